// SPDX-License-Identifier: MIT OR Apache-2.0
//! Recording backend and stub loader shared by the unit tests.

use crate::backend::{ProgramId, RenderBackend, SamplingProperties, TextureId, UniformValue};
use crate::error::{CompileError, ImageError};
use crate::image_cache::{ImageData, ImageLoader, ImagePixels};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Backend that records every call instead of touching a GPU
#[derive(Debug, Default)]
pub struct RecordingBackend {
    next_id: u64,
    pub compiled: Vec<(ProgramId, String)>,
    pub released_programs: Vec<ProgramId>,
    pub used_programs: Vec<ProgramId>,
    pub uniforms: HashMap<String, UniformValue>,
    pub textures_created: usize,
    pub textures_released: usize,
    pub bound_textures: Vec<(TextureId, u32)>,
    pub attributes: Vec<(String, usize)>,
    pub index_uploads: usize,
    pub draws: Vec<usize>,
    pub blending: Option<bool>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl RenderBackend for RecordingBackend {
    fn compile_program(&mut self, name: &str, vertex_source: &str, pixel_source: &str) -> Result<ProgramId, CompileError> {
        if !vertex_source.contains("main") || !pixel_source.contains("main") {
            return Err(CompileError {
                name: name.to_string(),
                message: "missing entry point".to_string(),
                vertex_source: vertex_source.to_string(),
                pixel_source: pixel_source.to_string(),
            });
        }
        let id = ProgramId(self.next_id());
        self.compiled.push((id, name.to_string()));
        Ok(id)
    }

    fn release_program(&mut self, program: ProgramId) {
        self.released_programs.push(program);
    }

    fn use_program(&mut self, program: ProgramId) {
        self.used_programs.push(program);
    }

    fn set_uniform(&mut self, _program: ProgramId, name: &str, value: UniformValue) {
        self.uniforms.insert(name.to_string(), value);
    }

    fn create_texture(&mut self, _image: &ImageData) -> TextureId {
        self.textures_created += 1;
        TextureId(self.next_id())
    }

    fn release_texture(&mut self, _texture: TextureId) {
        self.textures_released += 1;
    }

    fn bind_texture(&mut self, texture: TextureId, unit: u32, _sampling: &SamplingProperties) {
        self.bound_textures.push((texture, unit));
    }

    fn upload_attribute(&mut self, _program: ProgramId, name: &str, data: &[f32], components: usize) {
        self.attributes.push((name.to_string(), data.len() / components.max(1)));
    }

    fn upload_indices(&mut self, _program: ProgramId, _indices: &[u32]) {
        self.index_uploads += 1;
    }

    fn draw_indexed(&mut self, _program: ProgramId, index_count: usize) {
        self.draws.push(index_count);
    }

    fn set_blending(&mut self, enabled: bool) {
        self.blending = Some(enabled);
    }
}

/// Loader that counts decodes and returns a 4x4 RGBA image for any png
#[derive(Debug, Default)]
pub struct CountingLoader {
    pub decodes: Arc<AtomicUsize>,
}

impl CountingLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ImageLoader for CountingLoader {
    fn extensions(&self) -> &[&str] {
        &["png"]
    }

    fn load(&self, _path: &Path) -> Result<ImageData, ImageError> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        Ok(ImageData {
            width: 4,
            height: 4,
            channel_count: 4,
            pixels: ImagePixels::U8(vec![128; 64]),
        })
    }
}
