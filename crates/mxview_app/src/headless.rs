// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless rendering backend.
//!
//! Stands in for a windowing and GPU layer: programs are validated and
//! assigned ids, uniform writes are tracked per program and draws are
//! counted and logged.

use mxview_render::{
    CompileError, ImageData, ProgramId, RenderBackend, SamplingProperties, TextureId, UniformValue,
};
use std::collections::HashMap;

/// Entry point every stage must define
const ENTRY_POINT: &str = "void main()";

#[derive(Debug, Default)]
struct ProgramState {
    name: String,
    uniforms: HashMap<String, UniformValue>,
    attributes: HashMap<String, usize>,
    index_count: usize,
}

/// Backend that keeps all state on the CPU
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_id: u64,
    programs: HashMap<ProgramId, ProgramState>,
    textures: HashMap<TextureId, (u32, u32)>,
    bound_textures: HashMap<u32, TextureId>,
    current: Option<ProgramId>,
    blending: bool,
    draw_calls: u64,
    triangles: u64,
}

impl HeadlessBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Number of live programs
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    /// Number of live textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Last value written to a uniform of a program
    pub fn uniform(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        self.programs.get(&program)?.uniforms.get(name).copied()
    }

    /// Currently used program
    pub fn current_program(&self) -> Option<ProgramId> {
        self.current
    }

    /// Whether blending is enabled
    pub fn blending(&self) -> bool {
        self.blending
    }

    /// Total draw calls issued
    pub fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    /// Total triangles drawn
    pub fn triangles(&self) -> u64 {
        self.triangles
    }
}

impl RenderBackend for HeadlessBackend {
    fn compile_program(&mut self, name: &str, vertex_source: &str, pixel_source: &str) -> Result<ProgramId, CompileError> {
        let missing = [("vertex", vertex_source), ("pixel", pixel_source)]
            .into_iter()
            .find(|(_, source)| !source.contains(ENTRY_POINT));
        if let Some((stage, _)) = missing {
            return Err(CompileError {
                name: name.to_string(),
                message: format!("{stage} stage has no '{ENTRY_POINT}'"),
                vertex_source: vertex_source.to_string(),
                pixel_source: pixel_source.to_string(),
            });
        }

        let id = ProgramId(self.allocate_id());
        self.programs.insert(
            id,
            ProgramState {
                name: name.to_string(),
                ..Default::default()
            },
        );
        tracing::debug!("Created program {:?} for {}", id, name);
        Ok(id)
    }

    fn release_program(&mut self, program: ProgramId) {
        if let Some(state) = self.programs.remove(&program) {
            tracing::debug!("Released program {:?} ({})", program, state.name);
        }
        if self.current == Some(program) {
            self.current = None;
        }
    }

    fn use_program(&mut self, program: ProgramId) {
        self.current = Some(program);
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) {
        match self.programs.get_mut(&program) {
            Some(state) => {
                state.uniforms.insert(name.to_string(), value);
            }
            None => tracing::warn!("Uniform {} set on unknown program {:?}", name, program),
        }
    }

    fn create_texture(&mut self, image: &ImageData) -> TextureId {
        let id = TextureId(self.allocate_id());
        self.textures.insert(id, (image.width, image.height));
        id
    }

    fn release_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        self.bound_textures.retain(|_, bound| *bound != texture);
    }

    fn bind_texture(&mut self, texture: TextureId, unit: u32, _sampling: &SamplingProperties) {
        self.bound_textures.insert(unit, texture);
    }

    fn upload_attribute(&mut self, program: ProgramId, name: &str, data: &[f32], components: usize) {
        if let Some(state) = self.programs.get_mut(&program) {
            state.attributes.insert(name.to_string(), data.len() / components.max(1));
        }
    }

    fn upload_indices(&mut self, program: ProgramId, indices: &[u32]) {
        if let Some(state) = self.programs.get_mut(&program) {
            state.index_count = indices.len();
        }
    }

    fn draw_indexed(&mut self, program: ProgramId, index_count: usize) {
        let Some(state) = self.programs.get(&program) else {
            tracing::warn!("Draw with unknown program {:?}", program);
            return;
        };
        if state.index_count < index_count {
            tracing::warn!(
                "Draw of {} indices with {} uploaded for {}",
                index_count,
                state.index_count,
                state.name
            );
            return;
        }
        self.draw_calls += 1;
        self.triangles += (index_count / 3) as u64;
        tracing::trace!(
            "Drew {} triangles with {} ({} attributes)",
            index_count / 3,
            state.name,
            state.attributes.len()
        );
    }

    fn set_blending(&mut self, enabled: bool) {
        self.blending = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "void main()\n{\n}\n";

    #[test]
    fn test_compile_requires_entry_point() {
        let mut backend = HeadlessBackend::new();
        let err = backend.compile_program("m", SOURCE, "void other() {}").unwrap_err();
        assert!(err.message.contains("pixel"));
        assert_eq!(err.pixel_source, "void other() {}");
        assert_eq!(backend.program_count(), 0);

        let id = backend.compile_program("m", SOURCE, SOURCE).unwrap();
        assert_eq!(backend.program_count(), 1);
        backend.release_program(id);
        assert_eq!(backend.program_count(), 0);
    }

    #[test]
    fn test_uniforms_and_draws() {
        let mut backend = HeadlessBackend::new();
        let id = backend.compile_program("m", SOURCE, SOURCE).unwrap();
        backend.use_program(id);
        backend.set_uniform(id, "u_envSamples", UniformValue::Int(16));
        assert_eq!(backend.uniform(id, "u_envSamples"), Some(UniformValue::Int(16)));
        assert_eq!(backend.current_program(), Some(id));

        backend.draw_indexed(id, 6);
        assert_eq!(backend.draw_calls(), 0);
        backend.upload_indices(id, &[0, 1, 2, 2, 3, 0]);
        backend.draw_indexed(id, 6);
        assert_eq!(backend.draw_calls(), 1);
        assert_eq!(backend.triangles(), 2);
    }

    #[test]
    fn test_textures() {
        let mut backend = HeadlessBackend::new();
        let texture = backend.create_texture(&ImageData::solid([0.0, 0.0, 0.0, 1.0]));
        backend.bind_texture(texture, 0, &SamplingProperties::default());
        assert_eq!(backend.texture_count(), 1);
        backend.release_texture(texture);
        assert_eq!(backend.texture_count(), 0);
    }
}
