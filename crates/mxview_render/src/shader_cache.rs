// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compiled program cache.
//!
//! Programs are keyed by a hash of their vertex and pixel source. Subsets
//! generating identical source share one program while keeping independent
//! uniform state.

use crate::backend::{ProgramId, RenderBackend};
use crate::error::CompileError;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A compiled program and the source it was built from
#[derive(Debug, PartialEq, Eq)]
pub struct CompiledProgram {
    /// Backend handle
    pub id: ProgramId,
    /// Name the program was first compiled under
    pub name: String,
    /// Vertex stage source
    pub vertex_source: String,
    /// Pixel stage source
    pub pixel_source: String,
}

/// Shared handle of a cached program
pub type ProgramHandle = Arc<CompiledProgram>;

/// Programs shared across materials
#[derive(Debug, Default)]
pub struct ShaderCache {
    programs: Mutex<HashMap<u64, Vec<ProgramHandle>>>,
}

impl ShaderCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the program for a source pair, compiling it on a miss
    ///
    /// Hash collisions are resolved by comparing the source text.
    pub fn acquire(
        &self,
        name: &str,
        vertex_source: &str,
        pixel_source: &str,
        backend: &mut dyn RenderBackend,
    ) -> Result<ProgramHandle, CompileError> {
        let key = source_hash(vertex_source, pixel_source);
        let mut programs = self.programs.lock();
        if let Some(program) = programs
            .get(&key)
            .into_iter()
            .flatten()
            .find(|p| p.vertex_source == vertex_source && p.pixel_source == pixel_source)
        {
            tracing::debug!("Shader cache hit for {} (shared with {})", name, program.name);
            return Ok(Arc::clone(program));
        }

        let id = backend.compile_program(name, vertex_source, pixel_source)?;
        tracing::info!("Compiled program for {}", name);
        let program = Arc::new(CompiledProgram {
            id,
            name: name.to_string(),
            vertex_source: vertex_source.to_string(),
            pixel_source: pixel_source.to_string(),
        });
        programs.entry(key).or_default().push(Arc::clone(&program));
        Ok(program)
    }

    /// Release programs no material holds anymore
    ///
    /// Returns the number of programs released.
    pub fn purge_unused(&self, backend: &mut dyn RenderBackend) -> usize {
        let mut released = 0;
        let mut programs = self.programs.lock();
        for bucket in programs.values_mut() {
            bucket.retain(|program| {
                if Arc::strong_count(program) > 1 {
                    return true;
                }
                backend.release_program(program.id);
                released += 1;
                false
            });
        }
        programs.retain(|_, bucket| !bucket.is_empty());
        if released > 0 {
            tracing::debug!("Released {} unused programs", released);
        }
        released
    }

    /// Number of cached programs
    pub fn len(&self) -> usize {
        self.programs.lock().values().map(Vec::len).sum()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn source_hash(vertex_source: &str, pixel_source: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    vertex_source.hash(&mut hasher);
    pixel_source.hash(&mut hasher);
    hasher.finish()
}
