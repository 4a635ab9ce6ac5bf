// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-request generation state shared with node implementations.

use crate::error::GenerationError;
use crate::options::GenOptions;
use crate::stage::StageBuffer;
use crate::variable::{ShaderVariable, VariableBlock};
use mxview_document::{Document, TypeDesc};
use std::collections::HashSet;
use std::path::PathBuf;

/// State of one generation pass
///
/// Node implementations register the attributes, varyings and uniforms they
/// need, then emit code into the stage buffers.
#[derive(Debug)]
pub struct GenContext<'a> {
    /// Document the graph was built from
    pub doc: &'a Document,
    /// Active options
    pub options: &'a GenOptions,
    /// Body of the vertex `main`
    pub vertex: StageBuffer,
    /// Body of the pixel `main`
    pub pixel: StageBuffer,
    /// Pixel-stage function definitions
    pub functions: StageBuffer,
    /// Vertex attributes
    pub vertex_inputs: VariableBlock,
    /// Values passed from the vertex to the pixel stage
    pub varyings: VariableBlock,
    /// Private uniforms of the vertex stage
    pub vertex_uniforms: VariableBlock,
    /// Private uniforms of the pixel stage
    pub pixel_uniforms: VariableBlock,
    included: HashSet<PathBuf>,
}

impl<'a> GenContext<'a> {
    /// Create an empty context
    pub fn new(doc: &'a Document, options: &'a GenOptions) -> Self {
        Self {
            doc,
            options,
            vertex: StageBuffer::with_indent(1),
            pixel: StageBuffer::with_indent(1),
            functions: StageBuffer::new(),
            vertex_inputs: VariableBlock::new(),
            varyings: VariableBlock::new(),
            vertex_uniforms: VariableBlock::new(),
            pixel_uniforms: VariableBlock::new(),
            included: HashSet::new(),
        }
    }

    /// Register a vertex attribute
    pub fn add_vertex_input(&mut self, name: &str, type_desc: TypeDesc) {
        self.vertex_inputs.add(ShaderVariable::new(name, type_desc));
    }

    /// Register a varying
    pub fn add_varying(&mut self, name: &str, type_desc: TypeDesc) {
        self.varyings.add(ShaderVariable::new(name, type_desc));
    }

    /// Register a private vertex-stage uniform
    pub fn add_vertex_uniform(&mut self, name: &str, type_desc: TypeDesc) {
        self.vertex_uniforms.add(ShaderVariable::new(name, type_desc));
    }

    /// Register a private pixel-stage uniform
    pub fn add_pixel_uniform(&mut self, name: &str, type_desc: TypeDesc) {
        self.pixel_uniforms.add(ShaderVariable::new(name, type_desc));
    }

    /// Append the content of a source file to the function definitions
    ///
    /// The file is resolved against the source search path. Each resolved
    /// file is included once.
    pub fn include_source(&mut self, implementation: &str, file: &str) -> Result<(), GenerationError> {
        let resolved = self
            .options
            .source_search_path
            .find_existing(file)
            .ok_or_else(|| GenerationError::SourceNotFound {
                implementation: implementation.to_string(),
                file: file.to_string(),
            })?;
        let key = resolved.canonicalize().unwrap_or_else(|_| resolved.clone());
        if !self.included.insert(key) {
            return Ok(());
        }

        let source = std::fs::read_to_string(&resolved).map_err(|source| GenerationError::SourceIo {
            path: resolved.clone(),
            source,
        })?;
        tracing::trace!("Including source {:?}", resolved);
        self.functions.add_line(&format!("// Included from {file}"));
        self.functions.add_block(&source);
        self.functions.new_line();
        Ok(())
    }
}
