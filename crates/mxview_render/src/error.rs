// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rendering errors.

use mxview_shadergen::GenerationError;

/// Errors that can occur when acquiring an image
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    /// File not found
    #[error("File not found: {0}")]
    NotFound(String),
    /// No loader handles the format, or the pixel format is not 8-bit or float
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    /// Image decoding error
    #[error("Failed to decode image: {0}")]
    Decode(String),
}

/// A program failed to compile or link
///
/// Carries the offending source for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to compile '{name}': {message}")]
pub struct CompileError {
    /// Program name, the renderable element path
    pub name: String,
    /// Backend diagnostic
    pub message: String,
    /// Vertex stage source
    pub vertex_source: String,
    /// Pixel stage source
    pub pixel_source: String,
}

/// Errors of the material state machine
#[derive(Debug, thiserror::Error)]
pub enum MaterialError {
    /// The operation needs a generated shader
    #[error("Material '{0}' has no generated shader")]
    NotGenerated(String),
    /// The operation needs a bound program
    #[error("Material '{0}' is not bound")]
    NotBound(String),
    /// Shader generation failed
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// Program compilation failed
    #[error(transparent)]
    Compile(#[from] CompileError),
}
