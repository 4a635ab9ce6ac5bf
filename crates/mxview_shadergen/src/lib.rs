// SPDX-License-Identifier: MIT OR Apache-2.0
//! GLSL shader generation for `mxview`.
//!
//! Turns a renderable element of a [`mxview_document::Document`] into a
//! vertex and pixel shader pair plus the metadata a renderer needs to bind
//! it: public uniforms, private uniforms, vertex inputs and light data.
//!
//! ## Architecture
//!
//! ```text
//! Document ──► ShaderGraph ──► GenContext ──► GeneratedShader
//!               (nodes,          (stage
//!                uniforms)        buffers)
//! ```
//!
//! Each graph node carries a [`NodeImplementation`]. Source-code records
//! from the document cover most nodes; the [`ImplementationRegistry`] holds
//! built-ins for geometric inputs such as texture coordinates.

pub mod color_management;
pub mod context;
pub mod generator;
pub mod graph;
pub mod implementation;
pub mod lights;
pub mod options;
pub mod registry;
pub mod shader;
pub mod stage;
pub mod syntax;
pub mod transparency;
pub mod variable;
mod error;

pub use context::GenContext;
pub use error::GenerationError;
pub use generator::ShaderGenerator;
pub use graph::{CycleError, InputBinding, ShaderGraph, ShaderInput, ShaderNode};
pub use implementation::{NodeImplementation, SourceCodeImplementation};
pub use lights::LightShaderBindings;
pub use options::{GenOptions, ShaderInterface, SpecularEnvironmentMethod};
pub use registry::{ImplementationCreator, ImplementationKey, ImplementationRegistry};
pub use shader::GeneratedShader;
pub use stage::StageBuffer;
pub use transparency::is_transparent_surface;
pub use variable::{ShaderVariable, VariableBlock};
