// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material binding and GPU resource caches for `mxview`.
//!
//! This crate connects generated shaders to a GPU:
//! - Rendering backend interface
//! - Image loading and the image cache
//! - Shader program cache
//! - Meshes and light rigs
//! - The material binder state machine
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  generate   ┌──────────────┐  acquire  ┌─────────────┐
//! │ Document     │ ──────────► │ Material     │ ────────► │ ShaderCache │
//! └──────────────┘             │  Unbound     │           └─────────────┘
//!                              │  Generated   │  acquire  ┌─────────────┐
//!        LightRig, Mesh ─────► │  Bound       │ ────────► │ ImageCache  │
//!                              └──────┬───────┘           └─────────────┘
//!                                     │ set_uniform / draw
//!                                     ▼
//!                              ┌──────────────┐
//!                              │ RenderBackend│
//!                              └──────────────┘
//! ```
//!
//! Both caches are owned by the viewer session and passed by reference.

pub mod backend;
pub mod image_cache;
pub mod shader_cache;
pub mod mesh;
pub mod lights;
pub mod material;
mod error;

#[cfg(test)]
mod test_support;

pub use backend::{
    AddressMode, FilterMode, ProgramId, RenderBackend, SamplingProperties, TextureId, UniformValue,
};
pub use error::{CompileError, ImageError, MaterialError};
pub use image_cache::{ImageCache, ImageData, ImageDesc, ImageLoader, ImagePixels, StandardImageLoader};
pub use lights::{EnvironmentLighting, LightRig, LightSource};
pub use material::{Material, MaterialState};
pub use mesh::{Mesh, MeshPartition, MeshStream};
pub use shader_cache::{CompiledProgram, ProgramHandle, ShaderCache};
