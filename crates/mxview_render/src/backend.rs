// SPDX-License-Identifier: MIT OR Apache-2.0
//! Interface to the GPU.
//!
//! The viewer never talks to a graphics API directly. Program compilation,
//! texture upload, uniform updates and draws go through [`RenderBackend`],
//! which the binary implements on top of its windowing layer.

use crate::error::CompileError;
use crate::image_cache::ImageData;
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use mxview_document::Value;

/// Handle of a compiled program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u64);

/// Handle of an uploaded texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

/// Texture address mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AddressMode {
    /// Repeat the texture
    #[default]
    Periodic,
    /// Clamp to the edge texel
    Clamp,
    /// Mirror on every repeat
    Mirror,
}

/// Texture filter mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// Nearest texel
    Closest,
    /// Bilinear
    Linear,
    /// Trilinear across mip levels
    #[default]
    Cubic,
}

/// Sampling state applied when binding a texture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SamplingProperties {
    /// Horizontal address mode
    pub u_address_mode: AddressMode,
    /// Vertical address mode
    pub v_address_mode: AddressMode,
    /// Filter mode
    pub filter: FilterMode,
}

/// Value written to a program uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// `bool`
    Bool(bool),
    /// `int`
    Int(i32),
    /// `float`
    Float(f32),
    /// `vec2`
    Vec2(Vec2),
    /// `vec3`
    Vec3(Vec3),
    /// `vec4`
    Vec4(Vec4),
    /// `mat3`
    Mat3(Mat3),
    /// `mat4`
    Mat4(Mat4),
    /// `sampler2D`, by texture unit
    Sampler(u32),
}

impl UniformValue {
    /// `int` from an unsigned count, saturating at `i32::MAX`
    pub fn count(value: impl TryInto<i32>) -> Self {
        Self::Int(value.try_into().unwrap_or(i32::MAX))
    }

    /// Convert a document value, `None` for strings, filenames and arrays
    ///
    /// Document matrices are row-major.
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Boolean(b) => Self::Bool(*b),
            Value::Integer(i) => Self::Int(*i),
            Value::Float(f) => Self::Float(*f),
            Value::Vector2(v) => Self::Vec2(Vec2::from_array(*v)),
            Value::Color3(v) | Value::Vector3(v) => Self::Vec3(Vec3::from_array(*v)),
            Value::Color4(v) | Value::Vector4(v) => Self::Vec4(Vec4::from_array(*v)),
            Value::Matrix33(m) => Self::Mat3(Mat3::from_cols_array(m).transpose()),
            Value::Matrix44(m) => Self::Mat4(Mat4::from_cols_array(m).transpose()),
            Value::String(_)
            | Value::Filename(_)
            | Value::IntegerArray(_)
            | Value::FloatArray(_)
            | Value::StringArray(_) => return None,
        })
    }
}

/// GPU services consumed by the material binder and caches
pub trait RenderBackend {
    /// Compile and link a vertex/pixel program
    fn compile_program(&mut self, name: &str, vertex_source: &str, pixel_source: &str) -> Result<ProgramId, CompileError>;

    /// Release a program
    fn release_program(&mut self, program: ProgramId);

    /// Make a program current
    fn use_program(&mut self, program: ProgramId);

    /// Write a uniform of a program
    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue);

    /// Upload decoded pixels into a new texture
    fn create_texture(&mut self, image: &ImageData) -> TextureId;

    /// Release a texture
    fn release_texture(&mut self, texture: TextureId);

    /// Bind a texture to a unit with sampling properties
    fn bind_texture(&mut self, texture: TextureId, unit: u32, sampling: &SamplingProperties);

    /// Upload a vertex attribute stream
    fn upload_attribute(&mut self, program: ProgramId, name: &str, data: &[f32], components: usize);

    /// Upload a triangle index buffer
    fn upload_indices(&mut self, program: ProgramId, indices: &[u32]);

    /// Draw the uploaded indices as a triangle list
    fn draw_indexed(&mut self, program: ProgramId, index_count: usize);

    /// Enable or disable alpha blending
    fn set_blending(&mut self, enabled: bool);
}
