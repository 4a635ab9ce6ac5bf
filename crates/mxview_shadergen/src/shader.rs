// SPDX-License-Identifier: MIT OR Apache-2.0
//! Generated shader output.

use crate::variable::{ShaderVariable, VariableBlock};
use mxview_document::TypeDesc;

/// Object-to-world transform
pub const WORLD_MATRIX: &str = "u_worldMatrix";
/// Combined view and projection transform
pub const VIEW_PROJECTION_MATRIX: &str = "u_viewProjectionMatrix";
/// Inverse transpose of the world transform, for normals
pub const WORLD_INVERSE_TRANSPOSE_MATRIX: &str = "u_worldInverseTransposeMatrix";
/// Camera position in world space
pub const VIEW_POSITION: &str = "u_viewPosition";
/// Environment radiance map
pub const ENV_RADIANCE: &str = "u_envRadiance";
/// Mip count of the environment radiance map
pub const ENV_RADIANCE_MIPS: &str = "u_envRadianceMips";
/// Environment irradiance map
pub const ENV_IRRADIANCE: &str = "u_envIrradiance";
/// Number of environment samples
pub const ENV_SAMPLES: &str = "u_envSamples";
/// Number of active entries in the light data array
pub const NUM_ACTIVE_LIGHT_SOURCES: &str = "u_numActiveLightSources";
/// Light data array
pub const LIGHT_DATA: &str = "u_lightData";
/// Light data field holding the light type id
pub const LIGHT_TYPE_FIELD: &str = "type";
/// Pixel shader output
pub const OUTPUT_COLOR: &str = "out_color";

/// Source and binding metadata of one generation request
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedShader {
    /// Path of the renderable element
    pub name: String,
    /// Vertex stage source
    pub vertex_source: String,
    /// Pixel stage source
    pub pixel_source: String,
    /// Whether the surface needs blending
    pub transparency: bool,
    /// Editable uniforms in discovery order
    pub public_uniforms: VariableBlock,
    /// Uniforms set by the renderer (transforms, lighting)
    pub private_uniforms: VariableBlock,
    /// Vertex attributes the shader reads
    pub vertex_inputs: VariableBlock,
    /// Fields of the light data struct, starting with `type`
    pub light_data: VariableBlock,
    /// Size of the light data array, 0 when the shader is unlit
    pub max_light_sources: usize,
}

impl GeneratedShader {
    /// Check whether the shader declares a uniform
    ///
    /// Light data entries are addressed as `u_lightData[i].field`.
    pub fn has_uniform(&self, name: &str) -> bool {
        if self.public_uniforms.contains(name) || self.private_uniforms.contains(name) {
            return true;
        }
        match parse_light_data_uniform(name) {
            Some((index, field)) => self.has_light_field(index, field),
            None => false,
        }
    }

    /// Check whether light entry `index` has a field the shader retained
    pub fn has_light_field(&self, index: usize, field: &str) -> bool {
        index < self.max_light_sources && self.light_data.contains(field)
    }

    /// Check whether the shader reads a vertex attribute
    pub fn has_vertex_input(&self, name: &str) -> bool {
        self.vertex_inputs.contains(name)
    }

    /// Type of a declared uniform
    pub fn uniform_type(&self, name: &str) -> Option<&TypeDesc> {
        if let Some(variable) = self
            .public_uniforms
            .get(name)
            .or_else(|| self.private_uniforms.get(name))
        {
            return Some(&variable.type_desc);
        }
        let (index, field) = parse_light_data_uniform(name)?;
        if index < self.max_light_sources {
            self.light_data.get(field).map(|v| &v.type_desc)
        } else {
            None
        }
    }

    /// Find a public uniform by the graph path of its input
    pub fn find_uniform(&self, path: &str) -> Option<&ShaderVariable> {
        self.public_uniforms.find_by_path(path)
    }

    /// Public uniforms holding texture file names
    pub fn image_uniforms(&self) -> impl Iterator<Item = &ShaderVariable> {
        self.public_uniforms
            .iter()
            .filter(|v| v.type_desc == TypeDesc::Filename)
    }

    /// Name of a light data entry
    pub fn light_data_uniform(index: usize, field: &str) -> String {
        format!("{LIGHT_DATA}[{index}].{field}")
    }
}

/// Split `u_lightData[i].field` into index and field
fn parse_light_data_uniform(name: &str) -> Option<(usize, &str)> {
    let rest = name.strip_prefix(LIGHT_DATA)?.strip_prefix('[')?;
    let (index, field) = rest.split_once("].")?;
    Some((index.parse().ok()?, field))
}
