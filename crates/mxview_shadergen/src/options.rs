// SPDX-License-Identifier: MIT OR Apache-2.0
//! Generator options.

use mxview_document::{FileSearchPath, ImplementationTarget};
use serde::{Deserialize, Serialize};

/// Shading language emitted by the generator
pub const GLSL_LANGUAGE: &str = "genglsl";

/// Target API of the emitted source
pub const GLSL_TARGET: &str = "glsl";

/// Color space textures are converted to when no override is set
pub const DEFAULT_TARGET_COLOR_SPACE: &str = "lin_rec709";

/// Default size of the light data array
pub const DEFAULT_MAX_LIGHT_SOURCES: usize = 3;

/// Which unconnected inputs become public uniforms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShaderInterface {
    /// Every input of every node definition
    #[default]
    Complete,
    /// Only inputs authored in the document; the rest are inlined as constants
    Reduced,
}

/// How specular environment lighting is integrated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecularEnvironmentMethod {
    /// No environment lighting
    None,
    /// Prefiltered environment maps sampled by roughness
    Prefilter,
    /// Filtered importance sampling
    #[default]
    Fis,
}

/// Options controlling a generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenOptions {
    /// Language and API implementations are picked for
    pub target: ImplementationTarget,
    /// Emit alpha from the surface transparency
    pub hw_transparency: bool,
    /// Interface reduction mode
    pub shader_interface: ShaderInterface,
    /// Color space textures are converted into
    pub target_color_space_override: String,
    /// Specular environment integration method
    pub specular_environment_method: SpecularEnvironmentMethod,
    /// Size of the light data array
    pub max_light_sources: usize,
    /// Directories searched for implementation source files, first match wins
    pub source_search_path: FileSearchPath,
}

impl Default for GenOptions {
    fn default() -> Self {
        Self {
            target: ImplementationTarget::new(GLSL_LANGUAGE, GLSL_TARGET),
            hw_transparency: false,
            shader_interface: ShaderInterface::Complete,
            target_color_space_override: DEFAULT_TARGET_COLOR_SPACE.to_string(),
            specular_environment_method: SpecularEnvironmentMethod::Fis,
            max_light_sources: DEFAULT_MAX_LIGHT_SOURCES,
            source_search_path: FileSearchPath::new(),
        }
    }
}
