// SPDX-License-Identifier: MIT OR Apache-2.0
//! Viewer settings.
//!
//! Settings are stored as RON and cover:
//! - Library folders and the search path
//! - Document modifiers (remap table, skip set, file prefix terminator)
//! - Environment lighting and light toggles
//! - Camera
//! - Shader generation options

use crate::error::SettingsError;
use glam::{Mat4, Vec3};
use mxview_document::{DocumentModifiers, FileSearchPath};
use mxview_render::lights::{DEFAULT_ENV_SAMPLES, MAX_ENV_SAMPLES, MIN_ENV_SAMPLES};
use mxview_render::EnvironmentLighting;
use mxview_shadergen::GenOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Library folders loaded when none are configured
pub const DEFAULT_LIBRARY_FOLDERS: [&str; 4] = ["stdlib", "pbrlib", "stdlib/genglsl", "pbrlib/genglsl"];

/// Directory under the working directory appended to every search path
pub const DEFAULT_LIBRARY_ROOT: &str = "libraries";

/// Viewing camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Eye position
    pub eye: [f32; 3],
    /// Point looked at
    pub target: [f32; 3],
    /// Vertical field of view in degrees
    pub view_angle: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
    /// Uniform model scale
    pub zoom: f32,
    /// Viewport size in pixels
    pub viewport: [u32; 2],
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            eye: [0.0, 0.0, 5.0],
            target: [0.0, 0.0, 0.0],
            view_angle: 45.0,
            near: 0.05,
            far: 100.0,
            zoom: 1.0,
            viewport: [1280, 960],
        }
    }
}

impl CameraSettings {
    /// World, view and projection matrices
    pub fn matrices(&self) -> (Mat4, Mat4, Mat4) {
        let world = Mat4::from_scale(Vec3::splat(self.zoom));
        let view = Mat4::look_at_rh(Vec3::from(self.eye), Vec3::from(self.target), Vec3::Y);
        let aspect = self.viewport[0].max(1) as f32 / self.viewport[1].max(1) as f32;
        let projection = Mat4::perspective_rh_gl(self.view_angle.to_radians(), aspect, self.near, self.far);
        (world, view, projection)
    }
}

/// Complete viewer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    /// Settings format version
    pub version: u32,
    /// Material document opened at startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<PathBuf>,
    /// Library folders, resolved against the search path
    pub library_folders: Vec<String>,
    /// Directories searched for libraries, includes, images and sources
    pub search_path: FileSearchPath,
    /// Modifiers applied to every loaded document
    pub modifiers: DocumentModifiers,
    /// Environment radiance map
    pub environment_radiance: String,
    /// Environment irradiance map
    pub environment_irradiance: String,
    /// Environment samples, clamped to the supported range on load
    pub env_samples: u32,
    /// Evaluate the document's lights
    pub direct_lighting: bool,
    /// Evaluate the environment maps
    pub indirect_lighting: bool,
    /// Color bound in place of missing textures; unset leaves them unbound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_color: Option<[f32; 4]>,
    /// Camera
    pub camera: CameraSettings,
    /// Shader generation options
    pub generator: GenOptions,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        let environment = EnvironmentLighting::default();
        Self {
            version: SETTINGS_FORMAT_VERSION,
            material: None,
            library_folders: DEFAULT_LIBRARY_FOLDERS.iter().map(|f| f.to_string()).collect(),
            search_path: FileSearchPath::new(),
            modifiers: DocumentModifiers::default(),
            environment_radiance: environment.radiance,
            environment_irradiance: environment.irradiance,
            env_samples: DEFAULT_ENV_SAMPLES,
            direct_lighting: environment.direct_lighting,
            indirect_lighting: environment.indirect_lighting,
            fallback_color: Some([0.0, 0.0, 0.0, 1.0]),
            camera: CameraSettings::default(),
            generator: GenOptions::default(),
        }
    }
}

impl ViewerSettings {
    /// Load settings from a RON file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings: ViewerSettings = ron::from_str(&content).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }
        settings.set_env_samples(settings.env_samples);
        tracing::info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to a RON file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content =
            ron::ser::to_string_pretty(self, config).map_err(|e| SettingsError::Serialize(e.to_string()))?;
        std::fs::write(path, content).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Set the environment sample count, clamped to the supported range
    pub fn set_env_samples(&mut self, samples: u32) {
        let clamped = samples.clamp(MIN_ENV_SAMPLES, MAX_ENV_SAMPLES);
        if clamped != samples {
            tracing::warn!("Environment samples {} clamped to {}", samples, clamped);
        }
        self.env_samples = clamped;
    }

    /// Environment lighting for the material binder
    pub fn environment(&self) -> EnvironmentLighting {
        EnvironmentLighting {
            radiance: self.environment_radiance.clone(),
            irradiance: self.environment_irradiance.clone(),
            samples: self.env_samples,
            direct_lighting: self.direct_lighting,
            indirect_lighting: self.indirect_lighting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mxview-settings-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn test_default_settings() {
        let settings = ViewerSettings::default();
        assert_eq!(settings.version, SETTINGS_FORMAT_VERSION);
        assert_eq!(settings.library_folders, DEFAULT_LIBRARY_FOLDERS);
        assert_eq!(settings.env_samples, 16);
        assert!(settings.direct_lighting && settings.indirect_lighting);
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_file("viewer.ron");
        let mut settings = ViewerSettings::default();
        settings.search_path.append("/materials");
        settings
            .modifiers
            .remap_elements
            .insert("standard_surface".to_string(), "surf".to_string());
        settings.env_samples = 4096;
        settings.save(&path).unwrap();

        let loaded = ViewerSettings::load(&path).unwrap();
        assert_eq!(loaded.search_path, settings.search_path);
        assert_eq!(loaded.modifiers, settings.modifiers);
        assert_eq!(loaded.env_samples, MAX_ENV_SAMPLES);
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_partial_and_future_files() {
        let path = temp_file("viewer.ron");
        std::fs::write(&path, "(env_samples: 1, direct_lighting: false)").unwrap();
        let loaded = ViewerSettings::load(&path).unwrap();
        assert_eq!(loaded.env_samples, MIN_ENV_SAMPLES);
        assert!(!loaded.direct_lighting);
        assert_eq!(loaded.library_folders.len(), 4);

        std::fs::write(&path, "(version: 99)").unwrap();
        assert!(matches!(
            ViewerSettings::load(&path),
            Err(SettingsError::UnsupportedVersion { found: 99, .. })
        ));
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_camera_matrices() {
        let camera = CameraSettings::default();
        let (world, view, _) = camera.matrices();
        assert_eq!(world, Mat4::IDENTITY);
        let eye = view.inverse().w_axis.truncate();
        assert!(eye.abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), 1e-5));
    }
}
