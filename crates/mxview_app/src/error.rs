// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors of the viewer binary.

use mxview_document::DocumentError;
use mxview_render::MaterialError;
use std::path::PathBuf;

/// Invalid command line
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CliError {
    /// A flag was given without its value
    #[error("{0} requires a value")]
    MissingValue(String),
    /// A flag value could not be parsed
    #[error("Invalid value '{value}' for {flag}")]
    InvalidValue {
        /// Flag name
        flag: String,
        /// Offending value
        value: String,
    },
}

/// Errors reading or writing viewer settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Settings file could not be read or written
    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        /// Settings file
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
    /// Settings file is not valid RON
    #[error("Invalid settings in {}: {message}", .path.display())]
    Parse {
        /// Settings file
        path: PathBuf,
        /// Parser diagnostic
        message: String,
    },
    /// Settings could not be serialized
    #[error("Failed to serialize settings: {0}")]
    Serialize(String),
    /// Settings were written by a newer viewer
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },
}

/// Errors of a viewer session
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    /// Invalid command line
    #[error(transparent)]
    Cli(#[from] CliError),
    /// Settings could not be loaded
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// Document or library loading failed
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// Shader generation, compilation or binding failed
    #[error(transparent)]
    Material(#[from] MaterialError),
    /// File watching could not be set up
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),
    /// Shader source could not be written
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        /// Output file
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
    /// No material document was given
    #[error("No material document given")]
    NoMaterial,
    /// The loaded document has no renderable element
    #[error("Document has no renderable elements")]
    NoSelection,
    /// Writing shaders needs a search path directory
    #[error("Search path is empty")]
    NoSearchPath,
}
