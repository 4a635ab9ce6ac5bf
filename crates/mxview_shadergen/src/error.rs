// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader generation errors.

use mxview_document::ResolveError;
use std::path::PathBuf;

/// Error when generating shader source for an element
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// No element was given, or the path does not name one
    #[error("Element '{0}' does not exist")]
    EmptyElement(String),

    /// The renderable element itself could not be resolved
    #[error("Cannot resolve '{element}': {source}")]
    UnresolvedRoot {
        /// Element name path
        element: String,
        /// Resolution failure
        #[source]
        source: ResolveError,
    },

    /// The node graph contains a cycle
    #[error("Node graph contains a cycle through '{0}'")]
    Cycle(String),

    /// An implementation source file is missing from the search path
    #[error("Source file '{file}' for '{implementation}' not found")]
    SourceNotFound {
        /// Implementation element name
        implementation: String,
        /// File as written in the implementation
        file: String,
    },

    /// An implementation source file exists but could not be read
    #[error("Failed to read source {}: {source}", .path.display())]
    SourceIo {
        /// Resolved path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// An implementation record cannot be turned into code
    #[error("Invalid implementation '{implementation}': {message}")]
    InvalidSource {
        /// Implementation element name
        implementation: String,
        /// Description of the problem
        message: String,
    },

    /// The element kind or output type cannot be rendered
    #[error("Unsupported element '{0}'")]
    UnsupportedElement(String),
}
