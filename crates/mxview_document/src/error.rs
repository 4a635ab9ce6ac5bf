// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors raised while reading or querying documents.

use std::path::PathBuf;

/// Error when reading or loading a document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// File could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Malformed document content
    #[error("Parse error in {origin}: {message}")]
    Parse {
        /// File path or `<memory>` for in-memory input
        origin: String,
        /// Description of the problem
        message: String,
    },

    /// A required attribute is missing
    #[error("Element '{element}' is missing attribute '{attribute}'")]
    MissingAttribute {
        /// Element name path
        element: String,
        /// Attribute name
        attribute: String,
    },

    /// Element lookup failed
    #[error("Element not found: {0}")]
    ElementNotFound(String),
}

impl DocumentError {
    pub(crate) fn parse(origin: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            origin: origin.into(),
            message: message.to_string(),
        }
    }
}
