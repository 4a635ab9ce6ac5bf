// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ordered file search paths.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Separator used when a search path is written as a single string
pub const PATH_LIST_SEPARATOR: char = ';';

/// Ordered list of directories searched for relative file names
///
/// The first directory containing a match wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSearchPath {
    paths: Vec<PathBuf>,
}

impl FileSearchPath {
    /// Create an empty search path
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `;`-separated list of directories
    pub fn parse(list: &str) -> Self {
        Self {
            paths: list
                .split(PATH_LIST_SEPARATOR)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect(),
        }
    }

    /// Append a directory with the lowest priority
    pub fn append(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Prepend a directory with the highest priority
    pub fn prepend(&mut self, path: impl Into<PathBuf>) {
        self.paths.insert(0, path.into());
    }

    /// Append every directory of another search path
    pub fn extend(&mut self, other: &FileSearchPath) {
        self.paths.extend(other.paths.iter().cloned());
    }

    /// Directories in priority order
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Highest priority directory
    pub fn first(&self) -> Option<&Path> {
        self.paths.first().map(PathBuf::as_path)
    }

    /// Number of directories
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if there are no directories
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Resolve a file name to an existing path, if any
    pub fn find_existing(&self, filename: impl AsRef<Path>) -> Option<PathBuf> {
        let filename = filename.as_ref();
        if filename.as_os_str().is_empty() {
            return None;
        }
        if filename.is_absolute() {
            return filename.exists().then(|| filename.to_path_buf());
        }
        self.paths
            .iter()
            .map(|dir| dir.join(filename))
            .find(|candidate| candidate.exists())
            .or_else(|| filename.exists().then(|| filename.to_path_buf()))
    }

    /// Resolve a file name, returning it unchanged when nothing matches
    pub fn find(&self, filename: impl AsRef<Path>) -> PathBuf {
        let filename = filename.as_ref();
        self.find_existing(filename)
            .unwrap_or_else(|| filename.to_path_buf())
    }
}

impl From<PathBuf> for FileSearchPath {
    fn from(path: PathBuf) -> Self {
        Self { paths: vec![path] }
    }
}
