// SPDX-License-Identifier: MIT OR Apache-2.0
//! File system watcher for material documents and their resources.
//!
//! Provides debounced file system events so the viewer can reload a
//! document or re-decode a texture after it changes on disk.

use notify_debouncer_full::{
    new_debouncer,
    notify::{self, EventKind, RecommendedWatcher, RecursiveMode},
    DebounceEventResult, Debouncer, RecommendedCache,
};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

/// Events emitted by the file watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    /// A file was created
    Created(PathBuf),
    /// A file was modified
    Modified(PathBuf),
    /// A file was deleted
    Deleted(PathBuf),
    /// An error occurred
    Error(String),
}

/// Configuration for the file watcher
#[derive(Debug, Clone)]
pub struct FileWatcherConfig {
    /// Debounce duration for events
    pub debounce_duration: Duration,
    /// Whether to watch directories recursively
    pub recursive: bool,
    /// File extensions to watch (empty = watch all)
    pub extensions: HashSet<String>,
}

impl Default for FileWatcherConfig {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_millis(250),
            recursive: true,
            extensions: HashSet::new(),
        }
    }
}

impl FileWatcherConfig {
    /// Watch documents, implementation sources and images
    pub fn for_materials() -> Self {
        let extensions = [
            // Documents
            "mtlx",
            // Implementation sources
            "glsl",
            // Images
            "png", "jpg", "jpeg", "gif", "bmp", "ico", "tga", "hdr", "exr",
        ];
        Self {
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            ..Self::default()
        }
    }

    fn accepts(&self, path: &Path) -> bool {
        self.extensions.is_empty()
            || path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| self.extensions.contains(&e.to_lowercase()))
    }
}

/// Debounced watcher over a set of directories
pub struct FileWatcher {
    /// The underlying debounced watcher
    watcher: Debouncer<RecommendedWatcher, RecommendedCache>,
    /// Receiver for file events
    event_rx: Receiver<FileEvent>,
    /// Watched directories
    watched_dirs: Arc<RwLock<HashSet<PathBuf>>>,
    /// Configuration
    config: FileWatcherConfig,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("watched_dirs", &self.watched_dirs.read())
            .field("config", &self.config)
            .finish()
    }
}

impl FileWatcher {
    /// Create a new file watcher with the given configuration
    pub fn new(config: FileWatcherConfig) -> Result<Self, notify::Error> {
        let (event_tx, event_rx) = mpsc::channel();
        let filter = config.clone();

        let watcher = new_debouncer(config.debounce_duration, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    for event in events {
                        let make: fn(PathBuf) -> FileEvent = match event.kind {
                            EventKind::Create(_) => FileEvent::Created,
                            EventKind::Modify(_) => FileEvent::Modified,
                            EventKind::Remove(_) => FileEvent::Deleted,
                            EventKind::Any | EventKind::Access(_) | EventKind::Other => continue,
                        };
                        for path in event.paths.iter().filter(|p| filter.accepts(p)) {
                            let _ = event_tx.send(make(path.clone()));
                        }
                    }
                }
                Err(errors) => {
                    for error in errors {
                        let _ = event_tx.send(FileEvent::Error(error.to_string()));
                    }
                }
            }
        })?;

        Ok(Self {
            watcher,
            event_rx,
            watched_dirs: Arc::new(RwLock::new(HashSet::new())),
            config,
        })
    }

    /// Create a file watcher configured for material documents
    pub fn for_materials() -> Result<Self, notify::Error> {
        Self::new(FileWatcherConfig::for_materials())
    }

    /// Watch a directory for changes
    pub fn watch(&mut self, path: impl AsRef<Path>) -> Result<(), notify::Error> {
        let path = path.as_ref().to_path_buf();
        if self.is_watching(&path) {
            return Ok(());
        }
        let mode = if self.config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        self.watcher.watch(&path, mode)?;
        tracing::info!("Watching directory for changes: {:?}", path);
        self.watched_dirs.write().insert(path);
        Ok(())
    }

    /// Check if a directory is being watched
    pub fn is_watching(&self, path: &Path) -> bool {
        self.watched_dirs.read().contains(path)
    }

    /// Poll for pending file events (non-blocking)
    pub fn poll_events(&self) -> Vec<FileEvent> {
        let mut events = Vec::new();
        loop {
            match self.event_rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!("File watcher channel disconnected");
                    break;
                }
            }
        }
        events
    }
}
