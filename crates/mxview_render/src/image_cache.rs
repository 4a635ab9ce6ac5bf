// SPDX-License-Identifier: MIT OR Apache-2.0
//! Image loading and the image cache.
//!
//! Images are keyed by absolute path and decoded at most once per path until
//! the entry is invalidated. Failed acquisitions are cached as well, so a
//! missing texture costs one lookup per session rather than one per frame.

use crate::backend::{RenderBackend, TextureId};
use crate::error::ImageError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Decoded pixel storage
#[derive(Debug, Clone, PartialEq)]
pub enum ImagePixels {
    /// 8-bit unsigned channels
    U8(Vec<u8>),
    /// 32-bit float channels
    F32(Vec<f32>),
}

/// A decoded image ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Channels per pixel
    pub channel_count: u32,
    /// Interleaved pixels
    pub pixels: ImagePixels,
}

impl ImageData {
    /// A 1x1 RGBA float image
    pub fn solid(color: [f32; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            channel_count: 4,
            pixels: ImagePixels::F32(color.to_vec()),
        }
    }

    /// Whether channels are floating point
    pub fn is_float(&self) -> bool {
        matches!(self.pixels, ImagePixels::F32(_))
    }

    /// Number of levels in a full mip chain
    pub fn mip_count(&self) -> u32 {
        let largest = self.width.max(self.height).max(1);
        u32::BITS - largest.leading_zeros()
    }
}

/// An uploaded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDesc {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Channels per pixel
    pub channel_count: u32,
    /// Number of mip levels
    pub mip_count: u32,
    /// GPU texture
    pub resource_id: TextureId,
    /// Whether channels are floating point
    pub floating_point: bool,
}

impl ImageDesc {
    fn uploaded(data: &ImageData, resource_id: TextureId) -> Self {
        Self {
            width: data.width,
            height: data.height,
            channel_count: data.channel_count,
            mip_count: data.mip_count(),
            resource_id,
            floating_point: data.is_float(),
        }
    }
}

/// Decodes image files
pub trait ImageLoader: Send + Sync {
    /// Lowercase file extensions the loader handles
    fn extensions(&self) -> &[&str];

    /// Decode a file
    fn load(&self, path: &Path) -> Result<ImageData, ImageError>;
}

/// Loader backed by the `image` crate
///
/// Only 8-bit and 32-bit float pixel formats are accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardImageLoader;

impl ImageLoader for StandardImageLoader {
    fn extensions(&self) -> &[&str] {
        &["png", "jpg", "jpeg", "gif", "bmp", "ico", "tga", "hdr", "exr"]
    }

    fn load(&self, path: &Path) -> Result<ImageData, ImageError> {
        let img = image::open(path).map_err(|e| match e {
            image::ImageError::Unsupported(e) => ImageError::UnsupportedFormat(e.to_string()),
            e => ImageError::Decode(e.to_string()),
        })?;
        let (width, height) = (img.width(), img.height());
        let (channel_count, pixels) = match img {
            image::DynamicImage::ImageLuma8(buf) => (1, ImagePixels::U8(buf.into_raw())),
            image::DynamicImage::ImageLumaA8(buf) => (2, ImagePixels::U8(buf.into_raw())),
            image::DynamicImage::ImageRgb8(buf) => (3, ImagePixels::U8(buf.into_raw())),
            image::DynamicImage::ImageRgba8(buf) => (4, ImagePixels::U8(buf.into_raw())),
            image::DynamicImage::ImageRgb32F(buf) => (3, ImagePixels::F32(buf.into_raw())),
            image::DynamicImage::ImageRgba32F(buf) => (4, ImagePixels::F32(buf.into_raw())),
            other => {
                return Err(ImageError::UnsupportedFormat(format!(
                    "{:?} in {}",
                    other.color(),
                    path.display()
                )))
            }
        };
        Ok(ImageData {
            width,
            height,
            channel_count,
            pixels,
        })
    }
}

/// Process-wide image cache owned by the viewer session
pub struct ImageCache {
    loaders: Vec<Box<dyn ImageLoader>>,
    entries: Mutex<HashMap<PathBuf, Result<ImageDesc, ImageError>>>,
    solids: Mutex<HashMap<[u32; 4], ImageDesc>>,
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCache")
            .field("loaders", &self.loaders.len())
            .field("entries", &self.entries.lock().len())
            .finish()
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCache {
    /// Create a cache with the standard loader
    pub fn new() -> Self {
        Self::with_loader(Box::new(StandardImageLoader))
    }

    /// Create a cache with a single loader
    pub fn with_loader(loader: Box<dyn ImageLoader>) -> Self {
        Self {
            loaders: vec![loader],
            entries: Mutex::new(HashMap::new()),
            solids: Mutex::new(HashMap::new()),
        }
    }

    /// Add a loader, consulted after the existing ones
    pub fn add_loader(&mut self, loader: Box<dyn ImageLoader>) {
        self.loaders.push(loader);
    }

    /// Acquire the image at a path, decoding and uploading it on first use
    ///
    /// The cache lock is held across the decode, so concurrent requests for
    /// the same path decode once.
    pub fn acquire(&self, path: &Path, backend: &mut dyn RenderBackend) -> Result<ImageDesc, ImageError> {
        let key = cache_key(path);
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(&key) {
            return entry.clone();
        }

        let result = self.load(&key).map(|data| {
            let texture = backend.create_texture(&data);
            ImageDesc::uploaded(&data, texture)
        });
        match &result {
            Ok(desc) => tracing::debug!(
                "Loaded image {} ({}x{}, {} mips)",
                key.display(),
                desc.width,
                desc.height,
                desc.mip_count
            ),
            Err(e) => tracing::warn!("Failed to load image {}: {}", key.display(), e),
        }
        entries.insert(key, result.clone());
        result
    }

    fn load(&self, path: &Path) -> Result<ImageData, ImageError> {
        if !path.is_file() {
            return Err(ImageError::NotFound(path.display().to_string()));
        }
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        let loader = self
            .loaders
            .iter()
            .find(|loader| loader.extensions().contains(&extension.as_str()))
            .ok_or_else(|| ImageError::UnsupportedFormat(path.display().to_string()))?;
        loader.load(path)
    }

    /// A 1x1 texture of a solid color, created once per color
    pub fn solid_color(&self, color: [f32; 4], backend: &mut dyn RenderBackend) -> ImageDesc {
        let key = color.map(f32::to_bits);
        *self.solids.lock().entry(key).or_insert_with(|| {
            let data = ImageData::solid(color);
            let texture = backend.create_texture(&data);
            ImageDesc::uploaded(&data, texture)
        })
    }

    /// Drop the entry for a path so the next acquisition decodes again
    pub fn invalidate(&self, path: &Path, backend: &mut dyn RenderBackend) -> bool {
        let removed = self.entries.lock().remove(&cache_key(path));
        if let Some(Ok(desc)) = &removed {
            backend.release_texture(desc.resource_id);
        }
        removed.is_some()
    }

    /// Drop every entry
    pub fn clear(&self, backend: &mut dyn RenderBackend) {
        for (_, entry) in self.entries.lock().drain() {
            if let Ok(desc) = entry {
                backend.release_texture(desc.resource_id);
            }
        }
        for (_, desc) in self.solids.lock().drain() {
            backend.release_texture(desc.resource_id);
        }
    }

    /// Check whether a path has an entry, successful or not
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.lock().contains_key(&cache_key(path))
    }

    /// Number of cached paths
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Absolute path with `.` and `..` resolved, so every spelling of a file
/// maps to one entry
fn cache_key(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CountingLoader, RecordingBackend};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mxview-images-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_acquire_decodes_once() {
        let dir = temp_dir();
        let path = dir.join("wood.png");
        std::fs::write(&path, b"stub").unwrap();

        let loader = CountingLoader::new();
        let decodes = Arc::clone(&loader.decodes);
        let cache = ImageCache::with_loader(Box::new(loader));
        let mut backend = RecordingBackend::new();

        let first = cache.acquire(&path, &mut backend).unwrap();
        let second = cache.acquire(&path, &mut backend).unwrap();
        assert_eq!(first, second);
        assert_eq!(decodes.load(Ordering::SeqCst), 1);
        assert_eq!(backend.textures_created, 1);
        assert_eq!(first.mip_count, 3);

        assert!(cache.invalidate(&path, &mut backend));
        cache.acquire(&path, &mut backend).unwrap();
        assert_eq!(decodes.load(Ordering::SeqCst), 2);
        assert_eq!(backend.textures_released, 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_path_spellings_share_entry() {
        let dir = temp_dir();
        std::fs::create_dir_all(dir.join("sub")).unwrap();
        let path = dir.join("wood.png");
        std::fs::write(&path, b"stub").unwrap();

        let loader = CountingLoader::new();
        let decodes = Arc::clone(&loader.decodes);
        let cache = ImageCache::with_loader(Box::new(loader));
        let mut backend = RecordingBackend::new();

        let direct = cache.acquire(&path, &mut backend).unwrap();
        let aliased = cache.acquire(&dir.join("sub").join("..").join("wood.png"), &mut backend).unwrap();
        assert_eq!(direct, aliased);
        assert_eq!(decodes.load(Ordering::SeqCst), 1);
        assert_eq!(backend.textures_created, 1);
        assert_eq!(cache.len(), 1);

        // Invalidation through another spelling drops the same entry
        assert!(cache.invalidate(&dir.join(".").join("wood.png"), &mut backend));
        assert!(cache.is_empty());

        // Missing files are normalized too
        let missing = dir.join("sub").join("..").join("missing.png");
        assert!(cache.acquire(&missing, &mut backend).is_err());
        assert!(cache.contains(&dir.join("missing.png")));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_is_cached_failure() {
        let dir = temp_dir();
        let path = dir.join("missing.png");
        let cache = ImageCache::with_loader(Box::new(CountingLoader::new()));
        let mut backend = RecordingBackend::new();

        assert!(matches!(cache.acquire(&path, &mut backend), Err(ImageError::NotFound(_))));
        assert!(cache.contains(&path));

        // Appearing later does not matter until the entry is invalidated
        std::fs::write(&path, b"stub").unwrap();
        assert!(cache.acquire(&path, &mut backend).is_err());
        cache.invalidate(&path, &mut backend);
        assert!(cache.acquire(&path, &mut backend).is_ok());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unknown_extension_unsupported() {
        let dir = temp_dir();
        let path = dir.join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();
        let cache = ImageCache::with_loader(Box::new(CountingLoader::new()));
        let mut backend = RecordingBackend::new();
        assert!(matches!(
            cache.acquire(&path, &mut backend),
            Err(ImageError::UnsupportedFormat(_))
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_solid_colors_shared() {
        let cache = ImageCache::with_loader(Box::new(CountingLoader::new()));
        let mut backend = RecordingBackend::new();
        let black = cache.solid_color([0.0, 0.0, 0.0, 1.0], &mut backend);
        let again = cache.solid_color([0.0, 0.0, 0.0, 1.0], &mut backend);
        assert_eq!(black.resource_id, again.resource_id);
        assert!(black.floating_point);
        assert_eq!(black.mip_count, 1);
        assert_eq!(backend.textures_created, 1);
    }

    #[test]
    fn test_standard_loader_reads_png() {
        let dir = temp_dir();
        let path = dir.join("checker.png");
        image::RgbaImage::from_pixel(4, 2, image::Rgba([255, 0, 0, 255]))
            .save(&path)
            .unwrap();
        let data = StandardImageLoader.load(&path).unwrap();
        assert_eq!((data.width, data.height, data.channel_count), (4, 2, 4));
        assert!(!data.is_float());
        assert_eq!(data.mip_count(), 3);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
