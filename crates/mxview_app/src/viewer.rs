// SPDX-License-Identifier: MIT OR Apache-2.0
//! Viewer session.
//!
//! A [`Viewer`] owns the standard libraries, the loaded document with one
//! [`Material`] per subset, the image and shader caches and the backend.
//! Loading and reloading build the new state aside and only install it once
//! the selected material generated, so a broken edit never replaces a
//! working material.

use crate::error::ViewerError;
use crate::file_watcher::FileEvent;
use crate::settings::ViewerSettings;
use mxview_document::loader::DOCUMENT_EXTENSION;
use mxview_document::{load_libraries, Document, DocumentLoader, LoadedDocument, MaterialSubset};
use mxview_render::{ImageCache, LightRig, Material, Mesh, RenderBackend, ShaderCache};
use mxview_shadergen::{GenOptions, ShaderGenerator};
use std::path::{Path, PathBuf};

/// Extension of implementation source files
const SOURCE_EXTENSION: &str = "glsl";

/// A document with its materials and lights
#[derive(Debug)]
struct Scene {
    path: PathBuf,
    loaded: LoadedDocument,
    materials: Vec<Material>,
    lights: LightRig,
    generator: ShaderGenerator,
    selection: usize,
}

/// Interactive session state, driven by a backend
#[derive(Debug)]
pub struct Viewer<B: RenderBackend> {
    settings: ViewerSettings,
    options: GenOptions,
    stdlib: Document,
    loader: DocumentLoader,
    scene: Option<Scene>,
    mesh: Mesh,
    images: ImageCache,
    shaders: ShaderCache,
    backend: B,
}

impl<B: RenderBackend> Viewer<B> {
    /// Create a session, loading the configured libraries
    pub fn new(settings: ViewerSettings, backend: B) -> Result<Self, ViewerError> {
        let stdlib = load_libraries(&settings.library_folders, &settings.search_path)?;
        let loader = DocumentLoader::new()
            .with_include_search_path(settings.search_path.clone())
            .with_target(settings.generator.target.clone());
        let mut options = settings.generator.clone();
        options.source_search_path.extend(&settings.search_path);
        Ok(Self {
            settings,
            options,
            stdlib,
            loader,
            scene: None,
            mesh: Mesh::cube(),
            images: ImageCache::new(),
            shaders: ShaderCache::new(),
            backend,
        })
    }

    /// Rendering backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Image cache
    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    /// Path of the loaded document
    pub fn document_path(&self) -> Option<&Path> {
        self.scene.as_ref().map(|s| s.path.as_path())
    }

    /// Material subsets of the loaded document
    pub fn subsets(&self) -> &[MaterialSubset] {
        self.scene.as_ref().map_or(&[], |s| s.loaded.subsets.as_slice())
    }

    /// Index of the selected subset
    pub fn selection(&self) -> Option<usize> {
        self.scene.as_ref().map(|s| s.selection)
    }

    /// Material of the selected subset
    pub fn current_material(&self) -> Option<&Material> {
        self.scene.as_ref().map(|s| &s.materials[s.selection])
    }

    /// Load a material document and select its first subset
    ///
    /// On failure the previous document stays installed.
    pub fn load(&mut self, path: &Path) -> Result<(), ViewerError> {
        let scene = self.prepare(path, 0)?;
        self.install(scene)
    }

    /// Reload the current document
    ///
    /// Textures the previous materials referenced are re-decoded and
    /// programs no material holds anymore are released. On failure the
    /// previous document stays installed.
    pub fn reload(&mut self) -> Result<(), ViewerError> {
        let (path, selection) = match &self.scene {
            Some(scene) => (scene.path.clone(), scene.selection),
            None => return Err(ViewerError::NoMaterial),
        };
        let scene = self.prepare(&path, selection)?;

        if let Some(old) = &self.scene {
            let referenced: Vec<PathBuf> = old
                .materials
                .iter()
                .flat_map(Material::referenced_images)
                .map(Path::to_path_buf)
                .collect();
            for image in &referenced {
                self.images.invalidate(image, &mut self.backend);
            }
        }
        self.install(scene)?;
        self.shaders.purge_unused(&mut self.backend);
        tracing::info!("Reloaded {:?}", path);
        Ok(())
    }

    /// Read a document and generate the material at `selection`
    fn prepare(&mut self, path: &Path, selection: usize) -> Result<Scene, ViewerError> {
        let loaded = self.loader.load_document(path, &self.stdlib, &self.settings.modifiers)?;
        if loaded.subsets.is_empty() {
            return Err(ViewerError::NoSelection);
        }
        let lights = LightRig::from_document(&loaded.document);
        let mut generator = ShaderGenerator::new();
        generator.bind_light_shaders(lights.bindings().iter());

        let mut materials: Vec<Material> = loaded.subsets.iter().map(Material::from_subset).collect();
        let selection = if selection < materials.len() { selection } else { 0 };
        materials[selection].generate_shader(
            &generator,
            &loaded.document,
            &self.options,
            &self.shaders,
            &mut self.backend,
        )?;

        Ok(Scene {
            path: path.to_path_buf(),
            loaded,
            materials,
            lights,
            generator,
            selection,
        })
    }

    fn install(&mut self, mut scene: Scene) -> Result<(), ViewerError> {
        let material = &mut scene.materials[scene.selection];
        material.bind(&mut self.backend)?;
        material.bind_images(
            &mut self.backend,
            &self.images,
            &self.settings.search_path,
            self.settings.fallback_color,
        )?;
        material.bind_mesh(&mut self.backend, &self.mesh)?;
        tracing::info!("Selected {}", scene.loaded.subsets[scene.selection].label());
        self.scene = Some(scene);
        Ok(())
    }

    /// Select a subset, wrapping around
    ///
    /// A subset whose shader fails to generate leaves the previous selection
    /// bound.
    pub fn select(&mut self, index: usize) -> Result<(), ViewerError> {
        let Some(scene) = &mut self.scene else {
            return Err(ViewerError::NoSelection);
        };
        let index = index % scene.materials.len();
        let material = &mut scene.materials[index];
        if material.shader().is_none() {
            material.generate_shader(
                &scene.generator,
                &scene.loaded.document,
                &self.options,
                &self.shaders,
                &mut self.backend,
            )?;
        }
        material.bind(&mut self.backend)?;
        material.bind_images(
            &mut self.backend,
            &self.images,
            &self.settings.search_path,
            self.settings.fallback_color,
        )?;
        material.bind_mesh(&mut self.backend, &self.mesh)?;
        scene.selection = index;
        tracing::info!("Selected {}", scene.loaded.subsets[index].label());
        Ok(())
    }

    /// Select the next subset
    pub fn select_next(&mut self) -> Result<(), ViewerError> {
        let selection = self.selection().ok_or(ViewerError::NoSelection)?;
        self.select(selection + 1)
    }

    /// Select the previous subset
    pub fn select_previous(&mut self) -> Result<(), ViewerError> {
        let count = self.subsets().len();
        let selection = self.selection().ok_or(ViewerError::NoSelection)?;
        self.select(selection + count - 1)
    }

    /// Write the selected shader next to the search path
    ///
    /// Files are named `<stem>_vs.glsl` and `<stem>_ps.glsl`, where the stem
    /// is the document file name up to its first '.'.
    pub fn save_shaders(&self) -> Result<(PathBuf, PathBuf), ViewerError> {
        let scene = self.scene.as_ref().ok_or(ViewerError::NoMaterial)?;
        let shader = scene.materials[scene.selection]
            .shader()
            .ok_or(ViewerError::NoSelection)?;
        let dir = self.settings.search_path.first().ok_or(ViewerError::NoSearchPath)?;
        let file_name = scene.path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let stem = file_name.split('.').next().unwrap_or(file_name);

        let vertex_path = dir.join(format!("{stem}_vs.glsl"));
        let pixel_path = dir.join(format!("{stem}_ps.glsl"));
        for (path, source) in [(&vertex_path, &shader.vertex_source), (&pixel_path, &shader.pixel_source)] {
            std::fs::write(path, source).map_err(|e| ViewerError::Io {
                path: path.clone(),
                source: e,
            })?;
        }
        tracing::info!("Saved shaders to {:?} and {:?}", vertex_path, pixel_path);
        Ok((vertex_path, pixel_path))
    }

    /// Draw the mesh with the selected material
    pub fn draw_frame(&mut self) -> Result<(), ViewerError> {
        let Some(scene) = &mut self.scene else {
            return Ok(());
        };
        let (world, view, projection) = self.settings.camera.matrices();
        let environment = self.settings.environment();
        let material = &mut scene.materials[scene.selection];

        material.bind(&mut self.backend)?;
        material.bind_view_information(&mut self.backend, world, view, projection)?;
        material.bind_images(
            &mut self.backend,
            &self.images,
            &self.settings.search_path,
            self.settings.fallback_color,
        )?;
        material.bind_lights(
            &mut self.backend,
            &self.images,
            &self.settings.search_path,
            &scene.lights,
            &environment,
        )?;
        for partition in self.mesh.partitions() {
            material.draw_partition(&mut self.backend, partition)?;
        }
        Ok(())
    }

    /// React to a change on disk
    ///
    /// Documents and implementation sources trigger a reload; images are
    /// dropped from the cache so the next frame decodes them again.
    pub fn handle_file_event(&mut self, event: &FileEvent) -> Result<(), ViewerError> {
        let path = match event {
            FileEvent::Created(path) | FileEvent::Modified(path) | FileEvent::Deleted(path) => path,
            FileEvent::Error(message) => {
                tracing::warn!("File watcher error: {}", message);
                return Ok(());
            }
        };
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if extension == DOCUMENT_EXTENSION || extension == SOURCE_EXTENSION {
            if self.scene.is_some() && !matches!(event, FileEvent::Deleted(_)) {
                tracing::info!("{:?} changed, reloading", path);
                return self.reload();
            }
        } else if self.images.invalidate(path, &mut self.backend) {
            tracing::info!("Texture {:?} changed", path);
        }
        Ok(())
    }
}
