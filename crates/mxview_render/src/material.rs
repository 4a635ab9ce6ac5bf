// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material binder.
//!
//! A [`Material`] drives one material subset through
//! `Unbound -> Generated -> Bound`. Generation produces shader source and a
//! shared program from the [`ShaderCache`]; binding makes the program current,
//! after which view, image, light and mesh data can be written to it.
//!
//! Every uniform write is probed against the generated shader first, so
//! variants that dropped a uniform are skipped silently.

use crate::backend::{ProgramId, RenderBackend, SamplingProperties, UniformValue};
use crate::error::MaterialError;
use crate::image_cache::{ImageCache, ImageDesc};
use crate::lights::{EnvironmentLighting, LightRig};
use crate::mesh::{Mesh, MeshPartition};
use crate::shader_cache::{ProgramHandle, ShaderCache};
use glam::Mat4;
use indexmap::IndexMap;
use mxview_document::{Document, FileSearchPath, MaterialSubset, Value, UDIM_TOKEN};
use mxview_shadergen::shader::{
    ENV_IRRADIANCE, ENV_RADIANCE, ENV_RADIANCE_MIPS, ENV_SAMPLES, LIGHT_TYPE_FIELD,
    NUM_ACTIVE_LIGHT_SOURCES, VIEW_POSITION, VIEW_PROJECTION_MATRIX, WORLD_INVERSE_TRANSPOSE_MATRIX,
    WORLD_MATRIX,
};
use mxview_shadergen::{
    is_transparent_surface, GenOptions, GeneratedShader, ShaderGenerator, ShaderVariable, VariableBlock,
};
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Color bound in place of a missing environment map
const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Lifecycle of a material
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MaterialState {
    /// No shader generated yet
    #[default]
    Unbound,
    /// Shader generated and program compiled
    Generated,
    /// Program made current at least once since generation
    Bound,
}

/// Everything owned per successful generation
#[derive(Debug)]
struct ShaderBinding {
    shader: GeneratedShader,
    program: ProgramHandle,
    /// Texture unit per sampler uniform
    texture_units: IndexMap<String, u32>,
    /// Image filenames (after UDIM substitution) resolved against the search path
    resolved: HashMap<String, PathBuf>,
}

impl ShaderBinding {
    fn new(shader: GeneratedShader, program: ProgramHandle) -> Self {
        let mut texture_units = IndexMap::new();
        let samplers = shader
            .image_uniforms()
            .map(|v| v.name.as_str())
            .chain([ENV_RADIANCE, ENV_IRRADIANCE].into_iter().filter(|name| shader.has_uniform(name)));
        for name in samplers {
            let unit = texture_units.len() as u32;
            texture_units.insert(name.to_string(), unit);
        }
        Self {
            shader,
            program,
            texture_units,
            resolved: HashMap::new(),
        }
    }

    fn program_id(&self) -> ProgramId {
        self.program.id
    }

    /// Write a uniform if the shader declares it
    fn set(&self, backend: &mut dyn RenderBackend, name: &str, value: UniformValue) -> bool {
        if !self.shader.has_uniform(name) {
            return false;
        }
        backend.set_uniform(self.program_id(), name, value);
        true
    }

    fn resolve(&mut self, filename: &str, search_path: &FileSearchPath) {
        if !self.resolved.contains_key(filename) {
            let path = search_path.find(filename);
            tracing::debug!("Resolved image {} to {}", filename, path.display());
            self.resolved.insert(filename.to_string(), path);
        }
    }

    fn resolved(&self, filename: &str) -> Option<&Path> {
        self.resolved.get(filename).map(PathBuf::as_path)
    }

    /// Bind an image, or the fallback color when it cannot be acquired
    ///
    /// Returns the descriptor only when the image itself was bound.
    fn bind_texture(
        &self,
        backend: &mut dyn RenderBackend,
        cache: &ImageCache,
        uniform: &str,
        path: Option<&Path>,
        fallback: Option<[f32; 4]>,
    ) -> Option<ImageDesc> {
        let &unit = self.texture_units.get(uniform)?;
        let loaded = path.and_then(|path| cache.acquire(path, backend).ok());
        let desc = match (loaded, fallback) {
            (Some(desc), _) => desc,
            (None, Some(color)) => cache.solid_color(color, backend),
            (None, None) => return None,
        };
        backend.bind_texture(desc.resource_id, unit, &SamplingProperties::default());
        backend.set_uniform(self.program_id(), uniform, UniformValue::Sampler(unit));
        loaded
    }
}

/// One material subset and its GPU state
#[derive(Debug)]
pub struct Material {
    element: String,
    udim: Option<String>,
    state: MaterialState,
    binding: Option<ShaderBinding>,
}

impl Material {
    /// Create an unbound material for a renderable element path
    pub fn new(element: impl Into<String>, udim: Option<String>) -> Self {
        Self {
            element: element.into(),
            udim: udim.filter(|u| !u.is_empty()),
            state: MaterialState::Unbound,
            binding: None,
        }
    }

    /// Create an unbound material for a subset
    pub fn from_subset(subset: &MaterialSubset) -> Self {
        Self::new(subset.element.path.clone(), subset.udim.clone())
    }

    /// Path of the renderable element
    pub fn element(&self) -> &str {
        &self.element
    }

    /// UDIM tile, if any
    pub fn udim(&self) -> Option<&str> {
        self.udim.as_deref()
    }

    /// Current state
    pub fn state(&self) -> MaterialState {
        self.state
    }

    /// Generated shader, once generation succeeded
    pub fn shader(&self) -> Option<&GeneratedShader> {
        self.binding.as_ref().map(|b| &b.shader)
    }

    /// Compiled program, once generation succeeded
    pub fn program(&self) -> Option<&ProgramHandle> {
        self.binding.as_ref().map(|b| &b.program)
    }

    /// Editable uniforms of the generated shader
    pub fn public_uniforms(&self) -> Option<&VariableBlock> {
        self.shader().map(|s| &s.public_uniforms)
    }

    /// Find a public uniform by the graph path of its input
    pub fn find_uniform(&self, path: &str) -> Option<&ShaderVariable> {
        self.shader()?.find_uniform(path)
    }

    /// Whether the material is drawn with blending
    pub fn has_transparency(&self) -> bool {
        self.shader().is_some_and(|s| s.transparency)
    }

    /// Image files resolved so far
    pub fn referenced_images(&self) -> impl Iterator<Item = &Path> {
        self.binding
            .iter()
            .flat_map(|b| b.resolved.values().map(PathBuf::as_path))
    }

    /// Generate the shader and acquire its program
    ///
    /// Transparency is detected from the document. On failure the material
    /// keeps its previous shader and state. On success it is left
    /// `Generated`, releasing its hold on the previous program.
    pub fn generate_shader(
        &mut self,
        generator: &ShaderGenerator,
        doc: &Document,
        options: &GenOptions,
        cache: &ShaderCache,
        backend: &mut dyn RenderBackend,
    ) -> Result<(), MaterialError> {
        let options = GenOptions {
            hw_transparency: is_transparent_surface(doc, &self.element),
            ..options.clone()
        };
        let shader = generator.generate(doc, &self.element, &options)?;
        let program = cache.acquire(&shader.name, &shader.vertex_source, &shader.pixel_source, backend)?;
        self.binding = Some(ShaderBinding::new(shader, program));
        self.state = MaterialState::Generated;
        Ok(())
    }

    /// Make the program current and apply its blend state
    pub fn bind(&mut self, backend: &mut dyn RenderBackend) -> Result<(), MaterialError> {
        let Some(binding) = &self.binding else {
            return Err(MaterialError::NotGenerated(self.element.clone()));
        };
        backend.use_program(binding.program_id());
        backend.set_blending(binding.shader.transparency);
        self.state = MaterialState::Bound;
        Ok(())
    }

    fn bound(&self) -> Result<&ShaderBinding, MaterialError> {
        match (&self.binding, self.state) {
            (Some(binding), MaterialState::Bound) => Ok(binding),
            _ => Err(MaterialError::NotBound(self.element.clone())),
        }
    }

    fn bound_mut(&mut self) -> Result<(&mut ShaderBinding, Option<&str>), MaterialError> {
        match (&mut self.binding, self.state) {
            (Some(binding), MaterialState::Bound) => Ok((binding, self.udim.as_deref())),
            _ => Err(MaterialError::NotBound(self.element.clone())),
        }
    }

    /// Write the transform and camera uniforms
    pub fn bind_view_information(
        &self,
        backend: &mut dyn RenderBackend,
        world: Mat4,
        view: Mat4,
        projection: Mat4,
    ) -> Result<(), MaterialError> {
        let binding = self.bound()?;
        binding.set(backend, WORLD_MATRIX, UniformValue::Mat4(world));
        binding.set(backend, VIEW_PROJECTION_MATRIX, UniformValue::Mat4(projection * view));
        if binding.shader.has_uniform(WORLD_INVERSE_TRANSPOSE_MATRIX) {
            let inverse_transpose = world.inverse().transpose();
            binding.set(backend, WORLD_INVERSE_TRANSPOSE_MATRIX, UniformValue::Mat4(inverse_transpose));
        }
        if binding.shader.has_uniform(VIEW_POSITION) {
            let view_position = view.inverse().w_axis.truncate();
            binding.set(backend, VIEW_POSITION, UniformValue::Vec3(view_position));
        }
        Ok(())
    }

    /// Bind every filename uniform to its image
    ///
    /// The UDIM token is replaced before the search path is consulted.
    /// Images that cannot be acquired are replaced by `fallback` when given
    /// and left unbound otherwise. Returns the number of images bound.
    pub fn bind_images(
        &mut self,
        backend: &mut dyn RenderBackend,
        cache: &ImageCache,
        search_path: &FileSearchPath,
        fallback: Option<[f32; 4]>,
    ) -> Result<usize, MaterialError> {
        let (binding, udim) = self.bound_mut()?;
        for uniform in binding.shader.image_uniforms() {
            if let Some(filename) = image_filename(uniform, udim) {
                if !binding.resolved.contains_key(filename.as_ref()) {
                    let path = search_path.find(filename.as_ref());
                    binding.resolved.insert(filename.into_owned(), path);
                }
            }
        }

        let binding = &*binding;
        let mut bound = 0;
        for uniform in binding.shader.image_uniforms() {
            let path = image_filename(uniform, udim).and_then(|f| binding.resolved(f.as_ref()));
            if binding
                .bind_texture(backend, cache, &uniform.name, path, fallback)
                .is_some()
            {
                bound += 1;
            }
        }
        Ok(bound)
    }

    /// Bind one image file to a sampler uniform
    ///
    /// Returns the image descriptor when the file itself was bound; a
    /// sampler the shader does not declare is a no-op.
    pub fn bind_image(
        &mut self,
        backend: &mut dyn RenderBackend,
        cache: &ImageCache,
        search_path: &FileSearchPath,
        uniform: &str,
        filename: &str,
        fallback: Option<[f32; 4]>,
    ) -> Result<Option<ImageDesc>, MaterialError> {
        let (binding, udim) = self.bound_mut()?;
        let filename = substitute_udim(filename, udim);
        binding.resolve(&filename, search_path);
        let path = binding.resolved(&filename);
        Ok(binding.bind_texture(backend, cache, uniform, path, fallback))
    }

    /// Bind environment maps and the light rig
    ///
    /// Missing environment maps fall back to opaque black, and the radiance
    /// mip count is only written when the radiance map itself was bound. With
    /// direct lighting disabled no light is active, though light data is
    /// still written.
    pub fn bind_lights(
        &mut self,
        backend: &mut dyn RenderBackend,
        cache: &ImageCache,
        search_path: &FileSearchPath,
        rig: &LightRig,
        environment: &EnvironmentLighting,
    ) -> Result<(), MaterialError> {
        let (binding, _) = self.bound_mut()?;
        binding.set(backend, ENV_SAMPLES, UniformValue::count(environment.samples));

        for (uniform, filename) in [
            (ENV_RADIANCE, environment.radiance.as_str()),
            (ENV_IRRADIANCE, environment.irradiance.as_str()),
        ] {
            if !binding.texture_units.contains_key(uniform) {
                continue;
            }
            let path = if environment.indirect_lighting && !filename.is_empty() {
                binding.resolve(filename, search_path);
                binding.resolved(filename)
            } else {
                None
            };
            let desc = binding.bind_texture(backend, cache, uniform, path, Some(BLACK));
            if let (ENV_RADIANCE, Some(desc)) = (uniform, desc) {
                binding.set(backend, ENV_RADIANCE_MIPS, UniformValue::count(desc.mip_count));
            }
        }

        let capacity = binding.shader.max_light_sources;
        if rig.len() > capacity && capacity > 0 {
            tracing::debug!("Binding {} of {} lights", capacity, rig.len());
        }
        let active = if environment.direct_lighting {
            rig.len().min(capacity)
        } else {
            0
        };
        binding.set(backend, NUM_ACTIVE_LIGHT_SOURCES, UniformValue::count(active));

        for (index, light) in rig.lights().iter().enumerate().take(capacity) {
            set_light_field(binding, backend, index, LIGHT_TYPE_FIELD, UniformValue::count(light.type_id));
            for (field, value) in &light.inputs {
                if let Some(value) = UniformValue::from_value(value) {
                    set_light_field(binding, backend, index, field, value);
                }
            }
        }
        Ok(())
    }

    /// Upload the mesh streams the shader reads
    ///
    /// Returns the number of streams uploaded. Attributes the mesh lacks are
    /// left unset.
    pub fn bind_mesh(&self, backend: &mut dyn RenderBackend, mesh: &Mesh) -> Result<usize, MaterialError> {
        let binding = self.bound()?;
        let mut uploaded = 0;
        for input in binding.shader.vertex_inputs.iter() {
            match mesh.stream(&input.name) {
                Some(stream) => {
                    backend.upload_attribute(binding.program_id(), &stream.name, &stream.data, stream.components);
                    uploaded += 1;
                }
                None => tracing::debug!("Mesh '{}' has no '{}' stream", mesh.name(), input.name),
            }
        }
        Ok(uploaded)
    }

    /// Upload a partition's indices and draw it
    pub fn draw_partition(&self, backend: &mut dyn RenderBackend, partition: &MeshPartition) -> Result<(), MaterialError> {
        let binding = self.bound()?;
        backend.upload_indices(binding.program_id(), &partition.indices);
        backend.draw_indexed(binding.program_id(), partition.indices.len());
        Ok(())
    }

    /// Write a value to a uniform
    ///
    /// Returns false when the shader does not declare the uniform or the
    /// value has no uniform representation.
    pub fn set_uniform(&self, backend: &mut dyn RenderBackend, name: &str, value: &Value) -> Result<bool, MaterialError> {
        let binding = self.bound()?;
        Ok(UniformValue::from_value(value).is_some_and(|value| binding.set(backend, name, value)))
    }
}

fn set_light_field(binding: &ShaderBinding, backend: &mut dyn RenderBackend, index: usize, field: &str, value: UniformValue) {
    if binding.shader.has_light_field(index, field) {
        let name = GeneratedShader::light_data_uniform(index, field);
        backend.set_uniform(binding.program_id(), &name, value);
    }
}

fn image_filename<'a>(uniform: &'a ShaderVariable, udim: Option<&str>) -> Option<Cow<'a, str>> {
    let filename = uniform.value.as_ref()?.as_str()?;
    (!filename.is_empty()).then(|| substitute_udim(filename, udim))
}

fn substitute_udim<'a>(filename: &'a str, udim: Option<&str>) -> Cow<'a, str> {
    match udim {
        Some(udim) if filename.contains(UDIM_TOKEN) => Cow::Owned(filename.replace(UDIM_TOKEN, udim)),
        _ => Cow::Borrowed(filename),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CountingLoader, RecordingBackend};
    use glam::{Vec3, Vec4};
    use mxview_document::xml::{read_document_from_str, ReadOptions};

    const DOC: &str = r#"<materialx>
        <nodedef name="ND_surf" node="surf" type="surfaceshader">
          <input name="base_color" type="color3" value="0.8, 0.8, 0.8"/>
          <input name="opacity" type="float" value="1.0"/>
          <input name="normal" type="vector3" defaultgeomprop="Nworld"/>
        </nodedef>
        <implementation name="IM_surf" nodedef="ND_surf" language="genglsl" sourcecode="surfaceshader({{base_color}} * max(dot({{normal}}, vec3(0.0, 1.0, 0.0)), 0.0), vec3(1.0 - {{opacity}}))"/>
        <nodedef name="ND_image_color3" node="image" type="color3">
          <parameter name="file" type="filename" value=""/>
          <input name="texcoord" type="vector2" defaultgeomprop="UV0"/>
        </nodedef>
        <implementation name="IM_image" nodedef="ND_image_color3" language="genglsl" sourcecode="texture({{file}}, {{texcoord}}).rgb"/>
        <nodedef name="ND_point_light" node="point_light" type="lightshader">
          <input name="color" type="color3" value="1, 1, 1"/>
        </nodedef>
        <nodegraph name="ng">
          <image name="tex" type="color3"><parameter name="file" type="filename" value="wood.&lt;UDIM&gt;.png"/></image>
          <output name="out" type="color3" nodename="tex"/>
        </nodegraph>
        <material name="M">
          <shaderref name="sr" node="surf">
            <bindinput name="base_color" type="color3" nodegraph="ng" output="out"/>
          </shaderref>
        </material>
        <material name="Glass">
          <shaderref name="sr" node="surf">
            <bindinput name="opacity" type="float" value="0.3"/>
          </shaderref>
        </material>
        <point_light name="key" type="lightshader"/>
    </materialx>"#;

    struct Fixture {
        doc: Document,
        generator: ShaderGenerator,
        shaders: ShaderCache,
        images: ImageCache,
        backend: RecordingBackend,
        dir: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = std::env::temp_dir().join(format!("mxview-material-{}", uuid::Uuid::new_v4()));
            std::fs::create_dir_all(&dir).unwrap();
            Self {
                doc: read_document_from_str(DOC, &ReadOptions::default()).unwrap(),
                generator: ShaderGenerator::new(),
                shaders: ShaderCache::new(),
                images: ImageCache::with_loader(Box::new(CountingLoader::new())),
                backend: RecordingBackend::new(),
                dir,
            }
        }

        fn bound(&mut self, element: &str, udim: Option<&str>) -> Material {
            let mut material = Material::new(element, udim.map(str::to_string));
            material
                .generate_shader(
                    &self.generator,
                    &self.doc,
                    &GenOptions::default(),
                    &self.shaders,
                    &mut self.backend,
                )
                .unwrap();
            material.bind(&mut self.backend).unwrap();
            material
        }

        fn search_path(&self) -> FileSearchPath {
            FileSearchPath::from(self.dir.clone())
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    #[test]
    fn test_state_machine() {
        let mut fx = Fixture::new();
        let mut material = Material::new("M/sr", None);
        assert_eq!(material.state(), MaterialState::Unbound);
        assert!(matches!(material.bind(&mut fx.backend), Err(MaterialError::NotGenerated(_))));

        material
            .generate_shader(&fx.generator, &fx.doc, &GenOptions::default(), &fx.shaders, &mut fx.backend)
            .unwrap();
        assert_eq!(material.state(), MaterialState::Generated);
        let err = material.bind_view_information(&mut fx.backend, Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY);
        assert!(matches!(err, Err(MaterialError::NotBound(_))));

        material.bind(&mut fx.backend).unwrap();
        assert_eq!(material.state(), MaterialState::Bound);
        assert_eq!(fx.backend.used_programs.len(), 1);
        assert_eq!(fx.backend.blending, Some(false));

        // A failed regeneration keeps the working shader
        let mut broken = GenOptions::default();
        broken.target.language = "osl".to_string();
        assert!(material
            .generate_shader(&fx.generator, &fx.doc, &broken, &fx.shaders, &mut fx.backend)
            .is_err());
        assert_eq!(material.state(), MaterialState::Bound);
        assert!(material.shader().is_some());
    }

    #[test]
    fn test_transparency_enables_blending() {
        let mut fx = Fixture::new();
        let glass = fx.bound("Glass/sr", None);
        assert!(glass.has_transparency());
        assert_eq!(fx.backend.blending, Some(true));
        assert!(glass.shader().unwrap().pixel_source.contains("outAlpha"));
    }

    #[test]
    fn test_view_information() {
        let mut fx = Fixture::new();
        let material = fx.bound("M/sr", None);
        let world = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)) * Mat4::from_scale(Vec3::splat(2.0));
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let projection = Mat4::perspective_rh_gl(1.0, 1.0, 0.1, 100.0);
        material
            .bind_view_information(&mut fx.backend, world, view, projection)
            .unwrap();

        assert_eq!(fx.backend.uniform(WORLD_MATRIX), Some(UniformValue::Mat4(world)));
        assert_eq!(
            fx.backend.uniform(VIEW_PROJECTION_MATRIX),
            Some(UniformValue::Mat4(projection * view))
        );
        let Some(UniformValue::Vec3(position)) = fx.backend.uniform(VIEW_POSITION) else {
            panic!("view position not set");
        };
        assert!(position.abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), 1e-5));
        let Some(UniformValue::Mat4(normal)) = fx.backend.uniform(WORLD_INVERSE_TRANSPOSE_MATRIX) else {
            panic!("normal matrix not set");
        };
        assert!(normal.x_axis.abs_diff_eq(Vec4::new(0.5, 0.0, 0.0, -0.5), 1e-5));
    }

    #[test]
    fn test_images_substitute_udim() {
        let mut fx = Fixture::new();
        std::fs::write(fx.dir.join("wood.1001.png"), b"stub").unwrap();
        let search_path = fx.search_path();

        let mut tile = fx.bound("M/sr", Some("1001"));
        let bound = tile
            .bind_images(&mut fx.backend, &fx.images, &search_path, None)
            .unwrap();
        assert_eq!(bound, 1);
        assert_eq!(fx.backend.uniform("tex_file"), Some(UniformValue::Sampler(0)));
        let referenced: Vec<_> = tile.referenced_images().collect();
        assert_eq!(referenced, vec![fx.dir.join("wood.1001.png").as_path()]);

        // Without a tile the token stays and the file is missing
        let mut plain = fx.bound("M/sr", None);
        let bound = plain
            .bind_images(&mut fx.backend, &fx.images, &search_path, None)
            .unwrap();
        assert_eq!(bound, 0);
        let referenced: Vec<_> = plain.referenced_images().collect();
        assert_eq!(referenced, vec![Path::new("wood.<UDIM>.png")]);
    }

    #[test]
    fn test_missing_image_uses_fallback() {
        let mut fx = Fixture::new();
        let search_path = fx.search_path();
        let mut material = fx.bound("M/sr", Some("1002"));
        let created = fx.backend.textures_created;

        let bound = material
            .bind_images(&mut fx.backend, &fx.images, &search_path, Some([1.0, 0.0, 1.0, 1.0]))
            .unwrap();
        assert_eq!(bound, 0);
        assert_eq!(fx.backend.textures_created, created + 1);
        assert_eq!(fx.backend.uniform("tex_file"), Some(UniformValue::Sampler(0)));

        // Second frame hits the caches
        material
            .bind_images(&mut fx.backend, &fx.images, &search_path, Some([1.0, 0.0, 1.0, 1.0]))
            .unwrap();
        assert_eq!(fx.backend.textures_created, created + 1);
    }

    #[test]
    fn test_lights_fall_back_to_black() {
        let mut fx = Fixture::new();
        let search_path = fx.search_path();
        let rig = LightRig::from_document(&fx.doc);
        let mut material = fx.bound("M/sr", None);

        material
            .bind_lights(&mut fx.backend, &fx.images, &search_path, &rig, &EnvironmentLighting::default())
            .unwrap();
        assert_eq!(fx.backend.uniform(ENV_SAMPLES), Some(UniformValue::Int(16)));
        assert!(fx.backend.uniform(ENV_RADIANCE).is_some());
        assert!(fx.backend.uniform(ENV_IRRADIANCE).is_some());
        assert_eq!(fx.backend.uniform(ENV_RADIANCE_MIPS), None);
        assert_eq!(fx.backend.uniform(NUM_ACTIVE_LIGHT_SOURCES), Some(UniformValue::Int(1)));
        assert_eq!(fx.backend.uniform("u_lightData[0].type"), Some(UniformValue::Int(1)));
        // The generator was not told about the light, so its fields were dropped
        assert_eq!(fx.backend.uniform("u_lightData[0].color"), None);

        let environment = EnvironmentLighting {
            radiance: "sky.png".to_string(),
            direct_lighting: false,
            ..EnvironmentLighting::default()
        };
        std::fs::write(fx.dir.join("sky.png"), b"stub").unwrap();
        material
            .bind_lights(&mut fx.backend, &fx.images, &search_path, &rig, &environment)
            .unwrap();
        assert_eq!(fx.backend.uniform(ENV_RADIANCE_MIPS), Some(UniformValue::Int(3)));
        assert_eq!(fx.backend.uniform(NUM_ACTIVE_LIGHT_SOURCES), Some(UniformValue::Int(0)));
    }

    #[test]
    fn test_absent_uniform_is_noop() {
        let mut fx = Fixture::new();
        let material = fx.bound("M/sr", None);
        let set = material
            .set_uniform(&mut fx.backend, "no_such_uniform", &Value::Float(1.0))
            .unwrap();
        assert!(!set);
        assert!(fx.backend.uniform("no_such_uniform").is_none());

        let path = "M/sr/opacity";
        let name = material.find_uniform(path).unwrap().name.clone();
        assert!(material.set_uniform(&mut fx.backend, &name, &Value::Float(0.5)).unwrap());
        assert_eq!(fx.backend.uniform(&name), Some(UniformValue::Float(0.5)));
    }

    #[test]
    fn test_mesh_and_draw() {
        let mut fx = Fixture::new();
        let material = fx.bound("M/sr", None);
        let mesh = Mesh::cube();
        let uploaded = material.bind_mesh(&mut fx.backend, &mesh).unwrap();
        let names: Vec<_> = fx.backend.attributes.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(uploaded, names.len());
        assert!(names.contains(&"i_position"));
        assert!(names.contains(&"i_texcoord_0"));
        assert!(!names.contains(&"i_tangent"));

        material.draw_partition(&mut fx.backend, &mesh.partitions()[0]).unwrap();
        assert_eq!(fx.backend.index_uploads, 1);
        assert_eq!(fx.backend.draws, vec![36]);
    }

    #[test]
    fn test_identical_subsets_share_program() {
        let mut fx = Fixture::new();
        let a = fx.bound("M/sr", Some("1001"));
        let b = fx.bound("M/sr", Some("1002"));
        assert!(std::sync::Arc::ptr_eq(a.program().unwrap(), b.program().unwrap()));
        assert_eq!(fx.backend.compiled.len(), 1);
    }
}
