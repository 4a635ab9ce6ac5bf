// SPDX-License-Identifier: MIT OR Apache-2.0
//! GLSL shader generator.

use crate::context::GenContext;
use crate::error::GenerationError;
use crate::graph::ShaderGraph;
use crate::implementation::{emit_default_output, POSITION_ATTRIBUTE, POSITION_WORLD_VARYING, VARYING_BLOCK_INSTANCE};
use crate::lights::{self, LightShaderBindings};
use crate::options::{GenOptions, SpecularEnvironmentMethod};
use crate::registry::ImplementationRegistry;
use crate::shader::{
    GeneratedShader, ENV_IRRADIANCE, ENV_RADIANCE, ENV_RADIANCE_MIPS, ENV_SAMPLES, LIGHT_DATA,
    NUM_ACTIVE_LIGHT_SOURCES, OUTPUT_COLOR, VIEW_POSITION, VIEW_PROJECTION_MATRIX, WORLD_MATRIX,
};
use crate::stage::StageBuffer;
use crate::syntax;
use crate::variable::{ShaderVariable, VariableBlock};
use mxview_document::{Document, TypeDesc};

/// GLSL version directive of every stage
const VERSION_DIRECTIVE: &str = "#version 400";

/// Generates vertex and pixel source for renderable elements
///
/// Holds the implementation registry and the light types bound for the
/// active scene. Generation itself is stateless: the same element and
/// options always produce the same source.
#[derive(Debug, Clone)]
pub struct ShaderGenerator {
    registry: ImplementationRegistry,
    light_shaders: LightShaderBindings,
}

impl Default for ShaderGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderGenerator {
    /// Create a generator with the built-in implementations
    pub fn new() -> Self {
        Self::with_registry(ImplementationRegistry::with_builtins())
    }

    /// Create a generator with a custom registry
    pub fn with_registry(registry: ImplementationRegistry) -> Self {
        Self {
            registry,
            light_shaders: LightShaderBindings::new(),
        }
    }

    /// Implementation registry
    pub fn registry(&self) -> &ImplementationRegistry {
        &self.registry
    }

    /// Mutable implementation registry
    pub fn registry_mut(&mut self) -> &mut ImplementationRegistry {
        &mut self.registry
    }

    /// Bind a light node definition to a type id
    pub fn bind_light_shader(&mut self, node_def: impl Into<String>, id: u32) {
        self.light_shaders.bind(node_def, id);
    }

    /// Replace every light binding
    pub fn bind_light_shaders<'s>(&mut self, bindings: impl IntoIterator<Item = (&'s str, u32)>) {
        self.light_shaders.clear();
        for (node_def, id) in bindings {
            self.light_shaders.bind(node_def, id);
        }
    }

    /// Light types bound for generation
    pub fn light_shaders(&self) -> &LightShaderBindings {
        &self.light_shaders
    }

    /// Generate the shader of a renderable element
    pub fn generate(&self, doc: &Document, element: &str, options: &GenOptions) -> Result<GeneratedShader, GenerationError> {
        if element.is_empty() {
            return Err(GenerationError::EmptyElement(String::new()));
        }
        let graph = ShaderGraph::build(doc, element, options, &self.registry)?;
        let order = graph
            .topological_order()
            .map_err(|_| GenerationError::Cycle(element.to_string()))?;

        let root = graph.root_node();
        let root_output = root.output_variable();
        let final_output = final_output_lines(&root.output_type, &root_output, options.hw_transparency)
            .ok_or_else(|| GenerationError::UnsupportedElement(format!("{} ({})", element, root.output_type)))?;
        let lit = root.output_type == TypeDesc::SurfaceShader;

        let mut ctx = GenContext::new(doc, options);
        ctx.add_vertex_uniform(WORLD_MATRIX, TypeDesc::Matrix44);
        ctx.add_vertex_uniform(VIEW_PROJECTION_MATRIX, TypeDesc::Matrix44);
        ctx.add_vertex_input(POSITION_ATTRIBUTE, TypeDesc::Vector3);

        let mut light_data = VariableBlock::new();
        let mut light_declarations = String::new();
        let max_light_sources = if lit { options.max_light_sources.max(1) } else { 0 };
        if lit {
            register_lighting_uniforms(&mut ctx, options.specular_environment_method);
            ctx.add_varying(POSITION_WORLD_VARYING, TypeDesc::Vector3);
            ctx.vertex.add_line(&format!(
                "{VARYING_BLOCK_INSTANCE}.{POSITION_WORLD_VARYING} = hPositionWorld.xyz;"
            ));
            ctx.vertex.set_calculated(POSITION_WORLD_VARYING);

            light_data = lights::light_data_fields(&ctx, &self.light_shaders);
            light_declarations = lights::emit_lights(&mut ctx, &self.light_shaders, &light_data)?;
        }

        for &index in &order {
            let node = &graph.nodes()[index];
            if let Some(implementation) = &node.implementation {
                implementation.register_inputs(node, &mut ctx)?;
            }
        }
        for &index in &order {
            let node = &graph.nodes()[index];
            if let Some(implementation) = &node.implementation {
                implementation.emit_function_definition(node, &mut ctx)?;
            }
        }
        for &index in &order {
            let node = &graph.nodes()[index];
            let output = node.output_variable();
            if ctx.pixel.is_calculated(&output) {
                continue;
            }
            match &node.implementation {
                Some(implementation) => implementation.emit_function_call(node, &graph, &mut ctx)?,
                None => emit_default_output(node, &mut ctx),
            }
            ctx.pixel.set_calculated(output);
        }
        for line in &final_output {
            ctx.pixel.add_line(line);
        }

        let vertex_source = assemble_vertex(&ctx);
        let pixel_source = assemble_pixel(&ctx, graph.public_uniforms(), &light_declarations, max_light_sources);

        let mut private_uniforms = VariableBlock::new();
        for variable in ctx.vertex_uniforms.iter().chain(ctx.pixel_uniforms.iter()) {
            private_uniforms.add(variable.clone());
        }
        if lit {
            private_uniforms.add(ShaderVariable::new(LIGHT_DATA, TypeDesc::Custom("LightData".into())));
        }

        tracing::info!(
            "Generated shader for {} ({} public uniforms, transparency: {})",
            element,
            graph.public_uniforms().len(),
            options.hw_transparency
        );

        Ok(GeneratedShader {
            name: element.to_string(),
            vertex_source,
            pixel_source,
            transparency: options.hw_transparency,
            public_uniforms: graph.public_uniforms().clone(),
            private_uniforms,
            vertex_inputs: ctx.vertex_inputs.clone(),
            light_data,
            max_light_sources,
        })
    }
}

fn register_lighting_uniforms(ctx: &mut GenContext, method: SpecularEnvironmentMethod) {
    ctx.add_pixel_uniform(VIEW_POSITION, TypeDesc::Vector3);
    ctx.add_pixel_uniform(NUM_ACTIVE_LIGHT_SOURCES, TypeDesc::Integer);
    match method {
        SpecularEnvironmentMethod::None => {}
        SpecularEnvironmentMethod::Prefilter => {
            ctx.add_pixel_uniform(ENV_RADIANCE, TypeDesc::Filename);
            ctx.add_pixel_uniform(ENV_RADIANCE_MIPS, TypeDesc::Integer);
            ctx.add_pixel_uniform(ENV_IRRADIANCE, TypeDesc::Filename);
        }
        SpecularEnvironmentMethod::Fis => {
            ctx.add_pixel_uniform(ENV_RADIANCE, TypeDesc::Filename);
            ctx.add_pixel_uniform(ENV_RADIANCE_MIPS, TypeDesc::Integer);
            ctx.add_pixel_uniform(ENV_SAMPLES, TypeDesc::Integer);
            ctx.add_pixel_uniform(ENV_IRRADIANCE, TypeDesc::Filename);
        }
    }
}

/// Statements writing the root output to `out_color`
fn final_output_lines(type_desc: &TypeDesc, output: &str, transparency: bool) -> Option<Vec<String>> {
    let color = match type_desc {
        TypeDesc::SurfaceShader | TypeDesc::VolumeShader if transparency => {
            return Some(vec![
                format!("float outAlpha = clamp(1.0 - dot({output}.transparency, vec3(0.3333)), 0.0, 1.0);"),
                format!("{OUTPUT_COLOR} = vec4({output}.color, outAlpha);"),
            ]);
        }
        TypeDesc::SurfaceShader | TypeDesc::VolumeShader => format!("vec4({output}.color, 1.0)"),
        TypeDesc::Float => format!("vec4(vec3({output}), 1.0)"),
        TypeDesc::Integer | TypeDesc::Boolean => format!("vec4(vec3(float({output})), 1.0)"),
        TypeDesc::Color3 | TypeDesc::Vector3 => format!("vec4({output}, 1.0)"),
        TypeDesc::Color4 | TypeDesc::Vector4 => output.to_string(),
        TypeDesc::Vector2 => format!("vec4({output}, 0.0, 1.0)"),
        _ => return None,
    };
    Some(vec![format!("{OUTPUT_COLOR} = {color};")])
}

fn declare_uniforms(out: &mut StageBuffer, title: &str, block: &VariableBlock, with_initializer: bool) {
    if block.is_empty() {
        return;
    }
    out.add_line(&format!("// Uniform block: {title}"));
    for variable in block {
        if let Some(declaration) = variable.declaration(with_initializer) {
            out.add_line(&format!("uniform {declaration};"));
        }
    }
    out.new_line();
}

fn declare_varyings(out: &mut StageBuffer, qualifier: &str, varyings: &VariableBlock) {
    if varyings.is_empty() {
        return;
    }
    out.add_line(&format!("{qualifier} VertexData"));
    out.begin_scope();
    for variable in varyings {
        if let Some(declaration) = variable.declaration(false) {
            out.add_line(&format!("{declaration};"));
        }
    }
    out.end_scope(&format!(" {VARYING_BLOCK_INSTANCE};"));
    out.new_line();
}

fn assemble_vertex(ctx: &GenContext) -> String {
    let mut out = StageBuffer::new();
    out.add_line(VERSION_DIRECTIVE);
    out.new_line();
    declare_uniforms(&mut out, "PrivateUniforms", &ctx.vertex_uniforms, false);

    out.add_line("// Inputs block: VertexInputs");
    for variable in &ctx.vertex_inputs {
        if let Some(declaration) = variable.declaration(false) {
            out.add_line(&format!("in {declaration};"));
        }
    }
    out.new_line();
    declare_varyings(&mut out, "out", &ctx.varyings);

    out.add_line("void main()");
    out.begin_scope();
    out.add_line(&format!(
        "vec4 hPositionWorld = {WORLD_MATRIX} * vec4({POSITION_ATTRIBUTE}, 1.0);"
    ));
    out.add_line(&format!("gl_Position = {VIEW_PROJECTION_MATRIX} * hPositionWorld;"));
    let mut source = out.into_code();
    source.push_str(ctx.vertex.code());
    source.push_str("}\n");
    source
}

fn assemble_pixel(
    ctx: &GenContext,
    public_uniforms: &VariableBlock,
    light_declarations: &str,
    max_light_sources: usize,
) -> String {
    let mut out = StageBuffer::new();
    out.add_line(VERSION_DIRECTIVE);
    out.new_line();
    if max_light_sources > 0 {
        out.add_line(&format!("#define MAX_LIGHT_SOURCES {max_light_sources}"));
        out.new_line();
    }
    out.add_block(syntax::CLOSURE_TYPE_DEFINITIONS);
    out.new_line();

    declare_uniforms(&mut out, "PrivateUniforms", &ctx.pixel_uniforms, false);
    declare_uniforms(&mut out, "PublicUniforms", public_uniforms, true);
    if !light_declarations.is_empty() {
        out.add_block(light_declarations);
        out.new_line();
    }
    declare_varyings(&mut out, "in", &ctx.varyings);

    out.add_line("// Pixel shader outputs");
    out.add_line(&format!("out vec4 {OUTPUT_COLOR};"));
    out.new_line();

    let mut source = out.into_code();
    source.push_str(ctx.functions.code());
    source.push_str("void main()\n{\n");
    source.push_str(ctx.pixel.code());
    source.push_str("}\n");
    source
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ShaderInterface;
    use mxview_document::xml::{read_document_from_str, ReadOptions};
    use mxview_document::FileSearchPath;

    const DOC: &str = r#"<materialx>
        <nodedef name="ND_surf" node="surf" type="surfaceshader">
          <input name="base_color" type="color3" value="0.8, 0.8, 0.8"/>
          <input name="normal" type="vector3" defaultgeomprop="Nworld"/>
        </nodedef>
        <implementation name="IM_surf" nodedef="ND_surf" language="genglsl" sourcecode="surfaceshader({{base_color}} * max(dot({{normal}}, vec3(0.0, 1.0, 0.0)), 0.0), vec3(0.0))"/>
        <nodedef name="ND_unimplemented" node="unimplemented" type="surfaceshader"/>
        <nodedef name="ND_image_color3" node="image" type="color3">
          <parameter name="file" type="filename" value=""/>
          <input name="texcoord" type="vector2" defaultgeomprop="UV0"/>
        </nodedef>
        <implementation name="IM_image" nodedef="ND_image_color3" language="genglsl" sourcecode="texture({{file}}, {{texcoord}}).rgb"/>
        <nodedef name="ND_add_color3" node="add" type="color3">
          <input name="in1" type="color3" value="0, 0, 0"/>
          <input name="in2" type="color3" value="0, 0, 0"/>
        </nodedef>
        <nodedef name="ND_mystery_color3" node="mystery" type="color3"/>
        <implementation name="IM_add" nodedef="ND_add_color3" language="genglsl" sourcecode="{{in1}} + {{in2}}"/>
        <nodegraph name="ng">
          <image name="a" type="color3"><parameter name="file" type="filename" value="a.png"/></image>
          <image name="b" type="color3"><parameter name="file" type="filename" value="b.png"/></image>
          <add name="sum" type="color3">
            <input name="in1" type="color3" nodename="a"/>
            <input name="in2" type="color3" nodename="b"/>
          </add>
          <mystery name="odd" type="color3"/>
          <add name="mix" type="color3"><input name="in1" type="color3" nodename="odd"/></add>
          <output name="base" type="color3" nodename="sum"/>
          <output name="odd_out" type="color3" nodename="odd"/>
          <output name="mixed" type="color3" nodename="mix"/>
        </nodegraph>
        <material name="A"><shaderref name="sr" node="unimplemented"/></material>
        <material name="B">
          <shaderref name="sr" node="surf">
            <bindinput name="base_color" type="color3" nodegraph="ng" output="base"/>
          </shaderref>
        </material>
    </materialx>"#;

    fn doc() -> Document {
        read_document_from_str(DOC, &ReadOptions::default()).unwrap()
    }

    #[test]
    fn test_generate_surface() {
        let doc = doc();
        let shader = ShaderGenerator::new()
            .generate(&doc, "B/sr", &GenOptions::default())
            .unwrap();

        assert!(shader.vertex_source.contains("uniform mat4 u_worldMatrix;"));
        assert!(shader.vertex_source.contains("in vec2 i_texcoord_0;"));
        assert!(shader.vertex_source.contains("in vec3 i_normal;"));
        assert!(shader.vertex_source.contains("uniform mat4 u_worldInverseTransposeMatrix;"));
        assert_eq!(shader.vertex_source.matches("vd.texcoord_0 = i_texcoord_0;").count(), 1);

        assert!(shader.pixel_source.contains("uniform sampler2D a_file;"));
        assert!(shader.pixel_source.contains("uniform sampler2D b_file;"));
        assert!(shader.pixel_source.contains("vec3 sum_out = a_out + b_out;"));
        assert!(shader.pixel_source.contains("out_color = vec4(sr_out.color, 1.0);"));
        assert!(shader.pixel_source.contains("void sampleLightSource("));
        assert!(shader.pixel_source.contains("uniform LightData u_lightData[MAX_LIGHT_SOURCES];"));

        assert!(shader.has_uniform(WORLD_MATRIX));
        assert!(shader.has_uniform(ENV_SAMPLES));
        assert!(shader.has_uniform("u_lightData[0].type"));
        assert!(shader.has_vertex_input("i_texcoord_0"));
        assert!(!shader.has_vertex_input("i_tangent"));
        assert!(!shader.transparency);

        let images: Vec<_> = shader.image_uniforms().map(|v| v.path.as_str()).collect();
        assert_eq!(images, vec!["ng/a/file", "ng/b/file"]);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let doc = doc();
        let generator = ShaderGenerator::new();
        let first = generator.generate(&doc, "B/sr", &GenOptions::default()).unwrap();
        let second = generator.generate(&doc, "B/sr", &GenOptions::default()).unwrap();
        assert_eq!(first.vertex_source, second.vertex_source);
        assert_eq!(first.pixel_source, second.pixel_source);
        assert_eq!(
            first.public_uniforms.names().collect::<Vec<_>>(),
            second.public_uniforms.names().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_unresolved_root_fails() {
        let doc = doc();
        let result = ShaderGenerator::new().generate(&doc, "A/sr", &GenOptions::default());
        assert!(matches!(result, Err(GenerationError::UnresolvedRoot { .. })));
        let empty = ShaderGenerator::new().generate(&doc, "", &GenOptions::default());
        assert!(matches!(empty, Err(GenerationError::EmptyElement(_))));
    }

    #[test]
    fn test_unimplemented_upstream_emits_default() {
        let doc = doc();
        let generator = ShaderGenerator::new();
        let root = generator.generate(&doc, "ng/odd_out", &GenOptions::default());
        assert!(matches!(root, Err(GenerationError::UnresolvedRoot { .. })));

        let shader = generator.generate(&doc, "ng/mixed", &GenOptions::default()).unwrap();
        assert!(shader.pixel_source.contains("vec3 odd_out = vec3(0.0, 0.0, 0.0);"));
        assert!(shader.pixel_source.contains("vec3 mix_out = odd_out + mix_in2;"));
        assert!(shader.pixel_source.contains("out_color = vec4(mix_out, 1.0);"));
        assert_eq!(shader.max_light_sources, 0);
        assert!(!shader.pixel_source.contains("LightData"));
        assert!(!shader.has_uniform(VIEW_POSITION));
    }

    #[test]
    fn test_transparency_writes_alpha() {
        let doc = doc();
        let options = GenOptions {
            hw_transparency: true,
            ..GenOptions::default()
        };
        let shader = ShaderGenerator::new().generate(&doc, "B/sr", &options).unwrap();
        assert!(shader.transparency);
        assert!(shader.pixel_source.contains("out_color = vec4(sr_out.color, outAlpha);"));
    }

    #[test]
    fn test_reduced_interface() {
        let doc = doc();
        let options = GenOptions {
            shader_interface: ShaderInterface::Reduced,
            specular_environment_method: SpecularEnvironmentMethod::None,
            ..GenOptions::default()
        };
        let shader = ShaderGenerator::new().generate(&doc, "B/sr", &options).unwrap();
        assert_eq!(shader.public_uniforms.len(), 2);
        assert!(!shader.has_uniform(ENV_RADIANCE));
        assert!(shader.has_uniform(NUM_ACTIVE_LIGHT_SOURCES));
    }

    #[test]
    fn test_light_functions_included_once() {
        let dir = std::env::temp_dir().join(format!("mxview-gen-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("mx_point_light.glsl"),
            "void mx_point_light(LightData light, vec3 position, out lightshader result)\n{\n    result.intensity = light.color;\n}\n",
        )
        .unwrap();

        let xml = DOC.replace(
            "</materialx>",
            r#"<nodedef name="ND_point_light" node="point_light" type="lightshader">
                 <input name="color" type="color3" value="1, 1, 1"/>
               </nodedef>
               <implementation name="IM_point_light" nodedef="ND_point_light" language="genglsl" file="mx_point_light.glsl" function="mx_point_light"/>
               </materialx>"#,
        );
        let doc = read_document_from_str(&xml, &ReadOptions::default()).unwrap();
        let mut generator = ShaderGenerator::new();
        generator.bind_light_shaders([("ND_point_light", 1)]);
        let options = GenOptions {
            source_search_path: FileSearchPath::from(dir.clone()),
            ..GenOptions::default()
        };
        let shader = generator.generate(&doc, "B/sr", &options).unwrap();
        assert_eq!(shader.pixel_source.matches("void mx_point_light(").count(), 1);
        assert!(shader.pixel_source.contains("if (light.type == 1)"));
        assert!(shader.has_uniform("u_lightData[2].color"));

        // Missing source files fail the request
        let missing = GenOptions::default();
        assert!(matches!(
            generator.generate(&doc, "B/sr", &missing),
            Err(GenerationError::SourceNotFound { .. })
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
