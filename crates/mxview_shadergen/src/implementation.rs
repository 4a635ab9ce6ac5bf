// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node implementations: how each node turns into shader code.

use crate::context::GenContext;
use crate::error::GenerationError;
use crate::graph::{ShaderGraph, ShaderNode};
use crate::syntax;
use mxview_document::{ImplementationHandle, TypeDesc, Value};

/// Vertex attribute holding object-space positions
pub const POSITION_ATTRIBUTE: &str = "i_position";
/// Vertex attribute holding object-space normals
pub const NORMAL_ATTRIBUTE: &str = "i_normal";
/// Vertex attribute holding object-space tangents
pub const TANGENT_ATTRIBUTE: &str = "i_tangent";
/// Prefix of texture-coordinate attributes, followed by the set index
pub const TEXCOORD_ATTRIBUTE_PREFIX: &str = "i_texcoord_";

/// Varying holding the world-space position
pub const POSITION_WORLD_VARYING: &str = "positionWorld";
/// Varying holding the world-space normal
pub const NORMAL_WORLD_VARYING: &str = "normalWorld";
/// Varying holding the world-space tangent
pub const TANGENT_WORLD_VARYING: &str = "tangentWorld";

/// Name of the varying interface block instance
pub const VARYING_BLOCK_INSTANCE: &str = "vd";

/// Code generation behavior of a node
pub trait NodeImplementation: std::fmt::Debug + Send + Sync {
    /// Register vertex inputs, varyings and private uniforms the node needs
    fn register_inputs(&self, _node: &ShaderNode, _ctx: &mut GenContext) -> Result<(), GenerationError> {
        Ok(())
    }

    /// Emit function definitions shared by every instance
    fn emit_function_definition(&self, _node: &ShaderNode, _ctx: &mut GenContext) -> Result<(), GenerationError> {
        Ok(())
    }

    /// Emit the statements computing the node output
    fn emit_function_call(
        &self,
        node: &ShaderNode,
        graph: &ShaderGraph,
        ctx: &mut GenContext,
    ) -> Result<(), GenerationError>;
}

/// Emit `type out = default;` for a node without usable implementation
pub(crate) fn emit_default_output(node: &ShaderNode, ctx: &mut GenContext) {
    match (
        syntax::type_name(&node.output_type),
        syntax::default_literal(&node.output_type),
    ) {
        (Some(type_name), Some(literal)) => ctx.pixel.add_line(&format!(
            "{} {} = {};",
            type_name,
            node.output_variable(),
            literal
        )),
        _ => ctx.pixel.add_line(&format!("// {}: no output", node.name)),
    }
}

/// Implementation backed by library source code
///
/// Either an inline expression with `{{input}}` placeholders, or a function
/// defined in a source file, called with every input followed by the output.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceCodeImplementation {
    name: String,
    file: Option<String>,
    function: Option<String>,
    source_code: Option<String>,
}

impl SourceCodeImplementation {
    /// Create from a resolved implementation, `None` for node-graph implementations
    pub fn from_handle(handle: &ImplementationHandle) -> Option<Self> {
        match handle {
            ImplementationHandle::Source {
                name,
                file,
                function,
                source_code,
            } => Some(Self {
                name: name.clone(),
                file: file.clone(),
                function: function.clone(),
                source_code: source_code.clone(),
            }),
            ImplementationHandle::NodeGraph { .. } => None,
        }
    }

    /// Function to call, for file implementations
    pub fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }

    fn invalid(&self, message: impl Into<String>) -> GenerationError {
        GenerationError::InvalidSource {
            implementation: self.name.clone(),
            message: message.into(),
        }
    }

    fn expand_inline(&self, code: &str, node: &ShaderNode, graph: &ShaderGraph) -> Result<String, GenerationError> {
        let mut expanded = String::with_capacity(code.len());
        let mut rest = code;
        while let Some(start) = rest.find("{{") {
            expanded.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or_else(|| self.invalid("unterminated placeholder"))?;
            let input_name = after[..end].trim();
            let input = node
                .input(input_name)
                .ok_or_else(|| self.invalid(format!("unknown input '{input_name}'")))?;
            expanded.push_str(&graph.input_expression(input));
            rest = &after[end + 2..];
        }
        expanded.push_str(rest);
        Ok(expanded)
    }
}

impl NodeImplementation for SourceCodeImplementation {
    fn emit_function_definition(&self, _node: &ShaderNode, ctx: &mut GenContext) -> Result<(), GenerationError> {
        match (&self.source_code, &self.file) {
            (None, Some(file)) => ctx.include_source(&self.name, file),
            _ => Ok(()),
        }
    }

    fn emit_function_call(
        &self,
        node: &ShaderNode,
        graph: &ShaderGraph,
        ctx: &mut GenContext,
    ) -> Result<(), GenerationError> {
        let Some(type_name) = syntax::type_name(&node.output_type) else {
            ctx.pixel.add_line(&format!("// {}: no output", node.name));
            return Ok(());
        };
        let output = node.output_variable();

        if let Some(code) = &self.source_code {
            let expression = self.expand_inline(code, node, graph)?;
            ctx.pixel
                .add_line(&format!("{type_name} {output} = {expression};"));
            return Ok(());
        }

        let function = self
            .function
            .as_deref()
            .ok_or_else(|| self.invalid("neither source code nor function given"))?;
        let mut args: Vec<String> = node
            .inputs
            .iter()
            .filter(|input| syntax::is_shader_type(&input.type_desc))
            .map(|input| graph.input_expression(input))
            .collect();
        args.push(output.clone());

        let default = syntax::default_literal(&node.output_type).unwrap_or_default();
        if default.is_empty() {
            ctx.pixel.add_line(&format!("{type_name} {output};"));
        } else {
            ctx.pixel
                .add_line(&format!("{type_name} {output} = {default};"));
        }
        ctx.pixel
            .add_line(&format!("{}({});", function, args.join(", ")));
        Ok(())
    }
}

fn texcoord_index(node: &ShaderNode) -> i32 {
    match node.input("index").and_then(|input| input.value.as_ref()) {
        Some(Value::Integer(index)) => *index,
        _ => 0,
    }
}

/// Texture coordinates read from a vertex attribute
///
/// The attribute is passed through a varying; the vertex-stage assignment
/// is emitted once however many nodes read the same set.
#[derive(Debug, Clone, Copy, Default)]
pub struct TexCoordNode;

impl TexCoordNode {
    /// Registry creator
    pub fn create() -> Box<dyn NodeImplementation> {
        Box::new(Self)
    }
}

impl NodeImplementation for TexCoordNode {
    fn register_inputs(&self, node: &ShaderNode, ctx: &mut GenContext) -> Result<(), GenerationError> {
        let index = texcoord_index(node);
        ctx.add_vertex_input(
            &format!("{TEXCOORD_ATTRIBUTE_PREFIX}{index}"),
            node.output_type.clone(),
        );
        ctx.add_varying(&format!("texcoord_{index}"), node.output_type.clone());
        Ok(())
    }

    fn emit_function_call(
        &self,
        node: &ShaderNode,
        _graph: &ShaderGraph,
        ctx: &mut GenContext,
    ) -> Result<(), GenerationError> {
        let index = texcoord_index(node);
        let varying = format!("texcoord_{index}");
        if !ctx.vertex.is_calculated(&varying) {
            ctx.vertex.add_line(&format!(
                "{VARYING_BLOCK_INSTANCE}.{varying} = {TEXCOORD_ATTRIBUTE_PREFIX}{index};"
            ));
            ctx.vertex.set_calculated(varying.clone());
        }

        let type_name = syntax::type_name(&node.output_type).unwrap_or("vec2");
        ctx.pixel.add_line(&format!(
            "{} {} = {}.{};",
            type_name,
            node.output_variable(),
            VARYING_BLOCK_INSTANCE,
            varying
        ));
        Ok(())
    }
}

/// Which geometric property a [`GeometricNode`] reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometricProperty {
    /// Surface position
    Position,
    /// Surface normal
    Normal,
    /// Surface tangent
    Tangent,
}

/// World-space position, normal or tangent
#[derive(Debug, Clone, Copy)]
pub struct GeometricNode {
    property: GeometricProperty,
}

impl GeometricNode {
    /// Registry creator for positions
    pub fn create_position() -> Box<dyn NodeImplementation> {
        Box::new(Self {
            property: GeometricProperty::Position,
        })
    }

    /// Registry creator for normals
    pub fn create_normal() -> Box<dyn NodeImplementation> {
        Box::new(Self {
            property: GeometricProperty::Normal,
        })
    }

    /// Registry creator for tangents
    pub fn create_tangent() -> Box<dyn NodeImplementation> {
        Box::new(Self {
            property: GeometricProperty::Tangent,
        })
    }

    fn varying(&self) -> &'static str {
        match self.property {
            GeometricProperty::Position => POSITION_WORLD_VARYING,
            GeometricProperty::Normal => NORMAL_WORLD_VARYING,
            GeometricProperty::Tangent => TANGENT_WORLD_VARYING,
        }
    }
}

impl NodeImplementation for GeometricNode {
    fn register_inputs(&self, _node: &ShaderNode, ctx: &mut GenContext) -> Result<(), GenerationError> {
        match self.property {
            GeometricProperty::Position => {}
            GeometricProperty::Normal => {
                ctx.add_vertex_input(NORMAL_ATTRIBUTE, TypeDesc::Vector3);
                ctx.add_vertex_uniform(crate::shader::WORLD_INVERSE_TRANSPOSE_MATRIX, TypeDesc::Matrix44);
            }
            GeometricProperty::Tangent => {
                ctx.add_vertex_input(TANGENT_ATTRIBUTE, TypeDesc::Vector3);
            }
        }
        ctx.add_varying(self.varying(), TypeDesc::Vector3);
        Ok(())
    }

    fn emit_function_call(
        &self,
        node: &ShaderNode,
        _graph: &ShaderGraph,
        ctx: &mut GenContext,
    ) -> Result<(), GenerationError> {
        let varying = self.varying();
        if !ctx.vertex.is_calculated(varying) {
            let line = match self.property {
                GeometricProperty::Position => {
                    format!("{VARYING_BLOCK_INSTANCE}.{varying} = hPositionWorld.xyz;")
                }
                GeometricProperty::Normal => format!(
                    "{VARYING_BLOCK_INSTANCE}.{varying} = normalize(({} * vec4({NORMAL_ATTRIBUTE}, 0.0)).xyz);",
                    crate::shader::WORLD_INVERSE_TRANSPOSE_MATRIX
                ),
                GeometricProperty::Tangent => format!(
                    "{VARYING_BLOCK_INSTANCE}.{varying} = normalize(({} * vec4({TANGENT_ATTRIBUTE}, 0.0)).xyz);",
                    crate::shader::WORLD_MATRIX
                ),
            };
            ctx.vertex.add_line(&line);
            ctx.vertex.set_calculated(varying);
        }

        let read = match self.property {
            GeometricProperty::Position => format!("{VARYING_BLOCK_INSTANCE}.{varying}"),
            _ => format!("normalize({VARYING_BLOCK_INSTANCE}.{varying})"),
        };
        ctx.pixel
            .add_line(&format!("vec3 {} = {};", node.output_variable(), read));
        Ok(())
    }
}
