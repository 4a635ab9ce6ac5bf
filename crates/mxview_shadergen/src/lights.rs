// SPDX-License-Identifier: MIT OR Apache-2.0
//! Light shader binding.
//!
//! Light node definitions are bound to integer type ids before generation.
//! Lit shaders then declare a `LightData` struct holding the union of every
//! bound light's inputs, an array of them, and a `sampleLightSource`
//! function dispatching on the type id.

use crate::context::GenContext;
use crate::error::GenerationError;
use crate::shader::{LIGHT_DATA, LIGHT_TYPE_FIELD};
use crate::syntax;
use crate::variable::{ShaderVariable, VariableBlock};
use indexmap::IndexMap;
use mxview_document::{resolve_implementation, ImplementationHandle, TypeDesc};

/// Light node definitions bound to type ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LightShaderBindings {
    ids: IndexMap<String, u32>,
}

impl LightShaderBindings {
    /// Create an empty binding table
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a light node definition to a type id
    pub fn bind(&mut self, node_def: impl Into<String>, id: u32) {
        self.ids.insert(node_def.into(), id);
    }

    /// Remove every binding
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Type id of a node definition
    pub fn id(&self, node_def: &str) -> Option<u32> {
        self.ids.get(node_def).copied()
    }

    /// Bindings in bind order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.ids.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Number of bound light types
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if no light type is bound
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Fields of the light data struct: `type`, then every bound light input
pub(crate) fn light_data_fields(ctx: &GenContext, bindings: &LightShaderBindings) -> VariableBlock {
    let mut fields = VariableBlock::new();
    fields.add(ShaderVariable::new(LIGHT_TYPE_FIELD, TypeDesc::Integer));
    for (node_def, _) in bindings.iter() {
        let Some(def) = ctx.doc.node_def(node_def) else {
            tracing::warn!("Bound light '{}' has no node definition", node_def);
            continue;
        };
        for input in def.value_elements() {
            let type_desc = TypeDesc::from_name(input.type_string());
            if !syntax::is_shader_type(&type_desc) || type_desc == TypeDesc::Filename || type_desc.is_closure() {
                continue;
            }
            fields.add(ShaderVariable::new(syntax::identifier(input.name()), type_desc));
        }
    }
    fields
}

/// Emit the light data declarations
///
/// Returns the struct and array declarations. Light implementations and the
/// dispatcher are appended to the context's function definitions.
pub(crate) fn emit_lights(
    ctx: &mut GenContext,
    bindings: &LightShaderBindings,
    fields: &VariableBlock,
) -> Result<String, GenerationError> {
    let mut declarations = String::from("struct LightData\n{\n");
    for field in fields {
        if let Some(declaration) = field.declaration(false) {
            declarations.push_str(&format!("    {declaration};\n"));
        }
    }
    declarations.push_str("};\n\n");
    declarations.push_str(&format!("uniform LightData {LIGHT_DATA}[MAX_LIGHT_SOURCES];\n"));

    let mut cases = Vec::new();
    for (node_def, id) in bindings.iter() {
        let handle = match resolve_implementation(ctx.doc, node_def, &ctx.options.target) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!("Skipping light type {}: {}", id, e);
                continue;
            }
        };
        match handle {
            ImplementationHandle::Source {
                name,
                file: Some(file),
                function: Some(function),
                ..
            } => {
                ctx.include_source(&name, &file)?;
                cases.push((id, function));
            }
            other => tracing::warn!(
                "Light implementation '{}' is not a source function, skipping type {}",
                other.name(),
                id
            ),
        }
    }

    let functions = &mut ctx.functions;
    functions.add_line("void sampleLightSource(LightData light, vec3 position, out lightshader result)");
    functions.begin_scope();
    functions.add_line("result.intensity = vec3(0.0);");
    functions.add_line("result.direction = vec3(0.0);");
    for (i, (id, function)) in cases.iter().enumerate() {
        let keyword = if i == 0 { "if" } else { "else if" };
        functions.add_line(&format!("{keyword} (light.type == {id})"));
        functions.begin_scope();
        functions.add_line(&format!("{function}(light, position, result);"));
        functions.end_scope("");
    }
    functions.end_scope("");
    functions.new_line();

    Ok(declarations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::GenOptions;
    use mxview_document::xml::{read_document_from_str, ReadOptions};

    #[test]
    fn test_fields_are_union_of_bound_lights() {
        let doc = read_document_from_str(
            r#"<materialx>
                <nodedef name="ND_point_light" node="point_light" type="lightshader">
                  <input name="position" type="vector3"/>
                  <input name="color" type="color3"/>
                  <input name="intensity" type="float"/>
                </nodedef>
                <nodedef name="ND_directional_light" node="directional_light" type="lightshader">
                  <input name="direction" type="vector3"/>
                  <input name="color" type="color3"/>
                  <input name="label" type="string"/>
                </nodedef>
            </materialx>"#,
            &ReadOptions::default(),
        )
        .unwrap();
        let options = GenOptions::default();
        let ctx = GenContext::new(&doc, &options);
        let mut bindings = LightShaderBindings::new();
        bindings.bind("ND_point_light", 1);
        bindings.bind("ND_directional_light", 2);

        let fields = light_data_fields(&ctx, &bindings);
        let names: Vec<_> = fields.names().collect();
        assert_eq!(names, vec!["type", "position", "color", "intensity", "direction"]);
        assert_eq!(bindings.id("ND_directional_light"), Some(2));
    }
}
