// SPDX-License-Identifier: MIT OR Apache-2.0
//! Light sources found in a document and environment lighting settings.

use mxview_document::element::{join_path, NODE_DEF};
use mxview_document::{Document, Element, TypeDesc, Value};
use mxview_shadergen::LightShaderBindings;

/// A light node and the values of its inputs
#[derive(Debug, Clone, PartialEq)]
pub struct LightSource {
    /// Name path of the light node
    pub path: String,
    /// Node definition of the light
    pub node_def: String,
    /// Type id the generator dispatches on
    pub type_id: u32,
    /// Input values, authored or node-definition defaults
    pub inputs: Vec<(String, Value)>,
}

/// Ordered light sources with their type-id table
///
/// Type ids start at 1 and follow first-seen node-definition order. Rebuild
/// the rig whenever the document's light set changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightRig {
    lights: Vec<LightSource>,
    bindings: LightShaderBindings,
}

impl LightRig {
    /// Collect every `lightshader` node of a document
    pub fn from_document(doc: &Document) -> Self {
        let mut rig = Self::default();
        let mut paths = Vec::new();
        collect_lights(doc.root(), "", &mut paths);

        for (path, node) in paths {
            let Some(node_def) = doc.node_def_for_node(node) else {
                tracing::warn!("Light '{}' has no node definition", path);
                continue;
            };
            let type_id = match rig.bindings.id(node_def.name()) {
                Some(id) => id,
                None => {
                    let id = rig.bindings.len() as u32 + 1;
                    rig.bindings.bind(node_def.name(), id);
                    id
                }
            };
            rig.lights.push(LightSource {
                path,
                node_def: node_def.name().to_string(),
                type_id,
                inputs: light_inputs(node, node_def),
            });
        }
        if !rig.lights.is_empty() {
            tracing::debug!(
                "Found {} lights of {} types",
                rig.lights.len(),
                rig.bindings.len()
            );
        }
        rig
    }

    /// Light sources in document order
    pub fn lights(&self) -> &[LightSource] {
        &self.lights
    }

    /// Node definitions bound to type ids
    pub fn bindings(&self) -> &LightShaderBindings {
        &self.bindings
    }

    /// Number of light sources
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    /// Check if the rig has no lights
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }
}

/// Default number of environment samples
pub const DEFAULT_ENV_SAMPLES: u32 = 16;
/// Smallest accepted number of environment samples
pub const MIN_ENV_SAMPLES: u32 = 4;
/// Largest accepted number of environment samples
pub const MAX_ENV_SAMPLES: u32 = 1024;

/// Environment maps and lighting toggles applied by `Material::bind_lights`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentLighting {
    /// Radiance map, resolved against the image search path
    pub radiance: String,
    /// Irradiance map, resolved against the image search path
    pub irradiance: String,
    /// Samples taken by filtered importance sampling
    pub samples: u32,
    /// Evaluate the light rig
    pub direct_lighting: bool,
    /// Evaluate the environment maps; black maps are bound otherwise
    pub indirect_lighting: bool,
}

impl Default for EnvironmentLighting {
    fn default() -> Self {
        Self {
            radiance: "resources/Images/san_giuseppe_bridge.hdr".to_string(),
            irradiance: "resources/Images/san_giuseppe_bridge_diffuse.hdr".to_string(),
            samples: DEFAULT_ENV_SAMPLES,
            direct_lighting: true,
            indirect_lighting: true,
        }
    }
}

fn collect_lights<'a>(elem: &'a Element, path: &str, out: &mut Vec<(String, &'a Element)>) {
    for child in elem.children() {
        let child_path = join_path(path, child.name());
        if child.category() == NODE_DEF {
            continue;
        }
        if child.type_string() == TypeDesc::LightShader.name() {
            out.push((child_path, child));
        } else {
            collect_lights(child, &child_path, out);
        }
    }
}

fn light_inputs(node: &Element, node_def: &Element) -> Vec<(String, Value)> {
    node_def
        .value_elements()
        .filter_map(|def_input| {
            let type_desc = TypeDesc::from_name(def_input.type_string());
            let text = node
                .value_element(def_input.name())
                .and_then(Element::value_string)
                .or_else(|| def_input.value_string())?;
            match Value::parse(&type_desc, text) {
                Ok(value) => Some((def_input.name().to_string(), value)),
                Err(e) => {
                    tracing::warn!("Ignoring light input '{}': {}", def_input.name(), e);
                    None
                }
            }
        })
        .collect()
}
