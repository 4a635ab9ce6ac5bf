// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node-definition implementation resolution.
//!
//! A node definition may have several implementations, one per shading
//! language and target API. Resolution picks the one matching the active
//! generator and reports a soft [`ResolveError`] otherwise.

use crate::document::Document;
use crate::element::{Element, NODE_GRAPH, SHADER_REF};
use serde::{Deserialize, Serialize};

/// Shading language and target API a generator emits for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImplementationTarget {
    /// Shading language, e.g. `genglsl`
    pub language: String,
    /// Target API, e.g. `glsl` or `ogsfx`; empty matches generic implementations only
    pub target: String,
}

impl ImplementationTarget {
    /// Create a new target
    pub fn new(language: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            target: target.into(),
        }
    }

    /// Check whether an implementation element serves this target
    ///
    /// Implementations without a `target` attribute serve every target of
    /// their language.
    pub fn accepts(&self, implementation: &Element) -> bool {
        implementation.attribute("language") == Some(self.language.as_str())
            && implementation
                .non_empty_attribute("target")
                .map_or(true, |t| t == self.target)
    }
}

/// A resolved implementation
#[derive(Debug, Clone, PartialEq)]
pub enum ImplementationHandle {
    /// Source code implementation (file + function, or inline source)
    Source {
        /// Implementation element name
        name: String,
        /// Source file holding the function definition
        file: Option<String>,
        /// Function to call
        function: Option<String>,
        /// Inline expression with `{{input}}` placeholders
        source_code: Option<String>,
    },
    /// Node graph implementing the definition
    NodeGraph {
        /// Node graph element name
        name: String,
    },
}

impl ImplementationHandle {
    /// Name of the implementing element
    pub fn name(&self) -> &str {
        match self {
            Self::Source { name, .. } | Self::NodeGraph { name } => name,
        }
    }
}

/// Soft resolution failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    /// The element names no known node definition
    #[error("No node definition found for '{0}'")]
    NodeDefNotFound(String),

    /// The definition exists but has no implementation for the target
    #[error("No implementation of '{node_def}' for {language}/{target}")]
    ImplementationNotFound {
        /// Node definition name
        node_def: String,
        /// Requested language
        language: String,
        /// Requested target
        target: String,
    },

    /// The element kind cannot carry an implementation
    #[error("Element '{0}' is not a node, shader reference or graph output")]
    Unsupported(String),
}

/// Check whether a node definition has any implementation
///
/// With `target` set only implementations serving that target count;
/// node-graph implementations serve every target.
pub fn has_implementation(doc: &Document, node_def: &str, target: Option<&ImplementationTarget>) -> bool {
    let graph_impl = doc
        .node_graphs()
        .any(|g| g.attribute("nodedef") == Some(node_def));
    graph_impl
        || doc.implementations().any(|i| {
            i.attribute("nodedef") == Some(node_def) && target.map_or(true, |t| t.accepts(i))
        })
}

/// Resolve the implementation of a node definition for a target
///
/// Exact target matches win over generic (target-less) implementations,
/// which win over node-graph implementations.
pub fn resolve_implementation(
    doc: &Document,
    node_def: &str,
    target: &ImplementationTarget,
) -> Result<ImplementationHandle, ResolveError> {
    if doc.node_def(node_def).is_none() {
        return Err(ResolveError::NodeDefNotFound(node_def.to_string()));
    }

    let mut candidates: Vec<&Element> = doc
        .implementations()
        .filter(|i| i.attribute("nodedef") == Some(node_def) && target.accepts(i))
        .collect();
    candidates.sort_by_key(|i| i.non_empty_attribute("target").is_none());

    if let Some(implementation) = candidates.first() {
        return Ok(ImplementationHandle::Source {
            name: implementation.name().to_string(),
            file: implementation.non_empty_attribute("file").map(str::to_string),
            function: implementation.non_empty_attribute("function").map(str::to_string),
            source_code: implementation.non_empty_attribute("sourcecode").map(str::to_string),
        });
    }

    if let Some(graph) = doc
        .node_graphs()
        .find(|g| g.attribute("nodedef") == Some(node_def))
    {
        return Ok(ImplementationHandle::NodeGraph {
            name: graph.name().to_string(),
        });
    }

    Err(ResolveError::ImplementationNotFound {
        node_def: node_def.to_string(),
        language: target.language.clone(),
        target: target.target.clone(),
    })
}

/// Node definition name backing an element (shader reference, node or graph output)
pub fn node_def_name_for(doc: &Document, path: &str) -> Result<String, ResolveError> {
    let elem = doc
        .element(path)
        .ok_or_else(|| ResolveError::Unsupported(path.to_string()))?;

    let node_def = match elem.category() {
        SHADER_REF => doc.node_def_for_shader_ref(elem),
        crate::element::OUTPUT => {
            let (graph_path, _) = path
                .rsplit_once(crate::element::NAME_PATH_SEPARATOR)
                .ok_or_else(|| ResolveError::Unsupported(path.to_string()))?;
            let graph = doc
                .element(graph_path)
                .filter(|g| g.category() == NODE_GRAPH)
                .ok_or_else(|| ResolveError::Unsupported(path.to_string()))?;
            let node_name = elem
                .non_empty_attribute("nodename")
                .ok_or_else(|| ResolveError::Unsupported(path.to_string()))?;
            let node = graph
                .child(node_name)
                .ok_or_else(|| ResolveError::NodeDefNotFound(node_name.to_string()))?;
            doc.node_def_for_node(node)
        }
        _ => doc.node_def_for_node(elem),
    };

    node_def
        .map(|nd| nd.name().to_string())
        .ok_or_else(|| ResolveError::NodeDefNotFound(path.to_string()))
}

/// Resolve the implementation behind a renderable element or node
pub fn resolve_element(
    doc: &Document,
    path: &str,
    target: &ImplementationTarget,
) -> Result<ImplementationHandle, ResolveError> {
    let node_def = node_def_name_for(doc, path)?;
    resolve_implementation(doc, &node_def, target)
}

/// Point shader references at an implemented alternative definition
///
/// For every shader reference whose node definition has no implementation,
/// the last definition sharing its node string that does have one is
/// substituted. Returns the number of references rewritten.
pub fn remap_unimplemented_shader_refs(doc: &mut Document, target: Option<&ImplementationTarget>) -> usize {
    let mut rewrites = Vec::new();
    for material in doc.materials() {
        for shader_ref in Document::shader_refs(material) {
            let Some(node_def) = doc.node_def_for_shader_ref(shader_ref) else {
                continue;
            };
            if has_implementation(doc, node_def.name(), target) {
                continue;
            }
            let Some(node_string) = node_def.attribute("node") else {
                continue;
            };
            let alternative = doc
                .matching_node_defs(node_string)
                .filter(|alt| alt.name() != node_def.name() && has_implementation(doc, alt.name(), target))
                .last();
            match alternative {
                Some(alt) => rewrites.push((
                    format!("{}/{}", material.name(), shader_ref.name()),
                    alt.name().to_string(),
                )),
                None => tracing::debug!(
                    "No implemented alternative for '{}' on {}/{}",
                    node_def.name(),
                    material.name(),
                    shader_ref.name()
                ),
            }
        }
    }

    let count = rewrites.len();
    for (path, node_def) in rewrites {
        if let Some(shader_ref) = doc.element_mut(&path) {
            tracing::info!("Remapped shader reference {} to '{}'", path, node_def);
            shader_ref.set_attribute("nodedef", node_def);
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::{read_document_from_str, ReadOptions};

    const LIBRARY: &str = r#"<materialx>
        <nodedef name="ND_surface_a" node="surface_a" type="surfaceshader"/>
        <nodedef name="ND_surface_a_v2" node="surface_a" type="surfaceshader"/>
        <implementation name="IM_surface_a_v2_glsl" nodedef="ND_surface_a_v2" language="genglsl" sourcecode="x"/>
        <implementation name="IM_surface_a_v2_ogs" nodedef="ND_surface_a_v2" language="genglsl" target="ogsfx" file="a.glsl" function="f"/>
        <nodedef name="ND_graph_impl" node="graph_impl" type="color3"/>
        <nodegraph name="NG_graph_impl" nodedef="ND_graph_impl"/>
        <material name="m">
          <shaderref name="sr" nodedef="ND_surface_a"/>
        </material>
    </materialx>"#;

    fn doc() -> Document {
        read_document_from_str(LIBRARY, &ReadOptions::default()).unwrap()
    }

    #[test]
    fn test_target_preference() {
        let doc = doc();
        let ogs = resolve_implementation(&doc, "ND_surface_a_v2", &ImplementationTarget::new("genglsl", "ogsfx")).unwrap();
        assert_eq!(ogs.name(), "IM_surface_a_v2_ogs");
        let glsl = resolve_implementation(&doc, "ND_surface_a_v2", &ImplementationTarget::new("genglsl", "glsl")).unwrap();
        assert_eq!(glsl.name(), "IM_surface_a_v2_glsl");
        let graph = resolve_implementation(&doc, "ND_graph_impl", &ImplementationTarget::new("genosl", "")).unwrap();
        assert_eq!(graph, ImplementationHandle::NodeGraph { name: "NG_graph_impl".into() });
    }

    #[test]
    fn test_missing_implementation_is_soft() {
        let doc = doc();
        let target = ImplementationTarget::new("genglsl", "glsl");
        assert!(matches!(
            resolve_implementation(&doc, "ND_surface_a", &target),
            Err(ResolveError::ImplementationNotFound { .. })
        ));
        assert!(matches!(
            resolve_implementation(&doc, "ND_nope", &target),
            Err(ResolveError::NodeDefNotFound(_))
        ));
    }

    #[test]
    fn test_remap_to_implemented_alternative() {
        let mut doc = doc();
        let target = ImplementationTarget::new("genglsl", "glsl");
        assert!(resolve_element(&doc, "m/sr", &target).is_err());
        assert_eq!(remap_unimplemented_shader_refs(&mut doc, Some(&target)), 1);
        assert_eq!(doc.element("m/sr").unwrap().attribute("nodedef"), Some("ND_surface_a_v2"));
        assert_eq!(resolve_element(&doc, "m/sr", &target).unwrap().name(), "IM_surface_a_v2_glsl");
        // Already implemented references are left alone
        assert_eq!(remap_unimplemented_shader_refs(&mut doc, Some(&target)), 0);
    }

    #[test]
    fn test_remap_prefers_last_implemented_alternative() {
        let mut doc = read_document_from_str(
            r#"<materialx>
                <nodedef name="ND_s" node="s" type="surfaceshader"/>
                <nodedef name="ND_s_v1" node="s" type="surfaceshader"/>
                <nodedef name="ND_s_v2" node="s" type="surfaceshader"/>
                <nodedef name="ND_s_v3" node="s" type="surfaceshader"/>
                <implementation name="IM_s_v1" nodedef="ND_s_v1" language="genglsl" sourcecode="x"/>
                <implementation name="IM_s_v2" nodedef="ND_s_v2" language="genglsl" sourcecode="x"/>
                <material name="m"><shaderref name="sr" nodedef="ND_s"/></material>
            </materialx>"#,
            &ReadOptions::default(),
        )
        .unwrap();
        let target = ImplementationTarget::new("genglsl", "glsl");
        assert_eq!(remap_unimplemented_shader_refs(&mut doc, Some(&target)), 1);
        assert_eq!(doc.element("m/sr").unwrap().attribute("nodedef"), Some("ND_s_v2"));
    }
}
