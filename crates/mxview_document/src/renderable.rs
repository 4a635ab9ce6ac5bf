// SPDX-License-Identifier: MIT OR Apache-2.0
//! Discovery of renderable elements.

use crate::document::Document;
use crate::element::{join_path, BIND_INPUT, OUTPUT, SHADER_REF};
use crate::resolve::{has_implementation, ImplementationTarget};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Kind of renderable element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderableKind {
    /// A shader reference inside a material
    ShaderRef,
    /// An output of a node graph
    Output,
}

/// Reference to a renderable element by name path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderableElement {
    /// Name path inside the owning document
    pub path: String,
    /// Kind of element
    pub kind: RenderableKind,
}

impl RenderableElement {
    /// Create a new renderable reference
    pub fn new(path: impl Into<String>, kind: RenderableKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Last component of the name path
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Find the renderable elements authored in a document
///
/// Shader references qualify when their node definition has an
/// implementation (for `target`, when given). Graph outputs qualify when no
/// shader reference binds them. Elements imported from a library are
/// skipped.
pub fn find_renderable_elements(doc: &Document, target: Option<&ImplementationTarget>) -> Vec<RenderableElement> {
    let mut renderables = Vec::new();

    let mut consumed: HashSet<(String, String)> = HashSet::new();
    for material in doc.materials() {
        for shader_ref in material.children_of_category(SHADER_REF) {
            for binding in shader_ref.children_of_category(BIND_INPUT) {
                if let Some(graph) = binding.non_empty_attribute("nodegraph") {
                    let output = binding.attribute("output").unwrap_or_default();
                    consumed.insert((graph.to_string(), output.to_string()));
                }
            }
        }
    }

    for material in doc.materials().filter(|m| m.source_uri().is_none()) {
        for shader_ref in material.children_of_category(SHADER_REF) {
            let path = join_path(material.name(), shader_ref.name());
            let implemented = doc
                .node_def_for_shader_ref(shader_ref)
                .is_some_and(|nd| has_implementation(doc, nd.name(), target));
            if implemented {
                renderables.push(RenderableElement::new(path, RenderableKind::ShaderRef));
            } else {
                tracing::warn!("Skipping shader reference {} without implementation", path);
            }
        }
    }

    for graph in doc
        .node_graphs()
        .filter(|g| g.source_uri().is_none() && !g.has_attribute("nodedef"))
    {
        for output in graph.children_of_category(OUTPUT) {
            let key = (graph.name().to_string(), output.name().to_string());
            let unnamed_key = (graph.name().to_string(), String::new());
            if consumed.contains(&key) || consumed.contains(&unnamed_key) {
                continue;
            }
            renderables.push(RenderableElement::new(
                join_path(graph.name(), output.name()),
                RenderableKind::Output,
            ));
        }
    }

    renderables
}
