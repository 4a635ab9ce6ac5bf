// SPDX-License-Identifier: MIT OR Apache-2.0
//! Document: the root of an element tree plus typed lookups.

use crate::element::{
    self, Element, GEOM_ATTR, GEOM_INFO, IMPLEMENTATION, MATERIAL, NODE_DEF, NODE_GRAPH,
    SHADER_REF,
};
use crate::value::{TypeDesc, Value};
use std::path::{Path, PathBuf};

/// Category of the document root element
pub const DOCUMENT_CATEGORY: &str = "materialx";

/// Geometric attribute listing the UDIM tiles of a document
pub const UDIM_SET_ATTRIBUTE: &str = "udimset";

/// A material document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Element,
    source_path: Option<PathBuf>,
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self {
            root: Element::new(DOCUMENT_CATEGORY, ""),
            source_path: None,
        }
    }

    /// Wrap an existing root element
    pub fn from_root(root: Element) -> Self {
        Self {
            root,
            source_path: None,
        }
    }

    /// The root element
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// The mutable root element
    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// File this document was read from
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Record the file this document was read from
    pub fn set_source_path(&mut self, path: Option<PathBuf>) {
        self.source_path = path;
    }

    /// Top-level elements
    pub fn elements(&self) -> &[Element] {
        self.root.children()
    }

    /// Add a top-level element
    pub fn add_element(&mut self, elem: Element) -> &mut Element {
        self.root.add_child(elem)
    }

    /// Look up an element by name path
    pub fn element(&self, path: &str) -> Option<&Element> {
        if path.is_empty() {
            return None;
        }
        self.root.descendant(path)
    }

    /// Look up a mutable element by name path
    pub fn element_mut(&mut self, path: &str) -> Option<&mut Element> {
        if path.is_empty() {
            return None;
        }
        self.root.descendant_mut(path)
    }

    /// Remove an element by name path
    pub fn remove_element(&mut self, path: &str) -> Option<Element> {
        let (parent, name) = match path.rsplit_once(element::NAME_PATH_SEPARATOR) {
            Some((parent, name)) => (self.root.descendant_mut(parent)?, name),
            None => (&mut self.root, path),
        };
        parent.remove_child(name)
    }

    /// Top-level elements of a category
    pub fn elements_of_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.root.children_of_category(category)
    }

    /// Material elements
    pub fn materials(&self) -> impl Iterator<Item = &Element> {
        self.elements_of_category(MATERIAL)
    }

    /// Node graph elements
    pub fn node_graphs(&self) -> impl Iterator<Item = &Element> {
        self.elements_of_category(NODE_GRAPH)
    }

    /// Node definition elements
    pub fn node_defs(&self) -> impl Iterator<Item = &Element> {
        self.elements_of_category(NODE_DEF)
    }

    /// Implementation elements
    pub fn implementations(&self) -> impl Iterator<Item = &Element> {
        self.elements_of_category(IMPLEMENTATION)
    }

    /// Look up a node definition by name
    pub fn node_def(&self, name: &str) -> Option<&Element> {
        self.node_defs().find(|nd| nd.name() == name)
    }

    /// Node definitions declaring the given node string
    pub fn matching_node_defs<'a>(&'a self, node_string: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.node_defs()
            .filter(move |nd| nd.attribute("node") == Some(node_string))
    }

    /// Node definition for a node instance of the given category and type
    ///
    /// An explicit `nodedef` attribute wins; otherwise the first matching
    /// definition with the same output type is used.
    pub fn node_def_for_node(&self, node: &Element) -> Option<&Element> {
        if let Some(name) = node.non_empty_attribute("nodedef") {
            return self.node_def(name);
        }
        let category = node.category();
        let node_type = node.type_string();
        let mut candidates = self
            .node_defs()
            .filter(|nd| nd.attribute("node") == Some(category));
        let first = candidates.next()?;
        if first.type_string() == node_type {
            return Some(first);
        }
        candidates
            .find(|nd| nd.type_string() == node_type)
            .or(Some(first))
    }

    /// Node definition referenced by a shader reference
    pub fn node_def_for_shader_ref(&self, shader_ref: &Element) -> Option<&Element> {
        if let Some(name) = shader_ref.non_empty_attribute("nodedef") {
            return self.node_def(name);
        }
        let node = shader_ref.non_empty_attribute("node")?;
        self.node_defs().find(|nd| nd.attribute("node") == Some(node))
    }

    /// Shader references of a material
    pub fn shader_refs<'a>(material: &'a Element) -> impl Iterator<Item = &'a Element> + 'a {
        material.children_of_category(SHADER_REF)
    }

    /// Import library content, skipping elements whose name already exists
    ///
    /// Imported elements keep their own source URI, or inherit the library's
    /// source path when they have none.
    pub fn import_library(&mut self, library: &Document) -> usize {
        let library_uri = library
            .source_path()
            .map(|p| p.to_string_lossy().into_owned());
        let mut imported = 0;
        for elem in library.elements() {
            if self.root.child(elem.name()).is_some() {
                tracing::trace!("Skipping duplicate library element '{}'", elem.name());
                continue;
            }
            let mut copy = elem.clone();
            if copy.source_uri().is_none() {
                copy.set_source_uri(library_uri.clone());
            }
            self.root.add_child(copy);
            imported += 1;
        }
        imported
    }

    /// Value of a geometric attribute declared in any `geominfo` block
    pub fn geom_attr_value(&self, name: &str) -> Option<Value> {
        self.elements_of_category(GEOM_INFO)
            .flat_map(|info| info.children_of_category(GEOM_ATTR))
            .find(|attr| attr.name() == name)
            .and_then(|attr| {
                let type_desc = TypeDesc::from_name(attr.type_string());
                let text = attr.value_string()?;
                match Value::parse(&type_desc, text) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::warn!("Ignoring geomattr '{}': {}", name, e);
                        None
                    }
                }
            })
    }

    /// UDIM identifiers declared by the document's `udimset`, if any
    pub fn udim_set(&self) -> Option<Vec<String>> {
        match self.geom_attr_value(UDIM_SET_ATTRIBUTE)? {
            Value::StringArray(udims) => Some(udims),
            _ => None,
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_def(name: &str, node: &str, ty: &str) -> Element {
        Element::new(NODE_DEF, name)
            .with_attribute("node", node)
            .with_attribute("type", ty)
    }

    #[test]
    fn test_import_library_first_definition_wins() {
        let mut doc = Document::new();
        doc.add_element(node_def("ND_a", "a", "float"));

        let mut lib = Document::new();
        lib.set_source_path(Some(PathBuf::from("lib.mtlx")));
        lib.add_element(node_def("ND_a", "a", "color3"));
        lib.add_element(node_def("ND_b", "b", "float"));

        assert_eq!(doc.import_library(&lib), 1);
        assert_eq!(doc.node_def("ND_a").unwrap().type_string(), "float");
        assert_eq!(doc.node_def("ND_b").unwrap().source_uri(), Some("lib.mtlx"));
        assert!(doc.node_def("ND_a").unwrap().source_uri().is_none());
    }

    #[test]
    fn test_node_def_for_node_prefers_type_match() {
        let mut doc = Document::new();
        doc.add_element(node_def("ND_image_float", "image", "float"));
        doc.add_element(node_def("ND_image_color3", "image", "color3"));

        let node = Element::new("image", "img").with_attribute("type", "color3");
        assert_eq!(doc.node_def_for_node(&node).unwrap().name(), "ND_image_color3");

        let explicit = node.clone().with_attribute("nodedef", "ND_image_float");
        assert_eq!(doc.node_def_for_node(&explicit).unwrap().name(), "ND_image_float");
    }

    #[test]
    fn test_udim_set() {
        let mut doc = Document::new();
        assert!(doc.udim_set().is_none());
        doc.add_element(Element::new(GEOM_INFO, "gi").with_child(
            Element::new(GEOM_ATTR, UDIM_SET_ATTRIBUTE)
                .with_attribute("type", "stringarray")
                .with_attribute("value", "1001, 1002"),
        ));
        assert_eq!(doc.udim_set(), Some(vec!["1001".to_string(), "1002".to_string()]));
    }

    #[test]
    fn test_remove_element_by_path() {
        let mut doc = Document::new();
        doc.add_element(Element::new(MATERIAL, "m").with_child(Element::new(SHADER_REF, "sr")));
        assert!(doc.element("m/sr").is_some());
        assert!(doc.remove_element("m/sr").is_some());
        assert!(doc.element("m/sr").is_none());
        assert!(doc.remove_element("m").is_some());
        assert!(doc.element("").is_none());
    }
}
