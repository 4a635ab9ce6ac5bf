// SPDX-License-Identifier: MIT OR Apache-2.0
//! Elements of a material document tree.

use indexmap::IndexMap;

/// Separator between element names in a name path
pub const NAME_PATH_SEPARATOR: char = '/';

/// Category of material elements
pub const MATERIAL: &str = "material";
/// Category of shader references inside a material
pub const SHADER_REF: &str = "shaderref";
/// Category of node graphs
pub const NODE_GRAPH: &str = "nodegraph";
/// Category of node definitions
pub const NODE_DEF: &str = "nodedef";
/// Category of implementation records
pub const IMPLEMENTATION: &str = "implementation";
/// Category of graph outputs
pub const OUTPUT: &str = "output";
/// Category of inputs
pub const INPUT: &str = "input";
/// Category of parameters
pub const PARAMETER: &str = "parameter";
/// Category of input bindings on a shader reference
pub const BIND_INPUT: &str = "bindinput";
/// Category of parameter bindings on a shader reference
pub const BIND_PARAM: &str = "bindparam";
/// Category of geometric info blocks
pub const GEOM_INFO: &str = "geominfo";
/// Category of geometric attributes
pub const GEOM_ATTR: &str = "geomattr";

/// A node in the document tree
///
/// Elements carry a category (the XML tag), a name unique among their
/// siblings, an ordered attribute map and ordered children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    category: String,
    name: String,
    attributes: IndexMap<String, String>,
    children: Vec<Element>,
    source_uri: Option<String>,
}

impl Element {
    /// Create a new element without attributes or children
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
            source_uri: None,
        }
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder-style child append
    pub fn with_child(mut self, child: Element) -> Self {
        self.add_child(child);
        self
    }

    /// Element category (XML tag)
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Change the element category
    pub fn set_category(&mut self, category: impl Into<String>) {
        self.category = category.into();
    }

    /// Element name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Change the element name
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Get an attribute value
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Get an attribute value, treating empty strings as absent
    pub fn non_empty_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name).filter(|v| !v.is_empty())
    }

    /// Check whether an attribute is present
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Set an attribute value
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Remove an attribute
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        self.attributes.shift_remove(name)
    }

    /// Iterate attributes in authored order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Mutable access to all attribute values
    pub fn attribute_values_mut(&mut self) -> impl Iterator<Item = &mut String> {
        self.attributes.values_mut()
    }

    /// The `type` attribute, or an empty string
    pub fn type_string(&self) -> &str {
        self.attribute("type").unwrap_or_default()
    }

    /// The `value` attribute, if any
    pub fn value_string(&self) -> Option<&str> {
        self.attribute("value")
    }

    /// Source file this element was imported from, if any
    pub fn source_uri(&self) -> Option<&str> {
        self.source_uri.as_deref()
    }

    /// Record the source file of this element
    pub fn set_source_uri(&mut self, uri: Option<String>) {
        self.source_uri = uri;
    }

    /// Child elements in document order
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Mutable child elements
    pub fn children_mut(&mut self) -> &mut Vec<Element> {
        &mut self.children
    }

    /// Find a child by name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Find a mutable child by name
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Children with the given category
    pub fn children_of_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.category == category)
    }

    /// Input and parameter children, in document order
    pub fn value_elements(&self) -> impl Iterator<Item = &Element> {
        self.children
            .iter()
            .filter(|c| c.category == INPUT || c.category == PARAMETER)
    }

    /// Find an input or parameter child by name
    pub fn value_element(&self, name: &str) -> Option<&Element> {
        self.value_elements().find(|c| c.name == name)
    }

    /// Append a child and return a reference to it
    pub fn add_child(&mut self, child: Element) -> &mut Element {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Remove a child by name
    pub fn remove_child(&mut self, name: &str) -> Option<Element> {
        let index = self.children.iter().position(|c| c.name == name)?;
        Some(self.children.remove(index))
    }

    /// Resolve a descendant by relative name path (`a/b/c`)
    pub fn descendant(&self, path: &str) -> Option<&Element> {
        path.split(NAME_PATH_SEPARATOR)
            .filter(|s| !s.is_empty())
            .try_fold(self, |elem, name| elem.child(name))
    }

    /// Resolve a mutable descendant by relative name path
    pub fn descendant_mut(&mut self, path: &str) -> Option<&mut Element> {
        let mut current = self;
        for name in path.split(NAME_PATH_SEPARATOR).filter(|s| !s.is_empty()) {
            current = current.child_mut(name)?;
        }
        Some(current)
    }

    /// Visit this element and all descendants depth-first, pre-order
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Element)) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }
}

/// Join a parent name path and a child name
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}{NAME_PATH_SEPARATOR}{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Element {
        Element::new("nodegraph", "graph1")
            .with_child(
                Element::new("image", "img")
                    .with_attribute("type", "color3")
                    .with_child(Element::new(PARAMETER, "file").with_attribute("type", "filename")),
            )
            .with_child(Element::new(OUTPUT, "out").with_attribute("nodename", "img"))
    }

    #[test]
    fn test_descendant_lookup() {
        let graph = sample();
        assert_eq!(graph.descendant("img/file").map(Element::category), Some(PARAMETER));
        assert!(graph.descendant("img/missing").is_none());
        assert_eq!(graph.descendant("").map(Element::name), Some("graph1"));
    }

    #[test]
    fn test_remove_child_and_visit() {
        let mut graph = sample();
        assert!(graph.remove_child("out").is_some());
        assert!(graph.remove_child("out").is_none());

        let mut names = Vec::new();
        graph.visit(&mut |e| names.push(e.name().to_string()));
        assert_eq!(names, vec!["graph1", "img", "file"]);
    }

    #[test]
    fn test_attribute_order_preserved() {
        let elem = Element::new("input", "a")
            .with_attribute("type", "float")
            .with_attribute("value", "0.5")
            .with_attribute("uiname", "A");
        let keys: Vec<_> = elem.attributes().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["type", "value", "uiname"]);
        assert_eq!(join_path("", "a"), "a");
        assert_eq!(join_path("m", "a"), "m/a");
    }
}
