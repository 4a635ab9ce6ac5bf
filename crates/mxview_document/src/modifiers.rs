// SPDX-License-Identifier: MIT OR Apache-2.0
//! Call-site modifications applied to freshly read content.
//!
//! Modifiers let the viewer rename or hide elements of third-party content
//! without editing the files themselves.

use crate::document::Document;
use crate::element::Element;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Attribute holding a file prefix
pub const FILE_PREFIX_ATTRIBUTE: &str = "fileprefix";

/// Remap table, skip set and file-prefix terminator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentModifiers {
    /// Replacement strings for categories, names and attribute values
    pub remap_elements: HashMap<String, String>,
    /// Categories or names of elements to remove
    pub skip_elements: HashSet<String>,
    /// Suffix every file prefix must end with
    pub file_prefix_terminator: String,
}

impl DocumentModifiers {
    /// Check if these modifiers change anything
    pub fn is_empty(&self) -> bool {
        self.remap_elements.is_empty()
            && self.skip_elements.is_empty()
            && self.file_prefix_terminator.is_empty()
    }

    /// Apply the modifiers to every element of a document
    pub fn apply(&self, doc: &mut Document) {
        if self.is_empty() {
            return;
        }
        let mut removed = 0;
        self.apply_children(doc.root_mut(), &mut removed);
        if removed > 0 {
            tracing::debug!("Document modifiers removed {} elements", removed);
        }
    }

    fn apply_children(&self, parent: &mut Element, removed: &mut usize) {
        let before = parent.children().len();
        parent
            .children_mut()
            .retain(|child| !self.is_skipped(child));
        *removed += before - parent.children().len();

        for child in parent.children_mut() {
            self.apply_element(child);
            self.apply_children(child, removed);
        }
    }

    fn is_skipped(&self, elem: &Element) -> bool {
        self.skip_elements.contains(elem.category()) || self.skip_elements.contains(elem.name())
    }

    fn apply_element(&self, elem: &mut Element) {
        if let Some(category) = self.remap_elements.get(elem.category()) {
            elem.set_category(category.clone());
        }
        if let Some(name) = self.remap_elements.get(elem.name()) {
            elem.set_name(name.clone());
        }
        for value in elem.attribute_values_mut() {
            if let Some(replacement) = self.remap_elements.get(value.as_str()) {
                *value = replacement.clone();
            }
        }
        if !self.file_prefix_terminator.is_empty() {
            if let Some(prefix) = elem.attribute(FILE_PREFIX_ATTRIBUTE) {
                if !prefix.ends_with(&self.file_prefix_terminator) {
                    let terminated = format!("{prefix}{}", self.file_prefix_terminator);
                    elem.set_attribute(FILE_PREFIX_ATTRIBUTE, terminated);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{MATERIAL, SHADER_REF};

    fn content() -> Document {
        let mut doc = Document::new();
        doc.add_element(
            Element::new(MATERIAL, "m1")
                .with_attribute(FILE_PREFIX_ATTRIBUTE, "textures")
                .with_child(Element::new(SHADER_REF, "sr1").with_attribute("node", "old_surface"))
                .with_child(Element::new("look", "hidden")),
        );
        doc.add_element(Element::new("old_surface_def", "nd"));
        doc
    }

    #[test]
    fn test_remap_category_name_and_values() {
        let mut modifiers = DocumentModifiers::default();
        modifiers
            .remap_elements
            .insert("old_surface".into(), "new_surface".into());
        modifiers
            .remap_elements
            .insert("old_surface_def".into(), "nodedef".into());
        modifiers.remap_elements.insert("sr1".into(), "sr_renamed".into());

        let mut doc = content();
        modifiers.apply(&mut doc);
        let sr = doc.element("m1/sr_renamed").unwrap();
        assert_eq!(sr.attribute("node"), Some("new_surface"));
        assert_eq!(doc.element("nd").unwrap().category(), "nodedef");
    }

    #[test]
    fn test_skip_and_file_prefix() {
        let mut modifiers = DocumentModifiers::default();
        modifiers.skip_elements.insert("look".into());
        modifiers.file_prefix_terminator = "/".into();

        let mut doc = content();
        modifiers.apply(&mut doc);
        let material = doc.element("m1").unwrap();
        assert!(material.child("hidden").is_none());
        assert_eq!(material.attribute(FILE_PREFIX_ATTRIBUTE), Some("textures/"));

        // Applying twice does not double the terminator
        modifiers.apply(&mut doc);
        assert_eq!(
            doc.element("m1").unwrap().attribute(FILE_PREFIX_ATTRIBUTE),
            Some("textures/")
        );
    }
}
