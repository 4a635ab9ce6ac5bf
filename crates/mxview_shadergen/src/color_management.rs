// SPDX-License-Identifier: MIT OR Apache-2.0
//! Color space transforms for texture reads.
//!
//! Image nodes declaring a color space other than the target get a
//! transform node inserted after them. Transforms are node definitions
//! named `ND_<source>_to_<target>_<type>`.

use mxview_document::resolve::has_implementation;
use mxview_document::{Document, Element, ImplementationTarget, TypeDesc};

/// Attribute naming the color space of a value or file
pub const COLOR_SPACE_ATTRIBUTE: &str = "colorspace";

/// Name of the node definition converting between two color spaces
pub fn transform_name(source: &str, target: &str, type_desc: &TypeDesc) -> String {
    format!("ND_{}_to_{}_{}", source, target, type_desc.name())
}

/// Color space declared for an image node
///
/// The node's own attribute wins over its `file` input's, which wins over
/// the document default.
pub fn source_color_space<'a>(doc: &'a Document, node: &'a Element) -> Option<&'a str> {
    node.non_empty_attribute(COLOR_SPACE_ATTRIBUTE)
        .or_else(|| {
            node.value_elements()
                .filter(|input| input.type_string() == TypeDesc::Filename.name())
                .find_map(|input| input.non_empty_attribute(COLOR_SPACE_ATTRIBUTE))
        })
        .or_else(|| doc.root().non_empty_attribute(COLOR_SPACE_ATTRIBUTE))
}

/// Transform node definition to insert after an image node, if any
pub fn transform_node_def<'a>(
    doc: &'a Document,
    source: &str,
    target_space: &str,
    type_desc: &TypeDesc,
    target: &ImplementationTarget,
) -> Option<&'a Element> {
    if source.is_empty() || target_space.is_empty() || source == target_space {
        return None;
    }
    let name = transform_name(source, target_space, type_desc);
    let node_def = doc.node_def(&name)?;
    if has_implementation(doc, &name, Some(target)) {
        Some(node_def)
    } else {
        tracing::debug!("Color transform '{}' has no implementation", name);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mxview_document::xml::{read_document_from_str, ReadOptions};

    const DOC: &str = r#"<materialx colorspace="lin_rec709">
        <nodedef name="ND_srgb_texture_to_lin_rec709_color3" node="srgb_texture_to_lin_rec709" type="color3">
          <input name="in" type="color3"/>
        </nodedef>
        <implementation name="IM_srgb" nodedef="ND_srgb_texture_to_lin_rec709_color3" language="genglsl" sourcecode="pow({{in}}, vec3(2.2))"/>
        <nodegraph name="ng">
          <image name="a" type="color3"><parameter name="file" type="filename" value="a.png" colorspace="srgb_texture"/></image>
          <image name="b" type="color3" colorspace="acescg"><parameter name="file" type="filename" value="b.png"/></image>
          <image name="c" type="color3"><parameter name="file" type="filename" value="c.png"/></image>
        </nodegraph>
    </materialx>"#;

    #[test]
    fn test_source_color_space_precedence() {
        let doc = read_document_from_str(DOC, &ReadOptions::default()).unwrap();
        assert_eq!(source_color_space(&doc, doc.element("ng/a").unwrap()), Some("srgb_texture"));
        assert_eq!(source_color_space(&doc, doc.element("ng/b").unwrap()), Some("acescg"));
        assert_eq!(source_color_space(&doc, doc.element("ng/c").unwrap()), Some("lin_rec709"));
    }

    #[test]
    fn test_transform_lookup() {
        let doc = read_document_from_str(DOC, &ReadOptions::default()).unwrap();
        let target = ImplementationTarget::new("genglsl", "glsl");
        let found = transform_node_def(&doc, "srgb_texture", "lin_rec709", &TypeDesc::Color3, &target);
        assert_eq!(found.unwrap().name(), "ND_srgb_texture_to_lin_rec709_color3");
        assert!(transform_node_def(&doc, "lin_rec709", "lin_rec709", &TypeDesc::Color3, &target).is_none());
        assert!(transform_node_def(&doc, "acescg", "lin_rec709", &TypeDesc::Color3, &target).is_none());
        assert!(transform_node_def(&doc, "srgb_texture", "lin_rec709", &TypeDesc::Color4, &target).is_none());
    }
}
