// SPDX-License-Identifier: MIT OR Apache-2.0
//! Transparency detection for surface shaders.

use mxview_document::element::{BIND_INPUT, BIND_PARAM, NODE_GRAPH, OUTPUT, SHADER_REF};
use mxview_document::{Document, Element, TypeDesc, Value};

/// Inputs making a surface transparent unless they are exactly one
const OPACITY_INPUTS: [&str; 3] = ["opacity", "existence", "alpha"];

/// Inputs making a surface transparent when above zero
const TRANSMISSION_INPUTS: [&str; 1] = ["transmission"];

/// Check whether a renderable element's surface needs blending
///
/// Opacity-like inputs count when connected or not exactly one; transmission
/// counts when connected or above zero. Elements that are not surface
/// shaders are opaque.
pub fn is_transparent_surface(doc: &Document, path: &str) -> bool {
    let Some(elem) = doc.element(path) else {
        return false;
    };

    match elem.category() {
        SHADER_REF => match doc.node_def_for_shader_ref(elem) {
            Some(node_def) => surface_is_transparent(node_def, |name| {
                elem.children().iter().find(|c| {
                    (c.category() == BIND_INPUT || c.category() == BIND_PARAM) && c.name() == name
                })
            }),
            None => false,
        },
        OUTPUT => {
            let graph_path = path.rsplit_once('/').map(|(graph, _)| graph).unwrap_or("");
            let upstream = doc
                .element(graph_path)
                .filter(|g| g.category() == NODE_GRAPH)
                .zip(elem.non_empty_attribute("nodename"))
                .and_then(|(graph, node_name)| graph.child(node_name));
            upstream.is_some_and(|node| node_is_transparent(doc, node))
        }
        _ => node_is_transparent(doc, elem),
    }
}

fn node_is_transparent(doc: &Document, node: &Element) -> bool {
    match doc.node_def_for_node(node) {
        Some(node_def) if node_def.type_string() == TypeDesc::SurfaceShader.name() => {
            surface_is_transparent(node_def, |name| node.value_element(name))
        }
        _ => false,
    }
}

fn surface_is_transparent<'a>(node_def: &Element, authored: impl Fn(&str) -> Option<&'a Element>) -> bool {
    let check = |name: &str, transparent: fn(f32) -> bool| -> bool {
        let Some(def_input) = node_def.value_element(name) else {
            return false;
        };
        let instance = authored(name);
        if instance.is_some_and(|i| {
            i.has_attribute("nodename") || i.has_attribute("nodegraph") || i.has_attribute("interfacename")
        }) {
            return true;
        }
        let type_desc = TypeDesc::from_name(def_input.type_string());
        let text = instance
            .and_then(Element::value_string)
            .or_else(|| def_input.value_string());
        let value = text.and_then(|t| Value::parse(&type_desc, t).ok());
        match value.as_ref().and_then(Value::as_floats) {
            Some(components) => components.into_iter().any(transparent),
            None => false,
        }
    };

    OPACITY_INPUTS.iter().any(|&name| check(name, |c| c != 1.0))
        || TRANSMISSION_INPUTS.iter().any(|&name| check(name, |c| c > 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mxview_document::xml::{read_document_from_str, ReadOptions};

    const DOC: &str = r#"<materialx>
        <nodedef name="ND_surf" node="surf" type="surfaceshader">
          <input name="base_color" type="color3" value="1, 1, 1"/>
          <input name="opacity" type="color3" value="1, 1, 1"/>
          <input name="transmission" type="float" value="0"/>
        </nodedef>
        <nodegraph name="ng">
          <surf name="s1" type="surfaceshader"><input name="transmission" type="float" value="0.5"/></surf>
          <output name="out" type="surfaceshader" nodename="s1"/>
          <output name="mask" type="float" nodename="m"/>
        </nodegraph>
        <material name="opaque"><shaderref name="sr" node="surf"/></material>
        <material name="faded">
          <shaderref name="sr" node="surf"><bindinput name="opacity" type="color3" value="1, 0.5, 1"/></shaderref>
        </material>
        <material name="mapped">
          <shaderref name="sr" node="surf"><bindinput name="opacity" type="color3" nodegraph="ng" output="mask"/></shaderref>
        </material>
    </materialx>"#;

    #[test]
    fn test_transparency_rules() {
        let doc = read_document_from_str(DOC, &ReadOptions::default()).unwrap();
        assert!(!is_transparent_surface(&doc, "opaque/sr"));
        assert!(is_transparent_surface(&doc, "faded/sr"));
        assert!(is_transparent_surface(&doc, "mapped/sr"));
        assert!(is_transparent_surface(&doc, "ng/out"));
        assert!(!is_transparent_surface(&doc, "ng/mask"));
        assert!(!is_transparent_surface(&doc, "missing"));
    }
}
