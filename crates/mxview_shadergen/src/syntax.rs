// SPDX-License-Identifier: MIT OR Apache-2.0
//! GLSL syntax: type names, literals and identifiers.

use mxview_document::{TypeDesc, Value};

/// Declarations of the closure and shader types, emitted ahead of any code
pub const CLOSURE_TYPE_DEFINITIONS: &str = "\
#define BSDF vec3
#define EDF vec3
#define VDF vec3
struct surfaceshader { vec3 color; vec3 transparency; };
struct volumeshader { vec3 color; vec3 transparency; };
struct displacementshader { vec3 offset; float scale; };
struct lightshader { vec3 intensity; vec3 direction; };
";

/// GLSL type name, `None` for types without a GLSL representation
pub fn type_name(type_desc: &TypeDesc) -> Option<&'static str> {
    Some(match type_desc {
        TypeDesc::Boolean => "bool",
        TypeDesc::Integer => "int",
        TypeDesc::Float => "float",
        TypeDesc::Color3 | TypeDesc::Vector3 => "vec3",
        TypeDesc::Color4 | TypeDesc::Vector4 => "vec4",
        TypeDesc::Vector2 => "vec2",
        TypeDesc::Matrix33 => "mat3",
        TypeDesc::Matrix44 => "mat4",
        TypeDesc::Filename => "sampler2D",
        TypeDesc::Bsdf => "BSDF",
        TypeDesc::Edf => "EDF",
        TypeDesc::Vdf => "VDF",
        TypeDesc::SurfaceShader => "surfaceshader",
        TypeDesc::VolumeShader => "volumeshader",
        TypeDesc::DisplacementShader => "displacementshader",
        TypeDesc::LightShader => "lightshader",
        TypeDesc::String
        | TypeDesc::IntegerArray
        | TypeDesc::FloatArray
        | TypeDesc::StringArray
        | TypeDesc::Custom(_) => return None,
    })
}

/// Check whether values of a type can be passed to shader code
pub fn is_shader_type(type_desc: &TypeDesc) -> bool {
    type_name(type_desc).is_some()
}

/// Deterministic float literal
pub fn float_literal(v: f32) -> String {
    if !v.is_finite() {
        return "0.0".to_string();
    }
    let text = format!("{v:?}");
    if text.contains(['.', 'e', 'E']) {
        text
    } else {
        format!("{text}.0")
    }
}

fn vector_literal(constructor: &str, components: &[f32]) -> String {
    let args: Vec<String> = components.iter().map(|c| float_literal(*c)).collect();
    format!("{}({})", constructor, args.join(", "))
}

/// Matrices are stored row-major; GLSL constructors take columns.
fn matrix_literal(constructor: &str, rows: &[f32], size: usize) -> String {
    let columns: Vec<f32> = (0..size)
        .flat_map(|col| (0..size).map(move |row| rows[row * size + col]))
        .collect();
    vector_literal(constructor, &columns)
}

/// GLSL literal for a value, `None` for values without one
pub fn value_literal(value: &Value) -> Option<String> {
    Some(match value {
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => float_literal(*f),
        Value::Color3(v) | Value::Vector3(v) => vector_literal("vec3", v),
        Value::Color4(v) | Value::Vector4(v) => vector_literal("vec4", v),
        Value::Vector2(v) => vector_literal("vec2", v),
        Value::Matrix33(v) => matrix_literal("mat3", v, 3),
        Value::Matrix44(v) => matrix_literal("mat4", v, 4),
        Value::String(_)
        | Value::Filename(_)
        | Value::IntegerArray(_)
        | Value::FloatArray(_)
        | Value::StringArray(_) => return None,
    })
}

/// Default literal of a type, including closures
pub fn default_literal(type_desc: &TypeDesc) -> Option<String> {
    match type_desc {
        TypeDesc::Bsdf | TypeDesc::Edf | TypeDesc::Vdf => Some("vec3(0.0)".to_string()),
        TypeDesc::SurfaceShader | TypeDesc::VolumeShader => {
            Some(format!("{}(vec3(0.0), vec3(0.0))", type_name(type_desc)?))
        }
        TypeDesc::DisplacementShader => Some("displacementshader(vec3(0.0), 1.0)".to_string()),
        TypeDesc::LightShader => Some("lightshader(vec3(0.0), vec3(0.0))".to_string()),
        other => Value::default_for(other).and_then(|v| value_literal(&v)),
    }
}

/// Turn an element name into a valid identifier
pub fn identifier(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    // Reserved by GLSL
    if ident.starts_with("gl_") {
        ident.insert(0, '_');
    }
    ident
}
