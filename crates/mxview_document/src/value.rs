// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed values carried by inputs and parameters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type of an input, parameter or output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeDesc {
    /// Boolean value
    Boolean,
    /// Integer value
    Integer,
    /// Floating point value
    Float,
    /// RGB color
    Color3,
    /// RGBA color
    Color4,
    /// 2D vector
    Vector2,
    /// 3D vector
    Vector3,
    /// 4D vector
    Vector4,
    /// 3x3 matrix
    Matrix33,
    /// 4x4 matrix
    Matrix44,
    /// String value
    String,
    /// File path (bound as a texture sampler)
    Filename,
    /// Array of integers
    IntegerArray,
    /// Array of floats
    FloatArray,
    /// Array of strings
    StringArray,
    /// BSDF closure
    Bsdf,
    /// EDF closure
    Edf,
    /// VDF closure
    Vdf,
    /// Surface shader
    SurfaceShader,
    /// Volume shader
    VolumeShader,
    /// Displacement shader
    DisplacementShader,
    /// Light shader
    LightShader,
    /// Any other type name
    Custom(String),
}

impl TypeDesc {
    /// Parse a type name as written in documents
    pub fn from_name(name: &str) -> Self {
        match name {
            "boolean" => Self::Boolean,
            "integer" => Self::Integer,
            "float" => Self::Float,
            "color3" => Self::Color3,
            "color4" => Self::Color4,
            "vector2" => Self::Vector2,
            "vector3" => Self::Vector3,
            "vector4" => Self::Vector4,
            "matrix33" => Self::Matrix33,
            "matrix44" => Self::Matrix44,
            "string" => Self::String,
            "filename" => Self::Filename,
            "integerarray" => Self::IntegerArray,
            "floatarray" => Self::FloatArray,
            "stringarray" => Self::StringArray,
            "BSDF" => Self::Bsdf,
            "EDF" => Self::Edf,
            "VDF" => Self::Vdf,
            "surfaceshader" => Self::SurfaceShader,
            "volumeshader" => Self::VolumeShader,
            "displacementshader" => Self::DisplacementShader,
            "lightshader" => Self::LightShader,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Type name as written in documents
    pub fn name(&self) -> &str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Color3 => "color3",
            Self::Color4 => "color4",
            Self::Vector2 => "vector2",
            Self::Vector3 => "vector3",
            Self::Vector4 => "vector4",
            Self::Matrix33 => "matrix33",
            Self::Matrix44 => "matrix44",
            Self::String => "string",
            Self::Filename => "filename",
            Self::IntegerArray => "integerarray",
            Self::FloatArray => "floatarray",
            Self::StringArray => "stringarray",
            Self::Bsdf => "BSDF",
            Self::Edf => "EDF",
            Self::Vdf => "VDF",
            Self::SurfaceShader => "surfaceshader",
            Self::VolumeShader => "volumeshader",
            Self::DisplacementShader => "displacementshader",
            Self::LightShader => "lightshader",
            Self::Custom(name) => name,
        }
    }

    /// Number of float components for numeric types
    pub fn components(&self) -> usize {
        match self {
            Self::Boolean | Self::Integer | Self::Float => 1,
            Self::Vector2 => 2,
            Self::Color3 | Self::Vector3 => 3,
            Self::Color4 | Self::Vector4 => 4,
            Self::Matrix33 => 9,
            Self::Matrix44 => 16,
            _ => 0,
        }
    }

    /// Closure and shader types have no literal value
    pub fn is_closure(&self) -> bool {
        matches!(
            self,
            Self::Bsdf
                | Self::Edf
                | Self::Vdf
                | Self::SurfaceShader
                | Self::VolumeShader
                | Self::DisplacementShader
                | Self::LightShader
        )
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error when parsing a value string
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValueError {
    /// Wrong number of components or malformed number
    #[error("Invalid {type_name} value: '{text}'")]
    Invalid {
        /// Target type name
        type_name: String,
        /// Offending text
        text: String,
    },

    /// The type has no literal representation
    #[error("Type {0} has no value representation")]
    NoValue(String),
}

/// Value of an input or parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean
    Boolean(bool),
    /// Integer
    Integer(i32),
    /// Float
    Float(f32),
    /// RGB color
    Color3([f32; 3]),
    /// RGBA color
    Color4([f32; 4]),
    /// 2D vector
    Vector2([f32; 2]),
    /// 3D vector
    Vector3([f32; 3]),
    /// 4D vector
    Vector4([f32; 4]),
    /// 3x3 matrix, row major
    Matrix33([f32; 9]),
    /// 4x4 matrix, row major
    Matrix44([f32; 16]),
    /// String
    String(String),
    /// File path
    Filename(String),
    /// Integer array
    IntegerArray(Vec<i32>),
    /// Float array
    FloatArray(Vec<f32>),
    /// String array
    StringArray(Vec<String>),
}

impl Value {
    /// Parse a value string for the given type
    pub fn parse(type_desc: &TypeDesc, text: &str) -> Result<Self, ValueError> {
        let invalid = || ValueError::Invalid {
            type_name: type_desc.name().to_string(),
            text: text.to_string(),
        };

        let value = match type_desc {
            TypeDesc::Boolean => match text.trim() {
                "true" | "1" => Self::Boolean(true),
                "false" | "0" => Self::Boolean(false),
                _ => return Err(invalid()),
            },
            TypeDesc::Integer => Self::Integer(text.trim().parse().map_err(|_| invalid())?),
            TypeDesc::Float => Self::Float(text.trim().parse().map_err(|_| invalid())?),
            TypeDesc::Color3 => Self::Color3(parse_floats(text).ok_or_else(invalid)?),
            TypeDesc::Color4 => Self::Color4(parse_floats(text).ok_or_else(invalid)?),
            TypeDesc::Vector2 => Self::Vector2(parse_floats(text).ok_or_else(invalid)?),
            TypeDesc::Vector3 => Self::Vector3(parse_floats(text).ok_or_else(invalid)?),
            TypeDesc::Vector4 => Self::Vector4(parse_floats(text).ok_or_else(invalid)?),
            TypeDesc::Matrix33 => Self::Matrix33(parse_floats(text).ok_or_else(invalid)?),
            TypeDesc::Matrix44 => Self::Matrix44(parse_floats(text).ok_or_else(invalid)?),
            TypeDesc::String | TypeDesc::Custom(_) => Self::String(text.to_string()),
            TypeDesc::Filename => Self::Filename(text.to_string()),
            TypeDesc::IntegerArray => Self::IntegerArray(
                split_list(text)
                    .map(|s| s.parse().map_err(|_| invalid()))
                    .collect::<Result<_, _>>()?,
            ),
            TypeDesc::FloatArray => Self::FloatArray(
                split_list(text)
                    .map(|s| s.parse().map_err(|_| invalid()))
                    .collect::<Result<_, _>>()?,
            ),
            TypeDesc::StringArray => {
                Self::StringArray(split_list(text).map(str::to_string).collect())
            }
            closure => return Err(ValueError::NoValue(closure.name().to_string())),
        };
        Ok(value)
    }

    /// Zero-like default for a type, `None` for closures
    pub fn default_for(type_desc: &TypeDesc) -> Option<Self> {
        Some(match type_desc {
            TypeDesc::Boolean => Self::Boolean(false),
            TypeDesc::Integer => Self::Integer(0),
            TypeDesc::Float => Self::Float(0.0),
            TypeDesc::Color3 => Self::Color3([0.0; 3]),
            TypeDesc::Color4 => Self::Color4([0.0; 4]),
            TypeDesc::Vector2 => Self::Vector2([0.0; 2]),
            TypeDesc::Vector3 => Self::Vector3([0.0; 3]),
            TypeDesc::Vector4 => Self::Vector4([0.0; 4]),
            TypeDesc::Matrix33 => Self::Matrix33([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]),
            TypeDesc::Matrix44 => Self::Matrix44([
                1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
            ]),
            TypeDesc::String | TypeDesc::Custom(_) => Self::String(String::new()),
            TypeDesc::Filename => Self::Filename(String::new()),
            TypeDesc::IntegerArray => Self::IntegerArray(Vec::new()),
            TypeDesc::FloatArray => Self::FloatArray(Vec::new()),
            TypeDesc::StringArray => Self::StringArray(Vec::new()),
            _ => return None,
        })
    }

    /// The semantic type of this value
    pub fn type_desc(&self) -> TypeDesc {
        match self {
            Self::Boolean(_) => TypeDesc::Boolean,
            Self::Integer(_) => TypeDesc::Integer,
            Self::Float(_) => TypeDesc::Float,
            Self::Color3(_) => TypeDesc::Color3,
            Self::Color4(_) => TypeDesc::Color4,
            Self::Vector2(_) => TypeDesc::Vector2,
            Self::Vector3(_) => TypeDesc::Vector3,
            Self::Vector4(_) => TypeDesc::Vector4,
            Self::Matrix33(_) => TypeDesc::Matrix33,
            Self::Matrix44(_) => TypeDesc::Matrix44,
            Self::String(_) => TypeDesc::String,
            Self::Filename(_) => TypeDesc::Filename,
            Self::IntegerArray(_) => TypeDesc::IntegerArray,
            Self::FloatArray(_) => TypeDesc::FloatArray,
            Self::StringArray(_) => TypeDesc::StringArray,
        }
    }

    /// Float components of numeric values, in declaration order
    pub fn as_floats(&self) -> Option<Vec<f32>> {
        match self {
            Self::Boolean(b) => Some(vec![if *b { 1.0 } else { 0.0 }]),
            Self::Integer(i) => Some(vec![*i as f32]),
            Self::Float(f) => Some(vec![*f]),
            Self::Color3(v) | Self::Vector3(v) => Some(v.to_vec()),
            Self::Color4(v) | Self::Vector4(v) => Some(v.to_vec()),
            Self::Vector2(v) => Some(v.to_vec()),
            Self::Matrix33(v) => Some(v.to_vec()),
            Self::Matrix44(v) => Some(v.to_vec()),
            Self::FloatArray(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// String payload of string and filename values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Filename(s) => Some(s),
            _ => None,
        }
    }

    /// Value string as it would be written in a document
    pub fn value_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: fmt::Display>(items: &[T]) -> String {
            items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        }

        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Color3(v) | Self::Vector3(v) => f.write_str(&join(v)),
            Self::Color4(v) | Self::Vector4(v) => f.write_str(&join(v)),
            Self::Vector2(v) => f.write_str(&join(v)),
            Self::Matrix33(v) => f.write_str(&join(v)),
            Self::Matrix44(v) => f.write_str(&join(v)),
            Self::String(s) | Self::Filename(s) => f.write_str(s),
            Self::IntegerArray(v) => f.write_str(&join(v)),
            Self::FloatArray(v) => f.write_str(&join(v)),
            Self::StringArray(v) => f.write_str(&join(v)),
        }
    }
}

fn split_list(text: &str) -> impl Iterator<Item = &str> {
    text.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_floats<const N: usize>(text: &str) -> Option<[f32; N]> {
    let mut out = [0.0f32; N];
    let mut count = 0;
    for part in split_list(text) {
        if count == N {
            return None;
        }
        out[count] = part.parse().ok()?;
        count += 1;
    }
    (count == N).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vectors() {
        assert_eq!(
            Value::parse(&TypeDesc::Color3, "0.1, 0.2,0.3").unwrap(),
            Value::Color3([0.1, 0.2, 0.3])
        );
        assert!(Value::parse(&TypeDesc::Color3, "0.1, 0.2").is_err());
        assert!(Value::parse(&TypeDesc::Vector2, "1, 2, 3").is_err());
        assert!(Value::parse(&TypeDesc::Float, "abc").is_err());
    }

    #[test]
    fn test_parse_arrays_and_closures() {
        assert_eq!(
            Value::parse(&TypeDesc::StringArray, "1001, 1002,1003").unwrap(),
            Value::StringArray(vec!["1001".into(), "1002".into(), "1003".into()])
        );
        assert!(matches!(
            Value::parse(&TypeDesc::SurfaceShader, ""),
            Err(ValueError::NoValue(_))
        ));
    }

    #[test]
    fn test_type_names_round_trip() {
        for name in ["float", "color3", "filename", "surfaceshader", "BSDF", "mytype"] {
            assert_eq!(TypeDesc::from_name(name).name(), name);
        }
        assert!(TypeDesc::LightShader.is_closure());
        assert_eq!(TypeDesc::Matrix44.components(), 16);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Vector3([1.0, 0.5, 0.0]).to_string(), "1, 0.5, 0");
        assert_eq!(Value::Filename("a.png".into()).to_string(), "a.png");
    }
}
