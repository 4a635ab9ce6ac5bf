// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader variables and ordered variable blocks.

use crate::syntax;
use indexmap::IndexMap;
use mxview_document::{TypeDesc, Value};

/// A uniform, vertex input or varying
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderVariable {
    /// Variable name in the emitted source
    pub name: String,
    /// Semantic type
    pub type_desc: TypeDesc,
    /// Default value, if any
    pub value: Option<Value>,
    /// Graph path of the input this variable was created for; empty for built-ins
    pub path: String,
}

impl ShaderVariable {
    /// Create a variable without value or path
    pub fn new(name: impl Into<String>, type_desc: TypeDesc) -> Self {
        Self {
            name: name.into(),
            type_desc,
            value: None,
            path: String::new(),
        }
    }

    /// Builder-style value setter
    pub fn with_value(mut self, value: Option<Value>) -> Self {
        self.value = value;
        self
    }

    /// Builder-style path setter
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// GLSL declaration without qualifier, e.g. `vec3 base_color = vec3(...)`
    pub(crate) fn declaration(&self, with_initializer: bool) -> Option<String> {
        let type_name = syntax::type_name(&self.type_desc)?;
        let initializer = if with_initializer {
            self.value.as_ref().and_then(syntax::value_literal)
        } else {
            None
        };
        Some(match initializer {
            Some(literal) => format!("{} {} = {}", type_name, self.name, literal),
            None => format!("{} {}", type_name, self.name),
        })
    }
}

/// Variables keyed by name, in first-registered order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableBlock {
    variables: IndexMap<String, ShaderVariable>,
}

impl VariableBlock {
    /// Create an empty block
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variable; re-registering a name keeps the first entry
    pub fn add(&mut self, variable: ShaderVariable) -> bool {
        if self.variables.contains_key(&variable.name) {
            return false;
        }
        self.variables.insert(variable.name.clone(), variable);
        true
    }

    /// Look up by name
    pub fn get(&self, name: &str) -> Option<&ShaderVariable> {
        self.variables.get(name)
    }

    /// Look up by originating graph path
    pub fn find_by_path(&self, path: &str) -> Option<&ShaderVariable> {
        self.variables.values().find(|v| v.path == path)
    }

    /// Check whether a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Variables in registration order
    pub fn iter(&self) -> impl Iterator<Item = &ShaderVariable> {
        self.variables.values()
    }

    /// Variable names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

impl<'a> IntoIterator for &'a VariableBlock {
    type Item = &'a ShaderVariable;
    type IntoIter = indexmap::map::Values<'a, String, ShaderVariable>;

    fn into_iter(self) -> Self::IntoIter {
        self.variables.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_keeps_first_registration() {
        let mut block = VariableBlock::new();
        assert!(block.add(
            ShaderVariable::new("b", TypeDesc::Float)
                .with_value(Some(Value::Float(1.0)))
                .with_path("n/b")
        ));
        assert!(block.add(ShaderVariable::new("a", TypeDesc::Color3)));
        assert!(!block.add(ShaderVariable::new("b", TypeDesc::Integer)));

        assert_eq!(block.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(block.get("b").unwrap().type_desc, TypeDesc::Float);
        assert_eq!(block.find_by_path("n/b").unwrap().name, "b");
        assert_eq!(
            block.get("b").unwrap().declaration(true).unwrap(),
            "float b = 1.0"
        );
    }
}
