// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of built-in node implementations.

use crate::implementation::{GeometricNode, NodeImplementation, TexCoordNode};
use crate::options::GLSL_LANGUAGE;
use indexmap::IndexMap;
use mxview_document::ImplementationTarget;

/// Function creating a node implementation
pub type ImplementationCreator = fn() -> Box<dyn NodeImplementation>;

/// Node definition, language and target an implementation serves
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImplementationKey {
    /// Node definition name
    pub node_def: String,
    /// Shading language
    pub language: String,
    /// Target API; empty serves every target of the language
    pub target: String,
}

impl ImplementationKey {
    /// Create a new key
    pub fn new(node_def: impl Into<String>, language: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            node_def: node_def.into(),
            language: language.into(),
            target: target.into(),
        }
    }
}

/// Maps (node definition, language, target) to implementation creators
///
/// Built-in implementations take precedence over implementation records
/// found in documents.
#[derive(Debug, Clone, Default)]
pub struct ImplementationRegistry {
    creators: IndexMap<ImplementationKey, ImplementationCreator>,
}

impl ImplementationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in GLSL implementations
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ImplementationKey::new("ND_texcoord_vector2", GLSL_LANGUAGE, ""), TexCoordNode::create);
        registry.register(ImplementationKey::new("ND_texcoord_vector3", GLSL_LANGUAGE, ""), TexCoordNode::create);
        registry.register(ImplementationKey::new("ND_position_vector3", GLSL_LANGUAGE, ""), GeometricNode::create_position);
        registry.register(ImplementationKey::new("ND_normal_vector3", GLSL_LANGUAGE, ""), GeometricNode::create_normal);
        registry.register(ImplementationKey::new("ND_tangent_vector3", GLSL_LANGUAGE, ""), GeometricNode::create_tangent);
        registry
    }

    /// Register a creator, replacing any previous one for the key
    pub fn register(&mut self, key: ImplementationKey, creator: ImplementationCreator) {
        self.creators.insert(key, creator);
    }

    /// Check whether a node definition has a built-in implementation for a target
    pub fn contains(&self, node_def: &str, target: &ImplementationTarget) -> bool {
        self.find(node_def, target).is_some()
    }

    /// Instantiate the implementation of a node definition for a target
    ///
    /// An exact target match wins over a target-less registration.
    pub fn create(&self, node_def: &str, target: &ImplementationTarget) -> Option<Box<dyn NodeImplementation>> {
        self.find(node_def, target).map(|creator| creator())
    }

    fn find(&self, node_def: &str, target: &ImplementationTarget) -> Option<ImplementationCreator> {
        let exact = ImplementationKey::new(node_def, target.language.as_str(), target.target.as_str());
        let generic = ImplementationKey::new(node_def, target.language.as_str(), "");
        self.creators
            .get(&exact)
            .or_else(|| self.creators.get(&generic))
            .copied()
    }

    /// Registered keys in registration order
    pub fn keys(&self) -> impl Iterator<Item = &ImplementationKey> {
        self.creators.keys()
    }
}
