// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader graphs built from renderable elements.
//!
//! Building walks the document from the renderable element upstream. Each
//! document node becomes one [`ShaderNode`], shared by every consumer.
//! Node-graph implementations are flattened in place, default geometric
//! properties become implicit geometry nodes, and color transforms are
//! inserted after image nodes.

use crate::color_management::{self, COLOR_SPACE_ATTRIBUTE};
use crate::error::GenerationError;
use crate::implementation::{NodeImplementation, SourceCodeImplementation};
use crate::options::{GenOptions, ShaderInterface};
use crate::registry::ImplementationRegistry;
use crate::syntax;
use crate::variable::{ShaderVariable, VariableBlock};
use mxview_document::element::{join_path, BIND_INPUT, BIND_PARAM, NODE_GRAPH, OUTPUT, SHADER_REF};
use mxview_document::{resolve_implementation, Document, Element, ResolveError, TypeDesc, Value};
use std::collections::{HashMap, HashSet};

/// Node-definition attribute naming the geometric property an unconnected input reads
pub const DEFAULT_GEOM_PROP_ATTRIBUTE: &str = "defaultgeomprop";

/// Error when a graph contains a cycle
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("Graph contains a cycle")]
pub struct CycleError;

/// Where an input takes its value from
#[derive(Debug, Clone, PartialEq)]
pub enum InputBinding {
    /// Output of another node, by index
    Connection(usize),
    /// A public uniform
    Uniform(String),
    /// An inlined literal
    Constant(Value),
    /// No shader representation (strings, arrays, unconnected closures)
    Unbound,
}

/// An input of a shader node
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderInput {
    /// Input name
    pub name: String,
    /// Semantic type
    pub type_desc: TypeDesc,
    /// Value source
    pub binding: InputBinding,
    /// Authored or default value
    pub value: Option<Value>,
}

/// A node of a shader graph
#[derive(Debug)]
pub struct ShaderNode {
    /// Unique identifier used for variable names
    pub name: String,
    /// Graph path of the originating element
    pub path: String,
    /// Node string
    pub category: String,
    /// Node definition name
    pub node_def: String,
    /// Output type
    pub output_type: TypeDesc,
    /// Inputs in node-definition order
    pub inputs: Vec<ShaderInput>,
    /// Code generation behavior, `None` emits a default output
    pub implementation: Option<Box<dyn NodeImplementation>>,
}

impl ShaderNode {
    /// Look up an input by name
    pub fn input(&self, name: &str) -> Option<&ShaderInput> {
        self.inputs.iter().find(|input| input.name == name)
    }

    /// Variable holding the node output
    pub fn output_variable(&self) -> String {
        format!("{}_out", self.name)
    }
}

/// Nodes reachable from one renderable element
#[derive(Debug)]
pub struct ShaderGraph {
    name: String,
    nodes: Vec<ShaderNode>,
    root: usize,
    uniforms: VariableBlock,
}

impl ShaderGraph {
    /// Build the graph of a renderable element
    pub fn build(
        doc: &Document,
        element: &str,
        options: &GenOptions,
        registry: &ImplementationRegistry,
    ) -> Result<Self, GenerationError> {
        let mut builder = GraphBuilder {
            doc,
            options,
            registry,
            nodes: Vec::new(),
            built: HashMap::new(),
            in_progress: HashSet::new(),
            names: HashSet::new(),
            uniforms: VariableBlock::new(),
        };
        let root = builder.build_root(element)?;
        tracing::debug!(
            "Built shader graph for {} ({} nodes, {} public uniforms)",
            element,
            builder.nodes.len(),
            builder.uniforms.len()
        );
        Ok(Self {
            name: element.to_string(),
            nodes: builder.nodes,
            root,
            uniforms: builder.uniforms,
        })
    }

    /// Path of the renderable element
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All nodes
    pub fn nodes(&self) -> &[ShaderNode] {
        &self.nodes
    }

    /// Get a node by index
    pub fn node(&self, index: usize) -> Option<&ShaderNode> {
        self.nodes.get(index)
    }

    /// The node producing the final output
    pub fn root_node(&self) -> &ShaderNode {
        &self.nodes[self.root]
    }

    /// Public uniforms in discovery order
    pub fn public_uniforms(&self) -> &VariableBlock {
        &self.uniforms
    }

    /// Shader expression feeding an input
    pub fn input_expression(&self, input: &ShaderInput) -> String {
        let fallback = || syntax::default_literal(&input.type_desc).unwrap_or_else(|| "0".to_string());
        match &input.binding {
            InputBinding::Connection(index) => self
                .nodes
                .get(*index)
                .map(ShaderNode::output_variable)
                .unwrap_or_else(fallback),
            InputBinding::Uniform(variable) => variable.clone(),
            InputBinding::Constant(value) => syntax::value_literal(value).unwrap_or_else(fallback),
            InputBinding::Unbound => fallback(),
        }
    }

    /// Nodes in dependency order, upstream first, starting from the root
    pub fn topological_order(&self) -> Result<Vec<usize>, CycleError> {
        let mut visited = HashSet::new();
        let mut temp_mark = HashSet::new();
        let mut order = Vec::new();
        self.visit(self.root, &mut visited, &mut temp_mark, &mut order)?;
        Ok(order)
    }

    fn visit(
        &self,
        index: usize,
        visited: &mut HashSet<usize>,
        temp_mark: &mut HashSet<usize>,
        order: &mut Vec<usize>,
    ) -> Result<(), CycleError> {
        if temp_mark.contains(&index) {
            return Err(CycleError);
        }
        if visited.contains(&index) {
            return Ok(());
        }

        temp_mark.insert(index);
        if let Some(node) = self.nodes.get(index) {
            for input in &node.inputs {
                if let InputBinding::Connection(upstream) = input.binding {
                    self.visit(upstream, visited, temp_mark, order)?;
                }
            }
        }
        temp_mark.remove(&index);
        visited.insert(index);
        order.push(index);
        Ok(())
    }
}

/// Lookup scope while walking a graph
#[derive(Debug, Clone, Default)]
struct Frame {
    /// Node graph path that `nodename` references resolve in; empty for the document root
    scope: String,
    /// Keeps node keys unique per flattened graph instance
    key_prefix: String,
    /// Prefix of generated variable names
    name_prefix: String,
    /// Inputs of the node a flattened graph implements
    interface: Option<Vec<ShaderInput>>,
}

/// How a node instance is authored
#[derive(Clone, Copy)]
enum Instance<'a> {
    /// A node inside a graph or at document level
    Node(&'a Element),
    /// A shader reference inside a material
    ShaderRef(&'a Element),
    /// A node the builder inserts itself
    Synthetic,
}

impl<'a> Instance<'a> {
    fn authored(&self, input: &str) -> Option<&'a Element> {
        match self {
            Self::Node(elem) => elem.value_element(input),
            Self::ShaderRef(elem) => elem.children().iter().find(|c| {
                (c.category() == BIND_INPUT || c.category() == BIND_PARAM) && c.name() == input
            }),
            Self::Synthetic => None,
        }
    }
}

enum Resolved {
    Code(Box<dyn NodeImplementation>),
    Graph(String),
}

/// Description of a node about to be added
struct NodeSpec<'a> {
    key: String,
    name: String,
    path: String,
    category: String,
    node_def: &'a Element,
    output_type: TypeDesc,
    inputs: Vec<ShaderInput>,
    root: bool,
}

struct GraphBuilder<'a> {
    doc: &'a Document,
    options: &'a GenOptions,
    registry: &'a ImplementationRegistry,
    nodes: Vec<ShaderNode>,
    built: HashMap<String, usize>,
    in_progress: HashSet<String>,
    names: HashSet<String>,
    uniforms: VariableBlock,
}

impl<'a> GraphBuilder<'a> {
    fn build_root(&mut self, path: &str) -> Result<usize, GenerationError> {
        let doc = self.doc;
        let elem = doc
            .element(path)
            .ok_or_else(|| GenerationError::EmptyElement(path.to_string()))?;
        let parent = path
            .rsplit_once(mxview_document::element::NAME_PATH_SEPARATOR)
            .map(|(parent, _)| parent)
            .unwrap_or("");

        match elem.category() {
            SHADER_REF => {
                let node_def = doc.node_def_for_shader_ref(elem).ok_or_else(|| {
                    GenerationError::UnresolvedRoot {
                        element: path.to_string(),
                        source: ResolveError::NodeDefNotFound(path.to_string()),
                    }
                })?;
                self.build_instance(&Frame::default(), Instance::ShaderRef(elem), node_def, path.to_string(), path, true)
            }
            OUTPUT => {
                let graph = doc
                    .element(parent)
                    .filter(|g| g.category() == NODE_GRAPH)
                    .ok_or_else(|| GenerationError::UnsupportedElement(path.to_string()))?;
                let node_name = elem.non_empty_attribute("nodename").ok_or_else(|| {
                    GenerationError::UnresolvedRoot {
                        element: path.to_string(),
                        source: ResolveError::Unsupported(path.to_string()),
                    }
                })?;
                let frame = Frame {
                    scope: graph.name().to_string(),
                    ..Frame::default()
                };
                self.build_node_element(&frame, node_name, true)
            }
            _ => {
                let frame = Frame {
                    scope: parent.to_string(),
                    ..Frame::default()
                };
                self.build_node_element(&frame, elem.name(), true)
            }
        }
    }

    /// Build a document node referenced by name within the frame's scope
    fn build_node_element(&mut self, frame: &Frame, node_name: &str, root: bool) -> Result<usize, GenerationError> {
        let doc = self.doc;
        let path = if frame.scope.is_empty() {
            node_name.to_string()
        } else {
            join_path(&frame.scope, node_name)
        };
        let key = format!("{}{}", frame.key_prefix, path);
        if let Some(&index) = self.built.get(&key) {
            return Ok(index);
        }
        if !self.in_progress.insert(key.clone()) {
            return Err(GenerationError::Cycle(path));
        }

        let elem = doc
            .element(&path)
            .ok_or_else(|| GenerationError::EmptyElement(path.clone()))?;
        let index = match doc.node_def_for_node(elem) {
            Some(node_def) => self.build_instance(frame, Instance::Node(elem), node_def, key.clone(), &path, root)?,
            None if root => {
                return Err(GenerationError::UnresolvedRoot {
                    element: path.clone(),
                    source: ResolveError::NodeDefNotFound(elem.category().to_string()),
                });
            }
            None => {
                tracing::warn!("No node definition for '{}', emitting default output", path);
                let name = self.unique_name(&format!("{}{}", frame.name_prefix, elem.name()));
                self.nodes.push(ShaderNode {
                    name,
                    path: path.clone(),
                    category: elem.category().to_string(),
                    node_def: String::new(),
                    output_type: TypeDesc::from_name(elem.type_string()),
                    inputs: Vec::new(),
                    implementation: None,
                });
                self.nodes.len() - 1
            }
        };

        self.in_progress.remove(&key);
        self.built.insert(key, index);
        Ok(index)
    }

    /// Build an authored instance of a node definition
    fn build_instance(
        &mut self,
        frame: &Frame,
        instance: Instance<'a>,
        node_def: &'a Element,
        key: String,
        path: &str,
        root: bool,
    ) -> Result<usize, GenerationError> {
        let (elem_name, category) = match instance {
            Instance::Node(elem) => (elem.name(), elem.category().to_string()),
            Instance::ShaderRef(elem) => (
                elem.name(),
                node_def.attribute("node").unwrap_or_default().to_string(),
            ),
            Instance::Synthetic => (
                node_def.name(),
                node_def.attribute("node").unwrap_or_default().to_string(),
            ),
        };
        let name = self.unique_name(&format!("{}{}", frame.name_prefix, elem_name));
        let inputs = self.resolve_inputs(frame, instance, node_def, &name, path, &[])?;
        let output_type = match instance {
            Instance::Node(elem) if !elem.type_string().is_empty() => TypeDesc::from_name(elem.type_string()),
            _ => TypeDesc::from_name(node_def.type_string()),
        };

        let index = self.add_node(NodeSpec {
            key,
            name,
            path: path.to_string(),
            category,
            node_def,
            output_type,
            inputs,
            root,
        })?;

        match instance {
            Instance::Node(elem) => self.insert_color_transform(frame, elem, index, path),
            _ => Ok(index),
        }
    }

    /// Resolve the implementation of a node and add it, flattening graph implementations
    fn add_node(&mut self, spec: NodeSpec<'a>) -> Result<usize, GenerationError> {
        let implementation = match self.implementation_for(spec.node_def.name()) {
            Ok(Resolved::Code(implementation)) => Some(implementation),
            Ok(Resolved::Graph(graph)) => {
                if let Some(index) = self.flatten(&graph, &spec)? {
                    return Ok(index);
                }
                None
            }
            Err(source) if spec.root => {
                return Err(GenerationError::UnresolvedRoot {
                    element: spec.path,
                    source,
                });
            }
            Err(e) => {
                tracing::warn!("Skipping implementation of '{}': {}", spec.path, e);
                None
            }
        };

        self.nodes.push(ShaderNode {
            name: spec.name,
            path: spec.path,
            category: spec.category,
            node_def: spec.node_def.name().to_string(),
            output_type: spec.output_type,
            inputs: spec.inputs,
            implementation,
        });
        Ok(self.nodes.len() - 1)
    }

    fn implementation_for(&self, node_def: &str) -> Result<Resolved, ResolveError> {
        if let Some(implementation) = self.registry.create(node_def, &self.options.target) {
            return Ok(Resolved::Code(implementation));
        }
        let handle = resolve_implementation(self.doc, node_def, &self.options.target)?;
        match SourceCodeImplementation::from_handle(&handle) {
            Some(source) => Ok(Resolved::Code(Box::new(source))),
            None => Ok(Resolved::Graph(handle.name().to_string())),
        }
    }

    /// Inline the node graph implementing a node
    ///
    /// Returns the index of the node producing the graph output, or `None`
    /// when the graph has no usable output.
    fn flatten(&mut self, graph_name: &str, spec: &NodeSpec<'a>) -> Result<Option<usize>, GenerationError> {
        let doc = self.doc;
        let output = doc
            .element(graph_name)
            .and_then(|graph| graph.children_of_category(OUTPUT).next());
        let Some(node_name) = output.and_then(|o| o.non_empty_attribute("nodename")) else {
            tracing::warn!("Node graph '{}' has no connected output", graph_name);
            return Ok(None);
        };

        let frame = Frame {
            scope: graph_name.to_string(),
            key_prefix: format!("{}>", spec.key),
            name_prefix: format!("{}_", spec.name),
            interface: Some(spec.inputs.clone()),
        };
        self.build_node_element(&frame, node_name, spec.root).map(Some)
    }

    fn insert_color_transform(
        &mut self,
        frame: &Frame,
        elem: &'a Element,
        index: usize,
        path: &str,
    ) -> Result<usize, GenerationError> {
        let doc = self.doc;
        let reads_file = self.nodes[index]
            .inputs
            .iter()
            .any(|input| input.type_desc == TypeDesc::Filename);
        if !reads_file {
            return Ok(index);
        }
        let Some(source) = color_management::source_color_space(doc, elem) else {
            return Ok(index);
        };
        let output_type = self.nodes[index].output_type.clone();
        let Some(transform) = color_management::transform_node_def(
            doc,
            source,
            &self.options.target_color_space_override,
            &output_type,
            &self.options.target,
        ) else {
            return Ok(index);
        };

        tracing::debug!(
            "Converting {} from {} to {}",
            path,
            source,
            self.options.target_color_space_override
        );
        let base = format!("{}_cm", self.nodes[index].name);
        let name = self.unique_name(&base);
        let cm_path = format!("{path}_{COLOR_SPACE_ATTRIBUTE}");
        let inputs = self.resolve_inputs(frame, Instance::Synthetic, transform, &name, &cm_path, &[("in", index)])?;
        self.add_node(NodeSpec {
            key: format!("{}{}", frame.key_prefix, cm_path),
            name,
            path: cm_path,
            category: transform.attribute("node").unwrap_or_default().to_string(),
            node_def: transform,
            output_type,
            inputs,
            root: false,
        })
    }

    fn resolve_inputs(
        &mut self,
        frame: &Frame,
        instance: Instance<'a>,
        node_def: &'a Element,
        node_name: &str,
        node_path: &str,
        connections: &[(&str, usize)],
    ) -> Result<Vec<ShaderInput>, GenerationError> {
        let mut inputs = Vec::new();
        for def_input in node_def.value_elements() {
            let input_name = def_input.name();
            let type_desc = TypeDesc::from_name(def_input.type_string());

            if let Some((_, index)) = connections.iter().find(|(name, _)| *name == input_name) {
                inputs.push(ShaderInput {
                    name: input_name.to_string(),
                    type_desc,
                    binding: InputBinding::Connection(*index),
                    value: None,
                });
                continue;
            }

            let authored = instance.authored(input_name);
            if let Some(authored) = authored {
                if let Some(input) = self.resolve_connection(frame, authored, input_name, &type_desc)? {
                    inputs.push(input);
                    continue;
                }
            }

            let authored_value = authored.and_then(|a| parse_value(a, &type_desc, node_path));
            let is_authored = authored_value.is_some();
            if !is_authored {
                if let Some(geomprop) = def_input.non_empty_attribute(DEFAULT_GEOM_PROP_ATTRIBUTE) {
                    if let Some(index) = self.build_geomprop(geomprop) {
                        inputs.push(ShaderInput {
                            name: input_name.to_string(),
                            type_desc,
                            binding: InputBinding::Connection(index),
                            value: None,
                        });
                        continue;
                    }
                }
            }

            let value = authored_value
                .or_else(|| parse_value(def_input, &type_desc, node_def.name()))
                .or_else(|| Value::default_for(&type_desc));
            let binding = self.classify(&type_desc, value.as_ref(), is_authored, node_name, input_name, node_path);
            inputs.push(ShaderInput {
                name: input_name.to_string(),
                type_desc,
                binding,
                value,
            });
        }
        Ok(inputs)
    }

    /// Resolve `nodename`, `nodegraph` and `interfacename` references
    fn resolve_connection(
        &mut self,
        frame: &Frame,
        authored: &Element,
        input_name: &str,
        type_desc: &TypeDesc,
    ) -> Result<Option<ShaderInput>, GenerationError> {
        let doc = self.doc;
        let connected = |index| ShaderInput {
            name: input_name.to_string(),
            type_desc: type_desc.clone(),
            binding: InputBinding::Connection(index),
            value: None,
        };

        if let Some(node_name) = authored.non_empty_attribute("nodename") {
            let path = if frame.scope.is_empty() {
                node_name.to_string()
            } else {
                join_path(&frame.scope, node_name)
            };
            if doc.element(&path).is_none() {
                tracing::warn!("Input '{}' references missing node '{}'", input_name, path);
                return Ok(None);
            }
            return self.build_node_element(frame, node_name, false).map(|i| Some(connected(i)));
        }

        if let Some(graph_name) = authored.non_empty_attribute("nodegraph") {
            let output_name = authored.attribute("output").unwrap_or_default();
            let output = doc.element(graph_name).and_then(|graph| {
                graph
                    .children_of_category(OUTPUT)
                    .find(|o| output_name.is_empty() || o.name() == output_name)
            });
            let Some(node_name) = output.and_then(|o| o.non_empty_attribute("nodename")) else {
                tracing::warn!(
                    "Input '{}' references missing output '{}' of '{}'",
                    input_name,
                    output_name,
                    graph_name
                );
                return Ok(None);
            };
            let graph_frame = Frame {
                scope: graph_name.to_string(),
                key_prefix: frame.key_prefix.clone(),
                name_prefix: frame.name_prefix.clone(),
                interface: None,
            };
            return self
                .build_node_element(&graph_frame, node_name, false)
                .map(|i| Some(connected(i)));
        }

        if let Some(interface_name) = authored.non_empty_attribute("interfacename") {
            let outer = frame
                .interface
                .as_ref()
                .and_then(|inputs| inputs.iter().find(|i| i.name == interface_name));
            return match outer {
                Some(outer) => Ok(Some(ShaderInput {
                    name: input_name.to_string(),
                    type_desc: type_desc.clone(),
                    binding: outer.binding.clone(),
                    value: outer.value.clone(),
                })),
                None => {
                    tracing::warn!("Unknown interface name '{}' on '{}'", interface_name, input_name);
                    Ok(None)
                }
            };
        }

        Ok(None)
    }

    /// Decide between a public uniform and an inlined constant
    fn classify(
        &mut self,
        type_desc: &TypeDesc,
        value: Option<&Value>,
        authored: bool,
        node_name: &str,
        input_name: &str,
        node_path: &str,
    ) -> InputBinding {
        if !syntax::is_shader_type(type_desc) || type_desc.is_closure() {
            return InputBinding::Unbound;
        }
        let inline = *type_desc != TypeDesc::Filename
            && self.options.shader_interface == ShaderInterface::Reduced
            && !authored;
        if inline {
            if let Some(value) = value {
                return InputBinding::Constant(value.clone());
            }
        }

        let variable = format!("{}_{}", node_name, syntax::identifier(input_name));
        self.uniforms.add(
            ShaderVariable::new(variable.clone(), type_desc.clone())
                .with_value(value.cloned())
                .with_path(join_path(node_path, input_name)),
        );
        InputBinding::Uniform(variable)
    }

    /// Implicit node reading a geometric property such as `UV0` or `Nworld`
    fn build_geomprop(&mut self, geomprop: &str) -> Option<usize> {
        let (node_def, category, output_type, index) = match geomprop {
            "UV0" => ("ND_texcoord_vector2", "texcoord", TypeDesc::Vector2, 0),
            "UV1" => ("ND_texcoord_vector2", "texcoord", TypeDesc::Vector2, 1),
            "Pobject" | "Pworld" => ("ND_position_vector3", "position", TypeDesc::Vector3, 0),
            "Nobject" | "Nworld" => ("ND_normal_vector3", "normal", TypeDesc::Vector3, 0),
            "Tobject" | "Tworld" => ("ND_tangent_vector3", "tangent", TypeDesc::Vector3, 0),
            other => {
                tracing::warn!("Unknown geometric property '{}'", other);
                return None;
            }
        };

        let key = format!("geomprop:{geomprop}");
        if let Some(&existing) = self.built.get(&key) {
            return Some(existing);
        }
        let Some(implementation) = self.registry.create(node_def, &self.options.target) else {
            tracing::warn!("No implementation of '{}' for geometric property", node_def);
            return None;
        };

        let name = self.unique_name(&format!("geomprop_{geomprop}"));
        let mut inputs = Vec::new();
        if category == "texcoord" {
            inputs.push(ShaderInput {
                name: "index".to_string(),
                type_desc: TypeDesc::Integer,
                binding: InputBinding::Constant(Value::Integer(index)),
                value: Some(Value::Integer(index)),
            });
        }
        self.nodes.push(ShaderNode {
            name,
            path: key.clone(),
            category: category.to_string(),
            node_def: node_def.to_string(),
            output_type,
            inputs,
            implementation: Some(implementation),
        });
        let index = self.nodes.len() - 1;
        self.built.insert(key, index);
        Some(index)
    }

    fn unique_name(&mut self, base: &str) -> String {
        let base = syntax::identifier(base);
        let mut name = base.clone();
        let mut counter = 1;
        while self.names.contains(&name) {
            name = format!("{base}{counter}");
            counter += 1;
        }
        self.names.insert(name.clone());
        name
    }
}

fn parse_value(elem: &Element, type_desc: &TypeDesc, context: &str) -> Option<Value> {
    let text = elem.value_string()?;
    match Value::parse(type_desc, text) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring value of '{}' on {}: {}", elem.name(), context, e);
            None
        }
    }
}
