//! Graph data model: nodes, ports, connections and the definitions that
//! nodes are created from.
//!
//! Everything here is plain data with JSON-shaped serde derives; the
//! invariants between these types are enforced by [`GraphStore`](crate::GraphStore).

use crate::error::GraphError;
use crate::viewport::{Position, Rect, Size, Viewport};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// A fresh random id.
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Unique identifier of a node in a graph.
    NodeId
);
string_id!(
    /// Identifier of a port, unique within its node.
    PortId
);
string_id!(
    /// Unique identifier of a connection in a graph.
    ConnectionId
);

/// Direction of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    Input,
    Output,
}

impl PortKind {
    pub fn opposite(self) -> Self {
        match self {
            PortKind::Input => PortKind::Output,
            PortKind::Output => PortKind::Input,
        }
    }
}

/// Data type carried by a port.
///
/// `Any` is compatible with every other type; all other types only match
/// themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    #[default]
    Any,
    Custom(String),
}

impl DataType {
    pub fn is_compatible_with(&self, other: &DataType) -> bool {
        matches!(self, DataType::Any) || matches!(other, DataType::Any) || self == other
    }

    pub fn as_str(&self) -> &str {
        match self {
            DataType::String => "string",
            DataType::Number => "number",
            DataType::Boolean => "boolean",
            DataType::Object => "object",
            DataType::Array => "array",
            DataType::Any => "any",
            DataType::Custom(name) => name,
        }
    }
}

impl From<String> for DataType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "string" => DataType::String,
            "number" => DataType::Number,
            "boolean" => DataType::Boolean,
            "object" => DataType::Object,
            "array" => DataType::Array,
            "any" => DataType::Any,
            _ => DataType::Custom(s),
        }
    }
}

impl From<&str> for DataType {
    fn from(s: &str) -> Self {
        DataType::from(s.to_owned())
    }
}

impl From<DataType> for String {
    fn from(t: DataType) -> Self {
        match t {
            DataType::Custom(name) => name,
            other => other.as_str().to_owned(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed connection endpoint on a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePort {
    pub id: PortId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PortKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    /// Maintained by the graph store.
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub optional: bool,
    /// Input ports only: accept more than one incoming connection.
    #[serde(default)]
    pub multiple: bool,
}

impl NodePort {
    pub fn input(id: impl Into<PortId>, name: impl Into<String>) -> Self {
        Self::new(id.into(), name.into(), PortKind::Input)
    }

    pub fn output(id: impl Into<PortId>, name: impl Into<String>) -> Self {
        Self::new(id.into(), name.into(), PortKind::Output)
    }

    fn new(id: PortId, name: String, kind: PortKind) -> Self {
        Self {
            id,
            name,
            kind,
            data_type: None,
            connected: false,
            optional: false,
            multiple: false,
        }
    }

    pub fn with_data_type(mut self, data_type: impl Into<DataType>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    pub fn allow_multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Effective data type; an untyped port behaves as `any`.
    pub fn effective_type(&self) -> DataType {
        self.data_type.clone().unwrap_or(DataType::Any)
    }
}

/// Open key/value payload of a node. `name` is the only required key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NodeData {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    pub data: NodeData,
    #[serde(default)]
    pub inputs: Vec<NodePort>,
    #[serde(default)]
    pub outputs: Vec<NodePort>,
    #[serde(default)]
    pub is_expanded: bool,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub z_index: i32,
}

impl Node {
    /// World-space bounding box, using `default_size` when the node has none.
    pub fn bounds(&self, default_size: Size) -> Rect {
        Rect::from_origin_size(self.position, self.size.unwrap_or(default_size))
    }

    pub fn port(&self, id: &PortId) -> Option<&NodePort> {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .find(|p| &p.id == id)
    }

    pub(crate) fn port_mut(&mut self, id: &PortId) -> Option<&mut NodePort> {
        self.inputs
            .iter_mut()
            .chain(self.outputs.iter_mut())
            .find(|p| &p.id == id)
    }

    pub fn ports(&self) -> impl Iterator<Item = &NodePort> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// Index of a port among the ports of the same kind, with the count of that kind.
    pub(crate) fn port_slot(&self, id: &PortId) -> Option<(PortKind, usize, usize)> {
        if let Some(i) = self.inputs.iter().position(|p| &p.id == id) {
            return Some((PortKind::Input, i, self.inputs.len()));
        }
        self.outputs
            .iter()
            .position(|p| &p.id == id)
            .map(|i| (PortKind::Output, i, self.outputs.len()))
    }

    pub(crate) fn check_port_ids(&self) -> Result<(), GraphError> {
        let mut seen = HashSet::new();
        for port in self.ports() {
            if !seen.insert(&port.id) {
                return Err(GraphError::DuplicatePortId {
                    node: self.id.clone(),
                    port: port.id.clone(),
                });
            }
        }
        Ok(())
    }
}

/// A node that has not been inserted yet. `id` is generated when absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    #[serde(rename = "type")]
    pub node_type: String,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    pub data: NodeData,
    #[serde(default)]
    pub inputs: Vec<NodePort>,
    #[serde(default)]
    pub outputs: Vec<NodePort>,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub z_index: i32,
}

impl NewNode {
    pub fn new(node_type: impl Into<String>, name: impl Into<String>, position: Position) -> Self {
        Self {
            node_type: node_type.into(),
            position,
            data: NodeData::named(name),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = Some(Size::new(width, height));
        self
    }

    pub fn with_input(mut self, port: NodePort) -> Self {
        self.inputs.push(port);
        self
    }

    pub fn with_output(mut self, port: NodePort) -> Self {
        self.outputs.push(port);
        self
    }

    pub fn locked(mut self) -> Self {
        self.is_locked = true;
        self
    }

    pub(crate) fn into_node(self, id: NodeId) -> Node {
        let reset = |ports: Vec<NodePort>| {
            ports
                .into_iter()
                .map(|p| NodePort { connected: false, ..p })
                .collect()
        };
        Node {
            id,
            node_type: self.node_type,
            position: self.position,
            size: self.size,
            data: self.data,
            inputs: reset(self.inputs),
            outputs: reset(self.outputs),
            is_expanded: false,
            is_locked: self.is_locked,
            is_hidden: false,
            z_index: self.z_index,
        }
    }
}

/// Partial node update. Absent fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeUpdate {
    pub position: Option<Position>,
    pub size: Option<Option<Size>>,
    pub data: Option<NodeData>,
    pub inputs: Option<Vec<NodePort>>,
    pub outputs: Option<Vec<NodePort>>,
    pub is_expanded: Option<bool>,
    pub is_locked: Option<bool>,
    pub is_hidden: Option<bool>,
    pub z_index: Option<i32>,
}

impl NodeUpdate {
    pub fn position(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }
}

/// Route style of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStyle {
    #[default]
    Bezier,
    Straight,
    Step,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_port: Option<PortId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<PortId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ConnectionStyle>,
}

impl Connection {
    pub fn references(&self, node: &NodeId) -> bool {
        &self.source == node || &self.target == node
    }

    /// Effective style, bezier when unset.
    pub fn style_or(&self, default: ConnectionStyle) -> ConnectionStyle {
        self.style.unwrap_or(default)
    }
}

/// A connection request, before validation and id assignment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewConnection {
    pub source: NodeId,
    pub source_port: Option<PortId>,
    pub target: NodeId,
    pub target_port: Option<PortId>,
    pub label: Option<String>,
    pub style: Option<ConnectionStyle>,
}

impl NewConnection {
    pub fn between(
        source: impl Into<NodeId>,
        source_port: impl Into<PortId>,
        target: impl Into<NodeId>,
        target_port: impl Into<PortId>,
    ) -> Self {
        Self {
            source: source.into(),
            source_port: Some(source_port.into()),
            target: target.into(),
            target_port: Some(target_port.into()),
            ..Default::default()
        }
    }

    /// Node-level connection without ports.
    pub fn nodes(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_style(mut self, style: ConnectionStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub(crate) fn into_connection(self, id: ConnectionId) -> Connection {
        Connection {
            id,
            source: self.source,
            target: self.target,
            source_port: self.source_port,
            target_port: self.target_port,
            label: self.label,
            style: self.style,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDefinition {
    pub id: PortId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub multiple: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub required: bool,
}

/// Template a node is created from (palette entry, marketplace item).
///
/// Only used to populate a new node's data and ports; parameter semantics
/// are not interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub inputs: Vec<PortDefinition>,
    #[serde(default)]
    pub outputs: Vec<PortDefinition>,
    #[serde(default)]
    pub parameters: Vec<ParameterDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_size: Option<Size>,
}

impl NodeDefinition {
    /// Build a [`NewNode`] at `position`, validating the required keys.
    pub fn instantiate(&self, position: Position) -> Result<NewNode, GraphError> {
        let invalid = |reason: String| GraphError::InvalidDefinition {
            definition: self.id.clone(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("definition id is empty".into()));
        }
        if self.name.trim().is_empty() {
            return Err(invalid("name is empty".into()));
        }

        let mut parameters = serde_json::Map::new();
        for param in &self.parameters {
            match (&param.default, param.required) {
                (Some(value), _) => {
                    parameters.insert(param.name.clone(), value.clone());
                }
                (None, true) => {
                    return Err(invalid(format!(
                        "required parameter `{}` has no default",
                        param.name
                    )));
                }
                (None, false) => {}
            }
        }

        let to_ports = |defs: &[PortDefinition], kind: PortKind| -> Result<Vec<NodePort>, GraphError> {
            let mut seen = HashSet::new();
            defs.iter()
                .map(|d| {
                    if !seen.insert(&d.id) {
                        return Err(invalid(format!("duplicate port id `{}`", d.id)));
                    }
                    Ok(NodePort {
                        id: d.id.clone(),
                        name: d.name.clone(),
                        kind,
                        data_type: d.data_type.clone(),
                        connected: false,
                        optional: d.optional,
                        multiple: d.multiple,
                    })
                })
                .collect()
        };

        let mut data = NodeData::named(self.name.clone());
        data.description = self.description.clone();
        if !self.category.is_empty() {
            data.extra
                .insert("category".into(), serde_json::Value::String(self.category.clone()));
        }
        data.extra
            .insert("parameters".into(), serde_json::Value::Object(parameters));

        Ok(NewNode {
            id: None,
            node_type: self.id.clone(),
            position,
            size: self.default_size,
            data,
            inputs: to_ports(&self.inputs, PortKind::Input)?,
            outputs: to_ports(&self.outputs, PortKind::Output)?,
            is_locked: false,
            z_index: 0,
        })
    }
}

/// Payload carried by a drag from the external node palette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DropPayload {
    Node { node: NodeDefinition },
}

impl DropPayload {
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Serializable snapshot of a graph, used for template save/load.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
}
