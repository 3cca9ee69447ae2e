//! Core data types for the graph engine.
//!
//! Nodes, ports, and connections are plain serializable data: the engine
//! never attaches behavior to them. Field shapes follow the editor's
//! interchange format, so a persistence collaborator can round-trip
//! documents without any mapping layer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mint a fresh, globally unique id with a readable prefix.
///
/// Used for connections, remapped nodes, groups, and component definitions.
/// Synthesized component *port* ids are deliberately not minted this way;
/// they are deterministic (`in-k`/`out-k`) so a re-extracted interface is
/// stable.
pub fn fresh_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

/// A point in canvas-local space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// This position shifted by a delta.
    pub fn translated(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Node dimensions in canvas units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Which side of a node a port sits on.
///
/// Role is determined solely by which declared list (`inputs` or `outputs`)
/// contains the port. It is never inferred from the port's id or label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortRole {
    Input,
    Output,
}

/// A connection endpoint declared on a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    pub label: String,
}

impl Port {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Type-specific payload of a node.
///
/// Every node declares its ports here; group nodes additionally carry their
/// member ids and component instances carry the id of their definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    /// Display name shown in the editor header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub inputs: Vec<Port>,
    #[serde(default)]
    pub outputs: Vec<Port>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    /// Member node ids; present only on group nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_node_ids: Option<Vec<String>>,
    /// Definition reference; present only on component instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
}

/// A graph vertex: typed, positioned, with declared ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    /// Node type tag, e.g. `"input"`, `"group"`, `"component"`.
    #[serde(rename = "type")]
    pub kind: String,
    pub position: Position,
    #[serde(default)]
    pub data: NodeData,
}

impl Node {
    /// Create a node with empty data.
    pub fn new(id: impl Into<String>, kind: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            position,
            data: NodeData::default(),
        }
    }

    /// Builder-style: set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.data.name = Some(name.into());
        self
    }

    /// Builder-style: declare the input and output port lists.
    pub fn with_ports(mut self, inputs: Vec<Port>, outputs: Vec<Port>) -> Self {
        self.data.inputs = inputs;
        self.data.outputs = outputs;
        self
    }

    /// Builder-style: set explicit dimensions.
    pub fn with_size(mut self, size: Size) -> Self {
        self.data.size = Some(size);
        self
    }

    /// The name shown for this node, falling back to its type tag.
    pub fn display_name(&self) -> &str {
        self.data.name.as_deref().unwrap_or(&self.kind)
    }

    /// Classify a port by declared list membership.
    ///
    /// A port declared in `outputs` is `Output`; otherwise a port declared
    /// in `inputs` is `Input`; an undeclared id is `None`.
    pub fn port_role(&self, port_id: &str) -> Option<PortRole> {
        if self.data.outputs.iter().any(|p| p.id == port_id) {
            Some(PortRole::Output)
        } else if self.data.inputs.iter().any(|p| p.id == port_id) {
            Some(PortRole::Input)
        } else {
            None
        }
    }

    /// Whether the node declares this port on either side.
    pub fn has_port(&self, port_id: &str) -> bool {
        self.port_role(port_id).is_some()
    }

    /// Look up a declared port by id, searching outputs first.
    pub fn port(&self, port_id: &str) -> Option<&Port> {
        self.data
            .outputs
            .iter()
            .chain(self.data.inputs.iter())
            .find(|p| p.id == port_id)
    }
}

/// A directed edge from one node's port to another's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub source_node_id: String,
    pub source_port: String,
    pub target_node_id: String,
    pub target_port: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_dashed: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_ghost: bool,
}

impl Connection {
    pub fn new(
        id: impl Into<String>,
        source_node_id: impl Into<String>,
        source_port: impl Into<String>,
        target_node_id: impl Into<String>,
        target_port: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_node_id: source_node_id.into(),
            source_port: source_port.into(),
            target_node_id: target_node_id.into(),
            target_port: target_port.into(),
            is_dashed: false,
            is_ghost: false,
        }
    }

    /// The endpoint tuple that defines connection identity for the
    /// duplicate guard.
    pub fn endpoint_key(&self) -> (&str, &str, &str, &str) {
        (
            &self.source_node_id,
            &self.source_port,
            &self.target_node_id,
            &self.target_port,
        )
    }

    /// Whether either endpoint references the given node.
    pub fn touches(&self, node_id: &str) -> bool {
        self.source_node_id == node_id || self.target_node_id == node_id
    }
}
