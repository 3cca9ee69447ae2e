//! Canonical graph state.
//!
//! [`GraphStore`] holds the live nodes and connections. It is pure data with
//! lookup helpers: the connection protocol lives in the router, structural
//! rewrites in the compiler/expander, and undo bookkeeping in the history
//! manager. Iteration order is stable insertion order, which downstream
//! passes rely on for deterministic output.

use indexmap::IndexMap;
use thiserror::Error;

use crate::model::{Connection, Node};

/// Rejections from the store's insertion boundary.
///
/// Uniqueness is enforced here, at the single point where ids enter the
/// graph; there is no background deduplication pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("node id `{0}` already exists")]
    DuplicateNodeId(String),
    #[error("connection id `{0}` already exists")]
    DuplicateConnectionId(String),
    #[error("a connection from `{source_node_id}.{source_port}` to `{target_node_id}.{target_port}` already exists")]
    DuplicateConnection {
        source_node_id: String,
        source_port: String,
        target_node_id: String,
        target_port: String,
    },
    #[error("node `{0}` not found")]
    NodeNotFound(String),
    #[error("port `{port}` not found on node `{node}`")]
    PortNotFound { node: String, port: String },
}

/// Mutable collection of nodes and connections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphStore {
    nodes: IndexMap<String, Node>,
    connections: IndexMap<String, Connection>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Nodes ===

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Mutable access to a node. Callers that change declared ports are
    /// responsible for keeping live connections consistent.
    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Iterate nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Insert a node, rejecting a colliding id.
    pub fn insert_node(&mut self, node: Node) -> Result<(), StoreError> {
        if self.nodes.contains_key(&node.id) {
            return Err(StoreError::DuplicateNodeId(node.id));
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Remove a node by id. Touching connections are not cascaded; callers
    /// decide what a delete means (see `GraphController::delete_node`).
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        self.nodes.shift_remove(id)
    }

    // === Connections ===

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn contains_connection(&self, id: &str) -> bool {
        self.connections.contains_key(id)
    }

    pub fn connection(&self, id: &str) -> Option<&Connection> {
        self.connections.get(id)
    }

    /// Iterate connections in insertion order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Whether a connection with this exact endpoint tuple exists.
    pub fn has_connection_between(
        &self,
        source_node_id: &str,
        source_port: &str,
        target_node_id: &str,
        target_port: &str,
    ) -> bool {
        self.connections.values().any(|c| {
            c.endpoint_key() == (source_node_id, source_port, target_node_id, target_port)
        })
    }

    /// Connections that have either endpoint on the given node.
    pub fn connections_touching<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = &'a Connection> {
        self.connections.values().filter(move |c| c.touches(node_id))
    }

    /// Ids of connections touching the given node, collected for callers
    /// that go on to mutate the store.
    pub fn connection_ids_touching(&self, node_id: &str) -> Vec<String> {
        self.connections_touching(node_id)
            .map(|c| c.id.clone())
            .collect()
    }

    /// Insert a connection, rejecting a colliding id, a duplicate endpoint
    /// tuple, or an endpoint whose node or port does not exist.
    pub fn insert_connection(&mut self, connection: Connection) -> Result<(), StoreError> {
        if self.connections.contains_key(&connection.id) {
            return Err(StoreError::DuplicateConnectionId(connection.id));
        }
        if self.has_connection_between(
            &connection.source_node_id,
            &connection.source_port,
            &connection.target_node_id,
            &connection.target_port,
        ) {
            return Err(StoreError::DuplicateConnection {
                source_node_id: connection.source_node_id,
                source_port: connection.source_port,
                target_node_id: connection.target_node_id,
                target_port: connection.target_port,
            });
        }
        self.require_port(&connection.source_node_id, &connection.source_port)?;
        self.require_port(&connection.target_node_id, &connection.target_port)?;
        self.connections.insert(connection.id.clone(), connection);
        Ok(())
    }

    pub fn remove_connection(&mut self, id: &str) -> Option<Connection> {
        self.connections.shift_remove(id)
    }

    fn require_port(&self, node_id: &str, port_id: &str) -> Result<(), StoreError> {
        let node = self
            .nodes
            .get(node_id)
            .ok_or_else(|| StoreError::NodeNotFound(node_id.to_string()))?;
        if node.has_port(port_id) {
            Ok(())
        } else {
            Err(StoreError::PortNotFound {
                node: node_id.to_string(),
                port: port_id.to_string(),
            })
        }
    }
}
