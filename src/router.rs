//! The connection protocol and its drag session.
//!
//! [`ConnectionRouter`] owns the single in-flight drag (`Idle → Dragging →
//! Idle`) and enforces the connection rules when a drag completes:
//!
//! 1. Both endpoints are classified by declared list membership.
//! 2. Two ports of the same role never connect.
//! 3. Direction is normalized so the source is always the output-role
//!    endpoint, regardless of which end the drag started on.
//! 4. A connection identical to an existing one is rejected.
//! 5. The new connection commits through the history manager; if the target
//!    node has elastic arity, a fresh input slot is appended in the same
//!    transaction.
//!
//! Rejections are local: the gesture ends, the store is untouched, and the
//! caller decides whether the error is worth surfacing (the controller logs
//! it and moves on).

use thiserror::Error;
use tracing::debug;

use crate::catalog::NodeCatalog;
use crate::history::HistoryManager;
use crate::model::{fresh_id, Connection, Node, Port, PortRole, Position};
use crate::store::StoreError;

/// Why a connection gesture was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("no connection drag in progress")]
    NoActiveDrag,
    #[error("node `{0}` not found")]
    NodeNotFound(String),
    #[error("port `{port}` not found on node `{node}`")]
    PortNotFound { node: String, port: String },
    #[error("both ports share the {0:?} role")]
    SameRole(PortRole),
    #[error("an identical connection already exists")]
    DuplicateConnection,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The in-flight drag: where it started and where the pointer is now,
/// in canvas-local space.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub node_id: String,
    pub port_id: String,
    /// Role of the port the drag started on, classified once at start.
    pub role: PortRole,
    pub pointer: Position,
}

/// Validates, normalizes, creates, and removes connections.
#[derive(Debug, Default)]
pub struct ConnectionRouter {
    drag: Option<DragSession>,
}

impl ConnectionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current drag session, if any.
    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Begin a drag from a port. `pointer` must already be in canvas-local
    /// space (the controller applies the viewport transform).
    ///
    /// Only one drag session exists at a time; starting a new one replaces
    /// a leftover session.
    pub fn start_connection(
        &mut self,
        history: &HistoryManager,
        node_id: &str,
        port_id: &str,
        pointer: Position,
    ) -> Result<(), ConnectError> {
        let node = history
            .store()
            .node(node_id)
            .ok_or_else(|| ConnectError::NodeNotFound(node_id.to_string()))?;
        let role = node.port_role(port_id).ok_or_else(|| ConnectError::PortNotFound {
            node: node_id.to_string(),
            port: port_id.to_string(),
        })?;
        if self.drag.is_some() {
            debug!("start_connection: replacing leftover drag session");
        }
        self.drag = Some(DragSession {
            node_id: node_id.to_string(),
            port_id: port_id.to_string(),
            role,
            pointer,
        });
        Ok(())
    }

    /// Track pointer movement during a drag. No-op when idle.
    pub fn update_pointer(&mut self, pointer: Position) {
        if let Some(drag) = &mut self.drag {
            drag.pointer = pointer;
        }
    }

    /// Abort the drag without mutating the store. Releasing over empty
    /// canvas routes here.
    pub fn cancel_connection(&mut self) {
        self.drag = None;
    }

    /// Finish the drag on a target port.
    ///
    /// On success the created connection is returned; on any rejection the
    /// gesture ends with the store untouched.
    pub fn complete_connection<C: NodeCatalog>(
        &mut self,
        history: &mut HistoryManager,
        catalog: &C,
        target_node_id: &str,
        target_port: &str,
    ) -> Result<Connection, ConnectError> {
        let drag = self.drag.take().ok_or(ConnectError::NoActiveDrag)?;

        let store = history.store();
        let target = store
            .node(target_node_id)
            .ok_or_else(|| ConnectError::NodeNotFound(target_node_id.to_string()))?;
        let target_role =
            target
                .port_role(target_port)
                .ok_or_else(|| ConnectError::PortNotFound {
                    node: target_node_id.to_string(),
                    port: target_port.to_string(),
                })?;

        if target_role == drag.role {
            debug!(role = ?drag.role, "complete_connection: both endpoints share a role");
            return Err(ConnectError::SameRole(target_role));
        }

        // Role decides polarity, not gesture order: the output-role endpoint
        // becomes the source.
        let (source_node, source_port, sink_node, sink_port) = match drag.role {
            PortRole::Output => (
                drag.node_id,
                drag.port_id,
                target_node_id.to_string(),
                target_port.to_string(),
            ),
            PortRole::Input => (
                target_node_id.to_string(),
                target_port.to_string(),
                drag.node_id,
                drag.port_id,
            ),
        };

        if store.has_connection_between(&source_node, &source_port, &sink_node, &sink_port) {
            debug!("complete_connection: identical connection exists");
            return Err(ConnectError::DuplicateConnection);
        }

        let grow_sink = store
            .node(&sink_node)
            .is_some_and(|n| catalog.is_elastic(&n.kind));

        let connection = Connection::new(
            fresh_id("conn"),
            source_node,
            source_port,
            sink_node.clone(),
            sink_port,
        );

        let created = history.transact(|store| -> Result<Connection, StoreError> {
            store.insert_connection(connection.clone())?;
            if grow_sink {
                if let Some(node) = store.node_mut(&sink_node) {
                    let slot = next_input_slot(node);
                    node.data.inputs.push(slot);
                }
            }
            Ok(connection)
        })?;
        Ok(created)
    }

    /// Remove a connection by id. No cascade; unknown ids are a reported
    /// no-op so the undo stack stays clean.
    pub fn delete_connection(
        &self,
        history: &mut HistoryManager,
        id: &str,
    ) -> Option<Connection> {
        if !history.store().contains_connection(id) {
            debug!(%id, "delete_connection: unknown id");
            return None;
        }
        history.transact(|store| store.remove_connection(id))
    }
}

/// First free `in-k` slot on a node, with an ordinal label.
fn next_input_slot(node: &Node) -> Port {
    let mut k = node.data.inputs.len();
    while node.has_port(&format!("in-{k}")) {
        k += 1;
    }
    Port::new(format!("in-{k}"), format!("Input {}", k + 1))
}
