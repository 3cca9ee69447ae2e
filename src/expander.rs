//! Restoring a component instance back into its constituent nodes.
//!
//! [`ComponentExpander::expand`] is the inverse of the compiler: it clones
//! the definition's internal subgraph (definitions are immutable; expansion
//! copies on read), remaps ids that would collide with live nodes, places
//! everything relative to the instance's position, resolves each connection
//! touching the instance through its recorded binding, and wraps the result
//! in a synthesized group. The whole replacement commits as one history
//! transaction.

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::{kinds, NodeCatalog};
use crate::compiler::group_node;
use crate::history::HistoryManager;
use crate::model::{fresh_id, Connection, Node, Position, Size};
use crate::registry::ComponentRegistry;
use crate::store::StoreError;

/// Padding between the restored nodes' bounding box and the group frame.
const GROUP_PADDING: f32 = 40.0;
/// Extra allowance at the top of the frame for the group header.
const GROUP_HEADER: f32 = 36.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    #[error("component instance `{0}` not found")]
    InstanceNotFound(String),
    #[error("node `{0}` is not a component instance")]
    NotAComponent(String),
    #[error("instance `{instance}` references unknown definition `{definition}`")]
    UnknownDefinition { instance: String, definition: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Restores a component instance into `{group, internal nodes}`.
pub struct ComponentExpander<'a, C: NodeCatalog> {
    registry: &'a ComponentRegistry,
    catalog: &'a C,
}

impl<'a, C: NodeCatalog> ComponentExpander<'a, C> {
    pub fn new(registry: &'a ComponentRegistry, catalog: &'a C) -> Self {
        Self { registry, catalog }
    }

    /// Replace the instance with its restored subgraph. Returns the id of
    /// the synthesized enclosing group.
    ///
    /// An unresolved definition aborts before any mutation; a touching
    /// connection whose port has no binding is dropped, not fatal.
    pub fn expand(
        &self,
        history: &mut HistoryManager,
        instance_id: &str,
    ) -> Result<String, ExpandError> {
        let store = history.store();
        let instance = store
            .node(instance_id)
            .ok_or_else(|| ExpandError::InstanceNotFound(instance_id.to_string()))?;
        if !self.catalog.is_component(&instance.kind) {
            return Err(ExpandError::NotAComponent(instance_id.to_string()));
        }
        let definition_id = instance.data.component_id.clone().unwrap_or_default();
        let definition =
            self.registry
                .definition(&definition_id)
                .ok_or_else(|| ExpandError::UnknownDefinition {
                    instance: instance_id.to_string(),
                    definition: definition_id.clone(),
                })?;

        // Old -> new id map, valid for this call only. Ids are remapped only
        // when the same definition is already instantiated elsewhere.
        let mut id_map: IndexMap<String, String> = IndexMap::new();
        for node in &definition.internal_nodes {
            let new_id = if store.contains_node(&node.id) {
                fresh_id("node")
            } else {
                node.id.clone()
            };
            id_map.insert(node.id.clone(), new_id);
        }

        let delta = (
            instance.position.x - definition.origin.x,
            instance.position.y - definition.origin.y,
        );

        let restored: Vec<Node> = definition
            .internal_nodes
            .iter()
            .map(|node| {
                let mut node = node.clone();
                node.id = id_map[&node.id].clone();
                node.position = node.position.translated(delta.0, delta.1);
                node
            })
            .collect();

        let mut internal: Vec<Connection> = Vec::new();
        for conn in &definition.internal_connections {
            let (Some(source), Some(target)) = (
                id_map.get(&conn.source_node_id),
                id_map.get(&conn.target_node_id),
            ) else {
                warn!(connection = %conn.id, "expand: internal connection references a node outside the snapshot");
                continue;
            };
            let mut conn = conn.clone();
            conn.id = fresh_id("conn");
            conn.source_node_id = source.clone();
            conn.target_node_id = target.clone();
            internal.push(conn);
        }

        // Resolve every live connection touching the instance through its
        // binding. Both ends of an instance self-loop are rewritten.
        let mut rewired: Vec<Connection> = Vec::new();
        let mut dropped: Vec<String> = Vec::new();
        for conn in store.connections().filter(|c| c.touches(instance_id)) {
            let mut conn = conn.clone();
            let mut ok = true;
            if conn.source_node_id == instance_id {
                match definition
                    .output_binding(&conn.source_port)
                    .and_then(|b| id_map.get(&b.node_id).map(|id| (id.clone(), b.port_id.clone())))
                {
                    Some((node, port)) => {
                        conn.source_node_id = node;
                        conn.source_port = port;
                    }
                    None => ok = false,
                }
            }
            if ok && conn.target_node_id == instance_id {
                match definition
                    .input_binding(&conn.target_port)
                    .and_then(|b| id_map.get(&b.node_id).map(|id| (id.clone(), b.port_id.clone())))
                {
                    Some((node, port)) => {
                        conn.target_node_id = node;
                        conn.target_port = port;
                    }
                    None => ok = false,
                }
            }
            if ok {
                rewired.push(conn);
            } else {
                warn!(connection = %conn.id, "expand: no binding for connection port; dropping");
                dropped.push(conn.id);
            }
        }

        let (group_position, group_size) =
            group_frame(self.catalog, restored.iter(), instance.position);
        let group = group_node(
            fresh_id("group"),
            Some(definition.name.clone()),
            group_position,
            group_size,
            id_map.values().cloned().collect(),
        );
        let group_id = group.id.clone();

        history.transact(|store| -> Result<(), StoreError> {
            for node in restored {
                store.insert_node(node)?;
            }
            store.insert_node(group)?;
            for conn in internal {
                if let Err(err) = store.insert_connection(conn) {
                    warn!(error = %err, "expand: skipping internal connection");
                }
            }
            for conn in rewired {
                store.remove_connection(&conn.id);
                if let Err(err) = store.insert_connection(conn) {
                    warn!(error = %err, "expand: skipping rebound connection");
                }
            }
            for id in &dropped {
                store.remove_connection(id);
            }
            store.remove_node(instance_id);
            Ok(())
        })?;

        info!(
            instance = %instance_id,
            definition = %definition_id,
            group = %group_id,
            "expanded component into group"
        );
        Ok(group_id)
    }
}

/// Frame for a group that should enclose the given nodes: their axis-aligned
/// bounding box (explicit node size, else the catalog's per-kind default)
/// grown by padding and a header allowance. Empty input falls back to a
/// default-sized frame at `fallback`.
pub(crate) fn group_frame<'a, C, I>(catalog: &C, nodes: I, fallback: Position) -> (Position, Size)
where
    C: NodeCatalog,
    I: IntoIterator<Item = &'a Node>,
{
    let mut bounds: Option<(f32, f32, f32, f32)> = None;
    for node in nodes {
        let size = node
            .data
            .size
            .unwrap_or_else(|| catalog.default_size(&node.kind));
        let (x0, y0) = (node.position.x, node.position.y);
        let (x1, y1) = (x0 + size.width, y0 + size.height);
        bounds = Some(match bounds {
            None => (x0, y0, x1, y1),
            Some((bx0, by0, bx1, by1)) => (bx0.min(x0), by0.min(y0), bx1.max(x1), by1.max(y1)),
        });
    }
    match bounds {
        Some((x0, y0, x1, y1)) => (
            Position::new(x0 - GROUP_PADDING, y0 - GROUP_PADDING - GROUP_HEADER),
            Size::new(
                (x1 - x0) + 2.0 * GROUP_PADDING,
                (y1 - y0) + 2.0 * GROUP_PADDING + GROUP_HEADER,
            ),
        ),
        None => (fallback, catalog.default_size(kinds::GROUP)),
    }
}
