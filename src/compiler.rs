//! Folding a group into a component instance.
//!
//! [`ComponentCompiler::compile`] replaces a group and its members with one
//! opaque component node whose port interface is synthesized in two passes:
//! boundary-role members first (each relevant socket becomes a candidate
//! port), then any external connection whose internal endpoint is still
//! uncovered. Every synthesized port records a binding back to the internal
//! endpoint it stands for, external wiring is rewritten onto the instance,
//! and the folded subgraph is snapshotted into the registry as an immutable
//! definition.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{kinds, NodeCatalog};
use crate::history::HistoryManager;
use crate::model::{fresh_id, Connection, Node, Port, PortRole, Position, Size};
use crate::registry::{ComponentDefinition, ComponentRegistry, PortBinding, RegistryError};
use crate::store::{GraphStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("group `{0}` not found")]
    GroupNotFound(String),
    #[error("node `{0}` is not a group")]
    NotAGroup(String),
    #[error("folding would recurse through component definition `{0}`")]
    RecursiveComponent(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Extracts a node group into an opaque component instance.
pub struct ComponentCompiler<'a, C: NodeCatalog> {
    registry: &'a mut ComponentRegistry,
    catalog: &'a C,
}

impl<'a, C: NodeCatalog> ComponentCompiler<'a, C> {
    pub fn new(registry: &'a mut ComponentRegistry, catalog: &'a C) -> Self {
        Self { registry, catalog }
    }

    /// Fold the group's members into a single component instance.
    ///
    /// Publishes the definition, then replaces `{group, members}` with the
    /// instance and rewires external connections in one history
    /// transaction. Returns the instance's node id.
    pub fn compile(
        &mut self,
        history: &mut HistoryManager,
        group_id: &str,
    ) -> Result<String, CompileError> {
        let plan = self.plan(history.store(), group_id)?;

        if plan.members.is_empty() {
            debug!(%group_id, "compile: folding an empty group");
        }
        for id in &plan.dropped_connections {
            warn!(connection = %id, "compile: dropping connection wired to the group container");
        }

        let definition_id = plan.definition.id.clone();
        let instance_id = plan.instance.id.clone();
        let port_count = (
            plan.definition.input_ports.len(),
            plan.definition.output_ports.len(),
        );
        self.registry.publish(plan.definition)?;

        history.transact(|store| -> Result<(), StoreError> {
            store.insert_node(plan.instance)?;
            for conn in &plan.rewired {
                store.remove_connection(&conn.id);
                store.insert_connection(conn.clone())?;
            }
            for id in &plan.dropped_connections {
                store.remove_connection(id);
            }
            for conn in &plan.internal {
                store.remove_connection(&conn.id);
            }
            for id in &plan.members {
                store.remove_node(id);
            }
            store.remove_node(group_id);
            Ok(())
        })?;

        info!(
            %group_id,
            instance = %instance_id,
            definition = %definition_id,
            inputs = port_count.0,
            outputs = port_count.1,
            "compiled group into component"
        );
        Ok(instance_id)
    }

    /// Read phase: everything the transaction needs, cloned out of the
    /// store so the write phase owns its inputs.
    fn plan(&self, store: &GraphStore, group_id: &str) -> Result<CompilePlan, CompileError> {
        let group = store
            .node(group_id)
            .ok_or_else(|| CompileError::GroupNotFound(group_id.to_string()))?;
        if !self.catalog.is_group(&group.kind) {
            return Err(CompileError::NotAGroup(group_id.to_string()));
        }

        let mut members: Vec<String> = Vec::new();
        for id in group.data.child_node_ids.as_deref().unwrap_or_default() {
            if store.contains_node(id) {
                members.push(id.clone());
            } else {
                warn!(member = %id, "compile: group member does not exist; skipping");
            }
        }
        let member_set: HashSet<&str> = members.iter().map(String::as_str).collect();

        let reference_roots: Vec<&str> = members
            .iter()
            .filter_map(|id| store.node(id).and_then(|n| n.data.component_id.as_deref()))
            .collect();
        if let Some(hit) = self.registry.find_recursion(reference_roots.iter().copied()) {
            return Err(CompileError::RecursiveComponent(hit));
        }

        // Partition the wiring. Connections touching the group container
        // itself cannot survive its removal and are dropped.
        let mut internal: Vec<Connection> = Vec::new();
        let mut external: Vec<Connection> = Vec::new();
        let mut dropped_connections: Vec<String> = Vec::new();
        for conn in store.connections() {
            if conn.touches(group_id) {
                dropped_connections.push(conn.id.clone());
                continue;
            }
            let source_inside = member_set.contains(conn.source_node_id.as_str());
            let target_inside = member_set.contains(conn.target_node_id.as_str());
            match (source_inside, target_inside) {
                (true, true) => internal.push(conn.clone()),
                (true, false) | (false, true) => external.push(conn.clone()),
                (false, false) => {}
            }
        }

        // Pass 1: boundary-role members. Source-like kinds expose their
        // output sockets as component inputs; sink-like kinds expose their
        // input sockets as component outputs.
        let mut interface = InterfaceBuilder::default();
        for id in &members {
            let Some(node) = store.node(id) else { continue };
            match self.catalog.boundary_role(&node.kind) {
                Some(PortRole::Input) => {
                    for port in &node.data.outputs {
                        interface.add(PortRole::Input, &node.id, &port.id, boundary_label(node, port));
                    }
                }
                Some(PortRole::Output) => {
                    for port in &node.data.inputs {
                        interface.add(PortRole::Output, &node.id, &port.id, boundary_label(node, port));
                    }
                }
                None => {}
            }
        }

        // Pass 2: external connections whose internal endpoint is still
        // uncovered get a supplemental port on the side the wiring implies.
        for conn in &external {
            let (inner_node, inner_port, side) =
                if member_set.contains(conn.source_node_id.as_str()) {
                    (&conn.source_node_id, &conn.source_port, PortRole::Output)
                } else {
                    (&conn.target_node_id, &conn.target_port, PortRole::Input)
                };
            let label = store
                .node(inner_node)
                .and_then(|n| n.port(inner_port))
                .filter(|p| !p.label.is_empty())
                .map(|p| p.label.clone());
            interface.add(side, inner_node, inner_port, label);
        }

        // Rewrite the external wiring onto the instance.
        let instance_id = fresh_id("cmp");
        let mut rewired: Vec<Connection> = Vec::new();
        for conn in &external {
            let mut conn = conn.clone();
            let resolved = if member_set.contains(conn.source_node_id.as_str()) {
                interface
                    .port_for(&conn.source_node_id, &conn.source_port)
                    .map(|port| {
                        conn.source_node_id = instance_id.clone();
                        conn.source_port = port.to_string();
                    })
            } else {
                interface
                    .port_for(&conn.target_node_id, &conn.target_port)
                    .map(|port| {
                        conn.target_node_id = instance_id.clone();
                        conn.target_port = port.to_string();
                    })
            };
            match resolved {
                Some(()) => rewired.push(conn),
                None => {
                    // Unreachable by construction; kept defensive.
                    warn!(connection = %conn.id, "compile: external connection has no synthesized port");
                    dropped_connections.push(conn.id);
                }
            }
        }

        let name = group
            .data
            .name
            .clone()
            .unwrap_or_else(|| format!("Component {}", self.registry.len() + 1));

        let definition = ComponentDefinition {
            id: fresh_id("def"),
            name: name.clone(),
            input_ports: interface.input_ports.clone(),
            output_ports: interface.output_ports.clone(),
            internal_nodes: members
                .iter()
                .filter_map(|id| store.node(id).cloned())
                .collect(),
            internal_connections: internal.clone(),
            input_bindings: interface.input_bindings,
            output_bindings: interface.output_bindings,
            origin: group.position,
        };

        let mut instance = Node::new(instance_id, kinds::COMPONENT, group.position)
            .with_name(name)
            .with_ports(interface.input_ports, interface.output_ports);
        instance.data.size = group
            .data
            .size
            .or_else(|| Some(self.catalog.default_size(&group.kind)));
        instance.data.component_id = Some(definition.id.clone());

        Ok(CompilePlan {
            members,
            internal,
            rewired,
            dropped_connections,
            definition,
            instance,
        })
    }
}

struct CompilePlan {
    members: Vec<String>,
    internal: Vec<Connection>,
    rewired: Vec<Connection>,
    dropped_connections: Vec<String>,
    definition: ComponentDefinition,
    instance: Node,
}

/// Label for a boundary-pass port: socket label, else the owning node's
/// display name, else an ordinal chosen by the builder.
fn boundary_label(node: &Node, port: &Port) -> Option<String> {
    if !port.label.is_empty() {
        Some(port.label.clone())
    } else if !node.display_name().is_empty() {
        Some(node.display_name().to_string())
    } else {
        None
    }
}

/// Accumulates the synthesized interface. Port ids run `in-k`/`out-k`
/// sequentially across both passes; the first occurrence of an internal
/// endpoint key wins, so fan-in and fan-out legally share one port.
#[derive(Default)]
struct InterfaceBuilder {
    input_ports: Vec<Port>,
    output_ports: Vec<Port>,
    input_bindings: Vec<PortBinding>,
    output_bindings: Vec<PortBinding>,
    covered: HashMap<(String, String), String>,
}

impl InterfaceBuilder {
    fn add(&mut self, side: PortRole, node_id: &str, port_id: &str, label: Option<String>) {
        let key = (node_id.to_string(), port_id.to_string());
        if self.covered.contains_key(&key) {
            return;
        }
        let (ports, bindings, prefix, noun) = match side {
            PortRole::Input => (
                &mut self.input_ports,
                &mut self.input_bindings,
                "in",
                "Input",
            ),
            PortRole::Output => (
                &mut self.output_ports,
                &mut self.output_bindings,
                "out",
                "Output",
            ),
        };
        let component_port_id = format!("{prefix}-{}", ports.len());
        let label = label.unwrap_or_else(|| format!("{noun} {}", ports.len() + 1));
        ports.push(Port::new(component_port_id.clone(), label));
        bindings.push(PortBinding {
            component_port_id: component_port_id.clone(),
            node_id: key.0.clone(),
            port_id: key.1.clone(),
        });
        self.covered.insert(key, component_port_id);
    }

    fn port_for(&self, node_id: &str, port_id: &str) -> Option<&str> {
        self.covered
            .get(&(node_id.to_string(), port_id.to_string()))
            .map(String::as_str)
    }
}

/// Convenience for building the group node a compile consumes; also used by
/// the controller's group gesture.
pub(crate) fn group_node(
    id: String,
    name: Option<String>,
    position: Position,
    size: Size,
    child_node_ids: Vec<String>,
) -> Node {
    let mut group = Node::new(id, kinds::GROUP, position).with_size(size);
    group.data.name = name;
    group.data.child_node_ids = Some(child_node_ids);
    group
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BasicNodeCatalog;

    /// Two plain members wired internally, one external producer feeding
    /// member `m1` and one external consumer fed by `m2`.
    fn folded_fixture() -> (HistoryManager, ComponentRegistry) {
        let mut history = HistoryManager::new();
        history.transact(|store| {
            store
                .insert_node(
                    Node::new("outside-src", "source", Position::new(-200.0, 0.0))
                        .with_ports(vec![], vec![Port::new("out-0", "Out")]),
                )
                .unwrap();
            store
                .insert_node(
                    Node::new("outside-dst", "sink", Position::new(600.0, 0.0))
                        .with_ports(vec![Port::new("in-0", "In")], vec![]),
                )
                .unwrap();
            store
                .insert_node(
                    Node::new("m1", "filter", Position::new(100.0, 50.0)).with_ports(
                        vec![Port::new("in-0", "Signal")],
                        vec![Port::new("out-0", "Filtered")],
                    ),
                )
                .unwrap();
            store
                .insert_node(
                    Node::new("m2", "filter", Position::new(300.0, 50.0)).with_ports(
                        vec![Port::new("in-0", "Signal")],
                        vec![Port::new("out-0", "Filtered")],
                    ),
                )
                .unwrap();
            store
                .insert_node(group_node(
                    "g".to_string(),
                    Some("Stage".to_string()),
                    Position::new(80.0, 20.0),
                    Size::new(400.0, 160.0),
                    vec!["m1".to_string(), "m2".to_string()],
                ))
                .unwrap();
            store
                .insert_connection(Connection::new("c-in", "outside-src", "out-0", "m1", "in-0"))
                .unwrap();
            store
                .insert_connection(Connection::new("c-mid", "m1", "out-0", "m2", "in-0"))
                .unwrap();
            store
                .insert_connection(Connection::new("c-out", "m2", "out-0", "outside-dst", "in-0"))
                .unwrap();
        });
        (history, ComponentRegistry::new())
    }

    // ========================================================================
    // Basic fold
    // ========================================================================

    #[test]
    fn test_compile_replaces_group_with_instance() {
        let (mut history, mut registry) = folded_fixture();
        let catalog = BasicNodeCatalog;
        let instance_id = ComponentCompiler::new(&mut registry, &catalog)
            .compile(&mut history, "g")
            .unwrap();

        let store = history.store();
        assert!(!store.contains_node("g"));
        assert!(!store.contains_node("m1"));
        assert!(!store.contains_node("m2"));

        let instance = store.node(&instance_id).unwrap();
        assert_eq!(instance.kind, kinds::COMPONENT);
        assert_eq!(instance.position, Position::new(80.0, 20.0));
        assert_eq!(instance.data.name.as_deref(), Some("Stage"));
        // One supplemental input (m1.in-0) and one supplemental output
        // (m2.out-0); no boundary-role members in this fixture.
        assert_eq!(instance.data.inputs.len(), 1);
        assert_eq!(instance.data.outputs.len(), 1);
        assert_eq!(instance.data.inputs[0].id, "in-0");
        assert_eq!(instance.data.inputs[0].label, "Signal");
        assert_eq!(instance.data.outputs[0].id, "out-0");
        assert_eq!(instance.data.outputs[0].label, "Filtered");
    }

    #[test]
    fn test_compile_rewires_external_connections() {
        let (mut history, mut registry) = folded_fixture();
        let catalog = BasicNodeCatalog;
        let instance_id = ComponentCompiler::new(&mut registry, &catalog)
            .compile(&mut history, "g")
            .unwrap();

        let store = history.store();
        let inbound = store.connection("c-in").unwrap();
        assert_eq!(inbound.source_node_id, "outside-src");
        assert_eq!(inbound.target_node_id, instance_id);
        assert_eq!(inbound.target_port, "in-0");

        let outbound = store.connection("c-out").unwrap();
        assert_eq!(outbound.source_node_id, instance_id);
        assert_eq!(outbound.source_port, "out-0");
        assert_eq!(outbound.target_node_id, "outside-dst");

        // Internal wiring left the live graph.
        assert!(store.connection("c-mid").is_none());
    }

    #[test]
    fn test_compile_publishes_snapshot() {
        let (mut history, mut registry) = folded_fixture();
        let catalog = BasicNodeCatalog;
        let instance_id = ComponentCompiler::new(&mut registry, &catalog)
            .compile(&mut history, "g")
            .unwrap();

        let definition_id = history
            .store()
            .node(&instance_id)
            .unwrap()
            .data
            .component_id
            .clone()
            .unwrap();
        let definition = registry.definition(&definition_id).unwrap();

        assert_eq!(definition.origin, Position::new(80.0, 20.0));
        assert_eq!(definition.internal_nodes.len(), 2);
        assert_eq!(definition.internal_connections.len(), 1);
        assert_eq!(definition.internal_connections[0].id, "c-mid");
        assert_eq!(definition.input_bindings.len(), 1);
        assert_eq!(definition.input_bindings[0].node_id, "m1");
        assert_eq!(definition.output_bindings[0].node_id, "m2");
    }

    #[test]
    fn test_compile_is_one_undo_step() {
        let (mut history, mut registry) = folded_fixture();
        let before = history.store().clone();
        let catalog = BasicNodeCatalog;
        ComponentCompiler::new(&mut registry, &catalog)
            .compile(&mut history, "g")
            .unwrap();

        assert!(history.undo());
        assert_eq!(*history.store(), before);
    }

    // ========================================================================
    // Rejections
    // ========================================================================

    #[test]
    fn test_compile_rejects_non_group() {
        let (mut history, mut registry) = folded_fixture();
        let catalog = BasicNodeCatalog;
        let result = ComponentCompiler::new(&mut registry, &catalog).compile(&mut history, "m1");
        assert_eq!(result, Err(CompileError::NotAGroup("m1".to_string())));
    }

    #[test]
    fn test_compile_rejects_missing_group() {
        let (mut history, mut registry) = folded_fixture();
        let catalog = BasicNodeCatalog;
        let result = ComponentCompiler::new(&mut registry, &catalog).compile(&mut history, "zzz");
        assert_eq!(result, Err(CompileError::GroupNotFound("zzz".to_string())));
    }

    #[test]
    fn test_compile_skips_vanished_members() {
        let (mut history, mut registry) = folded_fixture();
        history.transact(|store| {
            let group = store.node_mut("g").unwrap();
            group
                .data
                .child_node_ids
                .as_mut()
                .unwrap()
                .push("vanished".to_string());
        });
        let catalog = BasicNodeCatalog;
        let instance_id = ComponentCompiler::new(&mut registry, &catalog)
            .compile(&mut history, "g")
            .unwrap();

        assert!(history.store().contains_node(&instance_id));
        let definition_id = history
            .store()
            .node(&instance_id)
            .unwrap()
            .data
            .component_id
            .clone()
            .unwrap();
        assert_eq!(
            registry.definition(&definition_id).unwrap().internal_nodes.len(),
            2
        );
    }
}
