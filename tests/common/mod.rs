//! Shared test harness.
//!
//! Builds graphs through the public controller API the way an embedding
//! editor would: nodes placed programmatically, connections created by the
//! pointer gesture flow, and persistence-style wiring inserted directly into
//! the store for shapes the gesture protocol would not produce.

#![allow(dead_code)]

use node_graph_engine::{
    kinds, Connection, GraphController, GraphStore, Node, Port, Position, Size,
};

/// Controller plus convenience builders for the standard test palette.
pub struct GraphHarness {
    pub ctrl: GraphController,
}

impl Default for GraphHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphHarness {
    pub fn new() -> Self {
        Self {
            ctrl: GraphController::new(),
        }
    }

    /// A node with one output port `out-0`.
    pub fn add_source(&self, id: &str, x: f32, y: f32) {
        self.ctrl
            .add_node(
                Node::new(id, "source", Position::new(x, y))
                    .with_size(Size::new(160.0, 80.0))
                    .with_ports(vec![], vec![Port::new("out-0", "Out")]),
            )
            .unwrap();
    }

    /// A node with one input port `in-0`.
    pub fn add_sink(&self, id: &str, x: f32, y: f32) {
        self.ctrl
            .add_node(
                Node::new(id, "sink", Position::new(x, y))
                    .with_size(Size::new(160.0, 80.0))
                    .with_ports(vec![Port::new("in-0", "In")], vec![]),
            )
            .unwrap();
    }

    /// A pass-through node with `in-0` and `out-0`.
    pub fn add_relay(&self, id: &str, x: f32, y: f32) {
        self.ctrl
            .add_node(
                Node::new(id, "relay", Position::new(x, y))
                    .with_size(Size::new(160.0, 80.0))
                    .with_ports(
                        vec![Port::new("in-0", "In")],
                        vec![Port::new("out-0", "Out")],
                    ),
            )
            .unwrap();
    }

    /// A boundary `input`-kind node exposing one output socket.
    pub fn add_boundary_input(&self, id: &str, port_id: &str, label: &str, x: f32, y: f32) {
        self.ctrl
            .add_node(
                Node::new(id, kinds::INPUT, Position::new(x, y))
                    .with_ports(vec![], vec![Port::new(port_id, label)]),
            )
            .unwrap();
    }

    /// A boundary `output`-kind node exposing one input socket.
    pub fn add_boundary_output(&self, id: &str, port_id: &str, label: &str, x: f32, y: f32) {
        self.ctrl
            .add_node(
                Node::new(id, kinds::OUTPUT, Position::new(x, y))
                    .with_ports(vec![Port::new(port_id, label)], vec![]),
            )
            .unwrap();
    }

    /// Create a connection through the pointer gesture flow.
    pub fn connect(
        &self,
        from_node: &str,
        from_port: &str,
        to_node: &str,
        to_port: &str,
    ) -> Option<Connection> {
        self.ctrl
            .pointer_down_on_port(from_node, from_port, Position::default());
        self.ctrl.pointer_up(Some((to_node, to_port)))
    }

    /// Insert a connection the way a persistence collaborator would: as
    /// recorded, without running it through the gesture protocol.
    pub fn wire_raw(&self, id: &str, source: &str, source_port: &str, target: &str, target_port: &str) {
        self.ctrl
            .history()
            .borrow_mut()
            .transact(|store| {
                store.insert_connection(Connection::new(id, source, source_port, target, target_port))
            })
            .unwrap();
    }

    /// Snapshot of the current store for comparisons.
    pub fn store(&self) -> GraphStore {
        self.ctrl.history().borrow().store().clone()
    }

    pub fn node_count(&self) -> usize {
        self.ctrl.history().borrow().store().node_count()
    }

    pub fn connection_count(&self) -> usize {
        self.ctrl.history().borrow().store().connection_count()
    }

    /// The single component instance in the store, if exactly one exists.
    pub fn only_component(&self) -> Option<Node> {
        let history = self.ctrl.history();
        let history = history.borrow();
        let mut instances = history
            .store()
            .nodes()
            .filter(|n| n.kind == kinds::COMPONENT)
            .cloned();
        let first = instances.next();
        if instances.next().is_some() {
            return None;
        }
        first
    }
}
