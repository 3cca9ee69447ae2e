//! Connection protocol tests: drag gestures, normalization, guards, and
//! cancellation through the public controller API.

mod common;

use common::GraphHarness;
use node_graph_engine::{kinds, Node, Port, Position};

#[test]
fn test_forward_drag_yields_output_to_input() {
    let h = GraphHarness::new();
    h.add_source("a", 0.0, 0.0);
    h.add_sink("b", 300.0, 0.0);

    let conn = h.connect("a", "out-0", "b", "in-0").unwrap();
    assert_eq!(conn.source_node_id, "a");
    assert_eq!(conn.source_port, "out-0");
    assert_eq!(conn.target_node_id, "b");
    assert_eq!(conn.target_port, "in-0");
}

#[test]
fn test_backward_drag_yields_same_connection() {
    let h = GraphHarness::new();
    h.add_source("a", 0.0, 0.0);
    h.add_sink("b", 300.0, 0.0);

    // Drag starts on the input port; role decides polarity, not gesture
    // order.
    let conn = h.connect("b", "in-0", "a", "out-0").unwrap();
    assert_eq!(conn.source_node_id, "a");
    assert_eq!(conn.target_node_id, "b");
}

#[test]
fn test_same_role_ports_never_connect() {
    let h = GraphHarness::new();
    h.add_source("a", 0.0, 0.0);
    h.add_source("b", 0.0, 200.0);
    h.add_sink("c", 300.0, 0.0);
    h.add_sink("d", 300.0, 200.0);

    assert!(h.connect("a", "out-0", "b", "out-0").is_none());
    assert!(h.connect("c", "in-0", "d", "in-0").is_none());
    assert_eq!(h.connection_count(), 0);
}

#[test]
fn test_duplicate_connection_rejected_either_direction() {
    let h = GraphHarness::new();
    h.add_source("a", 0.0, 0.0);
    h.add_sink("b", 300.0, 0.0);

    assert!(h.connect("a", "out-0", "b", "in-0").is_some());
    assert!(h.connect("a", "out-0", "b", "in-0").is_none());
    assert!(h.connect("b", "in-0", "a", "out-0").is_none());
    assert_eq!(h.connection_count(), 1);
}

#[test]
fn test_release_over_empty_canvas_is_inert() {
    let h = GraphHarness::new();
    h.add_source("a", 0.0, 0.0);
    h.add_sink("b", 300.0, 0.0);
    let before = h.store();

    h.ctrl
        .pointer_down_on_port("a", "out-0", Position::new(160.0, 40.0));
    h.ctrl.pointer_moved(Position::new(500.0, 500.0));
    assert!(h.ctrl.pointer_up(None).is_none());

    assert_eq!(h.store(), before);
    assert!(!h.ctrl.is_connecting());
}

#[test]
fn test_fan_out_from_one_source_port() {
    let h = GraphHarness::new();
    h.add_source("a", 0.0, 0.0);
    h.add_sink("b", 300.0, 0.0);
    h.add_sink("c", 300.0, 200.0);

    assert!(h.connect("a", "out-0", "b", "in-0").is_some());
    assert!(h.connect("a", "out-0", "c", "in-0").is_some());
    assert_eq!(h.connection_count(), 2);
}

#[test]
fn test_merge_node_keeps_growing_inputs() {
    let h = GraphHarness::new();
    h.add_source("a", 0.0, 0.0);
    h.add_source("b", 0.0, 200.0);
    h.ctrl
        .add_node(
            Node::new("mix", kinds::MERGE, Position::new(300.0, 100.0))
                .with_ports(vec![Port::new("in-0", "Input 1")], vec![]),
        )
        .unwrap();

    h.connect("a", "out-0", "mix", "in-0").unwrap();
    // The slot appended by the first landing is where the next drag lands.
    h.connect("b", "out-0", "mix", "in-1").unwrap();

    let history = h.ctrl.history();
    let history = history.borrow();
    let mix = history.store().node("mix").unwrap();
    let ids: Vec<&str> = mix.data.inputs.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["in-0", "in-1", "in-2"]);
}

#[test]
fn test_new_drag_replaces_stale_session() {
    let h = GraphHarness::new();
    h.add_source("a", 0.0, 0.0);
    h.add_source("b", 0.0, 200.0);
    h.add_sink("c", 300.0, 0.0);

    // A drag left dangling by a lost pointer-up is replaced by the next one.
    h.ctrl.pointer_down_on_port("a", "out-0", Position::default());
    h.ctrl.pointer_down_on_port("b", "out-0", Position::default());
    let conn = h.ctrl.pointer_up(Some(("c", "in-0"))).unwrap();

    assert_eq!(conn.source_node_id, "b");
    assert_eq!(h.connection_count(), 1);
}

#[test]
fn test_delete_connection_no_cascade() {
    let h = GraphHarness::new();
    h.add_source("a", 0.0, 0.0);
    h.add_sink("b", 300.0, 0.0);
    h.add_sink("c", 300.0, 200.0);
    let first = h.connect("a", "out-0", "b", "in-0").unwrap();
    h.connect("a", "out-0", "c", "in-0").unwrap();

    assert!(h.ctrl.delete_connection(&first.id));
    assert_eq!(h.connection_count(), 1);
    assert_eq!(h.node_count(), 3);
}
