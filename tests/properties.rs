//! Property tests for the connection protocol and history semantics.

mod common;

use common::GraphHarness;
use node_graph_engine::{GraphStore, Position};
use proptest::prelude::*;

proptest! {
    /// Whichever end a drag starts on, the stored connection flows from the
    /// output-role port to the input-role port.
    #[test]
    fn prop_source_is_always_the_output_role_end(start_on_input in any::<bool>()) {
        let h = GraphHarness::new();
        h.add_source("a", 0.0, 0.0);
        h.add_sink("b", 300.0, 0.0);

        let conn = if start_on_input {
            h.connect("b", "in-0", "a", "out-0")
        } else {
            h.connect("a", "out-0", "b", "in-0")
        }
        .unwrap();

        prop_assert_eq!(conn.source_node_id.as_str(), "a");
        prop_assert_eq!(conn.source_port.as_str(), "out-0");
        prop_assert_eq!(conn.target_node_id.as_str(), "b");
    }

    /// Repeating the same gesture any number of times leaves exactly one
    /// connection.
    #[test]
    fn prop_duplicate_attempts_never_grow_the_graph(attempts in 1usize..8) {
        let h = GraphHarness::new();
        h.add_source("a", 0.0, 0.0);
        h.add_sink("b", 300.0, 0.0);

        for i in 0..attempts {
            let result = h.connect("a", "out-0", "b", "in-0");
            prop_assert_eq!(result.is_some(), i == 0);
        }
        prop_assert_eq!(h.connection_count(), 1);
    }

    /// Any editing session unwinds to the empty graph, one undo per
    /// committed step.
    #[test]
    fn prop_undo_all_returns_to_empty(ops in prop::collection::vec(0u8..=2, 1..16)) {
        let h = GraphHarness::new();
        let mut sources = 0usize;
        let mut sinks = 0usize;
        for op in ops {
            match op {
                0 => {
                    h.add_source(&format!("s{sources}"), 0.0, sources as f32 * 90.0);
                    sources += 1;
                }
                1 => {
                    h.add_sink(&format!("k{sinks}"), 300.0, sinks as f32 * 90.0);
                    sinks += 1;
                }
                _ => {
                    if sources > 0 && sinks > 0 {
                        // May be rejected as a duplicate; rejections must
                        // not produce undo steps.
                        let _ = h.connect("s0", "out-0", &format!("k{}", sinks - 1), "in-0");
                    }
                }
            }
        }

        while h.ctrl.undo() {}
        prop_assert_eq!(h.store(), GraphStore::new());
    }

    /// A gesture of any length batches into exactly one undo step.
    #[test]
    fn prop_gesture_is_one_step(moves in 1usize..20) {
        let h = GraphHarness::new();
        h.add_source("a", 0.0, 0.0);
        let before = h.store();

        h.ctrl.begin_gesture();
        for step in 0..moves {
            h.ctrl.move_node("a", Position::new(step as f32 * 5.0, 0.0));
        }
        h.ctrl.end_gesture();

        prop_assert!(h.ctrl.undo());
        prop_assert_eq!(h.store(), before);
    }
}
