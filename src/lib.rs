//! # Node Graph Engine
//!
//! A headless, transactional graph-transformation engine for building
//! visual node editors. It owns the data model and the semantics — typed
//! nodes, directed port-to-port connections, folding a cluster of nodes
//! into a reusable component and expanding it back, and undo/redo around
//! every mutation — while rendering, hit testing, and layout stay with the
//! embedding application.
//!
//! ## Features
//!
//! - **Connection protocol** - Role classification by declared membership,
//!   direction normalization, duplicate rejection, elastic input growth
//! - **Component fold/unfold** - Deterministic boundary-port synthesis with
//!   bindings that survive the round trip
//! - **Transactional history** - Snapshot-per-mutation undo/redo with
//!   explicit gesture batching and a raw path for external sync
//! - **Trait-Based Palette** - Node-kind classification behind the
//!   [`NodeCatalog`] trait; bring your own node types
//!
//! ## Quick Start
//!
//! ```ignore
//! use node_graph_engine::{GraphController, Node, Port, Position};
//!
//! let ctrl = GraphController::new();
//! ctrl.add_node(
//!     Node::new("osc", "oscillator", Position::new(100.0, 100.0))
//!         .with_ports(vec![], vec![Port::new("out-0", "Signal")]),
//! )?;
//!
//! // Wire ports from pointer events, fold a group, undo it all:
//! ctrl.pointer_down_on_port("osc", "out-0", cursor);
//! ctrl.pointer_up(Some(("speaker", "in-0")));
//! let instance = ctrl.compile_group(&group_id)?;
//! ctrl.undo();
//! ```
//!
//! ## Core Components
//!
//! - [`GraphStore`] - Canonical nodes and connections
//! - [`HistoryManager`] - Undo/redo transaction log over the store
//! - [`ConnectionRouter`] - Drag session and connection rules
//! - [`ComponentCompiler`] / [`ComponentExpander`] - The fold/unfold pair
//! - [`ComponentRegistry`] - Published, immutable component definitions
//! - [`GraphController`] - Clone-shareable facade wiring it all together

pub mod catalog;
pub mod controller;
pub mod compiler;
pub mod expander;
pub mod history;
pub mod model;
pub mod registry;
pub mod router;
pub mod selection;
pub mod store;

pub use catalog::{kinds, BasicNodeCatalog, NodeCatalog};
pub use compiler::{CompileError, ComponentCompiler};
pub use controller::{GraphController, Viewport};
pub use expander::{ComponentExpander, ExpandError};
pub use history::{ChangeNotice, HistoryManager, DEFAULT_UNDO_CAPACITY};
pub use model::{fresh_id, Connection, Node, NodeData, Port, PortRole, Position, Size};
pub use registry::{ComponentDefinition, ComponentRegistry, PortBinding, RegistryError};
pub use router::{ConnectError, ConnectionRouter, DragSession};
pub use selection::SelectionManager;
pub use store::{GraphStore, StoreError};
