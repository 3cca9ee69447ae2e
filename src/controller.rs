//! High-level controller for graph editor applications.
//!
//! [`GraphController`] reduces boilerplate by owning the history manager,
//! component registry, connection router, selection, and viewport in one
//! clone-shareable handle, and by exposing the engine at gesture level:
//! pointer events in screen space, undo/redo commands, and the fold/unfold
//! operations.
//!
//! # Example
//!
//! ```ignore
//! use node_graph_engine::{GraphController, Node, Position};
//!
//! let ctrl = GraphController::new();
//! ctrl.add_node(node_a)?;
//! ctrl.add_node(node_b)?;
//!
//! // A connection drag, driven by UI pointer events:
//! ctrl.pointer_down_on_port("a", "out-0", cursor);
//! ctrl.pointer_moved(cursor);
//! ctrl.pointer_up(Some(("b", "in-0"))); // release over a port
//!
//! ctrl.undo();
//! ```
//!
//! Rendering collaborators read the store through
//! [`history()`](GraphController::history) and must route every mutation
//! they trigger back through these entry points; scene-mirroring
//! collaborators use [`sync_write`](GraphController::sync_write) so their
//! updates stay out of undo history.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::catalog::{BasicNodeCatalog, NodeCatalog};
use crate::compiler::{group_node, CompileError, ComponentCompiler};
use crate::expander::{group_frame, ComponentExpander, ExpandError};
use crate::history::{ChangeNotice, HistoryManager};
use crate::model::{fresh_id, Connection, Node, Position};
use crate::registry::ComponentRegistry;
use crate::router::ConnectionRouter;
use crate::selection::SelectionManager;
use crate::store::{GraphStore, StoreError};

/// Zoom/pan state used to convert screen-space pointer positions into
/// canvas-local space before they reach the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

impl Viewport {
    /// Screen -> canvas. A non-positive zoom is treated as 1.
    pub fn to_canvas(&self, p: Position) -> Position {
        let z = if self.zoom > 0.0 { self.zoom } else { 1.0 };
        Position::new((p.x - self.pan_x) / z, (p.y - self.pan_y) / z)
    }

    /// Canvas -> screen.
    pub fn to_screen(&self, p: Position) -> Position {
        Position::new(p.x * self.zoom + self.pan_x, p.y * self.zoom + self.pan_y)
    }
}

/// Facade over the engine's moving parts.
///
/// Clone this controller to share it across UI callbacks.
pub struct GraphController<C: NodeCatalog = BasicNodeCatalog> {
    history: Rc<RefCell<HistoryManager>>,
    registry: Rc<RefCell<ComponentRegistry>>,
    router: Rc<RefCell<ConnectionRouter>>,
    selection: Rc<RefCell<SelectionManager>>,
    viewport: Rc<RefCell<Viewport>>,
    catalog: Rc<C>,
}

impl<C: NodeCatalog> Clone for GraphController<C> {
    fn clone(&self) -> Self {
        Self {
            history: self.history.clone(),
            registry: self.registry.clone(),
            router: self.router.clone(),
            selection: self.selection.clone(),
            viewport: self.viewport.clone(),
            catalog: self.catalog.clone(),
        }
    }
}

impl Default for GraphController<BasicNodeCatalog> {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphController<BasicNodeCatalog> {
    /// Create a controller over the built-in node palette.
    pub fn new() -> Self {
        Self::with_catalog(BasicNodeCatalog)
    }
}

impl<C: NodeCatalog> GraphController<C> {
    /// Create a controller over a custom node palette.
    pub fn with_catalog(catalog: C) -> Self {
        Self {
            history: Rc::new(RefCell::new(HistoryManager::new())),
            registry: Rc::new(RefCell::new(ComponentRegistry::new())),
            router: Rc::new(RefCell::new(ConnectionRouter::new())),
            selection: Rc::new(RefCell::new(SelectionManager::new())),
            viewport: Rc::new(RefCell::new(Viewport::default())),
            catalog: Rc::new(catalog),
        }
    }

    // === Shared state handles ===

    /// The history manager (and through it, the store).
    pub fn history(&self) -> Rc<RefCell<HistoryManager>> {
        self.history.clone()
    }

    /// The component registry.
    pub fn registry(&self) -> Rc<RefCell<ComponentRegistry>> {
        self.registry.clone()
    }

    /// The selection state.
    pub fn selection(&self) -> Rc<RefCell<SelectionManager>> {
        self.selection.clone()
    }

    /// Set viewport state: zoom, pan_x, pan_y.
    pub fn set_viewport(&self, zoom: f32, pan_x: f32, pan_y: f32) {
        *self.viewport.borrow_mut() = Viewport {
            zoom,
            pan_x,
            pan_y,
        };
    }

    pub fn viewport(&self) -> Viewport {
        *self.viewport.borrow()
    }

    /// Bind the store change observer (render read-model hook). The notice
    /// carries the `restoring` flag scene-sync collaborators must honor.
    pub fn bind_observer<F>(&self, observer: F)
    where
        F: Fn(ChangeNotice<'_>) + 'static,
    {
        self.history.borrow_mut().bind_observer(observer);
    }

    // === Connection gestures ===

    /// Pointer-down on a port: begin a connection drag. The position is in
    /// screen space; the viewport transform is applied here.
    pub fn pointer_down_on_port(&self, node_id: &str, port_id: &str, screen: Position) -> bool {
        let canvas = self.viewport.borrow().to_canvas(screen);
        let history = self.history.borrow();
        match self
            .router
            .borrow_mut()
            .start_connection(&history, node_id, port_id, canvas)
        {
            Ok(()) => true,
            Err(err) => {
                debug!(error = %err, "pointer_down_on_port rejected");
                false
            }
        }
    }

    /// Pointer-move during a drag.
    pub fn pointer_moved(&self, screen: Position) {
        let canvas = self.viewport.borrow().to_canvas(screen);
        self.router.borrow_mut().update_pointer(canvas);
    }

    /// Pointer-up: over a port, try to complete the connection; over empty
    /// canvas (`None`), cancel. Protocol rejections are logged and
    /// swallowed — an interactive editor stays quiet about them.
    pub fn pointer_up(&self, target: Option<(&str, &str)>) -> Option<Connection> {
        match target {
            Some((node_id, port_id)) => {
                let mut history = self.history.borrow_mut();
                match self.router.borrow_mut().complete_connection(
                    &mut history,
                    self.catalog.as_ref(),
                    node_id,
                    port_id,
                ) {
                    Ok(connection) => Some(connection),
                    Err(err) => {
                        debug!(error = %err, "connection gesture rejected");
                        None
                    }
                }
            }
            None => {
                self.router.borrow_mut().cancel_connection();
                None
            }
        }
    }

    /// Explicitly abort the in-flight drag.
    pub fn cancel_connection(&self) {
        self.router.borrow_mut().cancel_connection();
    }

    pub fn is_connecting(&self) -> bool {
        self.router.borrow().is_dragging()
    }

    // === Structure edits ===

    /// Insert a node through the history pipeline.
    pub fn add_node(&self, node: Node) -> Result<(), StoreError> {
        self.history
            .borrow_mut()
            .transact(|store| store.insert_node(node))
    }

    /// Remove a connection by id.
    pub fn delete_connection(&self, id: &str) -> bool {
        let mut history = self.history.borrow_mut();
        let removed = self
            .router
            .borrow()
            .delete_connection(&mut history, id)
            .is_some();
        if removed {
            self.selection.borrow_mut().deselect(id);
        }
        removed
    }

    /// Remove a node and every connection touching it, as one undo step.
    pub fn delete_node(&self, id: &str) -> bool {
        let mut history = self.history.borrow_mut();
        if !history.store().contains_node(id) {
            debug!(%id, "delete_node: unknown id");
            return false;
        }
        history.transact(|store| {
            for conn_id in store.connection_ids_touching(id) {
                store.remove_connection(&conn_id);
            }
            store.remove_node(id);
        });
        self.selection.borrow_mut().deselect(id);
        true
    }

    /// Delete everything currently selected (nodes with their touching
    /// connections, plus directly selected connections) as one undo step.
    /// Returns the number of removed items.
    pub fn delete_selected(&self) -> usize {
        let ids: Vec<String> = self.selection.borrow().iter().map(String::from).collect();
        if ids.is_empty() {
            return 0;
        }
        let mut history = self.history.borrow_mut();
        let removed = history.transact(|store| {
            let mut removed = 0;
            for id in &ids {
                if store.contains_node(id) {
                    for conn_id in store.connection_ids_touching(id) {
                        store.remove_connection(&conn_id);
                        removed += 1;
                    }
                    store.remove_node(id);
                    removed += 1;
                } else if store.remove_connection(id).is_some() {
                    removed += 1;
                }
            }
            removed
        });
        self.selection.borrow_mut().clear();
        removed
    }

    /// Move a node to an absolute canvas position. Combine with
    /// [`begin_gesture`](Self::begin_gesture)/[`end_gesture`](Self::end_gesture)
    /// so a continuous drag lands as one undo step.
    pub fn move_node(&self, id: &str, position: Position) -> bool {
        let mut history = self.history.borrow_mut();
        if !history.store().contains_node(id) {
            return false;
        }
        history.transact(|store| {
            if let Some(node) = store.node_mut(id) {
                node.position = position;
            }
        });
        true
    }

    /// Open a history batch for a multi-event gesture.
    pub fn begin_gesture(&self) {
        self.history.borrow_mut().start_action();
    }

    /// Close the gesture batch.
    pub fn end_gesture(&self) {
        self.history.borrow_mut().end_action();
    }

    /// Wrap live nodes in a new group node sized to enclose them. Returns
    /// the group id, or `None` when no id resolved to a live node.
    pub fn group_nodes<I, S>(&self, ids: I) -> Option<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut history = self.history.borrow_mut();
        let members: Vec<String> = {
            let store = history.store();
            ids.into_iter()
                .map(Into::into)
                .filter(|id| store.contains_node(id))
                .collect()
        };
        if members.is_empty() {
            debug!("group_nodes: nothing to group");
            return None;
        }
        let (position, size) = {
            let store = history.store();
            let nodes = members.iter().filter_map(|id| store.node(id));
            group_frame(self.catalog.as_ref(), nodes, Position::default())
        };
        let group = group_node(fresh_id("group"), None, position, size, members);
        let group_id = group.id.clone();
        let inserted = history.transact(|store| store.insert_node(group));
        match inserted {
            Ok(()) => Some(group_id),
            Err(err) => {
                debug!(error = %err, "group_nodes failed");
                None
            }
        }
    }

    // === Component workflow ===

    /// Fold a group into a component instance (the cluster command).
    pub fn compile_group(&self, group_id: &str) -> Result<String, CompileError> {
        let mut history = self.history.borrow_mut();
        let mut registry = self.registry.borrow_mut();
        let result = ComponentCompiler::new(&mut registry, self.catalog.as_ref())
            .compile(&mut history, group_id);
        if let Err(err) = &result {
            warn!(%group_id, error = %err, "compile_group failed");
        }
        result
    }

    /// Restore a component instance back into its nodes (the inline
    /// command).
    pub fn expand_component(&self, instance_id: &str) -> Result<String, ExpandError> {
        let mut history = self.history.borrow_mut();
        let registry = self.registry.borrow();
        let result = ComponentExpander::new(&registry, self.catalog.as_ref())
            .expand(&mut history, instance_id);
        if let Err(err) = &result {
            warn!(%instance_id, error = %err, "expand_component failed");
        }
        result
    }

    // === History ===

    pub fn undo(&self) -> bool {
        self.history.borrow_mut().undo()
    }

    pub fn redo(&self) -> bool {
        self.history.borrow_mut().redo()
    }

    /// True while undo/redo is replacing state; scene-sync collaborators
    /// must not write during this window.
    pub fn is_restoring(&self) -> bool {
        self.history.borrow().is_restoring()
    }

    /// Raw write path for synchronization-only updates (mirrored external
    /// state). Never appears in undo history.
    pub fn sync_write<R>(&self, write: impl FnOnce(&mut GraphStore) -> R) -> R {
        self.history.borrow_mut().write_raw(write)
    }

    // === Selection ===

    /// Click-style selection of a node or connection.
    pub fn select(&self, id: &str, shift_held: bool) {
        self.selection.borrow_mut().handle_interaction(id, shift_held);
    }

    /// Replace the selection from a box-selection result.
    pub fn box_select<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection.borrow_mut().replace_selection(ids);
    }

    pub fn clear_selection(&self) {
        self.selection.borrow_mut().clear();
    }
}
