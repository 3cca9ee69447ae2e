//! Transactional undo/redo over the graph store.
//!
//! [`HistoryManager`] owns the [`GraphStore`] and is the only mutation path
//! the rest of the engine uses. Every call to [`transact`](HistoryManager::transact)
//! snapshots the pre-mutation state — nodes and connections together, one
//! undo step — unless an action is open, in which case the whole bracketed
//! sequence collapses into a single step. A separate
//! [`write_raw`](HistoryManager::write_raw) path exists for
//! synchronization-only updates that must not appear in undo history.
//!
//! # Example
//!
//! ```ignore
//! let mut history = HistoryManager::new();
//! history.transact(|store| store.insert_node(node))?;
//!
//! history.start_action();
//! history.transact(|store| { /* drag step */ });
//! history.transact(|store| { /* drag step */ });
//! history.end_action(); // one undo step for the whole drag
//!
//! history.undo();
//! ```

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::store::GraphStore;

/// Default bound on the undo stack; the oldest snapshot is evicted beyond it.
pub const DEFAULT_UNDO_CAPACITY: usize = 50;

/// Context passed to a bound change observer.
pub struct ChangeNotice<'a> {
    /// The store after the change.
    pub store: &'a GraphStore,
    /// True while a restore is replacing state wholesale. Synchronization
    /// collaborators must suppress their own writes for this window.
    pub restoring: bool,
}

type Observer = Box<dyn Fn(ChangeNotice<'_>)>;

/// Owns the graph state and its undo/redo transaction log.
pub struct HistoryManager {
    store: GraphStore,
    undo: VecDeque<GraphStore>,
    redo: Vec<GraphStore>,
    capacity: usize,
    /// Pre-action snapshot while an action batch is open.
    batch: Option<GraphStore>,
    batch_dirty: bool,
    restoring: bool,
    observer: Option<Observer>,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::from_store(GraphStore::new())
    }

    /// Wrap an existing store, e.g. one rebuilt by a persistence
    /// collaborator. The loaded state becomes the undo floor.
    pub fn from_store(store: GraphStore) -> Self {
        Self {
            store,
            undo: VecDeque::new(),
            redo: Vec::new(),
            capacity: DEFAULT_UNDO_CAPACITY,
            batch: None,
            batch_dirty: false,
            restoring: false,
            observer: None,
        }
    }

    /// Set the undo stack bound (default [`DEFAULT_UNDO_CAPACITY`]).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Read access to the current graph state.
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// True while [`undo`](Self::undo)/[`redo`](Self::redo) is replacing
    /// state. Also reported on the [`ChangeNotice`] so observers need not
    /// reach back into the manager.
    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    /// True between `start_action` and `end_action`.
    pub fn is_batching(&self) -> bool {
        self.batch.is_some()
    }

    /// Bind the single change observer, replacing any previous one.
    ///
    /// The observer fires after every committed mutation and after every
    /// restore; it does not fire for `write_raw` updates (the writer already
    /// knows the state it wrote).
    pub fn bind_observer<F>(&mut self, observer: F)
    where
        F: Fn(ChangeNotice<'_>) + 'static,
    {
        self.observer = Some(Box::new(observer));
    }

    // === Mutation paths ===

    /// Apply a mutation through the history pipeline.
    ///
    /// Outside an action this snapshots the pre-mutation state as one undo
    /// step. Inside an action it only marks the batch dirty. Either way the
    /// redo stack is cleared and the observer notified after the closure
    /// runs: snapshot, mutate, notify, in that order.
    pub fn transact<R>(&mut self, mutate: impl FnOnce(&mut GraphStore) -> R) -> R {
        if self.batch.is_some() {
            self.batch_dirty = true;
        } else {
            let snapshot = self.store.clone();
            self.push_undo(snapshot);
        }
        self.redo.clear();
        let result = mutate(&mut self.store);
        self.notify();
        result
    }

    /// Apply a synchronization-only update: no snapshot, no redo clear, no
    /// observer notification. Mirrored external state must not pollute undo
    /// history.
    pub fn write_raw<R>(&mut self, write: impl FnOnce(&mut GraphStore) -> R) -> R {
        write(&mut self.store)
    }

    /// Open an action: suppress per-call snapshotting until
    /// [`end_action`](Self::end_action), collapsing every mutation in
    /// between into one undo step. Opening twice is reported and ignored.
    pub fn start_action(&mut self) {
        if self.batch.is_some() {
            warn!("start_action: an action is already open");
            return;
        }
        self.batch = Some(self.store.clone());
        self.batch_dirty = false;
    }

    /// Close the open action. If anything mutated, the pre-action snapshot
    /// becomes a single undo step; an untouched action leaves no trace.
    pub fn end_action(&mut self) {
        match self.batch.take() {
            Some(snapshot) if self.batch_dirty => self.push_undo(snapshot),
            Some(_) => {}
            None => warn!("end_action: no open action"),
        }
        self.batch_dirty = false;
    }

    // === Restore paths ===

    /// Restore the previous snapshot. An empty stack is a no-op, reported
    /// as `false` rather than raised.
    pub fn undo(&mut self) -> bool {
        if self.batch.is_some() {
            warn!("undo ignored while an action is open");
            return false;
        }
        let Some(snapshot) = self.undo.pop_back() else {
            debug!("undo: stack empty");
            return false;
        };
        self.restoring = true;
        let replaced = std::mem::replace(&mut self.store, snapshot);
        self.redo.push(replaced);
        self.notify();
        self.restoring = false;
        true
    }

    /// Inverse of [`undo`](Self::undo).
    pub fn redo(&mut self) -> bool {
        if self.batch.is_some() {
            warn!("redo ignored while an action is open");
            return false;
        }
        let Some(snapshot) = self.redo.pop() else {
            debug!("redo: stack empty");
            return false;
        };
        self.restoring = true;
        let replaced = std::mem::replace(&mut self.store, snapshot);
        self.push_undo(replaced);
        self.notify();
        self.restoring = false;
        true
    }

    fn push_undo(&mut self, snapshot: GraphStore) {
        if self.undo.len() == self.capacity {
            self.undo.pop_front();
        }
        self.undo.push_back(snapshot);
    }

    fn notify(&self) {
        if let Some(observer) = &self.observer {
            observer(ChangeNotice {
                store: &self.store,
                restoring: self.restoring,
            });
        }
    }
}
