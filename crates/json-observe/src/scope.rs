//! Observation scopes and the reversible action log.
//!
//! A [`ScopeManager`] is the per-tree context every wrapper node talks to:
//! reads go to the [`ObserverManager`], writes and deletes go to the
//! [`ActionManager`]. One manager is shared (`Rc`) by every node of a tree
//! and may be shared across trees.

use std::cell::{Cell, RefCell};

use json_observe_path::{is_prefix, Path, PathStep};

use crate::diff::{DiffRecord, ReplayError};
use crate::RootId;

/// A registered read: the observing scope depends on `path` under `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub root: RootId,
    pub path: Path,
}

impl Dependency {
    /// Whether a write at `path` under `root` invalidates this read.
    ///
    /// True when one path is a prefix of the other: writing `/a` replaces
    /// everything below it, and writing `/a/b/c` changes what a read of
    /// `/a/b` observed.
    pub fn is_affected_by(&self, root: RootId, path: &[PathStep]) -> bool {
        self.root == root && (is_prefix(path, &self.path) || is_prefix(&self.path, path))
    }
}

/// Records read dependencies against the innermost active scope.
///
/// With no active scope, [`add_dependency`](Self::add_dependency) is a
/// no-op, so untracked reads cost nothing.
#[derive(Default)]
pub struct ObserverManager {
    scopes: RefCell<Vec<Vec<Dependency>>>,
}

impl ObserverManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dependency(&self, root: RootId, path: Path) {
        if let Some(scope) = self.scopes.borrow_mut().last_mut() {
            scope.push(Dependency { root, path });
        }
    }

    /// Run `f` inside a fresh observation scope and return the
    /// dependencies it recorded. Scopes nest; reads land in the innermost
    /// scope only.
    pub fn track<T>(&self, f: impl FnOnce() -> T) -> (T, Vec<Dependency>) {
        self.scopes.borrow_mut().push(Vec::new());
        let out = f();
        let deps = self.scopes.borrow_mut().pop().unwrap_or_default();
        (out, deps)
    }

    pub fn is_tracking(&self) -> bool {
        !self.scopes.borrow().is_empty()
    }
}

/// Ordered log of diff records with an undo/redo cursor.
///
/// The cursor sits between the applied prefix and the undone tail.
/// Appending a record truncates the tail, so a new write after an undo
/// forgets the redo history.
#[derive(Default)]
pub struct ActionManager {
    records: RefCell<Vec<DiffRecord>>,
    cursor: Cell<usize>,
}

impl ActionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. The mutation it describes has already been applied
    /// by the caller; the log only gains the ability to replay it.
    pub fn add_diff(&self, record: DiffRecord) {
        let mut records = self.records.borrow_mut();
        records.truncate(self.cursor.get());
        records.push(record);
        self.cursor.set(records.len());
    }

    /// Reverse the most recent applied record. Returns `Ok(false)` at the
    /// beginning of the log. A replay failure leaves the cursor unmoved.
    pub fn undo(&self) -> Result<bool, ReplayError> {
        let records = self.records.borrow();
        let cursor = self.cursor.get();
        let Some(record) = cursor.checked_sub(1).and_then(|i| records.get(i)) else {
            return Ok(false);
        };
        record.undo()?;
        self.cursor.set(cursor - 1);
        Ok(true)
    }

    /// Re-apply the most recently undone record. Returns `Ok(false)` at
    /// the end of the log. A replay failure leaves the cursor unmoved.
    pub fn redo(&self) -> Result<bool, ReplayError> {
        let records = self.records.borrow();
        let cursor = self.cursor.get();
        let Some(record) = records.get(cursor) else {
            return Ok(false);
        };
        record.apply()?;
        self.cursor.set(cursor + 1);
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// Position of the undo/redo cursor: the number of applied records.
    pub fn cursor(&self) -> usize {
        self.cursor.get()
    }

    /// Inspect a record's envelope (target, path, kind) without replaying.
    pub fn with_record<T>(&self, index: usize, f: impl FnOnce(&DiffRecord) -> T) -> Option<T> {
        self.records.borrow().get(index).map(f)
    }
}

/// The dependency tracker + action log pair a wrapper tree runs against.
#[derive(Default)]
pub struct ScopeManager {
    pub observer: ObserverManager,
    pub actions: ActionManager,
}

impl ScopeManager {
    pub fn new() -> Self {
        Self::default()
    }
}
