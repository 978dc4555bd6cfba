//! The wrapper node: interception over one (sub)object of a document.
//!
//! An [`ObservedNode`] presents the illusion of direct access to a location
//! in the shared document while instrumenting every access: reads register
//! dependencies with the tree's [`ObserverManager`](crate::ObserverManager),
//! writes and deletes are
//! applied to the raw document and logged as replayable diff records, and
//! nested containers are wrapped lazily into cached child nodes on first
//! read.
//!
//! A node never holds a reference into the document. Its raw target is
//! re-derived on every operation by resolving `path` against the shared
//! document cell, and the diff records it emits re-resolve the same way at
//! replay time, so both the node and its records stay correct when other
//! parts of the tree are rewritten underneath them.
//!
//! States per node: `Live` then `Disposed` (terminal). Every operation
//! checks liveness first and fails with [`ObserveError::UseAfterDispose`]
//! on a disposed node. Disposing a node does not cascade to its cached
//! children.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use json_observe_path::{child_path, format_path, get_path_mut, value_at_path, Path, PathStep};
use serde_json::Value;
use thiserror::Error;

use crate::array::{self, ListMethod, SpliceMutation};
use crate::diff::{DiffKind, DiffRecord, ReplayError, ReplayFn};
use crate::scope::ScopeManager;
use crate::{is_wrappable, RootId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObserveError {
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    #[error("node used after dispose")]
    UseAfterDispose,
    #[error("path does not resolve: {0}")]
    PathResolution(String),
    #[error("not a list node")]
    NotList,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// What a read produced.
#[derive(Debug, Clone)]
pub enum Access {
    /// A wrappable child, lazily created and cached by the parent.
    Node(ObservedNode),
    /// A scalar raw value; `Null` when the key is absent.
    Value(Value),
    /// A list-mutation override shadowing the generic lookup.
    Hook(ListMethod),
}

impl Access {
    pub fn into_node(self) -> Option<ObservedNode> {
        match self {
            Access::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Access::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn hook(&self) -> Option<ListMethod> {
        match self {
            Access::Hook(method) => Some(*method),
            _ => None,
        }
    }
}

/// A value accepted by [`ObservedNode::set`]: a raw value, or another
/// wrapper node, which is unwrapped to a snapshot of its raw target before
/// storage so the document never holds a wrapper.
pub enum WriteValue {
    Raw(Value),
    Node(ObservedNode),
}

impl From<Value> for WriteValue {
    fn from(value: Value) -> Self {
        WriteValue::Raw(value)
    }
}

impl From<ObservedNode> for WriteValue {
    fn from(node: ObservedNode) -> Self {
        WriteValue::Node(node)
    }
}

impl From<&ObservedNode> for WriteValue {
    fn from(node: &ObservedNode) -> Self {
        WriteValue::Node(node.clone())
    }
}

struct NodeState {
    doc: Rc<RefCell<Value>>,
    root: RootId,
    scope: Rc<ScopeManager>,
    path: Path,
    children: RefCell<HashMap<PathStep, ObservedNode>>,
    list: bool,
    live: Cell<bool>,
}

/// A cheap-to-clone handle on one wrapper node. Clones share state, so
/// identity is handle-shared-state identity ([`same_as`](Self::same_as)).
#[derive(Clone)]
pub struct ObservedNode {
    state: Rc<NodeState>,
}

impl ObservedNode {
    pub(crate) fn new_root(target: Value, scope: Rc<ScopeManager>) -> Self {
        let list = target.is_array();
        ObservedNode {
            state: Rc::new(NodeState {
                doc: Rc::new(RefCell::new(target)),
                root: RootId::next(),
                scope,
                path: Vec::new(),
                children: RefCell::new(HashMap::new()),
                list,
                live: Cell::new(true),
            }),
        }
    }

    /// A child is born bound to its parent's document, root and scope; this
    /// is the only integration point, so descendants of a standalone tree
    /// are never adopted into another one.
    fn new_child(&self, path: Path, list: bool) -> ObservedNode {
        ObservedNode {
            state: Rc::new(NodeState {
                doc: Rc::clone(&self.state.doc),
                root: self.state.root,
                scope: Rc::clone(&self.state.scope),
                path,
                children: RefCell::new(HashMap::new()),
                list,
                live: Cell::new(true),
            }),
        }
    }

    fn ensure_live(&self) -> Result<(), ObserveError> {
        if self.state.live.get() {
            Ok(())
        } else {
            Err(ObserveError::UseAfterDispose)
        }
    }

    fn resolve<T>(&self, f: impl FnOnce(&Value) -> T) -> Result<T, ObserveError> {
        let doc = self.state.doc.borrow();
        let target = value_at_path(&doc, &self.state.path)
            .ok_or_else(|| ObserveError::PathResolution(format_path(&self.state.path)))?;
        Ok(f(target))
    }

    fn resolve_mut<T>(&self, f: impl FnOnce(&mut Value) -> T) -> Result<T, ObserveError> {
        let mut doc = self.state.doc.borrow_mut();
        let target = get_path_mut(&mut doc, &self.state.path)
            .ok_or_else(|| ObserveError::PathResolution(format_path(&self.state.path)))?;
        Ok(f(target))
    }

    /// Read `key`, registering a dependency `(root, path + [key])` first.
    ///
    /// Hook names on list nodes shadow everything else; then the child
    /// cache; then the raw document. A wrappable raw value becomes a new
    /// cached child node, a scalar comes back as-is, and an absent key
    /// reads as `Null`.
    pub fn get(&self, key: impl Into<PathStep>) -> Result<Access, ObserveError> {
        self.ensure_live()?;
        let key = key.into();
        let full = child_path(&self.state.path, key.clone());
        self.state
            .scope
            .observer
            .add_dependency(self.state.root, full.clone());

        if self.state.list {
            if let PathStep::Key(name) = &key {
                if let Some(method) = ListMethod::from_name(name) {
                    return Ok(Access::Hook(method));
                }
            }
        }

        if let Some(child) = self.state.children.borrow().get(&key) {
            return Ok(Access::Node(child.clone()));
        }

        let raw = self.resolve(|target| read_step(target, &key).cloned())?;
        let Some(raw) = raw else {
            return Ok(Access::Value(Value::Null));
        };
        if is_wrappable(&raw) {
            let child = self.new_child(full, raw.is_array());
            self.state
                .children
                .borrow_mut()
                .insert(key, child.clone());
            Ok(Access::Node(child))
        } else {
            Ok(Access::Value(raw))
        }
    }

    /// Report raw containment of `key`, registering the same dependency as
    /// [`get`](Self::get). Never creates children.
    pub fn has(&self, key: impl Into<PathStep>) -> Result<bool, ObserveError> {
        self.ensure_live()?;
        let key = key.into();
        self.state
            .scope
            .observer
            .add_dependency(self.state.root, child_path(&self.state.path, key.clone()));
        self.resolve(|target| contains_step(target, &key))
    }

    /// Write `value` at `key` and log a replayable record.
    ///
    /// A cached child at `key` is disposed and dropped: the old nested
    /// subtree is no longer reachable through this node. Array writes past
    /// the end extend the array with `Null`; undo truncates back.
    pub fn set(&self, key: impl Into<PathStep>, value: impl Into<WriteValue>) -> Result<(), ObserveError> {
        self.ensure_live()?;
        let key = key.into();
        let value = match value.into() {
            WriteValue::Raw(value) => value,
            WriteValue::Node(node) => node.raw()?,
        };

        if let Some(child) = self.state.children.borrow_mut().remove(&key) {
            child.dispose();
        }

        let undo_plan = self.resolve_mut(|target| -> Result<SetUndo, ObserveError> {
            let plan = if let Some(old) = read_step(target, &key) {
                SetUndo::Restore(old.clone())
            } else {
                match (&key, &*target) {
                    (PathStep::Key(_), Value::Object(_)) => SetUndo::Remove,
                    (PathStep::Index(_), Value::Array(arr)) => SetUndo::Truncate(arr.len()),
                    _ => return Err(step_mismatch(&key)),
                }
            };
            write_step(target, &key, value.clone()).map_err(|ShapeMismatch| step_mismatch(&key))?;
            Ok(plan)
        })??;

        self.state.scope.actions.add_diff(set_record(
            Rc::clone(&self.state.doc),
            self.state.root,
            self.state.path.clone(),
            key,
            value,
            undo_plan,
        ));
        Ok(())
    }

    /// Delete `key` and log a replayable record.
    ///
    /// Object keys are removed; in-bounds array slots are cleared to `Null`
    /// in place (structural removal is the `splice` hook's job). A cached
    /// child at `key` is disposed. Deleting an absent key succeeds and logs
    /// nothing.
    pub fn delete(&self, key: impl Into<PathStep>) -> Result<bool, ObserveError> {
        self.ensure_live()?;
        let key = key.into();

        if let Some(child) = self.state.children.borrow_mut().remove(&key) {
            child.dispose();
        }

        let old = self.resolve_mut(|target| {
            remove_step(target, &key).map_err(|ShapeMismatch| step_mismatch(&key))
        })??;
        let Some(old) = old else {
            return Ok(true);
        };

        self.state.scope.actions.add_diff(delete_record(
            Rc::clone(&self.state.doc),
            self.state.root,
            self.state.path.clone(),
            key,
            old,
        ));
        Ok(true)
    }

    /// Always fails: property redefinition has no diff or tracking
    /// semantics and would break identity invariants.
    pub fn define_property(
        &self,
        _key: impl Into<PathStep>,
        _descriptor: Value,
    ) -> Result<(), ObserveError> {
        self.ensure_live()?;
        Err(ObserveError::Unsupported("define_property"))
    }

    /// Always fails, like [`define_property`](Self::define_property).
    pub fn set_prototype(&self, _prototype: Value) -> Result<(), ObserveError> {
        self.ensure_live()?;
        Err(ObserveError::Unsupported("set_prototype"))
    }

    /// Enumerate the raw target's own keys. Not tracked as a dependency.
    pub fn keys(&self) -> Result<Vec<PathStep>, ObserveError> {
        self.ensure_live()?;
        self.resolve(|target| match target {
            Value::Object(map) => map.keys().map(|key| PathStep::Key(key.clone())).collect(),
            Value::Array(arr) => (0..arr.len()).map(PathStep::Index).collect(),
            _ => Vec::new(),
        })
    }

    /// Raw value at `key` without dependency recording or child creation.
    pub fn peek(&self, key: impl Into<PathStep>) -> Result<Option<Value>, ObserveError> {
        self.ensure_live()?;
        let key = key.into();
        self.resolve(|target| read_step(target, &key).cloned())
    }

    /// Invoke a list-mutation hook previously obtained from
    /// [`get`](Self::get).
    pub fn invoke(&self, method: ListMethod, args: Vec<Value>) -> Result<Value, ObserveError> {
        self.ensure_live()?;
        if !self.state.list {
            return Err(ObserveError::NotList);
        }
        let path = &self.state.path;
        let outcome = self.resolve_mut(|target| match target {
            Value::Array(arr) => array::run(method, &args, arr),
            _ => Err(ObserveError::PathResolution(format_path(path))),
        })??;

        if let Some(mutation) = outcome.mutation {
            self.prune_indices_from(mutation.start);
            self.state.scope.actions.add_diff(splice_record(
                Rc::clone(&self.state.doc),
                self.state.root,
                self.state.path.clone(),
                mutation,
            ));
        }
        Ok(outcome.returns)
    }

    /// Invalidate this node. Idempotent; cached children stay live.
    pub fn dispose(&self) {
        self.state.live.set(false);
    }

    pub fn is_live(&self) -> bool {
        self.state.live.get()
    }

    pub fn is_list(&self) -> bool {
        self.state.list
    }

    pub fn path(&self) -> &[PathStep] {
        &self.state.path
    }

    pub fn root_id(&self) -> RootId {
        self.state.root
    }

    pub fn scope(&self) -> &Rc<ScopeManager> {
        &self.state.scope
    }

    /// Whether two handles are the same node.
    pub fn same_as(&self, other: &ObservedNode) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Snapshot of the raw target this node currently resolves to.
    pub fn raw(&self) -> Result<Value, ObserveError> {
        self.ensure_live()?;
        self.resolve(Value::clone)
    }

    /// Dispose and drop cached index children at or beyond `start`; their
    /// positions shifted or vanished.
    fn prune_indices_from(&self, start: usize) {
        self.state.children.borrow_mut().retain(|step, child| {
            let shifted = matches!(step, PathStep::Index(index) if *index >= start);
            if shifted {
                child.dispose();
            }
            !shifted
        });
    }
}

impl fmt::Debug for ObservedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservedNode")
            .field("root", &self.state.root)
            .field("path", &self.state.path)
            .field("list", &self.state.list)
            .field("live", &self.state.live.get())
            .finish()
    }
}

/// How to reverse a keyed write.
enum SetUndo {
    /// The key held `old`; write it back.
    Restore(Value),
    /// The object key did not exist; remove it.
    Remove,
    /// The write extended an array; truncate back to the old length.
    Truncate(usize),
}

struct ShapeMismatch;

fn step_mismatch(step: &PathStep) -> ObserveError {
    ObserveError::InvalidArgument(format!("step {step} does not fit the target container"))
}

fn read_step<'a>(target: &'a Value, step: &PathStep) -> Option<&'a Value> {
    match (step, target) {
        (PathStep::Key(key), Value::Object(map)) => map.get(key),
        (PathStep::Index(index), Value::Array(arr)) => arr.get(*index),
        _ => None,
    }
}

fn contains_step(target: &Value, step: &PathStep) -> bool {
    match (step, target) {
        (PathStep::Key(key), Value::Object(map)) => map.contains_key(key),
        (PathStep::Index(index), Value::Array(arr)) => *index < arr.len(),
        _ => false,
    }
}

fn write_step(target: &mut Value, step: &PathStep, value: Value) -> Result<(), ShapeMismatch> {
    match (step, target) {
        (PathStep::Key(key), Value::Object(map)) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (PathStep::Index(index), Value::Array(arr)) => {
            if *index >= arr.len() {
                arr.resize(*index + 1, Value::Null);
            }
            arr[*index] = value;
            Ok(())
        }
        _ => Err(ShapeMismatch),
    }
}

/// Remove one step: object key removal, in-bounds array slot cleared to
/// `Null`. `Ok(None)` when the step was absent.
fn remove_step(target: &mut Value, step: &PathStep) -> Result<Option<Value>, ShapeMismatch> {
    match (step, target) {
        (PathStep::Key(key), Value::Object(map)) => Ok(map.remove(key)),
        (PathStep::Index(index), Value::Array(arr)) => Ok(arr
            .get_mut(*index)
            .map(|slot| std::mem::replace(slot, Value::Null))),
        _ => Err(ShapeMismatch),
    }
}

/// A replay closure that re-resolves `parent` against the live document on
/// every run, then hands the container to `op`.
fn replay_at(
    doc: Rc<RefCell<Value>>,
    parent: Path,
    op: impl Fn(&mut Value) -> Result<(), ReplayError> + 'static,
) -> ReplayFn {
    Box::new(move || {
        let mut doc = doc.borrow_mut();
        let target = get_path_mut(&mut doc, &parent)
            .ok_or_else(|| ReplayError::PathResolution(format_path(&parent)))?;
        op(target)
    })
}

fn replay_mismatch(parent: &[PathStep], step: &PathStep) -> ReplayError {
    ReplayError::PathResolution(format_path(&child_path(parent, step.clone())))
}

fn set_record(
    doc: Rc<RefCell<Value>>,
    root: RootId,
    parent: Path,
    key: PathStep,
    value: Value,
    undo_plan: SetUndo,
) -> DiffRecord {
    let full = child_path(&parent, key.clone());
    let apply = {
        let (parent, key, value) = (parent.clone(), key.clone(), value);
        replay_at(Rc::clone(&doc), parent.clone(), move |target| {
            write_step(target, &key, value.clone()).map_err(|ShapeMismatch| replay_mismatch(&parent, &key))
        })
    };
    let undo = {
        let (parent, key) = (parent.clone(), key);
        replay_at(doc, parent.clone(), move |target| match &undo_plan {
            SetUndo::Restore(old) => write_step(target, &key, old.clone())
                .map_err(|ShapeMismatch| replay_mismatch(&parent, &key)),
            SetUndo::Remove => match (&key, target) {
                (PathStep::Key(name), Value::Object(map)) => {
                    map.remove(name);
                    Ok(())
                }
                _ => Err(replay_mismatch(&parent, &key)),
            },
            SetUndo::Truncate(len) => match target {
                Value::Array(arr) => {
                    arr.truncate(*len);
                    Ok(())
                }
                _ => Err(replay_mismatch(&parent, &key)),
            },
        })
    };
    DiffRecord::new(root, full, DiffKind::Set, apply, undo)
}

fn delete_record(
    doc: Rc<RefCell<Value>>,
    root: RootId,
    parent: Path,
    key: PathStep,
    old: Value,
) -> DiffRecord {
    let full = child_path(&parent, key.clone());
    let apply = {
        let (parent, key) = (parent.clone(), key.clone());
        replay_at(Rc::clone(&doc), parent.clone(), move |target| {
            remove_step(target, &key)
                .map(|_| ())
                .map_err(|ShapeMismatch| replay_mismatch(&parent, &key))
        })
    };
    let undo = {
        let (parent, key) = (parent.clone(), key);
        replay_at(doc, parent.clone(), move |target| {
            write_step(target, &key, old.clone()).map_err(|ShapeMismatch| replay_mismatch(&parent, &key))
        })
    };
    DiffRecord::new(root, full, DiffKind::Set, apply, undo)
}

/// Splice records carry the array's own path: any index below it may have
/// shifted, so invalidation is against the whole list.
fn splice_record(
    doc: Rc<RefCell<Value>>,
    root: RootId,
    path: Path,
    mutation: SpliceMutation,
) -> DiffRecord {
    let SpliceMutation {
        start,
        removed,
        inserted,
    } = mutation;
    let apply = {
        let (path, removed, inserted) = (path.clone(), removed.clone(), inserted.clone());
        replay_at(Rc::clone(&doc), path.clone(), move |target| {
            let arr = as_array(target, &path)?;
            if start + removed.len() > arr.len() {
                return Err(ReplayError::PathResolution(format_path(&path)));
            }
            arr.splice(start..start + removed.len(), inserted.iter().cloned());
            Ok(())
        })
    };
    let undo = {
        let path = path.clone();
        replay_at(doc, path.clone(), move |target| {
            let arr = as_array(target, &path)?;
            if start + inserted.len() > arr.len() {
                return Err(ReplayError::PathResolution(format_path(&path)));
            }
            arr.splice(start..start + inserted.len(), removed.iter().cloned());
            Ok(())
        })
    };
    DiffRecord::new(root, path, DiffKind::Splice, apply, undo)
}

fn as_array<'a>(target: &'a mut Value, path: &[PathStep]) -> Result<&'a mut Vec<Value>, ReplayError> {
    match target {
        Value::Array(arr) => Ok(arr),
        _ => Err(ReplayError::PathResolution(format_path(path))),
    }
}
