//! Mutation-observing wrapper nodes over JSON documents.
//!
//! [`observe`] wraps a root `serde_json::Value` and returns the root
//! [`ObservedNode`] of a wrapper tree. Every read through a node registers
//! a dependency of the active observation scope, every write/delete is
//! applied to the raw document and appended to the action log as a
//! reversible, path-relative diff record, and nested objects/arrays are
//! wrapped lazily on first access.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use json_observe::{observe, ScopeManager};
//! use serde_json::json;
//!
//! let scope = Rc::new(ScopeManager::new());
//! let root = observe(json!({"a": {"b": 1}}), Rc::clone(&scope));
//!
//! let a = root.get("a").unwrap().into_node().unwrap();
//! a.set("b", json!(2)).unwrap();
//! assert_eq!(root.raw().unwrap(), json!({"a": {"b": 2}}));
//!
//! scope.actions.undo().unwrap();
//! assert_eq!(root.raw().unwrap(), json!({"a": {"b": 1}}));
//! ```

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

pub mod array;
pub mod diff;
pub mod node;
pub mod scope;

pub use array::ListMethod;
pub use diff::{DiffKind, DiffRecord, ReplayError, ReplayFn};
pub use json_observe_path::{Path, PathStep};
pub use node::{Access, ObserveError, ObservedNode, WriteValue};
pub use scope::{ActionManager, Dependency, ObserverManager, ScopeManager};

/// Identity of the top-of-tree raw document a wrapper tree observes.
///
/// All path-relative records (dependencies and diffs) are expressed
/// against a root id, and every node of one tree carries the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RootId(u64);

impl RootId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        RootId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Returns `true` when a value is wrapped recursively on read.
///
/// Objects and arrays are wrapped; scalars are returned as-is.
pub fn is_wrappable(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Wrap a root value, obtaining the root wrapper node of a new tree.
pub fn observe(target: Value, scope: Rc<ScopeManager>) -> ObservedNode {
    ObservedNode::new_root(target, scope)
}

/// Returns the crate version at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_wrappable() {
        assert!(is_wrappable(&json!({})));
        assert!(is_wrappable(&json!([1, 2])));
        assert!(!is_wrappable(&json!(null)));
        assert!(!is_wrappable(&json!(1)));
        assert!(!is_wrappable(&json!("s")));
        assert!(!is_wrappable(&json!(true)));
    }

    #[test]
    fn test_root_ids_are_distinct() {
        let scope = Rc::new(ScopeManager::new());
        let a = observe(json!({}), Rc::clone(&scope));
        let b = observe(json!({}), scope);
        assert_ne!(a.root_id(), b.root_id());
    }
}
