//! Reversible diff records appended to the action log.
//!
//! A record never captures a reference to the mutated location. Its
//! `apply`/`undo` closures re-resolve the record's path against the shared
//! root document each time they run, so records stay correct when replayed
//! long after the original mutation, even if the wrapper tree was rebuilt
//! in between.

use std::fmt;

use json_observe_path::Path;
use thiserror::Error;

use crate::RootId;

/// Discriminates what produced a record: a keyed write/delete, or a
/// structural list mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Set,
    Splice,
}

/// A replay closure. Resolution happens inside the closure at call time.
pub type ReplayFn = Box<dyn Fn() -> Result<(), ReplayError>>;

/// One logged mutation, replayable in either direction.
pub struct DiffRecord {
    pub target: RootId,
    pub path: Path,
    pub kind: DiffKind,
    apply: ReplayFn,
    undo: ReplayFn,
}

impl DiffRecord {
    pub fn new(target: RootId, path: Path, kind: DiffKind, apply: ReplayFn, undo: ReplayFn) -> Self {
        DiffRecord {
            target,
            path,
            kind,
            apply,
            undo,
        }
    }

    /// Re-apply the mutation at the current live location.
    pub fn apply(&self) -> Result<(), ReplayError> {
        (self.apply)()
    }

    /// Reverse the mutation at the current live location.
    pub fn undo(&self) -> Result<(), ReplayError> {
        (self.undo)()
    }
}

impl fmt::Debug for DiffRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffRecord")
            .field("target", &self.target)
            .field("path", &self.path)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("path does not resolve: {0}")]
    PathResolution(String),
}
