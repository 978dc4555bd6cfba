//! List-mutation hooks for array-shaped nodes.
//!
//! A fixed set of method names shadows the generic property lookup on list
//! nodes: `get("push")` returns [`Access::Hook`](crate::Access::Hook)
//! instead of a child or raw value, and the caller invokes the hook through
//! [`ObservedNode::invoke`](crate::ObservedNode::invoke). Each hook performs
//! the raw mutation and reports it as a single splice so the node can log
//! one replayable record and drop the index children whose positions
//! shifted.

use std::fmt;

use serde_json::Value;

use crate::node::ObserveError;

/// A list-mutation override. Shadows generic lookup on list nodes only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListMethod {
    Push,
    Pop,
    Shift,
    Unshift,
    Splice,
}

impl ListMethod {
    pub const ALL: [ListMethod; 5] = [
        ListMethod::Push,
        ListMethod::Pop,
        ListMethod::Shift,
        ListMethod::Unshift,
        ListMethod::Splice,
    ];

    /// The name-containment check consulted before generic lookup.
    pub fn from_name(name: &str) -> Option<ListMethod> {
        match name {
            "push" => Some(ListMethod::Push),
            "pop" => Some(ListMethod::Pop),
            "shift" => Some(ListMethod::Shift),
            "unshift" => Some(ListMethod::Unshift),
            "splice" => Some(ListMethod::Splice),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ListMethod::Push => "push",
            ListMethod::Pop => "pop",
            ListMethod::Shift => "shift",
            ListMethod::Unshift => "unshift",
            ListMethod::Splice => "splice",
        }
    }
}

impl fmt::Display for ListMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One structural list mutation, normalized to splice form: at `start`,
/// `removed` elements came out and `inserted` elements went in.
#[derive(Debug)]
pub(crate) struct SpliceMutation {
    pub start: usize,
    pub removed: Vec<Value>,
    pub inserted: Vec<Value>,
}

/// What a hook invocation produced: the mutation to log (if the call
/// changed anything) and the value returned to the caller.
#[derive(Debug)]
pub(crate) struct HookOutcome {
    pub mutation: Option<SpliceMutation>,
    pub returns: Value,
}

/// Perform a hook's raw mutation on `arr` and report it.
pub(crate) fn run(
    method: ListMethod,
    args: &[Value],
    arr: &mut Vec<Value>,
) -> Result<HookOutcome, ObserveError> {
    match method {
        ListMethod::Push => {
            let start = arr.len();
            arr.extend(args.iter().cloned());
            Ok(HookOutcome {
                mutation: (!args.is_empty()).then(|| SpliceMutation {
                    start,
                    removed: Vec::new(),
                    inserted: args.to_vec(),
                }),
                returns: Value::from(arr.len()),
            })
        }
        ListMethod::Pop => match arr.pop() {
            None => Ok(HookOutcome {
                mutation: None,
                returns: Value::Null,
            }),
            Some(last) => Ok(HookOutcome {
                mutation: Some(SpliceMutation {
                    start: arr.len(),
                    removed: vec![last.clone()],
                    inserted: Vec::new(),
                }),
                returns: last,
            }),
        },
        ListMethod::Shift => {
            if arr.is_empty() {
                return Ok(HookOutcome {
                    mutation: None,
                    returns: Value::Null,
                });
            }
            let first = arr.remove(0);
            Ok(HookOutcome {
                mutation: Some(SpliceMutation {
                    start: 0,
                    removed: vec![first.clone()],
                    inserted: Vec::new(),
                }),
                returns: first,
            })
        }
        ListMethod::Unshift => {
            arr.splice(0..0, args.iter().cloned());
            Ok(HookOutcome {
                mutation: (!args.is_empty()).then(|| SpliceMutation {
                    start: 0,
                    removed: Vec::new(),
                    inserted: args.to_vec(),
                }),
                returns: Value::from(arr.len()),
            })
        }
        ListMethod::Splice => {
            if args.is_empty() {
                return Ok(HookOutcome {
                    mutation: None,
                    returns: Value::Array(Vec::new()),
                });
            }
            let start = usize_arg(&args[0])?.min(arr.len());
            let delete_count = match args.get(1) {
                Some(count) => usize_arg(count)?.min(arr.len() - start),
                None => arr.len() - start,
            };
            let items = args.get(2..).unwrap_or_default().to_vec();
            let removed: Vec<Value> = arr
                .splice(start..start + delete_count, items.iter().cloned())
                .collect();
            Ok(HookOutcome {
                mutation: (!removed.is_empty() || !items.is_empty()).then(|| SpliceMutation {
                    start,
                    removed: removed.clone(),
                    inserted: items,
                }),
                returns: Value::Array(removed),
            })
        }
    }
}

fn usize_arg(value: &Value) -> Result<usize, ObserveError> {
    value
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| ObserveError::InvalidArgument(format!("expected a non-negative integer, got {value}")))
}
