//! Path steps and document resolution for json-observe.
//!
//! A wrapper-node tree addresses locations in a `serde_json::Value`
//! document by *paths*: ordered sequences of [`PathStep`]s from the root.
//! This crate holds the path vocabulary shared by the wrapper core and by
//! replayable diff records, plus the resolution helpers both use to
//! re-derive "the current live value at this path" instead of holding on
//! to references.
//!
//! # Example
//!
//! ```
//! use json_observe_path::{format_path, value_at_path, PathStep};
//! use serde_json::json;
//!
//! let doc = json!({"a": {"b": [10, 20]}});
//! let path = vec![
//!     PathStep::from("a"),
//!     PathStep::from("b"),
//!     PathStep::from(1usize),
//! ];
//! assert_eq!(value_at_path(&doc, &path), Some(&json!(20)));
//! assert_eq!(format_path(&path), "/a/b/1");
//! ```

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// One step in a path: an object property or an array slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathStep {
    Key(String),
    Index(usize),
}

/// A path from the document root to a location.
pub type Path = Vec<PathStep>;

impl From<&str> for PathStep {
    fn from(key: &str) -> Self {
        PathStep::Key(key.to_string())
    }
}

impl From<String> for PathStep {
    fn from(key: String) -> Self {
        PathStep::Key(key)
    }
}

impl From<usize> for PathStep {
    fn from(index: usize) -> Self {
        PathStep::Index(index)
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Key(key) => f.write_str(&escape_component(key)),
            PathStep::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Escapes a path component for pointer-style display.
///
/// `/` is replaced with `~1` and `~` is replaced with `~0`.
///
/// # Example
///
/// ```
/// use json_observe_path::escape_component;
///
/// assert_eq!(escape_component("a~b"), "a~0b");
/// assert_eq!(escape_component("c/d"), "c~1d");
/// assert_eq!(escape_component("no-escapes"), "no-escapes");
/// ```
pub fn escape_component(component: &str) -> String {
    if !component.contains('/') && !component.contains('~') {
        return component.to_string();
    }
    // Order matters: ~ must be escaped before /
    component.replace('~', "~0").replace('/', "~1")
}

/// Unescapes a pointer-style path component.
///
/// `~1` is replaced with `/` and `~0` is replaced with `~`.
pub fn unescape_component(component: &str) -> String {
    if !component.contains('~') {
        return component.to_string();
    }
    // Order matters: ~1 must be replaced before ~0
    component.replace("~1", "/").replace("~0", "~")
}

/// Format a path as a pointer-style string.
///
/// Returns an empty string for the root path. Index steps format as bare
/// digits, so the output is read-only diagnostics, not a reversible
/// encoding of the step kinds.
///
/// # Example
///
/// ```
/// use json_observe_path::{format_path, PathStep};
///
/// assert_eq!(format_path(&[]), "");
/// assert_eq!(
///     format_path(&[PathStep::from("a~b"), PathStep::from(0usize)]),
///     "/a~0b/0"
/// );
/// ```
pub fn format_path(path: &[PathStep]) -> String {
    if path.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    for step in path {
        out.push('/');
        out.push_str(&step.to_string());
    }
    out
}

/// Parse a pointer-style string into a path.
///
/// Components that are valid non-negative integers (no leading zeros)
/// become [`PathStep::Index`]; everything else becomes [`PathStep::Key`].
///
/// # Example
///
/// ```
/// use json_observe_path::{parse_path, PathStep};
///
/// assert_eq!(parse_path("").unwrap(), Vec::<PathStep>::new());
/// assert_eq!(
///     parse_path("/a/1").unwrap(),
///     vec![PathStep::from("a"), PathStep::from(1usize)]
/// );
/// assert_eq!(parse_path("/01").unwrap(), vec![PathStep::from("01")]);
/// ```
pub fn parse_path(pointer: &str) -> Result<Path, PathParseError> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    if !pointer.starts_with('/') {
        return Err(PathParseError::MissingLeadingSlash);
    }
    let mut out = Vec::new();
    for token in pointer[1..].split('/') {
        let token = unescape_component(token);
        if is_valid_index(&token) {
            // parse cannot fail after the digit check, but stay total
            match token.parse::<usize>() {
                Ok(index) => out.push(PathStep::Index(index)),
                Err(_) => out.push(PathStep::Key(token)),
            }
        } else {
            out.push(PathStep::Key(token));
        }
    }
    Ok(out)
}

/// Check if a string represents a valid non-negative array index.
///
/// Leading zeros are rejected, matching RFC 6901 index rules.
pub fn is_valid_index(index: &str) -> bool {
    if index.is_empty() {
        return false;
    }
    let bytes = index.as_bytes();
    if bytes.len() > 1 && bytes[0] == b'0' {
        return false;
    }
    bytes.iter().all(|b| b.is_ascii_digit())
}

/// Append one step to a base path, producing an owned child path.
pub fn child_path(base: &[PathStep], step: PathStep) -> Path {
    let mut out = Vec::with_capacity(base.len() + 1);
    out.extend_from_slice(base);
    out.push(step);
    out
}

/// Check if `prefix` is a (non-strict) prefix of `path`.
///
/// The root path is a prefix of every path, including itself.
///
/// # Example
///
/// ```
/// use json_observe_path::{is_prefix, PathStep};
///
/// let parent = vec![PathStep::from("a")];
/// let child = vec![PathStep::from("a"), PathStep::from("b")];
/// assert!(is_prefix(&parent, &child));
/// assert!(is_prefix(&parent, &parent));
/// assert!(!is_prefix(&child, &parent));
/// ```
pub fn is_prefix(prefix: &[PathStep], path: &[PathStep]) -> bool {
    if prefix.len() > path.len() {
        return false;
    }
    prefix.iter().zip(path.iter()).all(|(a, b)| a == b)
}

/// Resolve a path to a shared reference into a document.
///
/// Returns `None` if any step is missing or of the wrong shape for the
/// value it lands on.
///
/// # Example
///
/// ```
/// use json_observe_path::{value_at_path, PathStep};
/// use serde_json::json;
///
/// let doc = json!({"a": [true]});
/// let path = vec![PathStep::from("a"), PathStep::from(0usize)];
/// assert_eq!(value_at_path(&doc, &path), Some(&json!(true)));
/// assert_eq!(value_at_path(&doc, &[PathStep::from("b")]), None);
/// ```
pub fn value_at_path<'a>(value: &'a Value, path: &[PathStep]) -> Option<&'a Value> {
    let mut cur = value;
    for step in path {
        cur = match (step, cur) {
            (PathStep::Key(key), Value::Object(map)) => map.get(key)?,
            (PathStep::Index(index), Value::Array(arr)) => arr.get(*index)?,
            _ => return None,
        };
    }
    Some(cur)
}

/// Resolve a path to an exclusive reference into a document.
pub fn get_path_mut<'a>(value: &'a mut Value, path: &[PathStep]) -> Option<&'a mut Value> {
    let mut cur = value;
    for step in path {
        cur = match (step, cur) {
            (PathStep::Key(key), Value::Object(map)) => map.get_mut(key)?,
            (PathStep::Index(index), Value::Array(arr)) => arr.get_mut(*index)?,
            _ => return None,
        };
    }
    Some(cur)
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathParseError {
    #[error("pointer must start with '/'")]
    MissingLeadingSlash,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_component() {
        assert_eq!(escape_component("foo"), "foo");
        assert_eq!(escape_component("a~b"), "a~0b");
        assert_eq!(escape_component("c/d"), "c~1d");
        assert_eq!(escape_component("a~b/c"), "a~0b~1c");
    }

    #[test]
    fn test_unescape_component() {
        assert_eq!(unescape_component("foo"), "foo");
        assert_eq!(unescape_component("a~0b"), "a~b");
        assert_eq!(unescape_component("c~1d"), "c/d");
        assert_eq!(unescape_component("~0~0"), "~~");
    }

    #[test]
    fn test_format_path() {
        assert_eq!(format_path(&[]), "");
        assert_eq!(format_path(&[PathStep::from("foo")]), "/foo");
        assert_eq!(
            format_path(&[PathStep::from("a~b"), PathStep::from("c/d")]),
            "/a~0b/c~1d"
        );
        assert_eq!(
            format_path(&[PathStep::from("items"), PathStep::from(2usize)]),
            "/items/2"
        );
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(parse_path("").unwrap(), Vec::<PathStep>::new());
        assert_eq!(
            parse_path("/foo/bar").unwrap(),
            vec![PathStep::from("foo"), PathStep::from("bar")]
        );
        assert_eq!(
            parse_path("/a/10/b").unwrap(),
            vec![
                PathStep::from("a"),
                PathStep::from(10usize),
                PathStep::from("b")
            ]
        );
        // Leading zeros stay keys
        assert_eq!(parse_path("/007").unwrap(), vec![PathStep::from("007")]);
        // Escapes round-trip through components
        assert_eq!(
            parse_path("/a~0b/c~1d").unwrap(),
            vec![PathStep::from("a~b"), PathStep::from("c/d")]
        );
        assert!(matches!(
            parse_path("no-slash"),
            Err(PathParseError::MissingLeadingSlash)
        ));
    }

    #[test]
    fn test_parse_format_roundtrip() {
        for pointer in ["", "/foo", "/foo/bar", "/a~0b/c~1d", "/list/0/name"] {
            let path = parse_path(pointer).unwrap();
            assert_eq!(format_path(&path), pointer, "roundtrip for {pointer:?}");
        }
    }

    #[test]
    fn test_is_valid_index() {
        assert!(is_valid_index("0"));
        assert!(is_valid_index("123"));
        assert!(!is_valid_index("-1"));
        assert!(!is_valid_index("01"));
        assert!(!is_valid_index(""));
        assert!(!is_valid_index("abc"));
    }

    #[test]
    fn test_child_path() {
        let base = vec![PathStep::from("a")];
        assert_eq!(
            child_path(&base, PathStep::from("b")),
            vec![PathStep::from("a"), PathStep::from("b")]
        );
        assert_eq!(base.len(), 1);
    }

    #[test]
    fn test_is_prefix() {
        let root: Vec<PathStep> = vec![];
        let a = vec![PathStep::from("a")];
        let ab = vec![PathStep::from("a"), PathStep::from("b")];
        let b = vec![PathStep::from("b")];

        assert!(is_prefix(&root, &a));
        assert!(is_prefix(&a, &ab));
        assert!(is_prefix(&ab, &ab));
        assert!(!is_prefix(&ab, &a));
        assert!(!is_prefix(&b, &ab));
    }

    #[test]
    fn test_value_at_path() {
        let doc = json!({"a": {"b": [1, 2, {"c": true}]}});
        assert_eq!(value_at_path(&doc, &[]), Some(&doc));
        assert_eq!(
            value_at_path(&doc, &[PathStep::from("a"), PathStep::from("b")]),
            Some(&json!([1, 2, {"c": true}]))
        );
        assert_eq!(
            value_at_path(
                &doc,
                &[
                    PathStep::from("a"),
                    PathStep::from("b"),
                    PathStep::from(2usize),
                    PathStep::from("c")
                ]
            ),
            Some(&json!(true))
        );
        // Missing key
        assert_eq!(value_at_path(&doc, &[PathStep::from("missing")]), None);
        // Index into object
        assert_eq!(value_at_path(&doc, &[PathStep::from(0usize)]), None);
        // Out-of-bounds index
        assert_eq!(
            value_at_path(
                &doc,
                &[PathStep::from("a"), PathStep::from("b"), PathStep::from(9usize)]
            ),
            None
        );
        // Descending through a scalar
        assert_eq!(
            value_at_path(&doc, &[PathStep::from("a"), PathStep::from("b"),
                PathStep::from(0usize), PathStep::from("x")]),
            None
        );
    }

    #[test]
    fn test_get_path_mut() {
        let mut doc = json!({"a": [1, 2]});
        let path = vec![PathStep::from("a"), PathStep::from(1usize)];
        if let Some(slot) = get_path_mut(&mut doc, &path) {
            *slot = json!(99);
        }
        assert_eq!(doc, json!({"a": [1, 99]}));
        assert!(get_path_mut(&mut doc, &[PathStep::from("zzz")]).is_none());
    }
}
