//! JSON Pointer (RFC 6901) primitives and the form-path convention used by
//! `schema-form` property trees.
//!
//! Two path flavours live here:
//!
//! - **JSON Pointers** address a concrete location inside a JSON document
//!   (`/definitions/address`, `/items/0/name`). They are used to resolve
//!   `$ref` fragments and to read validator error paths.
//! - **Form paths** address a *structural* position in a property tree. They
//!   look like pointers, but the root is `/` and every array item is written
//!   as the wildcard segment `*` (`/items/*/name`). See [`form_path`].
//!
//! # Example
//!
//! ```
//! use schema_form_pointer::{get, parse_reference};
//! use serde_json::json;
//!
//! let schema = json!({"definitions": {"name": {"type": "string"}}});
//! let path = parse_reference("#/definitions/name").unwrap();
//! assert_eq!(get(&schema, &path), Some(&json!({"type": "string"})));
//! ```

use std::borrow::Cow;

use serde_json::Value;
use thiserror::Error;

pub mod form_path;
pub use form_path::{child_path, is_root_path, split_form_path, ROOT_PATH, WILDCARD};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PointerError {
    #[error("json pointer must be absolute or empty: {0:?}")]
    NotAbsolute(String),
    #[error("only document-local references are supported: {0:?}")]
    ExternalReference(String),
}

/// Unescapes one pointer component in a single left-to-right pass, so `~01`
/// reads as `~` followed by `1`. A `~` not followed by `0` or `1` is kept.
///
/// ```
/// use schema_form_pointer::unescape_component;
///
/// assert_eq!(unescape_component("a~1b"), "a/b");
/// assert_eq!(unescape_component("~01"), "~1");
/// ```
pub fn unescape_component(component: &str) -> Cow<'_, str> {
    if !component.contains('~') {
        return Cow::Borrowed(component);
    }
    let mut out = String::with_capacity(component.len());
    let mut rest = component;
    while let Some(at) = rest.find('~') {
        out.push_str(&rest[..at]);
        let tail = &rest[at + 1..];
        rest = match tail.as_bytes().first() {
            Some(b'0') => {
                out.push('~');
                &tail[1..]
            }
            Some(b'1') => {
                out.push('/');
                &tail[1..]
            }
            _ => {
                out.push('~');
                tail
            }
        };
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Escapes one pointer component; borrows when nothing needs escaping.
pub fn escape_component(component: &str) -> Cow<'_, str> {
    if !component.contains(&['/', '~'][..]) {
        return Cow::Borrowed(component);
    }
    let mut out = String::with_capacity(component.len() + 2);
    for c in component.chars() {
        match c {
            '~' => out.push_str("~0"),
            '/' => out.push_str("~1"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Parses an absolute pointer into unescaped components.
///
/// `""` is the whole document, `"/"` is the empty key.
pub fn parse_json_pointer(pointer: &str) -> Result<Vec<String>, PointerError> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    if !pointer.starts_with('/') {
        return Err(PointerError::NotAbsolute(pointer.to_string()));
    }
    Ok(pointer[1..]
        .split('/')
        .map(|component| unescape_component(component).into_owned())
        .collect())
}

/// Formats components into an absolute pointer. The empty path is `""`.
pub fn format_json_pointer<S: AsRef<str>>(path: &[S]) -> String {
    let mut out = String::new();
    for component in path {
        out.push('/');
        out.push_str(&escape_component(component.as_ref()));
    }
    out
}

/// Parses a `$ref` value into pointer components.
///
/// Accepted forms are `#`, `#/a/b` and bare absolute pointers (`/a/b`).
/// Anything with a document part before `#` (`other.json#/a`) is rejected:
/// property trees only ever resolve against their own root schema.
///
/// ```
/// use schema_form_pointer::parse_reference;
///
/// assert_eq!(parse_reference("#").unwrap(), Vec::<String>::new());
/// assert_eq!(parse_reference("#/definitions/a~1b").unwrap(), vec!["definitions", "a/b"]);
/// assert!(parse_reference("other.json#/x").is_err());
/// ```
pub fn parse_reference(reference: &str) -> Result<Vec<String>, PointerError> {
    match reference.split_once('#') {
        Some(("", fragment)) => parse_json_pointer(fragment),
        Some(_) => Err(PointerError::ExternalReference(reference.to_string())),
        None => parse_json_pointer(reference),
    }
}

/// Looks a path up in a document. Array steps must be canonical indices.
pub fn get<'a, S: AsRef<str>>(doc: &'a Value, path: &[S]) -> Option<&'a Value> {
    let mut current = doc;
    for step in path {
        let step = step.as_ref();
        current = match current {
            Value::Object(map) => map.get(step)?,
            Value::Array(items) => {
                if !is_valid_index(step) {
                    return None;
                }
                items.get(step.parse::<usize>().ok()?)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Checks for a non-negative integer without leading zeros.
pub fn is_valid_index(step: &str) -> bool {
    if step.is_empty() {
        return false;
    }
    let bytes = step.as_bytes();
    if bytes.len() > 1 && bytes[0] == b'0' {
        return false;
    }
    bytes.iter().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn escape_round_trips_special_characters() {
        for raw in ["plain", "a/b", "a~b", "~1", "/~/"] {
            assert_eq!(unescape_component(&escape_component(raw)), raw);
        }
    }

    #[test]
    fn unescape_keeps_stray_tildes_and_borrows_plain_input() {
        assert_eq!(unescape_component("a~2b~"), "a~2b~");
        assert!(matches!(unescape_component("plain"), Cow::Borrowed("plain")));
        assert!(matches!(escape_component("plain"), Cow::Borrowed("plain")));
        assert_eq!(escape_component("~/"), "~0~1");
    }

    #[test]
    fn parse_rejects_relative_pointer() {
        assert_eq!(
            parse_json_pointer("foo"),
            Err(PointerError::NotAbsolute("foo".to_string()))
        );
        assert_eq!(parse_json_pointer("/").unwrap(), vec![""]);
    }

    #[test]
    fn format_escapes_components() {
        assert_eq!(format_json_pointer::<&str>(&[]), "");
        assert_eq!(format_json_pointer(&["a/b", "c"]), "/a~1b/c");
    }

    #[test]
    fn get_walks_objects_and_arrays() {
        let doc = json!({"a": [{"b": 1}, {"b": 2}]});
        assert_eq!(get(&doc, &["a", "1", "b"]), Some(&json!(2)));
        assert_eq!(get(&doc, &["a", "01", "b"]), None);
        assert_eq!(get(&doc, &["a", "2"]), None);
        assert_eq!(get(&doc, &["a", "0", "b", "c"]), None);
    }
}
