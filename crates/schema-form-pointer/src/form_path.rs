//! Structural form paths.
//!
//! A form path names the position of a property in the tree rather than a
//! location in a value: the root is `/`, object children append their
//! (pointer-escaped) property id and array children append [`WILDCARD`], so
//! every item of `/tags` lives at `/tags/*`.

use std::borrow::Cow;

use crate::{escape_component, unescape_component};

/// Path of the tree root.
pub const ROOT_PATH: &str = "/";

/// Segment standing for "any index" below an array.
pub const WILDCARD: &str = "*";

/// Appends one segment to a parent form path.
///
/// ```
/// use schema_form_pointer::{child_path, WILDCARD};
///
/// assert_eq!(child_path("/", "name"), "/name");
/// assert_eq!(child_path("/tags", WILDCARD), "/tags/*");
/// assert_eq!(child_path("/a", "x/y"), "/a/x~1y");
/// ```
pub fn child_path(parent: &str, segment: &str) -> String {
    let segment = if segment == WILDCARD {
        Cow::Borrowed(segment)
    } else {
        escape_component(segment)
    };
    if is_root_path(parent) {
        format!("/{segment}")
    } else {
        format!("{parent}/{segment}")
    }
}

pub fn is_root_path(path: &str) -> bool {
    path.is_empty() || path == ROOT_PATH
}

/// Splits a relative or absolute form path into unescaped segments.
///
/// Leading and trailing separators are ignored, so `"/a/b"`, `"a/b"` and
/// `"a/b/"` all give `["a", "b"]`; the root gives no segments.
pub fn split_form_path(path: &str) -> Vec<String> {
    let trimmed = path.trim_start_matches('/').trim_end_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed
        .split('/')
        .map(|segment| unescape_component(segment).into_owned())
        .collect()
}
