//! Property nodes.
//!
//! A [`Property`] is one node of a [`FormTree`](crate::FormTree). Its
//! behaviour is selected by a closed set of kinds:
//!
//! | Kind | Module | Children |
//! |------|--------|----------|
//! | [`PropertyKind::Atomic`] | [`atomic`] | none |
//! | [`PropertyKind::Additional`] | [`additional`] | none |
//! | [`PropertyKind::Object`] | [`object`] | keyed by property id |
//! | [`PropertyKind::Array`] | [`array`] | ordered by index |
//!
//! Nodes never own each other directly: the tree's arena owns every node and
//! groups hold [`PropertyId`]s of their children. A child's `parent` id is a
//! back-reference used for path computation and upward aggregation only.

use std::sync::Arc;

use serde_json::Value;

use crate::binding::{PropertyBinding, PropertyBindingRegistry};
use crate::field_type::FieldType;
use crate::schema::SchemaNode;
use crate::validator::ValidationError;
use crate::visibility::VisibilityRule;

pub mod additional;
pub mod array;
pub mod atomic;
pub mod object;

pub use array::ArrayProperty;
pub use atomic::AtomicProperty;
pub use object::ObjectProperty;

/// Generation-checked handle to a node of a [`FormTree`](crate::FormTree).
///
/// Ids of released nodes (for instance items dropped by an array rebuild)
/// stay invalid even when their arena slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl std::fmt::Display for PropertyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone)]
pub enum PropertyKind {
    Atomic(AtomicProperty),
    Additional(AtomicProperty),
    Object(ObjectProperty),
    Array(ArrayProperty),
}

impl PropertyKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Atomic(_) => "atomic",
            Self::Additional(_) => "additional",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
        }
    }
}

/// Everything a constructor needs to know about the node it builds.
#[derive(Debug, Clone)]
pub struct PropertyInit {
    pub(crate) schema: Arc<SchemaNode>,
    pub(crate) parent: Option<PropertyId>,
    pub(crate) path: String,
    pub(crate) canonical_path: String,
    pub(crate) bindings: Arc<PropertyBindingRegistry>,
}

impl PropertyInit {
    pub fn schema(&self) -> &Arc<SchemaNode> {
        &self.schema
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Clone)]
pub struct Property {
    pub(crate) schema: Arc<SchemaNode>,
    pub(crate) kind: PropertyKind,
    pub(crate) parent: Option<PropertyId>,
    pub(crate) path: String,
    pub(crate) canonical_path: String,
    pub(crate) value: Value,
    /// `own_errors` followed by the attached copies not already in it.
    pub(crate) errors: Vec<ValidationError>,
    pub(crate) own_errors: Vec<ValidationError>,
    /// Copies handed down by an ancestor, tagged with that ancestor.
    pub(crate) attached_errors: Vec<(PropertyId, ValidationError)>,
    /// Descendants this node attached copies to on its last validation.
    pub(crate) attached_to: Vec<PropertyId>,
    pub(crate) visible: bool,
    pub(crate) visibility: Option<Arc<VisibilityRule>>,
    pub(crate) bindings: Arc<PropertyBindingRegistry>,
}

impl Property {
    pub(crate) fn new(init: PropertyInit, kind: PropertyKind, value: Value) -> Self {
        Self {
            schema: init.schema,
            kind,
            parent: init.parent,
            path: init.path,
            canonical_path: init.canonical_path,
            value,
            errors: Vec::new(),
            own_errors: Vec::new(),
            attached_errors: Vec::new(),
            attached_to: Vec::new(),
            visible: true,
            visibility: None,
            bindings: init.bindings,
        }
    }

    pub fn schema(&self) -> &Arc<SchemaNode> {
        &self.schema
    }

    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<PropertyId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn canonical_path(&self) -> &str {
        &self.canonical_path
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Rebuilds `errors`; returns whether they changed.
    pub(crate) fn merge_errors(&mut self) -> bool {
        let mut merged = self.own_errors.clone();
        for (_, error) in &self.attached_errors {
            if !merged.contains(error) {
                merged.push(error.clone());
            }
        }
        if merged == self.errors {
            return false;
        }
        self.errors = merged;
        true
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn field_type(&self) -> FieldType {
        match &self.kind {
            PropertyKind::Atomic(atomic) | PropertyKind::Additional(atomic) => atomic.field_type(),
            PropertyKind::Object(_) => FieldType::Object,
            PropertyKind::Array(_) => FieldType::Array,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, PropertyKind::Object(_) | PropertyKind::Array(_))
    }

    pub fn is_additional(&self) -> bool {
        matches!(self.kind, PropertyKind::Additional(_))
    }

    /// Whether the node contributes to its parent's value.
    pub fn has_value(&self) -> bool {
        match &self.kind {
            PropertyKind::Atomic(atomic) => self.value != atomic.fallback_value(),
            PropertyKind::Additional(_) => !self.value.is_null(),
            PropertyKind::Object(_) => self.value.as_object().is_some_and(|map| !map.is_empty()),
            PropertyKind::Array(_) => true,
        }
    }

    /// Bindings registered for this node's canonical path.
    pub fn bindings(&self) -> &[PropertyBinding] {
        self.bindings.get(&self.canonical_path)
    }

    /// Ids of the direct children in order (declaration order for objects,
    /// index order for arrays).
    pub fn child_ids(&self) -> Vec<PropertyId> {
        match &self.kind {
            PropertyKind::Object(object) => object.properties.values().copied().collect(),
            PropertyKind::Array(array) => array.items.clone(),
            PropertyKind::Atomic(_) | PropertyKind::Additional(_) => Vec::new(),
        }
    }

    /// Looks up a direct child by path segment: a property id for objects,
    /// an index for arrays.
    pub fn child(&self, segment: &str) -> Option<PropertyId> {
        match &self.kind {
            PropertyKind::Object(object) => object.properties.get(segment).copied(),
            PropertyKind::Array(array) => {
                let index: usize = segment.parse().ok()?;
                array.items.get(index).copied()
            }
            PropertyKind::Atomic(_) | PropertyKind::Additional(_) => None,
        }
    }
}

impl std::fmt::Debug for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("value", &self.value)
            .field("visible", &self.visible)
            .field("errors", &self.errors)
            .finish()
    }
}
