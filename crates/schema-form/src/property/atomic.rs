//! Leaf properties for primitive schema types.

use serde_json::{Number, Value};

use super::{additional, Property, PropertyId, PropertyInit, PropertyKind};
use crate::error::FormError;
use crate::field_type::FieldType;
use crate::tree::FormTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomicProperty {
    field_type: FieldType,
}

impl AtomicProperty {
    pub fn new(field_type: FieldType) -> Self {
        Self { field_type }
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Value of a leaf nobody filled in. Empty leaves are left out of their
    /// parent's value.
    pub fn fallback_value(&self) -> Value {
        match self.field_type {
            FieldType::String => Value::String(String::new()),
            _ => Value::Null,
        }
    }

    /// Numeric leaves accept text input: `""` clears the field, text with a
    /// `.` is read as a float and anything else as an integer.
    fn coerce(&self, value: Value) -> Value {
        if !matches!(self.field_type, FieldType::Number | FieldType::Integer) {
            return value;
        }
        let Value::String(text) = value else {
            return value;
        };
        let text = text.trim();
        if text.is_empty() {
            return Value::Null;
        }
        let parsed = if text.contains('.') {
            text.parse::<f64>().ok().and_then(Number::from_f64)
        } else {
            text.parse::<i64>().ok().map(Number::from)
        };
        parsed.map_or(Value::Null, Value::Number)
    }
}

/// Builds a detached atomic node of the given type.
pub fn atomic_property(init: PropertyInit, field_type: FieldType) -> Property {
    let atomic = AtomicProperty::new(field_type);
    let value = atomic.fallback_value();
    Property::new(init, PropertyKind::Atomic(atomic), value)
}

pub(crate) fn string_property(init: PropertyInit) -> Property {
    atomic_property(init, FieldType::String)
}

pub(crate) fn number_property(init: PropertyInit) -> Property {
    atomic_property(init, FieldType::Number)
}

pub(crate) fn integer_property(init: PropertyInit) -> Property {
    atomic_property(init, FieldType::Integer)
}

pub(crate) fn boolean_property(init: PropertyInit) -> Property {
    atomic_property(init, FieldType::Boolean)
}

pub(crate) fn null_property(init: PropertyInit) -> Property {
    atomic_property(init, FieldType::Null)
}

fn fallback_for(kind: &PropertyKind) -> Value {
    match kind {
        PropertyKind::Atomic(atomic) => atomic.fallback_value(),
        _ => Value::Null,
    }
}

/// Stores `value` on a leaf (atomic or additional) and aggregates.
pub(crate) fn set_value(
    tree: &mut FormTree,
    id: PropertyId,
    value: Value,
    only_self: bool,
) -> Result<(), FormError> {
    let node = tree.node_mut(id)?;
    node.value = match &node.kind {
        PropertyKind::Atomic(atomic) => atomic.coerce(value),
        _ => value,
    };
    additional::retype(node);
    tree.update_value_and_validity(id, only_self, true);
    Ok(())
}

/// Resets a leaf: a missing or `null` value falls back to the schema
/// `default`, then to the leaf's fallback value.
pub(crate) fn reset(
    tree: &mut FormTree,
    id: PropertyId,
    value: Option<Value>,
    only_self: bool,
) -> Result<(), FormError> {
    let node = tree.node_mut(id)?;
    node.value = match value {
        Some(value) if !value.is_null() => value,
        _ => match &node.schema.default {
            Some(default) => default.clone(),
            None => fallback_for(&node.kind),
        },
    };
    additional::retype(node);
    tree.update_value_and_validity(id, only_self, true);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fallback_depends_on_type() {
        assert_eq!(AtomicProperty::new(FieldType::String).fallback_value(), json!(""));
        assert_eq!(AtomicProperty::new(FieldType::Boolean).fallback_value(), json!(null));
        assert_eq!(AtomicProperty::new(FieldType::Integer).fallback_value(), json!(null));
    }

    #[test]
    fn numeric_leaves_parse_text() {
        let number = AtomicProperty::new(FieldType::Number);
        assert_eq!(number.coerce(json!("1.5")), json!(1.5));
        assert_eq!(number.coerce(json!("42")), json!(42));
        assert_eq!(number.coerce(json!("")), json!(null));
        assert_eq!(number.coerce(json!("abc")), json!(null));
        assert_eq!(number.coerce(json!(7)), json!(7));

        let text = AtomicProperty::new(FieldType::String);
        assert_eq!(text.coerce(json!("42")), json!("42"));
    }
}
