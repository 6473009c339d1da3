//! Leaves for values the schema does not describe.
//!
//! An object with `additionalProperties: true` (or an array with
//! `additionalItems: true`) accepts keys/indices it never declared. Such a
//! value gets an additional property whose type is read off its current
//! value; its schema is just `{"type": <inferred>}` and follows the value
//! whenever it is replaced, so the type check never fails.

use std::sync::Arc;

use serde_json::Value;

use super::{AtomicProperty, Property, PropertyInit, PropertyKind};
use crate::field_type::FieldType;
use crate::schema::{SchemaNode, SchemaType};

pub(crate) fn construct(mut init: PropertyInit, value: Option<Value>) -> Property {
    let value = value.unwrap_or(Value::Null);
    let field_type = FieldType::of_value(&value);
    init.schema = inferred_schema(field_type);
    Property::new(
        init,
        PropertyKind::Additional(AtomicProperty::new(field_type)),
        value,
    )
}

fn inferred_schema(field_type: FieldType) -> Arc<SchemaNode> {
    Arc::new(SchemaNode {
        type_: Some(SchemaType::Single(field_type.as_str().to_string())),
        ..SchemaNode::default()
    })
}

/// Re-reads the type of an additional node from its value.
pub(crate) fn retype(node: &mut Property) {
    let field_type = FieldType::of_value(&node.value);
    if let PropertyKind::Additional(atomic) = &mut node.kind {
        if atomic.field_type() != field_type {
            *atomic = AtomicProperty::new(field_type);
            node.schema = inferred_schema(field_type);
        }
    }
}
