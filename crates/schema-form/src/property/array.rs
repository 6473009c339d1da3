//! Array properties: an ordered list of item nodes.
//!
//! Every item sits at the wildcard path `<array>/*`; item schemas come from
//! `items` (a single schema or a positional tuple) and `additionalItems`.
//! Replacing the array's value throws every item away and rebuilds the list.

use serde_json::Value;

use super::{Property, PropertyId, PropertyInit, PropertyKind};
use crate::error::FormError;
use crate::factory::FormPropertyFactory;
use crate::tree::FormTree;

#[derive(Debug, Clone, Default)]
pub struct ArrayProperty {
    pub(crate) items: Vec<PropertyId>,
}

impl ArrayProperty {
    pub fn items(&self) -> &[PropertyId] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub(crate) fn construct(
    _factory: &FormPropertyFactory,
    tree: &mut FormTree,
    init: PropertyInit,
    _value: Option<Value>,
) -> Result<PropertyId, FormError> {
    let array = PropertyKind::Array(ArrayProperty::default());
    Ok(tree.insert(Property::new(init, array, Value::Array(Vec::new()))))
}

/// Appends an item built for the next index. `Ok(None)` when the schema has
/// no room for another item (closed tuple).
fn add_property(
    tree: &mut FormTree,
    id: PropertyId,
    value: Option<Value>,
) -> Result<Option<PropertyId>, FormError> {
    let node = tree.node(id)?;
    let index = tree.array(id)?.len();
    let Some(item_schema) = node.schema.item_at(index) else {
        tracing::debug!("array {} has no item schema for index {}", node.path, index);
        return Ok(None);
    };
    let factory = tree.factory();
    let item = factory.create_child(tree, &item_schema, Some(id), None, value)?;
    tree.array_mut(id)?.items.push(item);
    Ok(Some(item))
}

/// Appends one item and resets it with `value`; ancestors are updated.
pub(crate) fn add_item(
    tree: &mut FormTree,
    id: PropertyId,
    value: Option<Value>,
) -> Result<Option<PropertyId>, FormError> {
    let Some(item) = add_property(tree, id, value.clone())? else {
        return Ok(None);
    };
    tree.reset_internal(item, value, false)?;
    Ok(Some(item))
}

pub(crate) fn remove_item(
    tree: &mut FormTree,
    id: PropertyId,
    item: PropertyId,
) -> Result<(), FormError> {
    let items = &mut tree.array_mut(id)?.items;
    let before = items.len();
    items.retain(|candidate| *candidate != item);
    if items.len() == before {
        tracing::debug!("array item {} is not part of {}", item, id);
        return Ok(());
    }
    tree.release(item);
    tree.update_value_and_validity(id, false, true);
    Ok(())
}

pub(crate) fn set_value(
    tree: &mut FormTree,
    id: PropertyId,
    value: Value,
    only_self: bool,
) -> Result<(), FormError> {
    rebuild(tree, id, &value)?;
    tree.update_value_and_validity(id, only_self, true);
    Ok(())
}

/// A missing or `null` value falls back to the schema `default`, then `[]`.
pub(crate) fn reset(
    tree: &mut FormTree,
    id: PropertyId,
    value: Option<Value>,
    only_self: bool,
) -> Result<(), FormError> {
    let value = match value {
        Some(value) if !value.is_null() => value,
        _ => tree
            .node(id)?
            .schema
            .default
            .clone()
            .unwrap_or_else(|| Value::Array(Vec::new())),
    };
    rebuild(tree, id, &value)?;
    tree.update_value_and_validity(id, only_self, true);
    Ok(())
}

/// Drops all items and builds one per entry of `value`. Anything that is not
/// an array rebuilds an empty list.
fn rebuild(tree: &mut FormTree, id: PropertyId, value: &Value) -> Result<(), FormError> {
    let stale = std::mem::take(&mut tree.array_mut(id)?.items);
    for item in stale {
        tree.release(item);
    }
    let Some(entries) = value.as_array() else {
        if !value.is_null() {
            tracing::debug!("array {} rebuilt empty from non-array value", tree.node(id)?.path);
        }
        return Ok(());
    };
    for entry in entries {
        match add_property(tree, id, Some(entry.clone()))? {
            Some(item) => tree.reset_internal(item, Some(entry.clone()), true)?,
            None => break,
        }
    }
    Ok(())
}

/// Values of the visible items that hold a value. Entries that are hidden
/// or empty are dropped, so indices are not preserved.
pub(crate) fn reduce_value(tree: &FormTree, array: &ArrayProperty) -> Value {
    let items = array
        .items
        .iter()
        .filter_map(|item| tree.get(*item))
        .filter(|item| item.visible && item.has_value())
        .map(|item| item.value.clone())
        .collect();
    Value::Array(items)
}
