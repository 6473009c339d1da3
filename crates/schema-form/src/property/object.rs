//! Object properties: children keyed by property id.
//!
//! Normal objects create one child per declared property up front. Objects
//! sitting at an extension position (`.../extension/*`) cannot enumerate
//! their children from the schema, so they take them from the keys of the
//! value they are built with instead.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{Property, PropertyId, PropertyInit, PropertyKind};
use crate::error::FormError;
use crate::factory::FormPropertyFactory;
use crate::schema::SchemaNode;
use crate::tree::FormTree;
use crate::validator::ValidationError;

#[derive(Debug, Clone, Default)]
pub struct ObjectProperty {
    pub(crate) properties: IndexMap<String, PropertyId>,
    pub(crate) extension: bool,
}

impl ObjectProperty {
    pub fn get(&self, property_id: &str) -> Option<PropertyId> {
        self.properties.get(property_id).copied()
    }

    /// Child ids in declaration (then discovery) order.
    pub fn property_ids(&self) -> impl Iterator<Item = &String> + '_ {
        self.properties.keys()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn is_extension(&self) -> bool {
        self.extension
    }
}

pub(crate) fn construct(
    factory: &FormPropertyFactory,
    tree: &mut FormTree,
    init: PropertyInit,
    value: Option<Value>,
) -> Result<PropertyId, FormError> {
    let extension = factory.is_extension_path(&init.path);
    let schema = Arc::clone(&init.schema);
    let object = ObjectProperty {
        properties: IndexMap::new(),
        extension,
    };
    let id = tree.insert(Property::new(
        init,
        PropertyKind::Object(object),
        Value::Object(Map::new()),
    ));
    let built = if extension {
        create_properties_extension(factory, tree, id, &schema, value.as_ref())
    } else {
        create_properties(factory, tree, id, &schema)
    };
    if let Err(err) = built {
        tree.release(id);
        return Err(err);
    }
    Ok(id)
}

fn create_properties(
    factory: &FormPropertyFactory,
    tree: &mut FormTree,
    id: PropertyId,
    schema: &SchemaNode,
) -> Result<(), FormError> {
    for (property_id, property_schema) in schema.properties.iter().flatten() {
        let child = factory.create_property(
            tree,
            property_schema,
            Some(id),
            Some(property_id.as_str()),
            None,
            false,
        )?;
        tree.object_mut(id)?
            .properties
            .insert(property_id.clone(), child);
    }
    Ok(())
}

fn create_properties_extension(
    factory: &FormPropertyFactory,
    tree: &mut FormTree,
    id: PropertyId,
    schema: &SchemaNode,
    value: Option<&Value>,
) -> Result<(), FormError> {
    let entries = value.and_then(Value::as_object);
    let keys: Vec<String> = match (entries, value) {
        (Some(entries), _) => entries.keys().cloned().collect(),
        (None, Some(other)) if !other.is_null() => Vec::new(),
        _ => schema.property_ids().cloned().collect(),
    };
    for key in keys {
        let Some(child_schema) = schema.object_child(&key) else {
            tracing::debug!(
                "extension object {} skips undeclared key {:?}",
                tree.node(id)?.path,
                key
            );
            continue;
        };
        let sub_value = entries.and_then(|entries| entries.get(&key)).cloned();
        let child =
            factory.create_child(tree, &child_schema, Some(id), Some(key.as_str()), sub_value)?;
        tree.object_mut(id)?.properties.insert(key, child);
    }
    Ok(())
}

/// Returns the child for `key`, creating it when the schema allows the key.
fn ensure_child(
    factory: &FormPropertyFactory,
    tree: &mut FormTree,
    id: PropertyId,
    key: &str,
    value: &Value,
) -> Result<Option<PropertyId>, FormError> {
    if let Some(child) = tree.object(id)?.get(key) {
        return Ok(Some(child));
    }
    let node = tree.node(id)?;
    let Some(child_schema) = node.schema.object_child(key) else {
        tracing::debug!("object {} has no schema for key {:?}, skipping", node.path, key);
        return Ok(None);
    };
    let child =
        factory.create_child(tree, &child_schema, Some(id), Some(key), Some(value.clone()))?;
    tree.object_mut(id)?.properties.insert(key.to_string(), child);
    Ok(Some(child))
}

pub(crate) fn set_value(
    tree: &mut FormTree,
    id: PropertyId,
    value: Value,
    only_self: bool,
) -> Result<(), FormError> {
    let factory = tree.factory();
    match value {
        Value::Object(entries) => {
            for (key, sub_value) in entries {
                if let Some(child) = ensure_child(&factory, tree, id, &key, &sub_value)? {
                    tree.set_value_internal(child, sub_value, true)?;
                }
            }
        }
        other => tracing::debug!(
            "object {} ignores non-object value {}",
            tree.node(id)?.path,
            other
        ),
    }
    tree.update_value_and_validity(id, only_self, true);
    Ok(())
}

pub(crate) fn reset(
    tree: &mut FormTree,
    id: PropertyId,
    value: Option<Value>,
    only_self: bool,
) -> Result<(), FormError> {
    let factory = tree.factory();
    let schema = Arc::clone(&tree.node(id)?.schema);
    let value = match value {
        Some(value) if !value.is_null() => value,
        _ => schema
            .default
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new())),
    };
    let entries = value.as_object();

    let children: Vec<(String, PropertyId)> = tree
        .object(id)?
        .properties
        .iter()
        .map(|(key, child)| (key.clone(), *child))
        .collect();
    for (key, child) in &children {
        let sub_value = entries.and_then(|entries| entries.get(key)).cloned();
        tree.reset_internal(*child, sub_value, true)?;
    }

    if schema.allows_additional_properties() {
        for (key, sub_value) in entries.into_iter().flatten() {
            if schema.has_property(key) || tree.object(id)?.get(key).is_some() {
                continue;
            }
            if let Some(child) = ensure_child(&factory, tree, id, key, sub_value)? {
                tree.reset_internal(child, Some(sub_value.clone()), true)?;
            }
        }
    }

    tree.update_value_and_validity(id, only_self, true);
    Ok(())
}

/// Removes an additional child. Declared children are part of the object's
/// shape and stay; `Ok(false)` is returned for them and for unknown keys.
pub(crate) fn remove_property(
    tree: &mut FormTree,
    id: PropertyId,
    key: &str,
) -> Result<bool, FormError> {
    let Some(child) = tree.object(id)?.get(key) else {
        return Ok(false);
    };
    if !tree.node(child)?.is_additional() {
        return Ok(false);
    }
    tree.object_mut(id)?.properties.shift_remove(key);
    tree.release(child);
    tree.update_value_and_validity(id, false, true);
    Ok(true)
}

/// The object's value: visible children that hold a value, in order.
pub(crate) fn reduce_value(tree: &FormTree, object: &ObjectProperty) -> Value {
    let mut value = Map::new();
    for (key, child) in &object.properties {
        if let Some(child) = tree.get(*child) {
            if child.visible && child.has_value() {
                value.insert(key.clone(), child.value.clone());
            }
        }
    }
    Value::Object(value)
}

/// Hands each error aimed below the object to the descendant it names. The
/// copy is rebased onto the descendant (empty path), so it matches what the
/// descendant reports for itself. Copies from the previous run are replaced,
/// so a descendant loses an error once the object stops reporting it. Errors
/// whose path resolves to nothing stay on the object only.
pub(crate) fn propagate_errors(tree: &mut FormTree, id: PropertyId) {
    let Some(node) = tree.get(id) else {
        return;
    };
    let targeted: Vec<(PropertyId, ValidationError)> = node
        .own_errors
        .iter()
        .filter_map(|error| {
            let relative = error.path.trim_start_matches('#').trim_start_matches('/');
            if relative.is_empty() {
                return None;
            }
            let target = tree.get_property(id, relative)?;
            Some((
                target,
                ValidationError {
                    path: String::new(),
                    ..error.clone()
                },
            ))
        })
        .collect();

    let previous = match tree.node_mut(id) {
        Ok(node) => std::mem::take(&mut node.attached_to),
        Err(_) => return,
    };
    let mut attached_to: Vec<PropertyId> = Vec::new();
    for (target, _) in &targeted {
        if !attached_to.contains(target) {
            attached_to.push(*target);
        }
    }
    let mut touched = previous;
    for target in &attached_to {
        if !touched.contains(target) {
            touched.push(*target);
        }
    }

    for target in touched {
        let Ok(node) = tree.node_mut(target) else {
            continue;
        };
        node.attached_errors.retain(|(source, _)| *source != id);
        node.attached_errors.extend(
            targeted
                .iter()
                .filter(|(candidate, _)| *candidate == target)
                .map(|(_, error)| (id, error.clone())),
        );
        if node.merge_errors() {
            tree.emit_errors_changed(target);
        }
    }
    if let Ok(node) = tree.node_mut(id) {
        node.attached_to = attached_to;
    }
}
