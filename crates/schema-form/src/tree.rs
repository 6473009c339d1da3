//! The property tree and its builder.
//!
//! [`FormTree`] owns every node in an arena; [`PropertyId`]s are
//! generation-checked so ids of released subtrees are rejected instead of
//! aliasing whatever reuses their slot. All mutations go through `&mut self`
//! and finish propagating (values, validation, visibility) before they
//! return.

use std::collections::BTreeMap;
use std::sync::Arc;

use schema_form_pointer::split_form_path;
use serde_json::Value;

use crate::binding::{PropertyBinding, PropertyBindingRegistry};
use crate::error::FormError;
use crate::events::FormEvent;
use crate::expression::{ExpressionCompiler, NoExpressionCompiler};
use crate::factory::FormPropertyFactory;
use crate::options::FormOptions;
use crate::property::{array, atomic, object, ArrayProperty, ObjectProperty};
use crate::property::{Property, PropertyId, PropertyKind};
use crate::schema::SchemaNode;
use crate::type_mapping::PropertyTypeMapping;
use crate::validator::{BasicSchemaValidatorFactory, SchemaValidatorFactory, ValidationError, ValidatorRegistry};

static NULL: Value = Value::Null;

struct Slot {
    generation: u32,
    node: Option<Property>,
}

type Listener = Box<dyn FnMut(FormEvent) + Send + Sync>;

pub struct FormTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: PropertyId,
    root_schema: Arc<Value>,
    factory: Arc<FormPropertyFactory>,
    validator_registry: Arc<ValidatorRegistry>,
    next_listener_id: u64,
    listeners: BTreeMap<u64, Listener>,
}

impl FormTree {
    /// Builds a tree for `schema` with default collaborators and options.
    pub fn new(schema: Value) -> Result<Self, FormError> {
        FormTreeBuilder::new(schema).build()
    }

    pub fn builder(schema: Value) -> FormTreeBuilder {
        FormTreeBuilder::new(schema)
    }

    pub fn root(&self) -> PropertyId {
        self.root
    }

    /// The value of the root node.
    pub fn value(&self) -> &Value {
        self.get(self.root).map_or(&NULL, |root| &root.value)
    }

    pub fn options(&self) -> &FormOptions {
        self.factory.options()
    }

    pub fn get(&self, id: PropertyId) -> Option<&Property> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, id: PropertyId) -> Option<&mut Property> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: PropertyId) -> bool {
        self.get(id).is_some()
    }

    // ------------------------------------------------------------------
    // Embedder API

    /// Sets the value of `id`. With `only_self` unset every ancestor is
    /// re-aggregated and re-validated.
    pub fn set_value(&mut self, id: PropertyId, value: Value, only_self: bool) -> Result<(), FormError> {
        self.set_value_internal(id, value, only_self)?;
        self.refresh_visibility();
        Ok(())
    }

    /// Resets `id` to `value`, falling back to the schema default.
    pub fn reset(&mut self, id: PropertyId, value: Option<Value>, only_self: bool) -> Result<(), FormError> {
        self.reset_internal(id, value, only_self)?;
        self.refresh_visibility();
        Ok(())
    }

    /// Appends an item to the array `id`. Returns `Ok(None)` when the array
    /// schema has no room for another item.
    pub fn add_item(&mut self, id: PropertyId, value: Option<Value>) -> Result<Option<PropertyId>, FormError> {
        self.array(id)?;
        let item = array::add_item(self, id, value)?;
        self.refresh_visibility();
        Ok(item)
    }

    pub fn remove_item(&mut self, id: PropertyId, item: PropertyId) -> Result<(), FormError> {
        self.array(id)?;
        array::remove_item(self, id, item)?;
        self.refresh_visibility();
        Ok(())
    }

    /// Removes the additional property `key` of the object `id`. Returns
    /// whether a child was removed; declared properties are never removed.
    pub fn remove_property(&mut self, id: PropertyId, key: &str) -> Result<bool, FormError> {
        self.object(id)?;
        let removed = object::remove_property(self, id, key)?;
        if removed {
            self.refresh_visibility();
        }
        Ok(removed)
    }

    /// Resolves `path` relative to `id`. Segments are `/`-separated and
    /// pointer-escaped; numeric segments index arrays.
    pub fn get_property(&self, id: PropertyId, path: &str) -> Option<PropertyId> {
        let mut current = id;
        for segment in split_form_path(path) {
            current = self.get(current)?.child(&segment)?;
        }
        self.get(current).map(|_| current)
    }

    /// Resolves `path` from the root when absolute, otherwise against each
    /// ancestor of `id` in turn, nearest first.
    pub fn search_property(&self, id: PropertyId, path: &str) -> Option<PropertyId> {
        if path.starts_with('/') {
            return self.get_property(self.root, path);
        }
        let mut ancestor = self.get(id)?.parent;
        while let Some(base) = ancestor {
            if let Some(found) = self.get_property(base, path) {
                return Some(found);
            }
            ancestor = self.get(base)?.parent;
        }
        None
    }

    pub fn children(&self, id: PropertyId) -> Vec<PropertyId> {
        self.get(id).map(Property::child_ids).unwrap_or_default()
    }

    pub fn for_each_child<F>(&self, id: PropertyId, mut f: F)
    where
        F: FnMut(PropertyId, &Property),
    {
        for child in self.children(id) {
            if let Some(node) = self.get(child) {
                f(child, node);
            }
        }
    }

    /// Visits every descendant of `id` depth-first, parents before children.
    pub fn for_each_child_recursive<F>(&self, id: PropertyId, mut f: F)
    where
        F: FnMut(PropertyId, &Property),
    {
        let mut stack: Vec<PropertyId> = self.children(id).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            let Some(node) = self.get(current) else {
                continue;
            };
            f(current, node);
            stack.extend(node.child_ids().into_iter().rev());
        }
    }

    /// All nodes built for `canonical_path` (every item of an array shares
    /// one), in tree order.
    pub fn find_by_canonical_path(&self, canonical_path: &str) -> Vec<PropertyId> {
        let mut found = Vec::new();
        if self.get(self.root).is_some_and(|root| root.canonical_path == canonical_path) {
            found.push(self.root);
        }
        self.for_each_child_recursive(self.root, |id, node| {
            if node.canonical_path == canonical_path {
                found.push(id);
            }
        });
        found
    }

    /// Appends validation errors not already present on `id`. They last until
    /// `id` is validated again.
    pub fn extend_errors(&mut self, id: PropertyId, errors: Vec<ValidationError>) {
        let Some(node) = self.get_mut(id) else {
            return;
        };
        for error in errors {
            if !node.errors.contains(&error) && !node.own_errors.contains(&error) {
                node.own_errors.push(error);
            }
        }
        if node.merge_errors() {
            self.emit_errors_changed(id);
        }
    }

    pub fn on_change<F>(&mut self, listener: F) -> u64
    where
        F: FnMut(FormEvent) + Send + Sync + 'static,
    {
        let id = self.next_listener_id;
        self.next_listener_id = self.next_listener_id.saturating_add(1);
        self.listeners.insert(id, Box::new(listener));
        id
    }

    pub fn off_change(&mut self, listener_id: u64) -> bool {
        self.listeners.remove(&listener_id).is_some()
    }

    // ------------------------------------------------------------------
    // Node plumbing used by the property kinds and the factory

    pub(crate) fn factory(&self) -> Arc<FormPropertyFactory> {
        Arc::clone(&self.factory)
    }

    pub(crate) fn root_schema(&self) -> &Value {
        &self.root_schema
    }

    pub(crate) fn node(&self, id: PropertyId) -> Result<&Property, FormError> {
        self.get(id).ok_or(FormError::PropertyNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: PropertyId) -> Result<&mut Property, FormError> {
        self.get_mut(id).ok_or(FormError::PropertyNotFound(id))
    }

    pub(crate) fn object(&self, id: PropertyId) -> Result<&ObjectProperty, FormError> {
        let node = self.node(id)?;
        match &node.kind {
            PropertyKind::Object(object) => Ok(object),
            _ => Err(FormError::NotObject {
                path: node.path.clone(),
            }),
        }
    }

    pub(crate) fn object_mut(&mut self, id: PropertyId) -> Result<&mut ObjectProperty, FormError> {
        let node = self.node_mut(id)?;
        match &mut node.kind {
            PropertyKind::Object(object) => Ok(object),
            _ => Err(FormError::NotObject {
                path: node.path.clone(),
            }),
        }
    }

    pub(crate) fn array(&self, id: PropertyId) -> Result<&ArrayProperty, FormError> {
        let node = self.node(id)?;
        match &node.kind {
            PropertyKind::Array(array) => Ok(array),
            _ => Err(FormError::NotArray {
                path: node.path.clone(),
            }),
        }
    }

    pub(crate) fn array_mut(&mut self, id: PropertyId) -> Result<&mut ArrayProperty, FormError> {
        let node = self.node_mut(id)?;
        match &mut node.kind {
            PropertyKind::Array(array) => Ok(array),
            _ => Err(FormError::NotArray {
                path: node.path.clone(),
            }),
        }
    }

    pub(crate) fn insert(&mut self, node: Property) -> PropertyId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return PropertyId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        PropertyId { index, generation: 0 }
    }

    /// Drops `id` and all of its descendants. The caller detaches `id` from
    /// its parent.
    pub(crate) fn release(&mut self, id: PropertyId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let Some(slot) = self
                .slots
                .get_mut(id.index as usize)
                .filter(|slot| slot.generation == id.generation)
            else {
                continue;
            };
            if let Some(node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                stack.extend(node.child_ids());
                self.free.push(id.index);
            }
        }
    }

    pub(crate) fn set_value_internal(
        &mut self,
        id: PropertyId,
        value: Value,
        only_self: bool,
    ) -> Result<(), FormError> {
        let node = self.node(id)?;
        if matches!(node.kind, PropertyKind::Object(_)) {
            object::set_value(self, id, value, only_self)
        } else if matches!(node.kind, PropertyKind::Array(_)) {
            array::set_value(self, id, value, only_self)
        } else {
            atomic::set_value(self, id, value, only_self)
        }
    }

    pub(crate) fn reset_internal(
        &mut self,
        id: PropertyId,
        value: Option<Value>,
        only_self: bool,
    ) -> Result<(), FormError> {
        let node = self.node(id)?;
        if matches!(node.kind, PropertyKind::Object(_)) {
            object::reset(self, id, value, only_self)
        } else if matches!(node.kind, PropertyKind::Array(_)) {
            array::reset(self, id, value, only_self)
        } else {
            atomic::reset(self, id, value, only_self)
        }
    }

    /// Recomputes the value of `id` (groups reduce their children), emits a
    /// value event when asked, validates, then does the same for each
    /// ancestor unless `only_self` is set.
    pub(crate) fn update_value_and_validity(&mut self, id: PropertyId, only_self: bool, emit_event: bool) {
        let mut current = Some(id);
        while let Some(id) = current {
            let Some(node) = self.get(id) else {
                break;
            };
            let parent = node.parent;
            let reduced = match &node.kind {
                PropertyKind::Object(object) => Some(object::reduce_value(self, object)),
                PropertyKind::Array(array) => Some(array::reduce_value(self, array)),
                PropertyKind::Atomic(_) | PropertyKind::Additional(_) => None,
            };
            if let (Some(value), Some(node)) = (reduced, self.get_mut(id)) {
                node.value = value;
            }
            if emit_event {
                self.emit_value_changed(id);
            }
            self.run_validation(id);
            current = if only_self { None } else { parent };
        }
    }

    fn run_validation(&mut self, id: PropertyId) {
        let Some(node) = self.get(id) else {
            return;
        };
        let mut errors = self
            .factory
            .validator_factory()
            .validate(&self.root_schema, &node.schema, &node.value);
        if let Some(custom) = self.validator_registry.get(&node.path) {
            errors.extend(custom(&node.value, node, self));
        }
        let is_object = matches!(node.kind, PropertyKind::Object(_));
        let changed = self.get_mut(id).is_some_and(|node| {
            node.own_errors = errors;
            node.merge_errors()
        });
        if changed {
            self.emit_errors_changed(id);
        }
        if is_object {
            object::propagate_errors(self, id);
        }
    }

    /// Re-evaluates `visibleIf` rules until no node changes. Each change
    /// re-aggregates the parent chain.
    pub(crate) fn refresh_visibility(&mut self) {
        let passes = self.slots.len() + 1;
        for _ in 0..passes {
            let changed: Vec<(PropertyId, bool)> = self
                .nodes()
                .filter_map(|(id, node)| {
                    let rule = node.visibility.as_ref()?;
                    let visible = rule.evaluate(self, id);
                    (visible != node.visible).then_some((id, visible))
                })
                .collect();
            if changed.is_empty() {
                return;
            }
            for (id, visible) in changed {
                let Some(node) = self.get_mut(id) else {
                    continue;
                };
                node.visible = visible;
                let parent = node.parent;
                self.emit_visibility_changed(id);
                if let Some(parent) = parent {
                    self.update_value_and_validity(parent, false, true);
                }
            }
        }
        tracing::warn!("visibility did not settle after {} passes", passes);
    }

    fn warn_unresolved_visibility(&self) {
        for (id, node) in self.nodes() {
            let Some(rule) = &node.visibility else {
                continue;
            };
            for target in rule.unresolved_targets(self, id) {
                tracing::warn!("visibleIf of {} names unknown property {}", node.path, target);
            }
        }
    }

    fn nodes(&self) -> impl Iterator<Item = (PropertyId, &Property)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let node = slot.node.as_ref()?;
            let id = PropertyId {
                index: index as u32,
                generation: slot.generation,
            };
            Some((id, node))
        })
    }

    // ------------------------------------------------------------------
    // Events

    fn emit(&mut self, event: FormEvent) {
        for listener in self.listeners.values_mut() {
            listener(event.clone());
        }
    }

    fn emit_value_changed(&mut self, id: PropertyId) {
        let Some(node) = self.get(id) else {
            return;
        };
        let bindings: Vec<PropertyBinding> = node.bindings().to_vec();
        if self.listeners.is_empty() && bindings.is_empty() {
            return;
        }
        let event = FormEvent::ValueChanged {
            property: id,
            path: node.path.clone(),
            value: node.value.clone(),
        };
        for binding in &bindings {
            binding(&event);
        }
        self.emit(event);
    }

    pub(crate) fn emit_errors_changed(&mut self, id: PropertyId) {
        if self.listeners.is_empty() {
            return;
        }
        let Some(node) = self.get(id) else {
            return;
        };
        let event = FormEvent::ErrorsChanged {
            property: id,
            path: node.path.clone(),
            errors: node.errors.clone(),
        };
        self.emit(event);
    }

    fn emit_visibility_changed(&mut self, id: PropertyId) {
        if self.listeners.is_empty() {
            return;
        }
        let Some(node) = self.get(id) else {
            return;
        };
        let event = FormEvent::VisibilityChanged {
            property: id,
            path: node.path.clone(),
            visible: node.visible,
        };
        self.emit(event);
    }
}

impl std::fmt::Debug for FormTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormTree")
            .field("root", &self.root)
            .field("nodes", &self.len())
            .field("value", self.value())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Configures collaborators and options for a [`FormTree`].
pub struct FormTreeBuilder {
    schema: Value,
    value: Option<Value>,
    options: FormOptions,
    validator_factory: Option<Arc<dyn SchemaValidatorFactory>>,
    validator_registry: ValidatorRegistry,
    bindings: PropertyBindingRegistry,
    expression_compiler: Arc<dyn ExpressionCompiler>,
    type_mapping: PropertyTypeMapping,
}

impl FormTreeBuilder {
    pub fn new(schema: Value) -> Self {
        Self {
            schema,
            value: None,
            options: FormOptions::default(),
            validator_factory: None,
            validator_registry: ValidatorRegistry::new(),
            bindings: PropertyBindingRegistry::new(),
            expression_compiler: Arc::new(NoExpressionCompiler),
            type_mapping: PropertyTypeMapping::default(),
        }
    }

    /// Initial value; the root is reset with it after construction.
    pub fn value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn options(mut self, options: FormOptions) -> Self {
        self.options = options;
        self
    }

    pub fn validator_factory(mut self, factory: Arc<dyn SchemaValidatorFactory>) -> Self {
        self.validator_factory = Some(factory);
        self
    }

    pub fn validator_registry(mut self, registry: ValidatorRegistry) -> Self {
        self.validator_registry = registry;
        self
    }

    pub fn bindings(mut self, bindings: PropertyBindingRegistry) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn expression_compiler(mut self, compiler: Arc<dyn ExpressionCompiler>) -> Self {
        self.expression_compiler = compiler;
        self
    }

    pub fn type_mapping(mut self, type_mapping: PropertyTypeMapping) -> Self {
        self.type_mapping = type_mapping;
        self
    }

    pub fn build(self) -> Result<FormTree, FormError> {
        let schema = Arc::new(SchemaNode::from_value(self.schema.clone())?);
        let validator_factory = self.validator_factory.unwrap_or_else(|| {
            Arc::new(BasicSchemaValidatorFactory::new())
        });
        let factory = Arc::new(FormPropertyFactory::new(
            validator_factory,
            self.expression_compiler,
            Arc::new(self.bindings),
            self.type_mapping,
            self.options,
        )?);
        let mut tree = FormTree {
            slots: Vec::new(),
            free: Vec::new(),
            root: PropertyId {
                index: 0,
                generation: 0,
            },
            root_schema: Arc::new(self.schema),
            factory: Arc::clone(&factory),
            validator_registry: Arc::new(self.validator_registry),
            next_listener_id: 1,
            listeners: BTreeMap::new(),
        };
        tree.root = factory.create_property(&mut tree, &schema, None, None, None, false)?;
        tree.reset_internal(tree.root, self.value, false)?;
        tree.refresh_visibility();
        tree.warn_unresolved_visibility();
        tracing::debug!("built form tree with {} properties", tree.len());
        Ok(tree)
    }
}
