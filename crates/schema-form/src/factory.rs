//! Builds property nodes from schema nodes.
//!
//! The factory computes each node's paths, expands `$ref` schemas, resolves
//! the schema type and dispatches to the registered constructor. Groups
//! recurse back into the factory for their children.

use std::sync::Arc;

use regex::Regex;
use schema_form_pointer::{child_path, ROOT_PATH, WILDCARD};
use serde_json::Value;

use crate::binding::PropertyBindingRegistry;
use crate::error::FormError;
use crate::expression::ExpressionCompiler;
use crate::field_type::resolve_schema_type;
use crate::options::FormOptions;
use crate::property::{additional, PropertyId, PropertyInit, PropertyKind};
use crate::schema::{ChildSchema, SchemaNode};
use crate::tree::FormTree;
use crate::type_mapping::{PropertyConstructor, PropertyTypeMapping};
use crate::validator::SchemaValidatorFactory;
use crate::visibility::VisibilityRule;

pub struct FormPropertyFactory {
    validator_factory: Arc<dyn SchemaValidatorFactory>,
    expression_compiler: Arc<dyn ExpressionCompiler>,
    bindings: Arc<PropertyBindingRegistry>,
    type_mapping: PropertyTypeMapping,
    options: FormOptions,
    extension_pattern: Option<Regex>,
}

impl FormPropertyFactory {
    pub fn new(
        validator_factory: Arc<dyn SchemaValidatorFactory>,
        expression_compiler: Arc<dyn ExpressionCompiler>,
        bindings: Arc<PropertyBindingRegistry>,
        type_mapping: PropertyTypeMapping,
        options: FormOptions,
    ) -> Result<Self, FormError> {
        options.validate()?;
        let extension_pattern = options.extension_pattern()?;
        Ok(Self {
            validator_factory,
            expression_compiler,
            bindings,
            type_mapping,
            options,
            extension_pattern,
        })
    }

    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    pub fn type_mapping(&self) -> &PropertyTypeMapping {
        &self.type_mapping
    }

    pub(crate) fn validator_factory(&self) -> &dyn SchemaValidatorFactory {
        self.validator_factory.as_ref()
    }

    /// Whether an object at `path` takes its children from its value.
    pub fn is_extension_path(&self, path: &str) -> bool {
        self.extension_pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(path))
    }

    /// Creates a node for `schema` under `parent` and inserts it into `tree`.
    ///
    /// `property_id` names the child for object parents and is ignored for
    /// arrays. With `additional` set the schema is ignored and the node's
    /// type is read off `value`. The returned node is not yet attached to
    /// its parent's child list.
    pub fn create_property(
        &self,
        tree: &mut FormTree,
        schema: &Arc<SchemaNode>,
        parent: Option<PropertyId>,
        property_id: Option<&str>,
        value: Option<Value>,
        additional: bool,
    ) -> Result<PropertyId, FormError> {
        self.create(tree, schema, parent, property_id, value, additional, 0)
    }

    /// Creates a child from the schema slot a group looked up for it.
    pub(crate) fn create_child(
        &self,
        tree: &mut FormTree,
        child: &ChildSchema,
        parent: Option<PropertyId>,
        property_id: Option<&str>,
        value: Option<Value>,
    ) -> Result<PropertyId, FormError> {
        match child {
            ChildSchema::Declared(schema) => {
                self.create_property(tree, schema, parent, property_id, value, false)
            }
            ChildSchema::Additional => self.create_property(
                tree,
                &Arc::new(SchemaNode::default()),
                parent,
                property_id,
                value,
                true,
            ),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn create(
        &self,
        tree: &mut FormTree,
        schema: &Arc<SchemaNode>,
        parent: Option<PropertyId>,
        property_id: Option<&str>,
        value: Option<Value>,
        additional: bool,
        ref_depth: usize,
    ) -> Result<PropertyId, FormError> {
        let (path, canonical_path) = self.child_paths(tree, parent, property_id)?;
        let depth = path.split('/').filter(|segment| !segment.is_empty()).count();
        if depth > self.options.max_depth {
            return Err(FormError::MaxDepthExceeded {
                path,
                max: self.options.max_depth,
            });
        }
        let init = PropertyInit {
            schema: Arc::clone(schema),
            parent,
            path,
            canonical_path,
            bindings: Arc::clone(&self.bindings),
        };

        if additional {
            let id = tree.insert(additional::construct(init, value));
            tree.update_value_and_validity(id, true, false);
            return Ok(id);
        }

        if let Some(reference) = &schema.reference {
            if ref_depth >= self.options.max_reference_depth {
                return Err(FormError::ReferenceDepthExceeded {
                    path: init.path,
                    max: self.options.max_reference_depth,
                });
            }
            tracing::debug!("expanding {} at {}", reference, init.path);
            let target = self
                .validator_factory
                .get_schema(tree.root_schema(), reference)?;
            let mut resolved = SchemaNode::from_value(target)?;
            resolved.overlay_reference_site(schema, &self.options.hidden_widget);
            return self.create(
                tree,
                &Arc::new(resolved),
                parent,
                property_id,
                value,
                false,
                ref_depth + 1,
            );
        }

        let type_name = resolve_schema_type(schema.type_.as_ref())?;
        let Some(constructor) = self.type_mapping.get(&type_name) else {
            return Err(FormError::UnknownType {
                type_name,
                existing: self.type_mapping.type_names().join(","),
            });
        };
        let visibility = match &schema.visible_if {
            Some(visible_if) => Some(Arc::new(VisibilityRule::compile(
                visible_if,
                &init.path,
                self.expression_compiler.as_ref(),
            )?)),
            None => None,
        };
        tracing::debug!("creating {} property at {}", type_name, init.path);

        let id = match constructor {
            PropertyConstructor::Group(construct) => construct(self, tree, init, value)?,
            PropertyConstructor::Atomic(construct) => tree.insert(construct(init)),
        };
        let node = tree.node_mut(id)?;
        node.visibility = visibility;
        if matches!(node.kind, PropertyKind::Object(_) | PropertyKind::Array(_)) {
            if let Err(err) = tree.reset_internal(id, None, true) {
                tree.release(id);
                return Err(err);
            }
        }
        Ok(id)
    }

    fn child_paths(
        &self,
        tree: &FormTree,
        parent: Option<PropertyId>,
        property_id: Option<&str>,
    ) -> Result<(String, String), FormError> {
        let Some(parent) = parent else {
            return Ok((ROOT_PATH.to_string(), ROOT_PATH.to_string()));
        };
        let parent = tree.node(parent)?;
        let segment = match &parent.kind {
            PropertyKind::Object(_) => property_id.ok_or_else(|| FormError::MissingPropertyId {
                path: parent.path.clone(),
            })?,
            PropertyKind::Array(_) => WILDCARD,
            kind => {
                return Err(FormError::InvalidParentType {
                    kind: kind.name(),
                    path: parent.path.clone(),
                })
            }
        };
        Ok((
            child_path(&parent.path, segment),
            child_path(&parent.canonical_path, segment),
        ))
    }
}

impl std::fmt::Debug for FormPropertyFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormPropertyFactory")
            .field("type_mapping", &self.type_mapping)
            .field("options", &self.options)
            .finish()
    }
}
