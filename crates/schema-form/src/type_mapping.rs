//! Registry from resolved schema type names to node constructors.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::FormError;
use crate::factory::FormPropertyFactory;
use crate::property::{array, atomic, object, Property, PropertyId, PropertyInit};
use crate::tree::FormTree;

pub type GroupConstructor = fn(
    &FormPropertyFactory,
    &mut FormTree,
    PropertyInit,
    Option<Value>,
) -> Result<PropertyId, FormError>;

pub type AtomicConstructor = fn(PropertyInit) -> Property;

/// Groups build their children through the factory and insert themselves;
/// atomic constructors only produce the detached node.
#[derive(Clone, Copy)]
pub enum PropertyConstructor {
    Group(GroupConstructor),
    Atomic(AtomicConstructor),
}

impl std::fmt::Debug for PropertyConstructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Group(_) => f.write_str("Group"),
            Self::Atomic(_) => f.write_str("Atomic"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PropertyTypeMapping {
    constructors: BTreeMap<String, PropertyConstructor>,
}

impl Default for PropertyTypeMapping {
    fn default() -> Self {
        let mut mapping = Self::empty();
        mapping.register("object", PropertyConstructor::Group(object::construct));
        mapping.register("array", PropertyConstructor::Group(array::construct));
        mapping.register("string", PropertyConstructor::Atomic(atomic::string_property));
        mapping.register("number", PropertyConstructor::Atomic(atomic::number_property));
        mapping.register("integer", PropertyConstructor::Atomic(atomic::integer_property));
        mapping.register("boolean", PropertyConstructor::Atomic(atomic::boolean_property));
        mapping.register("null", PropertyConstructor::Atomic(atomic::null_property));
        mapping
    }
}

impl PropertyTypeMapping {
    /// A mapping with no types; every lookup fails.
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, type_name: impl Into<String>, constructor: PropertyConstructor) {
        self.constructors.insert(type_name.into(), constructor);
    }

    /// Registers `type_name` with the constructor of an existing type.
    pub fn alias(&mut self, type_name: impl Into<String>, existing: &str) -> bool {
        match self.constructors.get(existing).copied() {
            Some(constructor) => {
                self.register(type_name, constructor);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, type_name: &str) -> Option<PropertyConstructor> {
        self.constructors.get(type_name).copied()
    }

    pub fn type_names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }
}
