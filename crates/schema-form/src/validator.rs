//! Validation collaborators.
//!
//! The tree never interprets JSON-Schema validation keywords itself. It asks
//! a [`SchemaValidatorFactory`] for the errors of a (schema, value) pair and
//! merges them with the custom validator registered for the node's path in a
//! [`ValidatorRegistry`]. [`BasicSchemaValidatorFactory`] delegates to the
//! `jsonschema` crate (draft 7, which still has tuple `items` and
//! `additionalItems`) so a tree works without an external validator.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, Validator};
use schema_form_pointer::{format_json_pointer, get, parse_reference};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FormError;
use crate::field_type::FieldType;
use crate::property::Property;
use crate::schema::SchemaNode;
use crate::tree::FormTree;

/// One validation finding. `path` is a JSON Pointer relative to the value
/// that was validated (`""` is the value itself).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
    pub kind: String,
}

impl ValidationError {
    pub fn new(kind: impl Into<String>, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind: kind.into(),
        }
    }
}

/// Kinds reported by [`BasicSchemaValidatorFactory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidType,
    EnumMismatch,
    MissingRequiredProperty,
    AdditionalProperties,
    AdditionalItems,
    MinLength,
    MaxLength,
    Pattern,
    Format,
    Minimum,
    Maximum,
    ArrayTooShort,
    ArrayTooLong,
    InvalidSchema,
    Other,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidType => "INVALID_TYPE",
            Self::EnumMismatch => "ENUM_MISMATCH",
            Self::MissingRequiredProperty => "OBJECT_MISSING_REQUIRED_PROPERTY",
            Self::AdditionalProperties => "OBJECT_ADDITIONAL_PROPERTIES",
            Self::AdditionalItems => "ARRAY_ADDITIONAL_ITEMS",
            Self::MinLength => "MIN_LENGTH",
            Self::MaxLength => "MAX_LENGTH",
            Self::Pattern => "PATTERN",
            Self::Format => "INVALID_FORMAT",
            Self::Minimum => "MINIMUM",
            Self::Maximum => "MAXIMUM",
            Self::ArrayTooShort => "ARRAY_LENGTH_SHORT",
            Self::ArrayTooLong => "ARRAY_LENGTH_LONG",
            Self::InvalidSchema => "INVALID_SCHEMA",
            Self::Other => "SCHEMA_VIOLATION",
        }
    }

    fn of(kind: &ValidationErrorKind) -> Self {
        match kind {
            ValidationErrorKind::Type { .. } => Self::InvalidType,
            ValidationErrorKind::Enum { .. } | ValidationErrorKind::Constant { .. } => {
                Self::EnumMismatch
            }
            ValidationErrorKind::Required { .. } => Self::MissingRequiredProperty,
            ValidationErrorKind::AdditionalProperties { .. } => Self::AdditionalProperties,
            ValidationErrorKind::AdditionalItems { .. } => Self::AdditionalItems,
            ValidationErrorKind::MinLength { .. } => Self::MinLength,
            ValidationErrorKind::MaxLength { .. } => Self::MaxLength,
            ValidationErrorKind::Pattern { .. } => Self::Pattern,
            ValidationErrorKind::Format { .. } => Self::Format,
            ValidationErrorKind::Minimum { .. } | ValidationErrorKind::ExclusiveMinimum { .. } => {
                Self::Minimum
            }
            ValidationErrorKind::Maximum { .. } | ValidationErrorKind::ExclusiveMaximum { .. } => {
                Self::Maximum
            }
            ValidationErrorKind::MinItems { .. } => Self::ArrayTooShort,
            ValidationErrorKind::MaxItems { .. } => Self::ArrayTooLong,
            _ => Self::Other,
        }
    }
}

pub trait SchemaValidatorFactory: Send + Sync {
    /// Resolves a `$ref` against the root schema document.
    fn get_schema(&self, root: &Value, reference: &str) -> Result<Value, FormError>;

    /// Validates `value` against `schema`; `root` resolves nested references.
    fn validate(&self, root: &Value, schema: &SchemaNode, value: &Value) -> Vec<ValidationError>;
}

/// Keywords of the root schema copied into every node schema so nested
/// `#/definitions/...` references keep resolving.
const SHARED_KEYWORDS: [&str; 2] = ["definitions", "$defs"];

/// Keywords holding instance data rather than subschemas.
const DATA_KEYWORDS: [&str; 5] = ["enum", "const", "default", "examples", "visibleIf"];

/// Default validator collaborator. Compiled validators are cached per node
/// schema, so repeated validation of the same schema only compiles once.
///
/// A `null` value counts as "no value": errors raised against a `null`
/// instance are dropped and absence is reported through `required` only.
#[derive(Default)]
pub struct BasicSchemaValidatorFactory {
    compiled: Mutex<HashMap<String, Arc<Validator>>>,
}

impl BasicSchemaValidatorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn validator_for(&self, root: &Value, schema: &SchemaNode) -> Result<Arc<Validator>, ValidationError> {
        let document = validation_document(root, schema)?;
        let key = document.to_string();
        let mut compiled = self.compiled.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(validator) = compiled.get(&key) {
            return Ok(Arc::clone(validator));
        }
        let validator = jsonschema::options()
            .with_draft(Draft::Draft7)
            .build(&document)
            .map_err(|err| {
                tracing::debug!("schema does not compile: {}", err);
                ValidationError::new(ErrorKind::InvalidSchema.as_str(), "", err.to_string())
            })?;
        let validator = Arc::new(validator);
        compiled.insert(key, Arc::clone(&validator));
        Ok(validator)
    }
}

impl SchemaValidatorFactory for BasicSchemaValidatorFactory {
    fn get_schema(&self, root: &Value, reference: &str) -> Result<Value, FormError> {
        let path = parse_reference(reference).map_err(|source| FormError::InvalidReference {
            reference: reference.to_string(),
            source,
        })?;
        get(root, &path)
            .cloned()
            .ok_or_else(|| FormError::UnresolvedReference {
                reference: reference.to_string(),
            })
    }

    fn validate(&self, root: &Value, schema: &SchemaNode, value: &Value) -> Vec<ValidationError> {
        let validator = match self.validator_for(root, schema) {
            Ok(validator) => validator,
            Err(error) => return vec![error],
        };
        validator
            .iter_errors(value)
            .filter(|error| !error.instance.is_null())
            .map(|error| {
                let mut path = error.instance_path.to_string();
                // point at the missing child so it can pick the error up
                if let ValidationErrorKind::Required { property } = &error.kind {
                    if let Some(name) = property.as_str() {
                        path.push_str(&format_json_pointer(&[name]));
                    }
                }
                ValidationError::new(ErrorKind::of(&error.kind).as_str(), path, error.to_string())
            })
            .collect()
    }
}

impl std::fmt::Debug for BasicSchemaValidatorFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self
            .compiled
            .lock()
            .map_or(0, |compiled| compiled.len());
        f.debug_struct("BasicSchemaValidatorFactory")
            .field("cached", &cached)
            .finish()
    }
}

/// The node schema as a standalone document: shared definitions of the root
/// are copied in and type names the form registers beyond JSON Schema's own
/// (`"type": "date"`) are dropped.
fn validation_document(root: &Value, schema: &SchemaNode) -> Result<Value, ValidationError> {
    let mut document = serde_json::to_value(schema).map_err(|err| {
        ValidationError::new(ErrorKind::InvalidSchema.as_str(), "", err.to_string())
    })?;
    if let (Value::Object(document), Some(root)) = (&mut document, root.as_object()) {
        for keyword in SHARED_KEYWORDS {
            if let (false, Some(shared)) = (document.contains_key(keyword), root.get(keyword)) {
                document.insert(keyword.to_string(), shared.clone());
            }
        }
    }
    drop_form_types(&mut document);
    Ok(document)
}

fn drop_form_types(schema: &mut Value) {
    match schema {
        Value::Object(map) => {
            let custom = match map.get("type") {
                Some(Value::String(name)) => FieldType::parse(name).is_none(),
                Some(Value::Array(names)) => names
                    .iter()
                    .any(|name| name.as_str().is_some_and(|name| FieldType::parse(name).is_none())),
                _ => false,
            };
            if custom {
                map.remove("type");
            }
            for (keyword, child) in map.iter_mut() {
                if !DATA_KEYWORDS.contains(&keyword.as_str()) {
                    drop_form_types(child);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(drop_form_types),
        _ => {}
    }
}

/// Custom validator: receives the node's value, the node and the tree.
pub type CustomValidator =
    Arc<dyn Fn(&Value, &Property, &FormTree) -> Vec<ValidationError> + Send + Sync>;

/// Custom validators keyed by form path (`/items/*/name` covers every item).
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    validators: HashMap<String, CustomValidator>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, path: impl Into<String>, validator: F)
    where
        F: Fn(&Value, &Property, &FormTree) -> Vec<ValidationError> + Send + Sync + 'static,
    {
        self.validators.insert(path.into(), Arc::new(validator));
    }

    pub fn get(&self, path: &str) -> Option<&CustomValidator> {
        self.validators.get(path)
    }

    pub fn remove(&mut self, path: &str) -> bool {
        self.validators.remove(path).is_some()
    }

    pub fn clear(&mut self) {
        self.validators.clear();
    }
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("paths", &self.validators.keys().collect::<Vec<_>>())
            .finish()
    }
}
