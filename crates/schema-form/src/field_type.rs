//! Field-type resolution: schema `type` keywords and runtime values to type
//! tags.

use serde_json::Value;

use crate::error::FormError;
use crate::schema::SchemaType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Null,
    Boolean,
    Number,
    Integer,
    String,
    Object,
    Array,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::String => "string",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "null" => Self::Null,
            "boolean" => Self::Boolean,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "string" => Self::String,
            "object" => Self::Object,
            "array" => Self::Array,
            _ => return None,
        })
    }

    /// Types allowed on the non-null side of a nullable union.
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            Self::String | Self::Number | Self::Integer | Self::Boolean
        )
    }

    /// Classifies a runtime value. Numbers are always `Number`; JSON does not
    /// distinguish integers.
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
            Value::String(_) => Self::String,
            Value::Number(_) => Self::Number,
            Value::Bool(_) => Self::Boolean,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves a schema `type` keyword to the name used for constructor lookup.
///
/// Unions are only accepted in their nullable form (`["string", "null"]`) and
/// resolve to the primitive side; nullability is not tracked separately.
/// A missing type resolves to the empty name, which no constructor is
/// registered under.
pub fn resolve_schema_type(schema_type: Option<&SchemaType>) -> Result<String, FormError> {
    let names = match schema_type {
        None => return Ok(String::new()),
        Some(SchemaType::Single(name)) => return Ok(name.clone()),
        Some(SchemaType::Union(names)) => names,
    };
    if names.len() <= 1 {
        return Ok(names.first().cloned().unwrap_or_default());
    }

    let unsupported = |reason: String| FormError::UnsupportedSchema {
        type_spec: format!("[{}]", names.join(",")),
        reason,
    };
    let null = FieldType::Null.as_str();
    if !names.iter().any(|name| name == null) {
        return Err(unsupported(
            "only nullable unions are supported, for example [\"string\",\"null\"]".to_string(),
        ));
    }
    if names.len() != 2 {
        return Err(unsupported(
            "a nullable union holds exactly two types, one of them \"null\"".to_string(),
        ));
    }
    let concrete = names.iter().find(|name| *name != null);
    match concrete.and_then(|name| FieldType::parse(name)) {
        Some(field_type) if field_type.is_primitive() => Ok(field_type.as_str().to_string()),
        _ => Err(unsupported(format!(
            "unsupported second type {} for nullable union, allowed types are \"number\", \"integer\", \"boolean\", \"string\"",
            concrete.map_or("null", String::as_str)
        ))),
    }
}
