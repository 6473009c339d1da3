//! Typed, read-only view of a JSON-Schema-like document.
//!
//! Only the keywords the property tree (and the default validator) act on
//! get typed fields; everything else (`definitions`, `format`, vendor
//! keywords, ...) is preserved verbatim in [`SchemaNode::extra`]. Sub-schemas
//! are shared through `Arc`, so handing a child schema to a new property is a
//! reference-count bump, never a copy.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The `type` keyword: one type name or a union of names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Union(Vec<String>),
}

impl std::fmt::Display for SchemaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaType::Single(name) => f.write_str(name),
            SchemaType::Union(names) => write!(f, "[{}]", names.join(",")),
        }
    }
}

/// The `items` keyword: one schema for every index, or a positional tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaItems {
    Tuple(Vec<Arc<SchemaNode>>),
    Single(Arc<SchemaNode>),
}

/// `additionalItems` / `additionalProperties`: a switch or a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaOrBool {
    Bool(bool),
    Schema(Arc<SchemaNode>),
}

/// How a child that is about to be created should be typed.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildSchema {
    /// Typed from a schema (declared, positional or `additional*` schema).
    Declared(Arc<SchemaNode>),
    /// Not described by the schema; typed from its runtime value.
    Additional,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchemaNode {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<SchemaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Arc<SchemaNode>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<SchemaItems>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_items: Option<SchemaOrBool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<SchemaOrBool>,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub widget: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_if: Option<Value>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SchemaNode {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn property(&self, property_id: &str) -> Option<&Arc<SchemaNode>> {
        self.properties.as_ref()?.get(property_id)
    }

    pub fn has_property(&self, property_id: &str) -> bool {
        self.property(property_id).is_some()
    }

    /// Declared property ids in declaration order.
    pub fn property_ids(&self) -> impl Iterator<Item = &String> + '_ {
        self.properties.iter().flat_map(|props| props.keys())
    }

    pub fn allows_additional_properties(&self) -> bool {
        match &self.additional_properties {
            Some(SchemaOrBool::Bool(allowed)) => *allowed,
            Some(SchemaOrBool::Schema(_)) => true,
            None => false,
        }
    }

    /// Schema for the object child `property_id`, or `None` when a closed
    /// object does not know the key.
    pub fn object_child(&self, property_id: &str) -> Option<ChildSchema> {
        if let Some(schema) = self.property(property_id) {
            return Some(ChildSchema::Declared(Arc::clone(schema)));
        }
        match &self.additional_properties {
            Some(SchemaOrBool::Bool(true)) => Some(ChildSchema::Additional),
            Some(SchemaOrBool::Schema(schema)) => Some(additional_schema(schema)),
            _ => None,
        }
    }

    /// Schema for the array item at `index`, or `None` when a tuple schema
    /// has no room for it.
    pub fn item_at(&self, index: usize) -> Option<ChildSchema> {
        match &self.items {
            Some(SchemaItems::Single(schema)) => Some(ChildSchema::Declared(Arc::clone(schema))),
            Some(SchemaItems::Tuple(schemas)) => {
                if let Some(schema) = schemas.get(index) {
                    return Some(ChildSchema::Declared(Arc::clone(schema)));
                }
                match &self.additional_items {
                    Some(SchemaOrBool::Schema(schema)) => Some(additional_schema(schema)),
                    Some(SchemaOrBool::Bool(true)) => Some(ChildSchema::Additional),
                    _ => None,
                }
            }
            None => Some(ChildSchema::Additional),
        }
    }

    /// The widget as an options map; a bare string is shorthand for `{id}`.
    pub fn widget_options(&self) -> Option<Map<String, Value>> {
        self.widget.as_ref().and_then(widget_to_options)
    }

    pub fn widget_id(&self) -> Option<String> {
        self.widget_options()?
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Applies the settings of the schema holding a `$ref` to the schema it
    /// points at.
    ///
    /// `title` and `description` are overwritten when the referencing schema
    /// has them; the widget defaults to `{id: hidden_widget}` and the
    /// referencing widget is merged over it key by key.
    pub fn overlay_reference_site(&mut self, site: &SchemaNode, hidden_widget: &str) {
        if site.title.is_some() {
            self.title.clone_from(&site.title);
        }
        if site.description.is_some() {
            self.description.clone_from(&site.description);
        }
        let mut widget = self.widget_options().unwrap_or_else(|| {
            let mut options = Map::new();
            options.insert("id".to_string(), Value::String(hidden_widget.to_string()));
            options
        });
        if let Some(overlay) = site.widget_options() {
            for (key, value) in overlay {
                widget.insert(key, value);
            }
        }
        self.widget = Some(Value::Object(widget));
    }
}

/// An empty `additional*` schema (`{}`) accepts anything, like `true`.
fn additional_schema(schema: &Arc<SchemaNode>) -> ChildSchema {
    if schema.type_.is_none() && schema.reference.is_none() {
        ChildSchema::Additional
    } else {
        ChildSchema::Declared(Arc::clone(schema))
    }
}

fn widget_to_options(widget: &Value) -> Option<Map<String, Value>> {
    match widget {
        Value::Object(options) => Some(options.clone()),
        Value::String(id) => {
            let mut options = Map::new();
            options.insert("id".to_string(), Value::String(id.clone()));
            Some(options)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(value: Value) -> SchemaNode {
        SchemaNode::from_value(value).unwrap()
    }

    #[test]
    fn parses_type_variants() {
        assert_eq!(
            schema(json!({"type": "string"})).type_,
            Some(SchemaType::Single("string".into()))
        );
        assert_eq!(
            schema(json!({"type": ["integer", "null"]})).type_,
            Some(SchemaType::Union(vec!["integer".into(), "null".into()]))
        );
    }

    #[test]
    fn keeps_declaration_order_and_unknown_keywords() {
        let node = schema(json!({
            "type": "object",
            "properties": {"z": {"type": "string"}, "a": {"type": "string"}},
            "definitions": {"x": {"type": "number"}},
            "format": "custom"
        }));
        let ids: Vec<_> = node.property_ids().cloned().collect();
        assert_eq!(ids, vec!["z", "a"]);
        assert!(node.extra.contains_key("definitions"));
        assert_eq!(node.extra.get("format"), Some(&json!("custom")));
    }

    #[test]
    fn tuple_items_fall_back_to_additional_items() {
        let node = schema(json!({
            "type": "array",
            "items": [{"type": "string"}, {"type": "number"}],
            "additionalItems": {"type": "boolean"}
        }));
        assert!(matches!(node.item_at(1), Some(ChildSchema::Declared(s)) if s.type_ == Some(SchemaType::Single("number".into()))));
        assert!(matches!(node.item_at(7), Some(ChildSchema::Declared(s)) if s.type_ == Some(SchemaType::Single("boolean".into()))));

        let closed = schema(json!({"type": "array", "items": [{"type": "string"}]}));
        assert_eq!(closed.item_at(1), None);

        let open = schema(json!({"type": "array", "items": [], "additionalItems": true}));
        assert_eq!(open.item_at(0), Some(ChildSchema::Additional));
    }

    #[test]
    fn object_child_respects_additional_properties() {
        let closed = schema(json!({"type": "object", "properties": {"a": {"type": "string"}}}));
        assert!(closed.object_child("a").is_some());
        assert_eq!(closed.object_child("b"), None);

        let open = schema(json!({"type": "object", "additionalProperties": true}));
        assert_eq!(open.object_child("b"), Some(ChildSchema::Additional));
    }

    #[test]
    fn reference_overlay_merges_widget() {
        let mut target = schema(json!({"type": "string", "title": "Target", "widget": {"id": "text", "rows": 2}}));
        let site = schema(json!({"$ref": "#/x", "title": "Site", "widget": {"rows": 5}}));
        target.overlay_reference_site(&site, "hidden");
        assert_eq!(target.title.as_deref(), Some("Site"));
        assert_eq!(target.widget, Some(json!({"id": "text", "rows": 5})));

        let mut bare = schema(json!({"type": "string", "description": "kept"}));
        bare.overlay_reference_site(&schema(json!({"$ref": "#/x"})), "hidden");
        assert_eq!(bare.widget, Some(json!({"id": "hidden"})));
        assert_eq!(bare.description.as_deref(), Some("kept"));
    }
}
