mod common;

use common::{build, init_tracing, prop, value_at};
use schema_form::{FieldType, FormTree, PropertyKind};
use serde_json::json;

fn foo_bar_baz() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "FOO": {"type": "integer"},
            "BAR": {"type": "integer"},
            "BAZ": {"type": "object"}
        }
    })
}

#[test]
fn creates_every_declared_property() {
    init_tracing();
    let tree = FormTree::new(foo_bar_baz()).unwrap();
    for key in ["FOO", "BAR", "BAZ"] {
        assert!(tree.get_property(tree.root(), key).is_some(), "missing {key}");
    }
    let root = tree.get(tree.root()).unwrap();
    assert_eq!(root.path(), "/");
    assert_eq!(tree.get(prop(&tree, "BAZ")).unwrap().path(), "/BAZ");
    assert!(matches!(root.kind(), PropertyKind::Object(object) if !object.is_extension()));
}

#[test]
fn reduced_value_skips_empty_children() {
    let tree = build(foo_bar_baz(), json!({"FOO": 1}));
    assert_eq!(tree.value(), &json!({"FOO": 1}));
    // BAZ is an empty object: it has no key, so it has no value either.
    assert!(!tree.get(prop(&tree, "BAZ")).unwrap().has_value());
}

#[test]
fn reset_applies_defaults_per_child() {
    let schema = json!({
        "type": "object",
        "properties": {
            "name": {"type": "string", "default": "anonymous"},
            "age": {"type": "integer"}
        }
    });
    let mut tree = build(schema, json!({"age": 3}));
    assert_eq!(tree.value(), &json!({"name": "anonymous", "age": 3}));

    let root = tree.root();
    tree.reset(root, Some(json!({"name": "Ada"})), false).unwrap();
    assert_eq!(tree.value(), &json!({"name": "Ada"}));
}

#[test]
fn object_default_feeds_children() {
    let schema = json!({
        "type": "object",
        "properties": {
            "point": {
                "type": "object",
                "default": {"x": 1, "y": 2},
                "properties": {"x": {"type": "number"}, "y": {"type": "number"}}
            }
        }
    });
    let tree = build(schema, json!(null));
    assert_eq!(tree.value(), &json!({"point": {"x": 1, "y": 2}}));
}

#[test]
fn closed_objects_ignore_unknown_keys() {
    let schema = json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {"known": {"type": "integer"}}
    });
    let mut tree = build(schema, json!({"known": 1, "extra": 2}));
    assert!(tree.get_property(tree.root(), "extra").is_none());
    assert_eq!(tree.value(), &json!({"known": 1}));

    let root = tree.root();
    tree.set_value(root, json!({"other": true}), false).unwrap();
    assert!(tree.get_property(tree.root(), "other").is_none());
    assert_eq!(tree.children(root).len(), 1);
}

#[test]
fn open_objects_create_additional_properties() {
    let schema = json!({
        "type": "object",
        "additionalProperties": true,
        "properties": {"known": {"type": "integer"}}
    });
    let tree = build(schema, json!({"known": 1, "extra": {"a": 11}}));

    let extra = tree.get(prop(&tree, "extra")).unwrap();
    assert!(extra.is_additional());
    assert_eq!(extra.field_type(), FieldType::Object);
    assert_eq!(extra.value(), &json!({"a": 11}));
    assert_eq!(extra.path(), "/extra");
    assert_eq!(tree.value(), &json!({"known": 1, "extra": {"a": 11}}));
}

#[test]
fn set_value_creates_missing_children_and_reuses_existing_ones() {
    let schema = json!({
        "type": "object",
        "additionalProperties": true,
        "properties": {"known": {"type": "integer"}}
    });
    let mut tree = build(schema, json!({"extra": "x"}));
    let extra = prop(&tree, "extra");
    let root = tree.root();

    tree.set_value(root, json!({"extra": "y", "more": 2.5}), false).unwrap();
    assert_eq!(prop(&tree, "extra"), extra);
    assert_eq!(value_at(&tree, "extra"), &json!("y"));
    assert_eq!(tree.get(prop(&tree, "more")).unwrap().field_type(), FieldType::Number);
    assert_eq!(tree.value(), &json!({"extra": "y", "more": 2.5}));
}

#[test]
fn additional_properties_follow_the_type_of_their_value() {
    let schema = json!({"type": "object", "additionalProperties": true, "properties": {}});
    let mut tree = build(schema, json!({"extra": null}));
    let extra = prop(&tree, "extra");
    assert_eq!(tree.get(extra).unwrap().field_type(), FieldType::Null);

    let root = tree.root();
    tree.set_value(root, json!({"extra": "text"}), false).unwrap();
    let node = tree.get(extra).unwrap();
    assert_eq!(node.field_type(), FieldType::String);
    assert!(node.is_valid(), "{:?}", node.errors());

    tree.reset(extra, Some(json!([1, 2])), false).unwrap();
    let node = tree.get(extra).unwrap();
    assert_eq!(node.field_type(), FieldType::Array);
    assert!(node.is_valid(), "{:?}", node.errors());
    assert!(tree.get(root).unwrap().is_valid());
}

#[test]
fn additional_properties_schema_types_new_children() {
    let schema = json!({
        "type": "object",
        "additionalProperties": {"type": "integer", "minimum": 0},
        "properties": {}
    });
    let tree = build(schema, json!({"a": -1}));
    let a = tree.get(prop(&tree, "a")).unwrap();
    assert!(!a.is_additional());
    assert_eq!(a.field_type(), FieldType::Integer);
    assert!(!a.is_valid());
}

#[test]
fn removes_only_additional_properties() {
    let schema = json!({
        "type": "object",
        "additionalProperties": true,
        "properties": {"known": {"type": "integer"}}
    });
    let mut tree = build(schema, json!({"known": 1, "extra": 2}));
    let extra = prop(&tree, "extra");
    let root = tree.root();

    assert!(!tree.remove_property(root, "known").unwrap());
    assert!(!tree.remove_property(root, "missing").unwrap());
    assert!(tree.remove_property(root, "extra").unwrap());
    assert!(tree.get(extra).is_none());
    assert_eq!(tree.value(), &json!({"known": 1}));

    let known = prop(&tree, "known");
    assert!(tree.remove_property(known, "x").is_err());
}

fn extension_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "x": {
                "type": "object",
                "properties": {
                    "extension": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "FOO": {"type": "integer"},
                                "BAR": {"type": "integer"},
                                "BAZ": {"type": "object"}
                            }
                        }
                    }
                }
            }
        }
    })
}

#[test]
fn extension_objects_take_children_from_their_value() {
    let tree = build(extension_schema(), json!({"x": {"extension": [{"FOO": 1}]}}));
    let item = prop(&tree, "x/extension/0");
    let node = tree.get(item).unwrap();
    assert_eq!(node.path(), "/x/extension/*");
    assert!(matches!(node.kind(), PropertyKind::Object(object) if object.is_extension()));

    assert!(tree.get_property(item, "FOO").is_some());
    assert!(tree.get_property(item, "BAR").is_none());
    assert!(tree.get_property(item, "BAZ").is_none());
    assert_eq!(tree.value(), &json!({"x": {"extension": [{"FOO": 1}]}}));
}

#[test]
fn extension_objects_without_value_declare_everything() {
    let mut tree = build(extension_schema(), json!({}));
    let extension = prop(&tree, "x/extension");
    let item = tree.add_item(extension, None).unwrap().unwrap();
    assert_eq!(tree.children(item).len(), 3);
}

#[test]
fn extension_keys_are_configurable() {
    init_tracing();
    let options = schema_form::FormOptions {
        extension_keys: vec!["ext".into()],
        ..Default::default()
    };
    let schema = json!({
        "type": "object",
        "properties": {
            "ext": {"type": "array", "items": {"type": "object", "properties": {"a": {"type": "string"}, "b": {"type": "string"}}}},
            "extension": {"type": "array", "items": {"type": "object", "properties": {"a": {"type": "string"}, "b": {"type": "string"}}}}
        }
    });
    let tree = FormTree::builder(schema)
        .options(options)
        .value(json!({"ext": [{"a": "1"}], "extension": [{"a": "1"}]}))
        .build()
        .unwrap();
    assert_eq!(tree.children(prop(&tree, "ext/0")).len(), 1);
    assert_eq!(tree.children(prop(&tree, "extension/0")).len(), 2);
}

#[test]
fn property_ids_are_escaped_in_paths() {
    let schema = json!({
        "type": "object",
        "properties": {"a/b": {"type": "string"}}
    });
    let tree = build(schema, json!({"a/b": "v"}));
    let node = tree.get(prop(&tree, "a~1b")).unwrap();
    assert_eq!(node.path(), "/a~1b");
    assert_eq!(tree.value(), &json!({"a/b": "v"}));
}
