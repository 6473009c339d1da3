mod common;

use std::sync::{Arc, Mutex};

use common::{build, init_tracing, prop};
use schema_form::{
    Expression, ExpressionCompiler, ExpressionContext, ExpressionError, FnExpressionCompiler,
    FormError, FormEvent, FormTree,
};
use serde_json::{json, Value};

fn contact_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "kind": {"type": "string"},
            "email": {"type": "string", "visibleIf": {"kind": ["email"]}},
            "phone": {"type": "string", "visibleIf": {"/kind": ["phone", "sms"]}},
            "note": {"type": "string", "visibleIf": {"kind": "$ANY$"}}
        }
    })
}

fn visible(tree: &FormTree, path: &str) -> bool {
    tree.get(prop(tree, path)).unwrap().visible()
}

#[test]
fn hidden_properties_leave_the_value() {
    let mut tree = build(
        contact_schema(),
        json!({"email": "a@b.c", "phone": "123", "note": "hi"}),
    );
    assert!(!visible(&tree, "email"));
    assert!(!visible(&tree, "phone"));
    assert!(!visible(&tree, "note"));
    assert_eq!(tree.value(), &json!({}));

    let kind = prop(&tree, "kind");
    tree.set_value(kind, json!("email"), false).unwrap();
    assert!(visible(&tree, "email"));
    assert!(!visible(&tree, "phone"));
    assert!(visible(&tree, "note"));
    assert_eq!(tree.value(), &json!({"kind": "email", "email": "a@b.c", "note": "hi"}));

    tree.set_value(kind, json!("sms"), false).unwrap();
    assert_eq!(tree.value(), &json!({"kind": "sms", "phone": "123", "note": "hi"}));
}

#[test]
fn conditions_match_array_members() {
    let schema = json!({
        "type": "object",
        "properties": {
            "roles": {"type": "array", "items": {"type": "string"}},
            "admin_note": {"type": "string", "visibleIf": {"roles": ["admin"]}}
        }
    });
    let mut tree = build(schema, json!({"roles": ["user"], "admin_note": "x"}));
    assert!(!visible(&tree, "admin_note"));

    let roles = prop(&tree, "roles");
    tree.add_item(roles, Some(json!("admin"))).unwrap();
    assert!(visible(&tree, "admin_note"));
    assert_eq!(tree.value(), &json!({"roles": ["user", "admin"], "admin_note": "x"}));
}

#[test]
fn one_of_and_all_of_combine_rules() {
    let schema = json!({
        "type": "object",
        "properties": {
            "a": {"type": "boolean"},
            "b": {"type": "boolean"},
            "either": {"type": "string", "visibleIf": {"oneOf": [{"a": [true]}, {"b": [true]}]}},
            "both": {"type": "string", "visibleIf": {"allOf": [{"a": [true]}, {"b": [true]}]}}
        }
    });
    let mut tree = build(schema, json!({"a": true, "either": "e", "both": "b"}));
    assert!(visible(&tree, "either"));
    assert!(!visible(&tree, "both"));

    let b = prop(&tree, "b");
    tree.set_value(b, json!(true), false).unwrap();
    assert!(visible(&tree, "both"));
}

#[test]
fn hidden_targets_hide_their_dependants() {
    let schema = json!({
        "type": "object",
        "properties": {
            "a": {"type": "string"},
            "b": {"type": "string", "visibleIf": {"a": "$ANY$"}},
            "c": {"type": "string", "visibleIf": {"b": "$ANY$"}}
        }
    });
    let mut tree = build(schema, json!({"a": "x", "b": "y", "c": "z"}));
    assert!(visible(&tree, "c"));

    let a = prop(&tree, "a");
    tree.set_value(a, json!(""), false).unwrap();
    assert!(!visible(&tree, "b"));
    assert!(!visible(&tree, "c"));
    assert_eq!(tree.value(), &json!({}));
}

#[test]
fn item_rules_resolve_against_their_item() {
    let schema = json!({
        "type": "object",
        "properties": {
            "people": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "adult": {"type": "boolean"},
                        "licence": {"type": "string", "visibleIf": {"adult": [true]}}
                    }
                }
            }
        }
    });
    let tree = build(
        schema,
        json!({"people": [{"adult": true, "licence": "A"}, {"adult": false, "licence": "B"}]}),
    );
    assert!(visible(&tree, "people/0/licence"));
    assert!(!visible(&tree, "people/1/licence"));
    assert_eq!(
        tree.value(),
        &json!({"people": [{"adult": true, "licence": "A"}, {"adult": false}]})
    );
}

fn threshold_compiler() -> Arc<dyn ExpressionCompiler> {
    Arc::new(FnExpressionCompiler(|source: &str| -> Result<Arc<dyn Expression>, ExpressionError> {
        let threshold: f64 = source
            .strip_prefix("target.value >= ")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| ExpressionError(format!("unsupported expression {source}")))?;
        Ok(Arc::new(move |ctx: &ExpressionContext<'_>| {
            ctx.target.value().as_f64().is_some_and(|v| v >= threshold)
        }))
    }))
}

#[test]
fn expressions_are_evaluated_with_the_target() {
    init_tracing();
    let schema = json!({
        "type": "object",
        "properties": {
            "age": {"type": "integer"},
            "licence": {"type": "string", "visibleIf": {"age": ["$EXP$ target.value >= 18"]}}
        }
    });
    let mut tree = FormTree::builder(schema)
        .expression_compiler(threshold_compiler())
        .value(json!({"age": 12, "licence": "B"}))
        .build()
        .unwrap();
    assert!(!visible(&tree, "licence"));

    let age = prop(&tree, "age");
    tree.set_value(age, json!(30), false).unwrap();
    assert!(visible(&tree, "licence"));
    assert_eq!(tree.value(), &json!({"age": 30, "licence": "B"}));
}

#[test]
fn expressions_fail_without_a_compiler() {
    init_tracing();
    let schema = json!({
        "type": "object",
        "properties": {
            "age": {"type": "integer"},
            "licence": {"type": "string", "visibleIf": {"age": ["$EXP$ target.value >= 18"]}}
        }
    });
    let err = FormTree::new(schema).unwrap_err();
    assert!(matches!(err, FormError::Expression { ref path, .. } if path == "/licence"));

    let bad = json!({
        "type": "object",
        "properties": {"x": {"type": "string", "visibleIf": "age"}}
    });
    assert!(matches!(FormTree::new(bad), Err(FormError::InvalidVisibility { .. })));
}

#[test]
fn visibility_changes_are_reported() {
    let mut tree = build(contact_schema(), json!({"email": "a@b.c"}));
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    tree.on_change(move |event| {
        if let FormEvent::VisibilityChanged { path, visible, .. } = event {
            sink.lock().unwrap().push((path, visible));
        }
    });

    let kind = prop(&tree, "kind");
    tree.set_value(kind, json!("email"), false).unwrap();
    let mut seen = events.lock().unwrap().clone();
    seen.sort();
    assert_eq!(
        seen,
        vec![("/email".to_string(), true), ("/note".to_string(), true)]
    );
}
