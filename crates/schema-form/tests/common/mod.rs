#![allow(dead_code)]

use schema_form::{FormTree, PropertyId};
use serde_json::Value;

/// Routes `tracing` output through the test harness; `RUST_LOG` filters it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn build(schema: Value, value: Value) -> FormTree {
    init_tracing();
    FormTree::builder(schema).value(value).build().unwrap()
}

pub fn prop(tree: &FormTree, path: &str) -> PropertyId {
    tree.get_property(tree.root(), path)
        .unwrap_or_else(|| panic!("no property at {path}"))
}

pub fn value_at<'a>(tree: &'a FormTree, path: &str) -> &'a Value {
    tree.get(prop(tree, path)).unwrap().value()
}
