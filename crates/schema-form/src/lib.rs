//! Live property trees for JSON-Schema-like documents.
//!
//! A [`FormTree`] mirrors a schema as a tree of [`Property`] nodes. Objects
//! and arrays aggregate their children's values, every node re-validates
//! itself on change, and `visibleIf` rules hide nodes (and their values)
//! based on other nodes.
//!
//! ```
//! use schema_form::FormTree;
//! use serde_json::json;
//!
//! let mut tree = FormTree::builder(json!({
//!     "type": "object",
//!     "properties": {
//!         "name": {"type": "string"},
//!         "age": {"type": "integer", "minimum": 0}
//!     }
//! }))
//! .value(json!({"name": "Ada"}))
//! .build()
//! .unwrap();
//!
//! let age = tree.get_property(tree.root(), "age").unwrap();
//! tree.set_value(age, json!(-1), false).unwrap();
//! assert_eq!(tree.value(), &json!({"name": "Ada", "age": -1}));
//! assert!(!tree.get(age).unwrap().is_valid());
//! ```

pub mod binding;
pub mod error;
pub mod events;
pub mod expression;
pub mod factory;
pub mod field_type;
pub mod options;
pub mod property;
pub mod schema;
pub mod tree;
pub mod type_mapping;
pub mod validator;
pub mod visibility;

pub use binding::{PropertyBinding, PropertyBindingRegistry};
pub use error::FormError;
pub use events::FormEvent;
pub use expression::{
    Expression, ExpressionCompiler, ExpressionContext, ExpressionError, FnExpressionCompiler,
    NoExpressionCompiler,
};
pub use factory::FormPropertyFactory;
pub use field_type::{resolve_schema_type, FieldType};
pub use options::FormOptions;
pub use property::{
    ArrayProperty, AtomicProperty, ObjectProperty, Property, PropertyId, PropertyInit,
    PropertyKind,
};
pub use schema::{ChildSchema, SchemaItems, SchemaNode, SchemaOrBool, SchemaType};
pub use tree::{FormTree, FormTreeBuilder};
pub use type_mapping::{PropertyConstructor, PropertyTypeMapping};
pub use validator::{
    BasicSchemaValidatorFactory, CustomValidator, ErrorKind, SchemaValidatorFactory,
    ValidationError, ValidatorRegistry,
};
pub use visibility::VisibilityRule;
