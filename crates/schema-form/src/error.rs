use schema_form_pointer::PointerError;
use thiserror::Error;

use crate::expression::ExpressionError;
use crate::property::PropertyId;

/// Errors raised while building or mutating a property tree.
///
/// Construction errors (`InvalidParentType`, `UnsupportedSchema`,
/// `UnknownType` and the reference/depth variants) abort the subtree being
/// built and surface to whoever asked for it. Validation findings are never
/// reported through this type; see [`crate::ValidationError`].
#[derive(Debug, Error)]
pub enum FormError {
    #[error("cannot create a property below a {kind} property at {path}")]
    InvalidParentType { kind: &'static str, path: String },

    #[error("object property at {path} needs a property id for its child")]
    MissingPropertyId { path: String },

    #[error("unsupported schema type {type_spec}: {reason}")]
    UnsupportedSchema { type_spec: String, reason: String },

    #[error("undefined type {type_name} (existing: {existing})")]
    UnknownType { type_name: String, existing: String },

    #[error("unresolvable reference {reference:?}")]
    UnresolvedReference { reference: String },

    #[error("invalid reference {reference:?}: {source}")]
    InvalidReference {
        reference: String,
        #[source]
        source: PointerError,
    },

    #[error("reference chain at {path} exceeds {max} hops")]
    ReferenceDepthExceeded { path: String, max: usize },

    #[error("property tree exceeds {max} levels at {path}")]
    MaxDepthExceeded { path: String, max: usize },

    #[error("invalid schema: {0}")]
    InvalidSchema(#[from] serde_json::Error),

    #[error("invalid visibleIf at {path}: {expression}")]
    InvalidVisibility { path: String, expression: String },

    #[error("failed to compile expression {expression:?} at {path}: {source}")]
    Expression {
        path: String,
        expression: String,
        #[source]
        source: ExpressionError,
    },

    #[error("invalid form options: {0}")]
    InvalidOptions(String),

    #[error("property {0} does not exist")]
    PropertyNotFound(PropertyId),

    #[error("property at {path} is not an array")]
    NotArray { path: String },

    #[error("property at {path} is not an object")]
    NotObject { path: String },
}
