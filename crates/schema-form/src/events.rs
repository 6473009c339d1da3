use serde_json::Value;

use crate::property::PropertyId;
use crate::validator::ValidationError;

/// Change notification emitted by a [`FormTree`](crate::FormTree).
///
/// Events are emitted bottom-up: a leaf change is reported for the leaf
/// first, then for every ancestor whose value was recomputed.
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    ValueChanged {
        property: PropertyId,
        path: String,
        value: Value,
    },
    ErrorsChanged {
        property: PropertyId,
        path: String,
        errors: Vec<ValidationError>,
    },
    VisibilityChanged {
        property: PropertyId,
        path: String,
        visible: bool,
    },
}

impl FormEvent {
    pub fn property(&self) -> PropertyId {
        match self {
            Self::ValueChanged { property, .. }
            | Self::ErrorsChanged { property, .. }
            | Self::VisibilityChanged { property, .. } => *property,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::ValueChanged { path, .. }
            | Self::ErrorsChanged { path, .. }
            | Self::VisibilityChanged { path, .. } => path,
        }
    }
}
