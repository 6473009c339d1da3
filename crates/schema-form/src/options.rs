//! Tree-wide options.
//!
//! Options deserialize from any serde format with camelCase keys; every
//! field is optional:
//!
//! ```toml
//! extensionKeys = ["extension", "modifierExtension"]
//! hiddenWidget = "hidden"
//! maxReferenceDepth = 32
//! maxDepth = 128
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::FormError;

pub const DEFAULT_EXTENSION_KEYS: [&str; 2] = ["extension", "modifierExtension"];
pub const DEFAULT_HIDDEN_WIDGET: &str = "hidden";
pub const DEFAULT_MAX_REFERENCE_DEPTH: usize = 32;
pub const DEFAULT_MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormOptions {
    /// Property ids whose `*` children are extension objects.
    pub extension_keys: Vec<String>,
    /// Widget id given to expanded `$ref` schemas that declare no widget.
    pub hidden_widget: String,
    /// Longest chain of `$ref` hops followed for a single node.
    pub max_reference_depth: usize,
    /// Deepest path (in segments) the factory builds.
    pub max_depth: usize,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            extension_keys: DEFAULT_EXTENSION_KEYS.iter().map(|key| key.to_string()).collect(),
            hidden_widget: DEFAULT_HIDDEN_WIDGET.to_string(),
            max_reference_depth: DEFAULT_MAX_REFERENCE_DEPTH,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl FormOptions {
    pub fn validate(&self) -> Result<(), FormError> {
        if self.max_depth == 0 {
            return Err(FormError::InvalidOptions("maxDepth must be at least 1".into()));
        }
        if let Some(key) = self.extension_keys.iter().find(|key| key.is_empty() || key.contains('/')) {
            return Err(FormError::InvalidOptions(format!(
                "invalid extension key {key:?}"
            )));
        }
        Ok(())
    }

    /// Matches paths ending in `/<extension key>/*`. `None` when no keys are
    /// configured.
    pub(crate) fn extension_pattern(&self) -> Result<Option<Regex>, FormError> {
        if self.extension_keys.is_empty() {
            return Ok(None);
        }
        let keys: Vec<String> = self.extension_keys.iter().map(|key| regex::escape(key)).collect();
        let pattern = format!(r"(^|/)({})/\*$", keys.join("|"));
        Regex::new(&pattern)
            .map(Some)
            .map_err(|err| FormError::InvalidOptions(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let options = FormOptions::default();
        assert_eq!(options.extension_keys, vec!["extension", "modifierExtension"]);
        assert_eq!(options.hidden_widget, "hidden");
        assert_eq!(options.max_reference_depth, 32);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn extension_pattern_matches_wildcard_children_only() {
        let pattern = FormOptions::default().extension_pattern().unwrap().unwrap();
        assert!(pattern.is_match("/extension/*"));
        assert!(pattern.is_match("/patient/modifierExtension/*"));
        assert!(!pattern.is_match("/extension"));
        assert!(!pattern.is_match("/extension/*/url"));
        assert!(!pattern.is_match("/myextension/*"));
    }

    #[test]
    fn no_keys_means_no_extension_objects() {
        let options = FormOptions {
            extension_keys: Vec::new(),
            ..FormOptions::default()
        };
        assert!(options.extension_pattern().unwrap().is_none());
    }

    #[test]
    fn rejects_degenerate_options() {
        let options = FormOptions {
            max_depth: 0,
            ..FormOptions::default()
        };
        assert!(matches!(options.validate(), Err(FormError::InvalidOptions(_))));

        let options = FormOptions {
            extension_keys: vec!["a/b".into()],
            ..FormOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let options: FormOptions = serde_json::from_str(r#"{"hiddenWidget":"none"}"#).unwrap();
        assert_eq!(options.hidden_widget, "none");
        assert_eq!(options.max_depth, DEFAULT_MAX_DEPTH);
    }
}
