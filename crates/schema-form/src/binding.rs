//! Embedder callbacks keyed by canonical path.
//!
//! Every node created for the same canonical path (all items of an array
//! share one) sees the same bindings, so a binding registered for
//! `/items/*/name` fires for the `name` of every item.

use std::collections::HashMap;
use std::sync::Arc;

use crate::events::FormEvent;

pub type PropertyBinding = Arc<dyn Fn(&FormEvent) + Send + Sync>;

#[derive(Clone, Default)]
pub struct PropertyBindingRegistry {
    bindings: HashMap<String, Vec<PropertyBinding>>,
}

impl PropertyBindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, canonical_path: impl Into<String>, binding: F)
    where
        F: Fn(&FormEvent) + Send + Sync + 'static,
    {
        self.bindings
            .entry(canonical_path.into())
            .or_default()
            .push(Arc::new(binding));
    }

    /// Bindings for `canonical_path`; empty when none were registered.
    pub fn get(&self, canonical_path: &str) -> &[PropertyBinding] {
        self.bindings
            .get(canonical_path)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl std::fmt::Debug for PropertyBindingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut paths: Vec<_> = self.bindings.keys().collect();
        paths.sort();
        f.debug_struct("PropertyBindingRegistry")
            .field("paths", &paths)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn unknown_paths_have_no_bindings() {
        let registry = PropertyBindingRegistry::new();
        assert!(registry.get("/name").is_empty());
    }

    #[test]
    fn bindings_accumulate_per_path() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = PropertyBindingRegistry::new();
        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            registry.register("/items/*/name", move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }
        let event = FormEvent::VisibilityChanged {
            property: crate::property::PropertyId {
                index: 0,
                generation: 0,
            },
            path: "/items/0/name".to_string(),
            visible: true,
        };
        for binding in registry.get("/items/*/name") {
            binding(&event);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(registry.get("/items").is_empty());
    }
}
