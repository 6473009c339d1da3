//! `visibleIf` rules.
//!
//! A rule is compiled once when its node is created and evaluated against
//! the live tree whenever the tree refreshes visibility:
//!
//! ```json
//! {"visibleIf": {"/contact/kind": ["email", "$ANY$"]}}
//! {"visibleIf": {"oneOf": [{"age": ["$EXP$ target.value >= 18"]}, {"guardian": ["$ANY$"]}]}}
//! ```
//!
//! Condition lists are matched against their target with "any" semantics.
//! Missing or hidden targets never satisfy a condition.

use std::sync::Arc;

use serde_json::Value;

use crate::error::FormError;
use crate::expression::{Expression, ExpressionCompiler, ExpressionContext};
use crate::property::{Property, PropertyId};
use crate::tree::FormTree;

const ANY_VALUE: &str = "$ANY$";
const EXPRESSION_PREFIX: &str = "$EXP$";

pub enum VisibilityRule {
    /// `oneOf`: at least one nested rule holds.
    OneOf(Vec<VisibilityRule>),
    /// `allOf`: every nested rule holds.
    AllOf(Vec<VisibilityRule>),
    /// Plain map: at least one target satisfies one of its conditions.
    Targets(Vec<VisibilityTarget>),
}

pub struct VisibilityTarget {
    pub path: String,
    pub conditions: Vec<Condition>,
}

pub enum Condition {
    AnyValue,
    Expression {
        source: String,
        expression: Arc<dyn Expression>,
    },
    Equals(Value),
}

impl VisibilityRule {
    pub fn compile(
        visible_if: &Value,
        path: &str,
        compiler: &dyn ExpressionCompiler,
    ) -> Result<Self, FormError> {
        let invalid = || FormError::InvalidVisibility {
            path: path.to_string(),
            expression: visible_if.to_string(),
        };
        let Value::Object(entries) = visible_if else {
            return Err(invalid());
        };
        let combinators: [(&str, fn(Vec<VisibilityRule>) -> VisibilityRule); 2] =
            [("oneOf", Self::OneOf), ("allOf", Self::AllOf)];
        for (keyword, combine) in combinators {
            if let Some(rules) = entries.get(keyword) {
                let rules = rules.as_array().ok_or_else(invalid)?;
                let rules = rules
                    .iter()
                    .map(|rule| Self::compile(rule, path, compiler))
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(combine(rules));
            }
        }
        let mut targets = Vec::with_capacity(entries.len());
        for (target, conditions) in entries {
            let conditions = match conditions {
                Value::Array(conditions) => conditions.iter().collect(),
                single => vec![single],
            };
            let conditions = conditions
                .into_iter()
                .map(|condition| Condition::compile(condition, path, compiler))
                .collect::<Result<Vec<_>, _>>()?;
            targets.push(VisibilityTarget {
                path: target.clone(),
                conditions,
            });
        }
        Ok(Self::Targets(targets))
    }

    pub(crate) fn evaluate(&self, tree: &FormTree, source: PropertyId) -> bool {
        match self {
            Self::OneOf(rules) => rules.iter().any(|rule| rule.evaluate(tree, source)),
            Self::AllOf(rules) => rules.iter().all(|rule| rule.evaluate(tree, source)),
            Self::Targets(targets) => targets.iter().any(|target| target.evaluate(tree, source)),
        }
    }

    /// Target paths that resolve to no node from `source`.
    pub(crate) fn unresolved_targets<'a>(&'a self, tree: &FormTree, source: PropertyId) -> Vec<&'a str> {
        let mut missing = Vec::new();
        self.collect_unresolved(tree, source, &mut missing);
        missing
    }

    fn collect_unresolved<'a>(&'a self, tree: &FormTree, source: PropertyId, out: &mut Vec<&'a str>) {
        match self {
            Self::OneOf(rules) | Self::AllOf(rules) => {
                for rule in rules {
                    rule.collect_unresolved(tree, source, out);
                }
            }
            Self::Targets(targets) => out.extend(
                targets
                    .iter()
                    .filter(|target| tree.search_property(source, &target.path).is_none())
                    .map(|target| target.path.as_str()),
            ),
        }
    }
}

impl VisibilityTarget {
    fn evaluate(&self, tree: &FormTree, source: PropertyId) -> bool {
        let Some(target) = tree.search_property(source, &self.path).and_then(|id| tree.get(id)) else {
            tracing::debug!("visibleIf target {} not found", self.path);
            return false;
        };
        if !target.visible {
            return false;
        }
        let Some(source) = tree.get(source) else {
            return false;
        };
        self.conditions
            .iter()
            .any(|condition| condition.matches(source, target))
    }
}

impl Condition {
    fn compile(
        condition: &Value,
        path: &str,
        compiler: &dyn ExpressionCompiler,
    ) -> Result<Self, FormError> {
        let Value::String(text) = condition else {
            return Ok(Self::Equals(condition.clone()));
        };
        if text == ANY_VALUE {
            return Ok(Self::AnyValue);
        }
        let Some(source) = text.strip_prefix(EXPRESSION_PREFIX) else {
            return Ok(Self::Equals(condition.clone()));
        };
        let source = source.trim();
        let expression = compiler
            .compile(source)
            .map_err(|source_err| FormError::Expression {
                path: path.to_string(),
                expression: source.to_string(),
                source: source_err,
            })?;
        Ok(Self::Expression {
            source: source.to_string(),
            expression,
        })
    }

    fn matches(&self, source: &Property, target: &Property) -> bool {
        match self {
            Self::AnyValue => !is_empty_value(&target.value),
            Self::Expression { expression, .. } => {
                expression.evaluate(&ExpressionContext { source, target })
            }
            Self::Equals(expected) => match &target.value {
                Value::Array(values) => values.contains(expected),
                value => value == expected,
            },
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

impl std::fmt::Debug for VisibilityRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OneOf(rules) => f.debug_tuple("OneOf").field(rules).finish(),
            Self::AllOf(rules) => f.debug_tuple("AllOf").field(rules).finish(),
            Self::Targets(targets) => f.debug_tuple("Targets").field(targets).finish(),
        }
    }
}

impl std::fmt::Debug for VisibilityTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisibilityTarget")
            .field("path", &self.path)
            .field("conditions", &self.conditions)
            .finish()
    }
}

impl std::fmt::Debug for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AnyValue => f.write_str("AnyValue"),
            Self::Expression { source, .. } => f.debug_tuple("Expression").field(source).finish(),
            Self::Equals(value) => f.debug_tuple("Equals").field(value).finish(),
        }
    }
}
