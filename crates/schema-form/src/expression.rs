//! Expression collaborator used by `visibleIf` conditions written as
//! `"$EXP$ <expression>"`.
//!
//! The grammar belongs to the embedder: the tree only asks a compiler for an
//! evaluator and calls it with the property that owns the condition (source)
//! and the property the condition looks at (target).

use std::sync::Arc;

use thiserror::Error;

use crate::property::Property;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ExpressionError(pub String);

pub struct ExpressionContext<'a> {
    pub source: &'a Property,
    pub target: &'a Property,
}

pub trait Expression: Send + Sync {
    fn evaluate(&self, ctx: &ExpressionContext<'_>) -> bool;
}

impl<F> Expression for F
where
    F: Fn(&ExpressionContext<'_>) -> bool + Send + Sync,
{
    fn evaluate(&self, ctx: &ExpressionContext<'_>) -> bool {
        self(ctx)
    }
}

pub trait ExpressionCompiler: Send + Sync {
    fn compile(&self, expression: &str) -> Result<Arc<dyn Expression>, ExpressionError>;
}

/// Compiler used when the embedder configured none: every expression is
/// rejected, which turns `$EXP$` conditions into construction errors.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoExpressionCompiler;

impl ExpressionCompiler for NoExpressionCompiler {
    fn compile(&self, expression: &str) -> Result<Arc<dyn Expression>, ExpressionError> {
        Err(ExpressionError(format!(
            "no expression compiler configured for {expression:?}"
        )))
    }
}

/// Adapts a closure into an [`ExpressionCompiler`].
pub struct FnExpressionCompiler<F>(pub F);

impl<F> ExpressionCompiler for FnExpressionCompiler<F>
where
    F: Fn(&str) -> Result<Arc<dyn Expression>, ExpressionError> + Send + Sync,
{
    fn compile(&self, expression: &str) -> Result<Arc<dyn Expression>, ExpressionError> {
        (self.0)(expression)
    }
}
