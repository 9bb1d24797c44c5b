//! Per-query context threaded through validation and scans.
//!
//! The context only scopes tracing spans; it never changes what an operation
//! does.

use tracing::Span;

#[derive(Debug, Clone)]
pub struct Context {
    query_id: String,
    span: Span,
}

impl Context {
    pub fn new(query_id: impl Into<String>) -> Self {
        let query_id = query_id.into();
        let span = tracing::debug_span!("gitsql.query", query_id = %query_id);
        Self { query_id, span }
    }

    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    /// Child span of the query span for one named operation.
    pub fn span(&self, op: &'static str) -> Span {
        tracing::debug_span!(parent: &self.span, "gitsql.op", op)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new("")
    }
}
