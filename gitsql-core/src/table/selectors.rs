//! Filter pushdown helpers shared by the tables.
//!
//! `classify_filters` splits pushed-down filters into selectors, equality
//! or IN constraints over indexable columns that a table can satisfy with
//! direct lookups, and residual filters that still have to be evaluated on
//! every row.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::Span;

use crate::dataset::Dataset;
use crate::error::{GitSqlError, GitSqlResult};
use crate::expression::Expression;
use crate::iter::{BoxRowIter, FilterIter, RepoIterFactory, RepoRowIter, SpanIter};
use crate::types::{Schema, Value};

/// Literal values each indexable column is constrained to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selectors(BTreeMap<String, Vec<Value>>);

impl Selectors {
    /// Values for `column`, or `None` when no filter constrains it. A column
    /// constrained by contradictory filters has an empty list.
    pub fn get(&self, column: &str) -> Option<&[Value]> {
        self.0.get(column).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Adds a constraint. Several constraints on one column must all hold,
    /// so the value lists are intersected.
    fn constrain(&mut self, column: &str, values: Vec<Value>) {
        let mut unique: Vec<Value> = Vec::with_capacity(values.len());
        for v in values {
            if !unique.contains(&v) {
                unique.push(v);
            }
        }

        match self.0.get_mut(column) {
            Some(existing) => existing.retain(|v| unique.contains(v)),
            None => {
                self.0.insert(column.to_string(), unique);
            }
        }
    }

    /// Values for `column` as text. NULL never compares equal and is
    /// dropped.
    pub fn text_values(&self, column: &str) -> GitSqlResult<Vec<String>> {
        let Some(values) = self.get(column) else {
            return Ok(vec![]);
        };

        let mut out = Vec::with_capacity(values.len());
        for v in values {
            match v {
                Value::Text(s) => out.push(s.clone()),
                Value::Int64(n) => out.push(n.to_string()),
                Value::Null => {}
                other => {
                    return Err(GitSqlError::InvalidSelectorValue {
                        column: column.to_string(),
                        value: other.to_string(),
                    })
                }
            }
        }
        Ok(out)
    }
}

/// Splits `filters` into selectors over `indexable` columns of `table` and
/// the residual filters.
pub fn classify_filters(
    schema: &Schema,
    table: &str,
    filters: &[Expression],
    indexable: &[&str],
) -> (Selectors, Vec<Expression>) {
    let mut selectors = Selectors::default();
    let mut residual = Vec::new();

    for filter in filters {
        for conjunct in filter.split_conjunction() {
            match selector_for(schema, table, conjunct, indexable) {
                Some((column, values)) => selectors.constrain(&column, values),
                None => residual.push(conjunct.clone()),
            }
        }
    }

    (selectors, residual)
}

fn selector_for(
    schema: &Schema,
    table: &str,
    expr: &Expression,
    indexable: &[&str],
) -> Option<(String, Vec<Value>)> {
    match expr {
        Expression::Equals { left, right } => {
            if let (Some(column), Some(value)) = (
                indexable_column(schema, table, left, indexable),
                scalar_literal(right),
            ) {
                return Some((column, vec![value]));
            }
            if let (Some(value), Some(column)) = (
                scalar_literal(left),
                indexable_column(schema, table, right, indexable),
            ) {
                return Some((column, vec![value]));
            }
            None
        }
        Expression::In { left, right } => {
            let column = indexable_column(schema, table, left, indexable)?;
            let values = match right.as_ref() {
                Expression::Tuple { items } => {
                    items.iter().map(scalar_literal).collect::<Option<Vec<_>>>()?
                }
                other => vec![scalar_literal(other)?],
            };
            Some((column, values))
        }
        _ => None,
    }
}

fn indexable_column(
    schema: &Schema,
    table: &str,
    expr: &Expression,
    indexable: &[&str],
) -> Option<String> {
    match expr {
        Expression::Column {
            table: source,
            name,
            ..
        } if source == table
            && schema.contains(name, table)
            && indexable.iter().any(|c| c.eq_ignore_ascii_case(name)) =>
        {
            Some(name.to_ascii_lowercase())
        }
        _ => None,
    }
}

fn scalar_literal(expr: &Expression) -> Option<Value> {
    match expr {
        Expression::Literal { value } if !matches!(value, Value::Tuple(_)) => Some(value.clone()),
        _ => None,
    }
}

/// Filters that only reference columns of `table` present in `schema`.
pub fn handled_filters(table: &str, schema: &Schema, filters: &[Expression]) -> Vec<Expression> {
    filters
        .iter()
        .filter(|f| {
            f.inspect(&mut |e| match e {
                Expression::Column {
                    table: source,
                    name,
                    ..
                } => source == table && schema.contains(name, table),
                Expression::UnresolvedColumn { .. } | Expression::Aggregate { .. } => false,
                _ => true,
            })
        })
        .cloned()
        .collect()
}

/// Builds the row stream of a table scan with pushed-down filters.
///
/// `builder` receives the extracted selectors and returns the factory used
/// for every repository. Residual filters are evaluated on the resulting
/// stream, which keeps `span` open until it is closed.
pub fn row_iter_with_selectors<F, B>(
    span: Span,
    dataset: Arc<Dataset>,
    schema: &Schema,
    table: &str,
    filters: &[Expression],
    indexable: &[&str],
    builder: B,
) -> GitSqlResult<BoxRowIter>
where
    F: RepoIterFactory + Send + 'static,
    F::Iter: Send + 'static,
    B: FnOnce(&Selectors) -> GitSqlResult<F>,
{
    let (selectors, residual) = classify_filters(schema, table, filters, indexable);
    tracing::debug!(
        parent: &span,
        table,
        selectors = selectors.0.len(),
        residual = residual.len(),
        "classified pushed-down filters"
    );

    let factory = builder(&selectors)?;
    let repo_iter = RepoRowIter::new(dataset, factory);

    Ok(match Expression::join_and(residual) {
        Some(predicate) => Box::new(SpanIter::new(span, FilterIter::new(predicate, repo_iter))),
        None => Box::new(SpanIter::new(span, repo_iter)),
    })
}
