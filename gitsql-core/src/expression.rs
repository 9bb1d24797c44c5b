//! Expression model consumed from the host query engine.
//!
//! Expressions are a closed set of variants. Each exposes its static result
//! type, a canonical string form (via `Display`) and whether it is an
//! aggregation. Bound columns can be evaluated against a row, which is what
//! residual filters need after pushdown.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GitSqlError, GitSqlResult};
use crate::types::{DataType, Row, Value};

/// Aggregate functions known to the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    First,
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::First => "FIRST",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expression {
    Literal {
        value: Value,
    },
    /// Column bound to a position in the row of `table`.
    Column {
        table: String,
        name: String,
        index: usize,
        data_type: DataType,
        #[serde(default)]
        nullable: bool,
    },
    UnresolvedColumn {
        #[serde(default)]
        table: Option<String>,
        name: String,
    },
    /// `*` argument of `COUNT(*)`.
    Star,
    Alias {
        name: String,
        child: Box<Expression>,
    },
    Aggregate {
        function: AggregateFunction,
        child: Box<Expression>,
    },
    Tuple {
        items: Vec<Expression>,
    },
    Equals {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    In {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    And {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Or {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Not {
        child: Box<Expression>,
    },
    /// Scalar function call. The host marks it resolved once the function
    /// exists in its registry.
    Function {
        name: String,
        args: Vec<Expression>,
        return_type: DataType,
        #[serde(default)]
        resolved: bool,
    },
}

impl Expression {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal {
            value: value.into(),
        }
    }

    pub fn column(table: &str, name: &str, index: usize, data_type: DataType) -> Self {
        Expression::Column {
            table: table.to_string(),
            name: name.to_string(),
            index,
            data_type,
            nullable: false,
        }
    }

    pub fn unresolved_column(name: &str) -> Self {
        Expression::UnresolvedColumn {
            table: None,
            name: name.to_string(),
        }
    }

    pub fn alias(name: &str, child: Expression) -> Self {
        Expression::Alias {
            name: name.to_string(),
            child: Box::new(child),
        }
    }

    pub fn aggregate(function: AggregateFunction, child: Expression) -> Self {
        Expression::Aggregate {
            function,
            child: Box::new(child),
        }
    }

    pub fn tuple(items: Vec<Expression>) -> Self {
        Expression::Tuple { items }
    }

    pub fn equals(left: Expression, right: Expression) -> Self {
        Expression::Equals {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn in_list(left: Expression, right: Expression) -> Self {
        Expression::In {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(left: Expression, right: Expression) -> Self {
        Expression::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Expression::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(child: Expression) -> Self {
        Expression::Not {
            child: Box::new(child),
        }
    }

    /// Joins expressions with `AND`. Returns `None` for an empty list.
    pub fn join_and(exprs: Vec<Expression>) -> Option<Expression> {
        exprs.into_iter().reduce(Expression::and)
    }

    /// Splits nested `AND` expressions into their conjuncts.
    pub fn split_conjunction(&self) -> Vec<&Expression> {
        match self {
            Expression::And { left, right } => {
                let mut parts = left.split_conjunction();
                parts.extend(right.split_conjunction());
                parts
            }
            other => vec![other],
        }
    }

    pub fn is_aggregation(&self) -> bool {
        matches!(self, Expression::Aggregate { .. })
    }

    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Literal { .. }
            | Expression::Column { .. }
            | Expression::UnresolvedColumn { .. }
            | Expression::Star => vec![],
            Expression::Alias { child, .. }
            | Expression::Aggregate { child, .. }
            | Expression::Not { child } => vec![child.as_ref()],
            Expression::Tuple { items } => items.iter().collect(),
            Expression::Function { args, .. } => args.iter().collect(),
            Expression::Equals { left, right }
            | Expression::In { left, right }
            | Expression::And { left, right }
            | Expression::Or { left, right } => vec![left.as_ref(), right.as_ref()],
        }
    }

    /// Visits this expression and all its descendants, pre-order, while `f`
    /// returns true.
    pub fn inspect<F>(&self, f: &mut F) -> bool
    where
        F: FnMut(&Expression) -> bool,
    {
        if !f(self) {
            return false;
        }
        self.children().into_iter().all(|c| c.inspect(f))
    }

    pub fn resolved(&self) -> bool {
        match self {
            Expression::UnresolvedColumn { .. } => false,
            Expression::Function { resolved, args, .. } => {
                *resolved && args.iter().all(Expression::resolved)
            }
            other => other.children().into_iter().all(Expression::resolved),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Expression::Literal { value } => value.data_type(),
            Expression::Column { data_type, .. } => data_type.clone(),
            Expression::UnresolvedColumn { .. } | Expression::Star => DataType::Null,
            Expression::Alias { child, .. } => child.data_type(),
            Expression::Aggregate { function, child } => match function {
                AggregateFunction::Count => DataType::Int64,
                AggregateFunction::Sum | AggregateFunction::Avg => DataType::Float64,
                AggregateFunction::Min | AggregateFunction::Max | AggregateFunction::First => {
                    child.data_type()
                }
            },
            Expression::Tuple { items } if items.len() == 1 => items[0].data_type(),
            Expression::Tuple { items } => {
                DataType::Tuple(items.iter().map(Expression::data_type).collect())
            }
            Expression::Equals { .. }
            | Expression::In { .. }
            | Expression::And { .. }
            | Expression::Or { .. }
            | Expression::Not { .. } => DataType::Boolean,
            Expression::Function { return_type, .. } => return_type.clone(),
        }
    }

    /// Evaluates the expression against a full table row.
    pub fn eval(&self, row: &Row) -> GitSqlResult<Value> {
        match self {
            Expression::Literal { value } => Ok(value.clone()),
            Expression::Column { index, .. } => {
                row.get(*index)
                    .cloned()
                    .ok_or(GitSqlError::ColumnOutOfRange {
                        index: *index,
                        len: row.len(),
                    })
            }
            Expression::Alias { child, .. } => child.eval(row),
            Expression::Tuple { items } if items.len() == 1 => items[0].eval(row),
            Expression::Tuple { items } => Ok(Value::Tuple(
                items
                    .iter()
                    .map(|e| e.eval(row))
                    .collect::<GitSqlResult<Vec<_>>>()?,
            )),
            Expression::Equals { left, right } => {
                let l = left.eval(row)?;
                let r = right.eval(row)?;
                if l.is_null() || r.is_null() {
                    return Ok(Value::Null);
                }
                Ok(Value::Boolean(l == r))
            }
            Expression::In { left, right } => {
                let l = left.eval(row)?;
                if l.is_null() {
                    return Ok(Value::Null);
                }
                let candidates = match right.eval(row)? {
                    Value::Tuple(values) => values,
                    single => vec![single],
                };
                let mut saw_null = false;
                for candidate in candidates {
                    if candidate.is_null() {
                        saw_null = true;
                    } else if candidate == l {
                        return Ok(Value::Boolean(true));
                    }
                }
                Ok(if saw_null {
                    Value::Null
                } else {
                    Value::Boolean(false)
                })
            }
            Expression::And { left, right } => {
                let l = truth(&left.eval(row)?, left)?;
                if l == Some(false) {
                    return Ok(Value::Boolean(false));
                }
                let r = truth(&right.eval(row)?, right)?;
                Ok(match (l, r) {
                    (_, Some(false)) => Value::Boolean(false),
                    (Some(true), Some(true)) => Value::Boolean(true),
                    _ => Value::Null,
                })
            }
            Expression::Or { left, right } => {
                let l = truth(&left.eval(row)?, left)?;
                if l == Some(true) {
                    return Ok(Value::Boolean(true));
                }
                let r = truth(&right.eval(row)?, right)?;
                Ok(match (l, r) {
                    (_, Some(true)) => Value::Boolean(true),
                    (Some(false), Some(false)) => Value::Boolean(false),
                    _ => Value::Null,
                })
            }
            Expression::Not { child } => Ok(match truth(&child.eval(row)?, child)? {
                Some(b) => Value::Boolean(!b),
                None => Value::Null,
            }),
            Expression::UnresolvedColumn { .. }
            | Expression::Star
            | Expression::Aggregate { .. }
            | Expression::Function { .. } => Err(GitSqlError::TypeError(format!(
                "expression '{}' cannot be evaluated per row",
                self
            ))),
        }
    }
}

fn truth(value: &Value, expr: &Expression) -> GitSqlResult<Option<bool>> {
    match value {
        Value::Boolean(b) => Ok(Some(*b)),
        Value::Null => Ok(None),
        other => Err(GitSqlError::TypeError(format!(
            "expression '{}' evaluated to non-boolean {}",
            expr, other
        ))),
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expression]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal { value } => write!(f, "{}", value),
            Expression::Column { table, name, .. } => write!(f, "{}.{}", table, name),
            Expression::UnresolvedColumn {
                table: Some(table),
                name,
            } => write!(f, "{}.{}", table, name),
            Expression::UnresolvedColumn { table: None, name } => write!(f, "{}", name),
            Expression::Star => write!(f, "*"),
            Expression::Alias { name, child } => write!(f, "{} as {}", child, name),
            Expression::Aggregate { function, child } => write!(f, "{}({})", function, child),
            Expression::Tuple { items } => {
                write!(f, "(")?;
                write_list(f, items)?;
                write!(f, ")")
            }
            Expression::Equals { left, right } => write!(f, "{} = {}", left, right),
            Expression::In { left, right } => write!(f, "{} IN {}", left, right),
            Expression::And { left, right } => write!(f, "({} AND {})", left, right),
            Expression::Or { left, right } => write!(f, "({} OR {})", left, right),
            Expression::Not { child } => write!(f, "NOT({})", child),
            Expression::Function { name, args, .. } => {
                write!(f, "{}(", name)?;
                write_list(f, args)?;
                write!(f, ")")
            }
        }
    }
}
