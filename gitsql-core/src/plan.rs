//! Logical plan nodes consumed from the host query engine.
//!
//! Only the variants the validator has rules for carry their expression
//! lists. Recursion into children is left to whoever walks the plan.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::expression::Expression;
use crate::table::Table;
use crate::types::Schema;

/// Discriminant of a logical plan node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanKind {
    Sort,
    GroupBy,
    Project,
    Filter,
    Limit,
    Table,
    TableAlias,
    UnresolvedTable,
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlanKind::Sort => "Sort",
            PlanKind::GroupBy => "GroupBy",
            PlanKind::Project => "Project",
            PlanKind::Filter => "Filter",
            PlanKind::Limit => "Limit",
            PlanKind::Table => "Table",
            PlanKind::TableAlias => "TableAlias",
            PlanKind::UnresolvedTable => "UnresolvedTable",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortField {
    pub column: Expression,
    #[serde(default)]
    pub order: SortOrder,
}

impl SortField {
    pub fn asc(column: Expression) -> Self {
        Self {
            column,
            order: SortOrder::Ascending,
        }
    }

    pub fn desc(column: Expression) -> Self {
        Self {
            column,
            order: SortOrder::Descending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum LogicalPlan {
    Sort {
        sort_fields: Vec<SortField>,
        child: Box<LogicalPlan>,
    },
    GroupBy {
        aggregate: Vec<Expression>,
        grouping: Vec<Expression>,
        child: Box<LogicalPlan>,
    },
    Project {
        projections: Vec<Expression>,
        child: Box<LogicalPlan>,
    },
    Filter {
        expression: Expression,
        child: Box<LogicalPlan>,
    },
    Limit {
        limit: u64,
        child: Box<LogicalPlan>,
    },
    /// Base table scan, carrying the table's declared schema.
    Table {
        name: String,
        schema: Schema,
    },
    TableAlias {
        name: String,
        child: Box<LogicalPlan>,
    },
    UnresolvedTable {
        name: String,
    },
}

impl LogicalPlan {
    /// Scan node for a table provider.
    pub fn table(table: &dyn Table) -> Self {
        LogicalPlan::Table {
            name: table.name().to_string(),
            schema: table.schema().clone(),
        }
    }

    pub fn sort(sort_fields: Vec<SortField>, child: LogicalPlan) -> Self {
        LogicalPlan::Sort {
            sort_fields,
            child: Box::new(child),
        }
    }

    pub fn group_by(aggregate: Vec<Expression>, grouping: Vec<Expression>, child: LogicalPlan) -> Self {
        LogicalPlan::GroupBy {
            aggregate,
            grouping,
            child: Box::new(child),
        }
    }

    pub fn project(projections: Vec<Expression>, child: LogicalPlan) -> Self {
        LogicalPlan::Project {
            projections,
            child: Box::new(child),
        }
    }

    pub fn filter(expression: Expression, child: LogicalPlan) -> Self {
        LogicalPlan::Filter {
            expression,
            child: Box::new(child),
        }
    }

    pub fn limit(limit: u64, child: LogicalPlan) -> Self {
        LogicalPlan::Limit {
            limit,
            child: Box::new(child),
        }
    }

    pub fn alias(name: &str, child: LogicalPlan) -> Self {
        LogicalPlan::TableAlias {
            name: name.to_string(),
            child: Box::new(child),
        }
    }

    pub fn kind(&self) -> PlanKind {
        match self {
            LogicalPlan::Sort { .. } => PlanKind::Sort,
            LogicalPlan::GroupBy { .. } => PlanKind::GroupBy,
            LogicalPlan::Project { .. } => PlanKind::Project,
            LogicalPlan::Filter { .. } => PlanKind::Filter,
            LogicalPlan::Limit { .. } => PlanKind::Limit,
            LogicalPlan::Table { .. } => PlanKind::Table,
            LogicalPlan::TableAlias { .. } => PlanKind::TableAlias,
            LogicalPlan::UnresolvedTable { .. } => PlanKind::UnresolvedTable,
        }
    }

    pub fn children(&self) -> Vec<&LogicalPlan> {
        match self {
            LogicalPlan::Sort { child, .. }
            | LogicalPlan::GroupBy { child, .. }
            | LogicalPlan::Project { child, .. }
            | LogicalPlan::Filter { child, .. }
            | LogicalPlan::Limit { child, .. }
            | LogicalPlan::TableAlias { child, .. } => vec![child.as_ref()],
            LogicalPlan::Table { .. } | LogicalPlan::UnresolvedTable { .. } => vec![],
        }
    }

    /// Expressions held directly by this node.
    pub fn expressions(&self) -> Vec<&Expression> {
        match self {
            LogicalPlan::Sort { sort_fields, .. } => sort_fields.iter().map(|f| &f.column).collect(),
            LogicalPlan::GroupBy {
                aggregate, grouping, ..
            } => aggregate.iter().chain(grouping.iter()).collect(),
            LogicalPlan::Project { projections, .. } => projections.iter().collect(),
            LogicalPlan::Filter { expression, .. } => vec![expression],
            LogicalPlan::Limit { .. }
            | LogicalPlan::Table { .. }
            | LogicalPlan::TableAlias { .. }
            | LogicalPlan::UnresolvedTable { .. } => vec![],
        }
    }

    /// True when every table and column reference in this subtree is bound.
    pub fn resolved(&self) -> bool {
        match self {
            LogicalPlan::UnresolvedTable { .. } => false,
            _ => {
                self.expressions().into_iter().all(Expression::resolved)
                    && self.children().into_iter().all(LogicalPlan::resolved)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Column, DataType};

    fn table() -> LogicalPlan {
        LogicalPlan::Table {
            name: "t".to_string(),
            schema: Schema::new(vec![Column::new("a", DataType::Text, false, "t")]),
        }
    }

    #[test]
    fn test_kind() {
        let plan = LogicalPlan::limit(1, LogicalPlan::alias("x", table()));
        assert_eq!(plan.kind(), PlanKind::Limit);
        assert_eq!(plan.children()[0].kind(), PlanKind::TableAlias);
        assert_eq!(PlanKind::GroupBy.to_string(), "GroupBy");
    }

    #[test]
    fn test_resolved_looks_at_subtree() {
        let plan = LogicalPlan::project(
            vec![Expression::column("t", "a", 0, DataType::Text)],
            table(),
        );
        assert!(plan.resolved());

        let plan = LogicalPlan::project(
            vec![Expression::column("t", "a", 0, DataType::Text)],
            LogicalPlan::UnresolvedTable {
                name: "t".to_string(),
            },
        );
        assert!(!plan.resolved());

        let plan = LogicalPlan::sort(
            vec![SortField::asc(Expression::unresolved_column("a"))],
            table(),
        );
        assert!(!plan.resolved());
    }

    #[test]
    fn test_plan_from_json() {
        let plan: LogicalPlan = serde_json::from_str(
            r#"{
                "node": "project",
                "projections": [{"type": "unresolved_column", "name": "a"}],
                "child": {"node": "unresolved_table", "name": "t"}
            }"#,
        )
        .unwrap();
        assert_eq!(plan.kind(), PlanKind::Project);
        assert!(!plan.resolved());
    }
}
