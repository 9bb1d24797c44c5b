//! Default validation rules.
//!
//! Each rule looks at the node it is given and ignores every variant it has
//! no business with. Rules never mutate the plan.

use crate::context::Context;
use crate::error::ValidationError;
use crate::expression::Expression;
use crate::plan::LogicalPlan;
use crate::types::Schema;

use super::ValidationRule;

pub const VALIDATE_RESOLVED_RULE: &str = "validate_resolved";
pub const VALIDATE_ORDER_BY_RULE: &str = "validate_order_by";
pub const VALIDATE_GROUP_BY_RULE: &str = "validate_group_by";
pub const VALIDATE_SCHEMA_SOURCE_RULE: &str = "validate_schema_source";
pub const VALIDATE_PROJECT_TUPLES_RULE: &str = "validate_project_tuples";

/// Validation rules applied, in this order, as the last analyzer pass.
pub fn default_validation_rules() -> Vec<ValidationRule> {
    vec![
        ValidationRule::new(VALIDATE_RESOLVED_RULE, validate_is_resolved),
        ValidationRule::new(VALIDATE_ORDER_BY_RULE, validate_order_by),
        ValidationRule::new(VALIDATE_GROUP_BY_RULE, validate_group_by),
        ValidationRule::new(VALIDATE_SCHEMA_SOURCE_RULE, validate_schema_source),
        ValidationRule::new(VALIDATE_PROJECT_TUPLES_RULE, validate_project_tuples),
    ]
}

pub fn validate_is_resolved(ctx: &Context, n: &LogicalPlan) -> Result<(), ValidationError> {
    let _span = ctx.span("validate_is_resolved").entered();

    if !n.resolved() {
        return Err(ValidationError::Unresolved(n.kind()));
    }

    Ok(())
}

pub fn validate_order_by(ctx: &Context, n: &LogicalPlan) -> Result<(), ValidationError> {
    let _span = ctx.span("validate_order_by").entered();

    if let LogicalPlan::Sort { sort_fields, .. } = n {
        if sort_fields.iter().any(|field| field.column.is_aggregation()) {
            return Err(ValidationError::InvalidOrderBy);
        }
    }

    Ok(())
}

pub fn validate_group_by(ctx: &Context, n: &LogicalPlan) -> Result<(), ValidationError> {
    let _span = ctx.span("validate_group_by").entered();

    let LogicalPlan::GroupBy {
        aggregate,
        grouping,
        ..
    } = n
    else {
        return Ok(());
    };

    // A GroupBy without grouping columns only evaluates aggregate functions
    // for statements that have no GROUP BY clause.
    if grouping.is_empty() {
        return Ok(());
    }

    let valid_aggs: Vec<String> = grouping.iter().map(|e| e.to_string()).collect();

    // Columns used inside aggregations are not checked against the grouping
    // list.
    for expr in aggregate {
        if !expr.is_aggregation() && !is_valid_agg(&valid_aggs, expr) {
            return Err(ValidationError::InvalidGroupBy(expr.to_string()));
        }
    }

    Ok(())
}

fn is_valid_agg(valid_aggs: &[String], expr: &Expression) -> bool {
    match expr {
        Expression::Aggregate { .. } => true,
        Expression::Alias { child, .. } => is_valid_agg(valid_aggs, child),
        other => {
            let repr = other.to_string();
            valid_aggs.iter().any(|s| *s == repr)
        }
    }
}

pub fn validate_schema_source(ctx: &Context, n: &LogicalPlan) -> Result<(), ValidationError> {
    let _span = ctx.span("validate_schema_source").entered();

    match n {
        // Aliases are exempt, the table underneath is not.
        LogicalPlan::TableAlias { child, .. } => match child.as_ref() {
            LogicalPlan::Table { name, schema } => validate_schema(name, schema),
            _ => Ok(()),
        },
        LogicalPlan::Table { name, schema } => validate_schema(name, schema),
        _ => Ok(()),
    }
}

fn validate_schema(name: &str, schema: &Schema) -> Result<(), ValidationError> {
    match schema.iter().find(|col| col.source != name) {
        Some(col) => Err(ValidationError::SchemaSourceMismatch {
            table: name.to_string(),
            found: col.source.clone(),
        }),
        None => Ok(()),
    }
}

pub fn validate_project_tuples(ctx: &Context, n: &LogicalPlan) -> Result<(), ValidationError> {
    let _span = ctx.span("validate_project_tuples").entered();

    match n {
        LogicalPlan::Project { projections, .. } => validate_single_columns(projections),
        LogicalPlan::GroupBy { aggregate, .. } => validate_single_columns(aggregate),
        _ => Ok(()),
    }
}

fn validate_single_columns(exprs: &[Expression]) -> Result<(), ValidationError> {
    for (i, e) in exprs.iter().enumerate() {
        let data_type = e.data_type();
        if data_type.is_tuple() {
            return Err(ValidationError::ProjectionArity {
                position: i + 1,
                columns: data_type.num_columns(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::AggregateFunction;
    use crate::plan::{PlanKind, SortField};
    use crate::types::{Column, DataType};

    fn ctx() -> Context {
        Context::new("test")
    }

    fn col(name: &str, index: usize) -> Expression {
        Expression::column("t", name, index, DataType::Text)
    }

    fn count_star() -> Expression {
        Expression::aggregate(AggregateFunction::Count, Expression::Star)
    }

    fn table() -> LogicalPlan {
        LogicalPlan::Table {
            name: "t".to_string(),
            schema: Schema::new(vec![
                Column::new("a", DataType::Text, false, "t"),
                Column::new("b", DataType::Text, false, "t"),
                Column::new("c", DataType::Text, false, "t"),
            ]),
        }
    }

    fn bad_table() -> LogicalPlan {
        LogicalPlan::Table {
            name: "t".to_string(),
            schema: Schema::new(vec![
                Column::new("a", DataType::Text, false, "t"),
                Column::new("b", DataType::Text, false, "other"),
            ]),
        }
    }

    #[test]
    fn test_validate_resolved() {
        assert!(validate_is_resolved(&ctx(), &table()).is_ok());

        let plan = LogicalPlan::project(vec![col("a", 0)], table());
        assert!(validate_is_resolved(&ctx(), &plan).is_ok());

        let plan = LogicalPlan::project(vec![Expression::unresolved_column("a")], table());
        assert_eq!(
            validate_is_resolved(&ctx(), &plan),
            Err(ValidationError::Unresolved(PlanKind::Project))
        );
    }

    #[test]
    fn test_validate_resolved_ignores_other_problems() {
        // Aggregations in ORDER BY are someone else's problem.
        let plan = LogicalPlan::sort(vec![SortField::asc(count_star())], bad_table());
        assert!(validate_is_resolved(&ctx(), &plan).is_ok());
    }

    #[test]
    fn test_validate_order_by() {
        let plan = LogicalPlan::sort(
            vec![SortField::asc(col("a", 0)), SortField::desc(col("b", 1))],
            table(),
        );
        assert!(validate_order_by(&ctx(), &plan).is_ok());

        let plan = LogicalPlan::sort(
            vec![SortField::asc(col("a", 0)), SortField::desc(count_star())],
            table(),
        );
        assert_eq!(
            validate_order_by(&ctx(), &plan),
            Err(ValidationError::InvalidOrderBy)
        );
    }

    #[test]
    fn test_validate_order_by_other_nodes() {
        let plan = LogicalPlan::project(vec![count_star()], table());
        assert!(validate_order_by(&ctx(), &plan).is_ok());
    }

    #[test]
    fn test_validate_group_by() {
        let plan = LogicalPlan::group_by(
            vec![col("a", 0), Expression::alias("total", count_star())],
            vec![col("a", 0), col("b", 1)],
            table(),
        );
        assert!(validate_group_by(&ctx(), &plan).is_ok());

        let plan = LogicalPlan::group_by(
            vec![col("a", 0), col("c", 2)],
            vec![col("a", 0), col("b", 1)],
            table(),
        );
        assert_eq!(
            validate_group_by(&ctx(), &plan),
            Err(ValidationError::InvalidGroupBy("t.c".to_string()))
        );
    }

    #[test]
    fn test_validate_group_by_unwraps_aliases() {
        let plan = LogicalPlan::group_by(
            vec![Expression::alias("x", Expression::alias("y", col("b", 1)))],
            vec![col("a", 0), col("b", 1)],
            table(),
        );
        assert!(validate_group_by(&ctx(), &plan).is_ok());

        let plan = LogicalPlan::group_by(
            vec![Expression::alias("x", col("c", 2))],
            vec![col("a", 0), col("b", 1)],
            table(),
        );
        assert_eq!(
            validate_group_by(&ctx(), &plan),
            Err(ValidationError::InvalidGroupBy("t.c as x".to_string()))
        );
    }

    #[test]
    fn test_validate_group_by_without_grouping() {
        let plan = LogicalPlan::group_by(vec![col("c", 2), count_star()], vec![], table());
        assert!(validate_group_by(&ctx(), &plan).is_ok());
    }

    #[test]
    fn test_validate_group_by_does_not_look_inside_aggregations() {
        // Known gap: MAX(t.c) uses a column outside the grouping list and
        // still passes.
        let plan = LogicalPlan::group_by(
            vec![
                col("a", 0),
                Expression::aggregate(AggregateFunction::Max, col("c", 2)),
            ],
            vec![col("a", 0)],
            table(),
        );
        assert!(validate_group_by(&ctx(), &plan).is_ok());
    }

    #[test]
    fn test_validate_schema_source() {
        assert!(validate_schema_source(&ctx(), &table()).is_ok());
        assert_eq!(
            validate_schema_source(&ctx(), &bad_table()),
            Err(ValidationError::SchemaSourceMismatch {
                table: "t".to_string(),
                found: "other".to_string(),
            })
        );
    }

    #[test]
    fn test_validate_schema_source_through_alias() {
        let plan = LogicalPlan::alias("x", table());
        assert!(validate_schema_source(&ctx(), &plan).is_ok());

        let plan = LogicalPlan::alias("x", bad_table());
        assert!(matches!(
            validate_schema_source(&ctx(), &plan),
            Err(ValidationError::SchemaSourceMismatch { .. })
        ));

        // Only the node itself is checked.
        let plan = LogicalPlan::project(vec![col("a", 0)], bad_table());
        assert!(validate_schema_source(&ctx(), &plan).is_ok());
    }

    #[test]
    fn test_validate_project_tuples() {
        let tuple = Expression::tuple(vec![col("a", 0), col("b", 1), col("c", 2)]);

        let plan = LogicalPlan::project(vec![col("a", 0), col("b", 1)], table());
        assert!(validate_project_tuples(&ctx(), &plan).is_ok());

        let plan = LogicalPlan::project(vec![col("a", 0), tuple.clone()], table());
        assert_eq!(
            validate_project_tuples(&ctx(), &plan),
            Err(ValidationError::ProjectionArity {
                position: 2,
                columns: 3
            })
        );

        let plan = LogicalPlan::group_by(vec![tuple], vec![], table());
        assert_eq!(
            validate_project_tuples(&ctx(), &plan),
            Err(ValidationError::ProjectionArity {
                position: 1,
                columns: 3
            })
        );
    }

    #[test]
    fn test_validate_project_single_item_tuple() {
        let plan = LogicalPlan::project(vec![Expression::tuple(vec![col("a", 0)])], table());
        assert!(validate_project_tuples(&ctx(), &plan).is_ok());
    }
}
