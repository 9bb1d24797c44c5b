//! Plan validation over plans built from the catalog or read from JSON.

use std::sync::Arc;

use gitsql_core::{
    AggregateFunction, Analyzer, Catalog, Context, DataType, Dataset, Expression, LogicalPlan,
    PlanKind, SortField, ValidationError, TREE_ENTRIES_TABLE_NAME,
};

fn scan() -> LogicalPlan {
    let catalog = Catalog::with_default_tables(Arc::new(Dataset::new()));
    LogicalPlan::table(catalog.table(TREE_ENTRIES_TABLE_NAME).unwrap())
}

fn col(name: &str, index: usize) -> Expression {
    Expression::column(TREE_ENTRIES_TABLE_NAME, name, index, DataType::Text)
}

fn validate(plan: &LogicalPlan) -> Result<(), ValidationError> {
    Analyzer::with_default_rules().validate(&Context::new("validation-tests"), plan)
}

#[test]
fn test_count_files_per_tree() {
    let plan = LogicalPlan::sort(
        vec![SortField::desc(col("tree_hash", 1))],
        LogicalPlan::group_by(
            vec![
                col("tree_hash", 1),
                Expression::alias(
                    "files",
                    Expression::aggregate(AggregateFunction::Count, Expression::Star),
                ),
            ],
            vec![col("tree_hash", 1)],
            LogicalPlan::filter(
                Expression::equals(col("tree_entry_mode", 3), Expression::literal("100644")),
                scan(),
            ),
        ),
    );
    assert_eq!(validate(&plan), Ok(()));
}

#[test]
fn test_aliased_scan_with_limit() {
    let plan = LogicalPlan::limit(
        10,
        LogicalPlan::project(
            vec![col("tree_entry_name", 4), col("blob_hash", 2)],
            LogicalPlan::alias("te", scan()),
        ),
    );
    assert_eq!(validate(&plan), Ok(()));
}

#[test]
fn test_order_by_aggregate() {
    let plan = LogicalPlan::sort(
        vec![SortField::asc(Expression::aggregate(
            AggregateFunction::Count,
            Expression::Star,
        ))],
        scan(),
    );
    assert_eq!(validate(&plan), Err(ValidationError::InvalidOrderBy));
}

#[test]
fn test_group_by_ungrouped_column() {
    let plan = LogicalPlan::group_by(
        vec![col("blob_hash", 2)],
        vec![col("tree_hash", 1)],
        scan(),
    );
    let err = validate(&plan).unwrap_err();
    assert_eq!(
        err,
        ValidationError::InvalidGroupBy(format!("{}.blob_hash", TREE_ENTRIES_TABLE_NAME))
    );
}

#[test]
fn test_unresolved_json_plan() {
    let plan: LogicalPlan = serde_json::from_str(
        r#"{
            "node": "project",
            "projections": [{"type": "unresolved_column", "name": "tree_hash"}],
            "child": {"node": "unresolved_table", "name": "tree_entries"}
        }"#,
    )
    .unwrap();
    assert_eq!(
        validate(&plan),
        Err(ValidationError::Unresolved(PlanKind::Project))
    );
}

#[test]
fn test_schema_source_mismatch_json_plan() {
    let plan: LogicalPlan = serde_json::from_str(
        r#"{
            "node": "table",
            "name": "tree_entries",
            "schema": [
                {"name": "repository_id", "type": "text", "nullable": false, "source": "tree_entries"},
                {"name": "commit_hash", "type": "text", "nullable": false, "source": "commits"}
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(
        validate(&plan),
        Err(ValidationError::SchemaSourceMismatch {
            table: "tree_entries".to_string(),
            found: "commits".to_string(),
        })
    );
}

#[test]
fn test_tuple_projection_json_plan() {
    let plan: LogicalPlan = serde_json::from_str(
        r#"{
            "node": "project",
            "projections": [
                {"type": "column", "table": "tree_entries", "name": "tree_hash", "index": 1, "data_type": "text"},
                {"type": "tuple", "items": [
                    {"type": "literal", "value": 1},
                    {"type": "literal", "value": 2}
                ]}
            ],
            "child": {
                "node": "table",
                "name": "tree_entries",
                "schema": [
                    {"name": "tree_hash", "type": "text", "nullable": false, "source": "tree_entries"}
                ]
            }
        }"#,
    )
    .unwrap();
    assert_eq!(
        validate(&plan),
        Err(ValidationError::ProjectionArity {
            position: 2,
            columns: 2,
        })
    );
}

#[test]
fn test_plan_survives_json_round_trip() {
    let plan = LogicalPlan::project(
        vec![Expression::alias("name", col("tree_entry_name", 4))],
        LogicalPlan::filter(
            Expression::in_list(
                col("tree_hash", 1),
                Expression::tuple(vec![Expression::literal("a"), Expression::literal("b")]),
            ),
            scan(),
        ),
    );
    let json = serde_json::to_string(&plan).unwrap();
    let back: LogicalPlan = serde_json::from_str(&json).unwrap();
    assert_eq!(back, plan);
    assert_eq!(validate(&back), Ok(()));
}

#[test]
fn test_custom_rule_list() {
    let plan = LogicalPlan::sort(
        vec![SortField::asc(Expression::aggregate(
            AggregateFunction::Max,
            col("blob_hash", 2),
        ))],
        scan(),
    );
    let analyzer = Analyzer::new(vec![]);
    assert_eq!(analyzer.validate(&Context::default(), &plan), Ok(()));
}
