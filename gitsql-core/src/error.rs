//! Error types for gitsql-core.
//!
//! Validation errors are returned by analyzer rules, object store errors by
//! `ObjectStore` implementations. Everything else surfaces as `GitSqlError`.

use thiserror::Error;

use crate::plan::PlanKind;

/// Errors raised by the plan validation rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("plan is not resolved because of node '{0}'")]
    Unresolved(PlanKind),

    #[error("OrderBy does not support aggregation expressions")]
    InvalidOrderBy,

    #[error("GroupBy aggregate expression '{0}' doesn't appear in the grouping columns")]
    InvalidGroupBy(String),

    #[error("all schema column sources don't match table name, expecting {table:?}, but found: {found}")]
    SchemaSourceMismatch { table: String, found: String },

    #[error("selected field {position} should have 1 column, but has {columns}")]
    ProjectionArity { position: usize, columns: usize },
}

/// Errors returned by object store implementations.
#[derive(Error, Debug)]
pub enum ObjectStoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid object hash: {0}")]
    InvalidHash(String),

    #[error("corrupt object store: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ObjectStoreError {
    /// True for lookups of a hash that does not exist in the store.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ObjectStoreError::NotFound(_))
    }
}

/// gitsql error type
#[derive(Error, Debug)]
pub enum GitSqlError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] ObjectStoreError),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Invalid selector value for column '{column}': {value}")]
    InvalidSelectorValue { column: String, value: String },

    #[error("Column index {index} out of range for row of {len} values")]
    ColumnOutOfRange { index: usize, len: usize },

    #[error("Type error: {0}")]
    TypeError(String),
}

/// Result type for gitsql operations
pub type GitSqlResult<T> = Result<T, GitSqlError>;

impl serde::Serialize for GitSqlError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        let err = ValidationError::Unresolved(PlanKind::Project);
        assert_eq!(
            err.to_string(),
            "plan is not resolved because of node 'Project'"
        );

        let err = ValidationError::InvalidGroupBy("tree_entries.blob_hash".to_string());
        assert_eq!(
            err.to_string(),
            "GroupBy aggregate expression 'tree_entries.blob_hash' doesn't appear in the grouping columns"
        );

        let err = ValidationError::SchemaSourceMismatch {
            table: "tree_entries".to_string(),
            found: "commits".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "all schema column sources don't match table name, expecting \"tree_entries\", but found: commits"
        );

        let err = ValidationError::ProjectionArity {
            position: 2,
            columns: 3,
        };
        assert_eq!(
            err.to_string(),
            "selected field 2 should have 1 column, but has 3"
        );
    }

    #[test]
    fn test_error_conversion() {
        let err: GitSqlError = ValidationError::InvalidOrderBy.into();
        assert_eq!(
            err.to_string(),
            "Validation error: OrderBy does not support aggregation expressions"
        );

        let err: GitSqlError = ObjectStoreError::NotFound("abc".to_string()).into();
        assert!(matches!(err, GitSqlError::ObjectStore(ref e) if e.is_not_found()));
    }

    #[test]
    fn test_serialize_as_message() {
        let err = GitSqlError::TableNotFound("commits".to_string());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Table not found: commits\"");
    }
}
