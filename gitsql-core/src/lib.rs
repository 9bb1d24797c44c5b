//! gitsql core - plan validation and virtual tables over versioned object graphs.
//!
//! This crate sits between a SQL query engine and an object store holding
//! repositories of content-addressed trees. It has no parser or planner of
//! its own: the host hands it logical plans and scan requests.
//!
//! # Main Components
//!
//! - **Analyzer**: ordered validation rules run on a logical plan before
//!   execution
//! - **Tables**: virtual tables (`tree_entries`) with filter pushdown
//! - **Iterators**: pull-based row streams that visit one repository at a
//!   time
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use gitsql_core::{collect_rows, Catalog, Context, Dataset, MemoryRepository};
//! use gitsql_core::object::{FileMode, ObjectHash, TreeEntry};
//!
//! let mut builder = MemoryRepository::builder();
//! builder.add_tree(vec![TreeEntry::file(
//!     "README",
//!     FileMode::REGULAR,
//!     ObjectHash::digest(b"hello"),
//! )]);
//!
//! let mut dataset = Dataset::new();
//! dataset.add_memory("repo", builder.build());
//!
//! let catalog = Catalog::with_default_tables(Arc::new(dataset));
//! let table = catalog.table("tree_entries").unwrap();
//! let mut rows = table.row_iter(&Context::default()).unwrap();
//! let rows = collect_rows(&mut rows).unwrap();
//! assert_eq!(rows.len(), 1);
//! ```

pub mod analyzer;
pub mod context;
pub mod dataset;
pub mod error;
pub mod expression;
pub mod iter;
pub mod object;
pub mod plan;
pub mod table;
pub mod types;

// Re-export main types for convenience
pub use analyzer::{default_validation_rules, Analyzer, ValidationRule};
pub use context::Context;
pub use dataset::{Dataset, MemorySource, Repository, RepositorySource};
pub use error::{GitSqlError, GitSqlResult, ObjectStoreError, ValidationError};
pub use expression::{AggregateFunction, Expression};
pub use iter::{collect_rows, BoxRowIter, RepoIterFactory, RepoRowIter, RowIter};
pub use object::{MemoryRepository, ObjectStore};
pub use plan::{LogicalPlan, PlanKind, SortField, SortOrder};
pub use table::{Catalog, Table, TreeEntriesTable, TREE_ENTRIES_TABLE_NAME};
pub use types::{Column, DataType, Row, Schema, Value};
