//! Virtual tables over the repositories of a dataset.

pub mod selectors;
pub mod tree_entries;

pub use selectors::{classify_filters, handled_filters, row_iter_with_selectors, Selectors};
pub use tree_entries::{
    tree_entries_schema, FileRowIter, TreeEntriesByHash, TreeEntriesByHashIter, TreeEntriesTable,
    TreeEntryIter, TreeEntryIterFactory, TREE_ENTRIES_TABLE_NAME,
};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::dataset::Dataset;
use crate::error::{GitSqlError, GitSqlResult};
use crate::expression::Expression;
use crate::iter::BoxRowIter;
use crate::types::Schema;

/// A table the query engine can scan, with filter pushdown.
pub trait Table: fmt::Display + Send + Sync {
    fn name(&self) -> &str;

    fn schema(&self) -> &Schema;

    /// Filters this table can evaluate itself.
    fn handled_filters(&self, filters: &[Expression]) -> Vec<Expression>;

    /// Full, unfiltered scan.
    fn row_iter(&self, ctx: &Context) -> GitSqlResult<BoxRowIter>;

    /// Scan with pushed-down projection and filters. Rows always carry every
    /// column of the schema; narrowing them is left to the caller.
    fn with_project_and_filters(
        &self,
        ctx: &Context,
        projection: &[Expression],
        filters: &[Expression],
    ) -> GitSqlResult<BoxRowIter>;
}

/// Writes a table as a small tree of its columns.
pub fn print_table(f: &mut fmt::Formatter<'_>, name: &str, schema: &Schema) -> fmt::Result {
    writeln!(f, "Table({})", name)?;
    let last = schema.len().saturating_sub(1);
    for (i, col) in schema.iter().enumerate() {
        let branch = if i == last { "└─" } else { "├─" };
        write!(
            f,
            " {} Column({}, {}, nullable={})",
            branch, col.name, col.data_type, col.nullable
        )?;
        if i != last {
            writeln!(f)?;
        }
    }
    Ok(())
}

/// Tables available to the host, by name.
pub struct Catalog {
    tables: BTreeMap<String, Box<dyn Table>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
        }
    }

    /// Catalog with every built-in table over `dataset`.
    pub fn with_default_tables(dataset: Arc<Dataset>) -> Self {
        let mut catalog = Self::new();
        catalog.register(TreeEntriesTable::new(dataset));
        catalog
    }

    pub fn register(&mut self, table: impl Table + 'static) {
        self.tables.insert(table.name().to_string(), Box::new(table));
    }

    pub fn table(&self, name: &str) -> GitSqlResult<&dyn Table> {
        self.tables
            .get(&name.to_ascii_lowercase())
            .map(|t| t.as_ref())
            .ok_or_else(|| GitSqlError::TableNotFound(name.to_string()))
    }

    pub fn tables(&self) -> impl Iterator<Item = &dyn Table> {
        self.tables.values().map(|t| t.as_ref())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
