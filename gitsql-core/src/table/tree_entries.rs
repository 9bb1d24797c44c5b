use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::dataset::{Dataset, Repository};
use crate::error::GitSqlResult;
use crate::expression::Expression;
use crate::iter::{BoxRowIter, RepoIterFactory, RepoRowIter, RowIter, SpanIter};
use crate::object::{File, FileIter, ObjectHash, Tree, TreeIter};
use crate::types::{Column, DataType, Row, Schema, Value};

use super::selectors::{handled_filters, row_iter_with_selectors};
use super::{print_table, Table};

pub const TREE_ENTRIES_TABLE_NAME: &str = "tree_entries";

const TREE_HASH_COLUMN: &str = "tree_hash";

/// Schema of the tree entries table.
pub fn tree_entries_schema() -> Schema {
    let col = |name| Column::new(name, DataType::Text, false, TREE_ENTRIES_TABLE_NAME);
    Schema::new(vec![
        col("repository_id"),
        col("tree_hash"),
        col("blob_hash"),
        col("tree_entry_mode"),
        col("tree_entry_name"),
    ])
}

/// One row per file reachable from every tree of every repository.
pub struct TreeEntriesTable {
    dataset: Arc<Dataset>,
    schema: Schema,
}

impl TreeEntriesTable {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self {
            dataset,
            schema: tree_entries_schema(),
        }
    }
}

impl Table for TreeEntriesTable {
    fn name(&self) -> &str {
        TREE_ENTRIES_TABLE_NAME
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn handled_filters(&self, filters: &[Expression]) -> Vec<Expression> {
        handled_filters(TREE_ENTRIES_TABLE_NAME, &self.schema, filters)
    }

    fn row_iter(&self, ctx: &Context) -> GitSqlResult<BoxRowIter> {
        let span = ctx.span("gitsql.TreeEntriesTable");
        let iter = RepoRowIter::new(Arc::clone(&self.dataset), TreeEntryIterFactory);
        Ok(Box::new(SpanIter::new(span, iter)))
    }

    // TODO: when only tree_hash is projected the file walk could be skipped
    // entirely and one row emitted per tree.
    fn with_project_and_filters(
        &self,
        ctx: &Context,
        _projection: &[Expression],
        filters: &[Expression],
    ) -> GitSqlResult<BoxRowIter> {
        row_iter_with_selectors(
            ctx.span("gitsql.TreeEntriesTable"),
            Arc::clone(&self.dataset),
            &self.schema,
            TREE_ENTRIES_TABLE_NAME,
            filters,
            &[TREE_HASH_COLUMN],
            |selectors| {
                if selectors.get(TREE_HASH_COLUMN).is_none() {
                    tracing::debug!("scanning every tree object");
                    return Ok(TreeEntriesFactory::All(TreeEntryIterFactory));
                }

                let hashes = selectors.text_values(TREE_HASH_COLUMN)?;
                tracing::debug!(hashes = hashes.len(), "scanning trees by hash");
                Ok(TreeEntriesFactory::ByHash(TreeEntriesByHash::new(hashes)))
            },
        )
    }
}

impl fmt::Display for TreeEntriesTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        print_table(f, TREE_ENTRIES_TABLE_NAME, &self.schema)
    }
}

/// Either scan strategy, so both can flow through one driver type.
enum TreeEntriesFactory {
    All(TreeEntryIterFactory),
    ByHash(TreeEntriesByHash),
}

enum TreeEntriesIter {
    All(TreeEntryIter),
    ByHash(TreeEntriesByHashIter),
}

impl RepoIterFactory for TreeEntriesFactory {
    type Iter = TreeEntriesIter;

    fn new_iterator(&self, repo: Repository) -> GitSqlResult<TreeEntriesIter> {
        Ok(match self {
            TreeEntriesFactory::All(f) => TreeEntriesIter::All(f.new_iterator(repo)?),
            TreeEntriesFactory::ByHash(f) => TreeEntriesIter::ByHash(f.new_iterator(repo)?),
        })
    }
}

impl Iterator for TreeEntriesIter {
    type Item = GitSqlResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            TreeEntriesIter::All(i) => i.next(),
            TreeEntriesIter::ByHash(i) => i.next(),
        }
    }
}

impl RowIter for TreeEntriesIter {
    fn close(&mut self) -> GitSqlResult<()> {
        match self {
            TreeEntriesIter::All(i) => i.close(),
            TreeEntriesIter::ByHash(i) => i.close(),
        }
    }
}

/// Factory for the full traversal of a repository's tree objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeEntryIterFactory;

impl RepoIterFactory for TreeEntryIterFactory {
    type Iter = TreeEntryIter;

    fn new_iterator(&self, repo: Repository) -> GitSqlResult<TreeEntryIter> {
        let trees = repo.store().tree_objects()?;
        Ok(TreeEntryIter {
            repo: Some(repo),
            trees: Some(trees),
            files: None,
        })
    }
}

pub struct TreeEntryIter {
    repo: Option<Repository>,
    trees: Option<TreeIter>,
    files: Option<FileRowIter>,
}

impl Iterator for TreeEntryIter {
    type Item = GitSqlResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.files.is_none() {
                let repo = self.repo.as_ref()?;
                let tree = match self.trees.as_mut()?.next()? {
                    Ok(tree) => tree,
                    Err(err) => return Some(Err(err.into())),
                };
                match FileRowIter::new(repo, tree) {
                    Ok(files) => self.files = Some(files),
                    Err(err) => return Some(Err(err)),
                }
            }

            let files = self.files.as_mut()?;
            match files.next() {
                Some(row) => return Some(row),
                None => self.files = None,
            }
        }
    }
}

impl RowIter for TreeEntryIter {
    fn close(&mut self) -> GitSqlResult<()> {
        self.files = None;
        self.trees = None;
        self.repo = None;
        Ok(())
    }
}

/// Factory for scans restricted to a list of tree hashes.
#[derive(Debug, Clone)]
pub struct TreeEntriesByHash {
    hashes: Arc<[String]>,
}

impl TreeEntriesByHash {
    pub fn new(hashes: Vec<String>) -> Self {
        Self {
            hashes: hashes.into(),
        }
    }
}

impl RepoIterFactory for TreeEntriesByHash {
    type Iter = TreeEntriesByHashIter;

    fn new_iterator(&self, repo: Repository) -> GitSqlResult<TreeEntriesByHashIter> {
        Ok(TreeEntriesByHashIter {
            hashes: Arc::clone(&self.hashes),
            pos: 0,
            repo: Some(repo),
            files: None,
        })
    }
}

pub struct TreeEntriesByHashIter {
    hashes: Arc<[String]>,
    pos: usize,
    repo: Option<Repository>,
    files: Option<FileRowIter>,
}

impl TreeEntriesByHashIter {
    /// Resolves the next listed hash present in this repository.
    fn next_tree(&mut self) -> GitSqlResult<Option<Tree>> {
        let Some(repo) = self.repo.as_ref() else {
            return Ok(None);
        };

        while let Some(raw) = self.hashes.get(self.pos) {
            self.pos += 1;

            // Rows carry the lowercase form, so any other spelling can never
            // compare equal to them.
            let hash = match raw.parse::<ObjectHash>() {
                Ok(hash) if hash.to_string() == *raw => hash,
                _ => {
                    tracing::trace!(hash = %raw, "skipping malformed tree hash");
                    continue;
                }
            };

            match repo.store().tree_object(&hash) {
                Ok(tree) => return Ok(Some(tree)),
                Err(err) if err.is_not_found() => {
                    tracing::trace!(repository = repo.id(), %hash, "tree not in repository");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(None)
    }
}

impl Iterator for TreeEntriesByHashIter {
    type Item = GitSqlResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.files.is_none() {
                let tree = match self.next_tree() {
                    Ok(Some(tree)) => tree,
                    Ok(None) => return None,
                    Err(err) => return Some(Err(err)),
                };
                let repo = self.repo.as_ref()?;
                match FileRowIter::new(repo, tree) {
                    Ok(files) => self.files = Some(files),
                    Err(err) => return Some(Err(err)),
                }
            }

            let files = self.files.as_mut()?;
            match files.next() {
                Some(row) => return Some(row),
                None => self.files = None,
            }
        }
    }
}

impl RowIter for TreeEntriesByHashIter {
    fn close(&mut self) -> GitSqlResult<()> {
        self.files = None;
        self.repo = None;
        Ok(())
    }
}

/// Rows for every file of one tree, walked recursively.
pub struct FileRowIter {
    repo_id: String,
    tree_hash: String,
    files: FileIter,
}

impl FileRowIter {
    pub fn new(repo: &Repository, tree: Tree) -> GitSqlResult<Self> {
        let files = repo.store().files(&tree)?;
        Ok(Self {
            repo_id: repo.id().to_string(),
            tree_hash: tree.hash.to_string(),
            files,
        })
    }

    fn file_to_row(&self, file: File) -> Row {
        vec![
            Value::Text(self.repo_id.clone()),
            Value::Text(self.tree_hash.clone()),
            Value::Text(file.hash.to_string()),
            Value::Text(file.mode.to_string()),
            Value::Text(file.name),
        ]
    }
}

impl Iterator for FileRowIter {
    type Item = GitSqlResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.files.next()? {
            Ok(file) => Some(Ok(self.file_to_row(file))),
            Err(err) => Some(Err(err.into())),
        }
    }
}

impl RowIter for FileRowIter {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iter::collect_rows;
    use crate::object::{FileMode, MemoryRepository, TreeEntry};

    fn blob(content: &str) -> ObjectHash {
        ObjectHash::digest(content.as_bytes())
    }

    #[test]
    fn test_schema_sources() {
        let schema = tree_entries_schema();
        assert_eq!(schema.len(), 5);
        assert!(schema.iter().all(|c| c.source == TREE_ENTRIES_TABLE_NAME));
        assert!(schema.iter().all(|c| !c.nullable));
    }

    #[test]
    fn test_file_row_iter() {
        let mut b = MemoryRepository::builder();
        let sub = b.add_tree(vec![TreeEntry::file("b", FileMode::EXECUTABLE, blob("b"))]);
        let root = b.add_tree(vec![
            TreeEntry::file("a", FileMode::REGULAR, blob("a")),
            TreeEntry::tree("dir", sub),
        ]);
        let repo = Repository::new("r", Box::new(b.build()));
        let tree = repo.store().tree_object(&root).unwrap();

        let mut iter = FileRowIter::new(&repo, tree).unwrap();
        let rows = collect_rows(&mut iter).unwrap();
        assert_eq!(
            rows,
            vec![
                vec![
                    Value::from("r"),
                    Value::from(root.to_string()),
                    Value::from(blob("a").to_string()),
                    Value::from("100644"),
                    Value::from("a"),
                ],
                vec![
                    Value::from("r"),
                    Value::from(root.to_string()),
                    Value::from(blob("b").to_string()),
                    Value::from("100755"),
                    Value::from("dir/b"),
                ],
            ]
        );
    }

    #[test]
    fn test_display() {
        let table = TreeEntriesTable::new(Arc::new(Dataset::new()));
        let printed = table.to_string();
        assert!(printed.starts_with("Table(tree_entries)\n"));
        assert!(printed.contains("├─ Column(repository_id, TEXT, nullable=false)"));
        assert!(printed.ends_with("└─ Column(tree_entry_name, TEXT, nullable=false)"));
    }
}
