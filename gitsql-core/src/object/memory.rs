//! In-memory object store.
//!
//! Used by tests and by snapshot-backed datasets. Trees are kept in
//! insertion order, which is the order `tree_objects` enumerates them in.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{File, FileIter, FileMode, ObjectHash, ObjectStore, Tree, TreeEntry, TreeIter};
use crate::error::ObjectStoreError;

#[derive(Debug, Default)]
struct MemoryObjects {
    order: Vec<ObjectHash>,
    trees: HashMap<ObjectHash, Tree>,
}

/// Read-only in-memory repository. Clones share the same objects.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    objects: Arc<MemoryObjects>,
}

impl MemoryRepository {
    pub fn builder() -> MemoryRepositoryBuilder {
        MemoryRepositoryBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.objects.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.order.is_empty()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, ObjectStoreError> {
        let mut builder = Self::builder();
        for tree in snapshot.trees {
            let entries = tree
                .entries
                .into_iter()
                .map(|e| {
                    Ok(TreeEntry {
                        mode: FileMode::from_octal(&e.mode)?,
                        hash: e.hash,
                        name: e.name,
                    })
                })
                .collect::<Result<Vec<_>, ObjectStoreError>>()?;
            builder.insert_tree(Tree {
                hash: tree.hash,
                entries,
            });
        }
        Ok(builder.build())
    }

    pub fn from_json_reader<R: std::io::Read>(reader: R) -> Result<Self, ObjectStoreError> {
        let snapshot: Snapshot = serde_json::from_reader(reader)
            .map_err(|e| ObjectStoreError::Corrupt(format!("invalid snapshot: {}", e)))?;
        Self::from_snapshot(snapshot)
    }

    pub fn to_snapshot(&self) -> Snapshot {
        let trees = self
            .objects
            .order
            .iter()
            .filter_map(|h| self.objects.trees.get(h))
            .map(|tree| SnapshotTree {
                hash: tree.hash,
                entries: tree
                    .entries
                    .iter()
                    .map(|e| SnapshotEntry {
                        name: e.name.clone(),
                        mode: e.mode.to_string(),
                        hash: e.hash,
                    })
                    .collect(),
            })
            .collect();
        Snapshot { trees }
    }
}

impl ObjectStore for MemoryRepository {
    fn tree_objects(&self) -> Result<TreeIter, ObjectStoreError> {
        Ok(Box::new(MemoryTreeIter {
            objects: Arc::clone(&self.objects),
            pos: 0,
        }))
    }

    fn tree_object(&self, hash: &ObjectHash) -> Result<Tree, ObjectStoreError> {
        self.objects
            .trees
            .get(hash)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound(hash.to_string()))
    }

    fn files(&self, tree: &Tree) -> Result<FileIter, ObjectStoreError> {
        Ok(Box::new(MemoryFileIter {
            objects: Arc::clone(&self.objects),
            stack: vec![WalkFrame {
                hash: tree.hash,
                prefix: String::new(),
                entries: tree.entries.clone(),
                pos: 0,
            }],
        }))
    }
}

struct MemoryTreeIter {
    objects: Arc<MemoryObjects>,
    pos: usize,
}

impl Iterator for MemoryTreeIter {
    type Item = Result<Tree, ObjectStoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.objects.order.get(self.pos)?;
        self.pos += 1;
        Some(
            self.objects
                .trees
                .get(hash)
                .cloned()
                .ok_or_else(|| ObjectStoreError::Corrupt(format!("dangling tree {}", hash))),
        )
    }
}

struct WalkFrame {
    hash: ObjectHash,
    prefix: String,
    entries: Vec<TreeEntry>,
    pos: usize,
}

/// Depth-first walk yielding files in entry order. Submodules are skipped.
struct MemoryFileIter {
    objects: Arc<MemoryObjects>,
    stack: Vec<WalkFrame>,
}

impl Iterator for MemoryFileIter {
    type Item = Result<File, ObjectStoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some(entry) = frame.entries.get(frame.pos).cloned() else {
                self.stack.pop();
                continue;
            };
            frame.pos += 1;

            let name = if frame.prefix.is_empty() {
                entry.name
            } else {
                format!("{}/{}", frame.prefix, entry.name)
            };

            if entry.mode.is_submodule() {
                continue;
            }

            if entry.mode.is_dir() {
                let Some(subtree) = self.objects.trees.get(&entry.hash) else {
                    self.stack.clear();
                    return Some(Err(ObjectStoreError::Corrupt(format!(
                        "tree entry '{}' points to missing tree {}",
                        name, entry.hash
                    ))));
                };
                // A tree reachable from itself would be walked forever.
                if self.stack.iter().any(|f| f.hash == entry.hash) {
                    self.stack.clear();
                    return Some(Err(ObjectStoreError::Corrupt(format!(
                        "tree cycle at '{}' through {}",
                        name, entry.hash
                    ))));
                }
                self.stack.push(WalkFrame {
                    hash: entry.hash,
                    prefix: name,
                    entries: subtree.entries.clone(),
                    pos: 0,
                });
                continue;
            }

            return Some(Ok(File {
                name,
                mode: entry.mode,
                hash: entry.hash,
            }));
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryRepositoryBuilder {
    objects: MemoryObjects,
}

impl MemoryRepositoryBuilder {
    /// Adds a tree built from `entries` and returns its content hash.
    pub fn add_tree(&mut self, entries: Vec<TreeEntry>) -> ObjectHash {
        let mut content = Vec::new();
        for e in &entries {
            content.extend_from_slice(format!("{} {}\0", e.mode, e.name).as_bytes());
            content.extend_from_slice(e.hash.as_bytes());
        }
        let hash = ObjectHash::digest(&content);
        self.insert_tree(Tree { hash, entries });
        hash
    }

    /// Adds a tree under its declared hash. Re-adding a hash keeps the first.
    pub fn insert_tree(&mut self, tree: Tree) {
        if self.objects.trees.contains_key(&tree.hash) {
            return;
        }
        self.objects.order.push(tree.hash);
        self.objects.trees.insert(tree.hash, tree);
    }

    pub fn build(self) -> MemoryRepository {
        MemoryRepository {
            objects: Arc::new(self.objects),
        }
    }
}

/// Serialized form of a repository's trees.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub trees: Vec<SnapshotTree>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotTree {
    pub hash: ObjectHash,
    #[serde(default)]
    pub entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub name: String,
    /// Octal mode, e.g. "100644".
    pub mode: String,
    pub hash: ObjectHash,
}
