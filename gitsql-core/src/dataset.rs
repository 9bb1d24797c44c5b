//! The set of repositories a query runs against.
//!
//! A dataset is an ordered list of repository sources. Each scan opens a
//! fresh object store handle per repository, owned by the iterator that
//! traverses it.

use std::fmt;
use std::sync::Arc;

use crate::error::ObjectStoreError;
use crate::object::{MemoryRepository, ObjectStore};

/// Knows how to open one repository's object store.
pub trait RepositorySource: Send + Sync {
    fn id(&self) -> &str;

    fn open(&self) -> Result<Box<dyn ObjectStore>, ObjectStoreError>;
}

/// An opened repository: its identifier plus an exclusively owned store.
pub struct Repository {
    id: String,
    store: Box<dyn ObjectStore>,
}

impl Repository {
    pub fn new(id: impl Into<String>, store: Box<dyn ObjectStore>) -> Self {
        Self {
            id: id.into(),
            store,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository").field("id", &self.id).finish()
    }
}

/// Source over an in-memory repository; every open shares the same objects.
pub struct MemorySource {
    id: String,
    repo: MemoryRepository,
}

impl MemorySource {
    pub fn new(id: impl Into<String>, repo: MemoryRepository) -> Self {
        Self {
            id: id.into(),
            repo,
        }
    }
}

impl RepositorySource for MemorySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn open(&self) -> Result<Box<dyn ObjectStore>, ObjectStoreError> {
        Ok(Box::new(self.repo.clone()))
    }
}

/// Ordered, read-only list of repository sources.
#[derive(Clone, Default)]
pub struct Dataset {
    sources: Vec<Arc<dyn RepositorySource>>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, source: impl RepositorySource + 'static) {
        self.sources.push(Arc::new(source));
    }

    pub fn add_memory(&mut self, id: &str, repo: MemoryRepository) {
        self.add(MemorySource::new(id, repo));
    }

    pub fn get(&self, pos: usize) -> Option<&Arc<dyn RepositorySource>> {
        self.sources.get(pos)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.id())
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}
