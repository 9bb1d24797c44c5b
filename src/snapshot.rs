//! Repositories backed by JSON snapshot files.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use gitsql_core::error::ObjectStoreError;
use gitsql_core::{MemoryRepository, ObjectStore, RepositorySource};

/// Repository whose objects are read from a snapshot file each time it is
/// opened. Nothing is read until the first scan reaches it.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    id: String,
    path: PathBuf,
}

impl SnapshotSource {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RepositorySource for SnapshotSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn open(&self) -> Result<Box<dyn ObjectStore>, ObjectStoreError> {
        tracing::debug!(repository = %self.id, path = %self.path.display(), "loading snapshot");
        let file = File::open(&self.path)?;
        let repo = MemoryRepository::from_json_reader(BufReader::new(file))?;
        tracing::debug!(repository = %self.id, trees = repo.len(), "snapshot loaded");
        Ok(Box::new(repo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_snapshot_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = SnapshotSource::new("r", dir.path().join("missing.json"));
        assert!(matches!(source.open(), Err(ObjectStoreError::Io(_))));
    }

    #[test]
    fn test_malformed_snapshot_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let source = SnapshotSource::new("r", &path);
        assert!(matches!(source.open(), Err(ObjectStoreError::Corrupt(_))));
    }

    #[test]
    fn test_open_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repo.json");
        std::fs::write(&path, r#"{"trees": []}"#).unwrap();
        let source = SnapshotSource::new("r", &path);
        assert_eq!(source.id(), "r");
        assert!(source.open().is_ok());
    }
}
