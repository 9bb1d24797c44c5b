//! Object graph model and the object store interface the tables consume.
//!
//! A repository is a set of content-addressed tree objects. Trees hold named
//! entries pointing at blobs or at other trees. The store resolves hashes to
//! trees, enumerates every tree it holds and walks a tree's files
//! recursively.

mod memory;

pub use memory::{MemoryRepository, MemoryRepositoryBuilder, Snapshot, SnapshotEntry, SnapshotTree};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ObjectStoreError;

pub const HASH_SIZE: usize = 20;

/// Content hash of an object, rendered as 40 lowercase hex digits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectHash([u8; HASH_SIZE]);

impl ObjectHash {
    pub const fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Hash of arbitrary content: SHA-256 truncated to the object hash size.
    pub fn digest(content: &[u8]) -> Self {
        let full = Sha256::digest(content);
        let mut bytes = [0u8; HASH_SIZE];
        bytes.copy_from_slice(&full[..HASH_SIZE]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }
}

impl FromStr for ObjectHash {
    type Err = ObjectStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != HASH_SIZE * 2 {
            return Err(ObjectStoreError::InvalidHash(s.to_string()));
        }
        let mut bytes = [0u8; HASH_SIZE];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|_| ObjectStoreError::InvalidHash(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for ObjectHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ObjectHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectHash({})", self)
    }
}

impl Serialize for ObjectHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Mode of a tree entry, as stored in the tree object.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileMode(u32);

impl FileMode {
    pub const DIR: FileMode = FileMode(0o040000);
    pub const REGULAR: FileMode = FileMode(0o100644);
    pub const EXECUTABLE: FileMode = FileMode(0o100755);
    pub const SYMLINK: FileMode = FileMode(0o120000);
    pub const SUBMODULE: FileMode = FileMode(0o160000);

    pub const fn new(mode: u32) -> Self {
        Self(mode)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn is_dir(&self) -> bool {
        *self == Self::DIR
    }

    pub fn is_submodule(&self) -> bool {
        *self == Self::SUBMODULE
    }

    /// Parses the base-8 representation used in tree objects.
    pub fn from_octal(s: &str) -> Result<Self, ObjectStoreError> {
        u32::from_str_radix(s, 8)
            .map(Self)
            .map_err(|_| ObjectStoreError::Corrupt(format!("invalid file mode '{}'", s)))
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:o}", self.0)
    }
}

impl fmt::Debug for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileMode({:o})", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub mode: FileMode,
    pub hash: ObjectHash,
}

impl TreeEntry {
    pub fn file(name: &str, mode: FileMode, hash: ObjectHash) -> Self {
        Self {
            name: name.to_string(),
            mode,
            hash,
        }
    }

    pub fn tree(name: &str, hash: ObjectHash) -> Self {
        Self::file(name, FileMode::DIR, hash)
    }
}

/// A resolved tree object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    pub hash: ObjectHash,
    pub entries: Vec<TreeEntry>,
}

/// A file reached by walking a tree recursively. `name` is the slash-joined
/// path relative to the walked tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub name: String,
    pub mode: FileMode,
    pub hash: ObjectHash,
}

pub type TreeIter = Box<dyn Iterator<Item = Result<Tree, ObjectStoreError>> + Send>;
pub type FileIter = Box<dyn Iterator<Item = Result<File, ObjectStoreError>> + Send>;

/// Object store client for one repository.
///
/// Returned iterators own whatever they need from the store, so they can
/// outlive the borrow used to create them.
pub trait ObjectStore: Send {
    /// Every tree object in the repository, in the store's natural order.
    fn tree_objects(&self) -> Result<TreeIter, ObjectStoreError>;

    /// Resolves a single tree. Missing trees are `ObjectStoreError::NotFound`.
    fn tree_object(&self, hash: &ObjectHash) -> Result<Tree, ObjectStoreError>;

    /// Walks every file reachable from `tree`, descending into subtrees.
    fn files(&self, tree: &Tree) -> Result<FileIter, ObjectStoreError>;
}
