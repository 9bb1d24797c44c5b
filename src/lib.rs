//! gitsql - query the tree objects of versioned repositories as SQL tables.
//!
//! The query core lives in `gitsql-core`. This crate adds configuration,
//! snapshot-backed repositories and the command line front end.

pub mod cli;
pub mod config;
pub mod output;
pub mod snapshot;

pub use config::{Config, ConfigError, RepositoryConfig};
pub use snapshot::SnapshotSource;
