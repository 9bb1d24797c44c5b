//! Configuration handling for the gitsql CLI
//!
//! Manages the gitsql.toml configuration file.
//!
//! ## Environment Variables
//!
//! The following environment variables can override config file settings:
//!
//! - `GITSQL_LOG` - Default log filter, used when `RUST_LOG` is not set
//! - `GITSQL_REPOSITORIES` - Comma separated `id=path` pairs replacing the
//!   configured repositories
//!
//! These can be set in a `.env` file next to the config file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use gitsql_core::Dataset;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::snapshot::SnapshotSource;

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "gitsql.toml";

/// Environment variable names
pub const ENV_LOG: &str = "GITSQL_LOG";
pub const ENV_REPOSITORIES: &str = "GITSQL_REPOSITORIES";

/// Log filter used when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "gitsql=info,gitsql_core=info";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Repository id must not be empty")]
    EmptyRepositoryId,

    #[error("Duplicate repository id: {0}")]
    DuplicateRepositoryId(String),

    #[error("Invalid repository override '{0}', expected id=path")]
    InvalidRepositoryOverride(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default log filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
    /// Repositories making up the dataset, in scan order
    #[serde(default)]
    pub repositories: Vec<RepositoryConfig>,
    /// Directory snapshot paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub id: String,
    /// Snapshot file (relative to the config file)
    pub snapshot: PathBuf,
}

impl Config {
    /// Load configuration from a file
    ///
    /// This also loads any `.env` file next to it and applies environment
    /// variable overrides.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        // Load env file if present (ignore errors)
        let env_path = dir.join(".env");
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
        }

        if !path.exists() {
            anyhow::bail!("Configuration file not found: {}", path.display());
        }

        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.base_dir = dir;

        // Apply environment variable overrides
        config.apply_env_overrides()?;
        config.validate()?;

        tracing::debug!(
            path = %path.display(),
            repositories = config.repositories.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(filter) = std::env::var(ENV_LOG) {
            if !filter.is_empty() {
                self.log_filter = Some(filter);
            }
        }

        if let Ok(list) = std::env::var(ENV_REPOSITORIES) {
            if !list.is_empty() {
                self.repositories = parse_repository_list(&list)?;
            }
        }

        Ok(())
    }

    /// Reject empty and duplicate repository ids
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for repo in &self.repositories {
            if repo.id.is_empty() {
                return Err(ConfigError::EmptyRepositoryId);
            }
            if !seen.insert(repo.id.as_str()) {
                return Err(ConfigError::DuplicateRepositoryId(repo.id.clone()));
            }
        }
        Ok(())
    }

    /// Log filter to use when `RUST_LOG` is not set
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Get the absolute snapshot path of a repository
    pub fn snapshot_path(&self, repo: &RepositoryConfig) -> PathBuf {
        if repo.snapshot.is_absolute() {
            repo.snapshot.clone()
        } else {
            self.base_dir.join(&repo.snapshot)
        }
    }

    /// Dataset over the configured repositories. Snapshots are only read
    /// when a scan reaches them.
    pub fn dataset(&self) -> Dataset {
        let mut dataset = Dataset::new();
        for repo in &self.repositories {
            dataset.add(SnapshotSource::new(&repo.id, self.snapshot_path(repo)));
        }
        dataset
    }
}

/// Parse `id=path,id=path`
pub fn parse_repository_list(list: &str) -> Result<Vec<RepositoryConfig>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (id, path) = item
                .split_once('=')
                .ok_or_else(|| ConfigError::InvalidRepositoryOverride(item.to_string()))?;
            Ok(RepositoryConfig {
                id: id.trim().to_string(),
                snapshot: PathBuf::from(path.trim()),
            })
        })
        .collect()
}
