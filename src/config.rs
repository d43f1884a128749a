// Configuration file loading

use crate::error::Result as StoreResult;
use crate::storage::{FileStorage, KeyValueStorage, SqliteStorage};
use crate::store::MalformedPolicy;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Which key-value backend holds the task list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    File,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    /// Directory holding the storage files
    pub store_path: PathBuf,
    pub on_malformed: MalformedPolicy,
    /// One of trace, debug, info, warn, error
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            store_path: default_store_path(),
            on_malformed: MalformedPolicy::default(),
            log_level: "warn".to_string(),
        }
    }
}

/// `<data dir>/tasklist`, or `.tasklist` when no data dir is known
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("tasklist"))
        .unwrap_or_else(|| PathBuf::from(".tasklist"))
}

/// `<config dir>/tasklist/config.yml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tasklist").join("config.yml"))
}

impl Config {
    /// Load config from `path`, or the default location when `None`
    ///
    /// A missing file yields the defaults; an unreadable or invalid one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(p) => p,
            None => return Ok(Self::default()),
        };

        if !path.exists() {
            debug!(path = ?path, "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document parses as null, not as a mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Open the configured backend
    pub fn open_storage(&self) -> StoreResult<Box<dyn KeyValueStorage>> {
        let storage: Box<dyn KeyValueStorage> = match self.backend {
            Backend::File => Box::new(FileStorage::open(&self.store_path)?),
            Backend::Sqlite => Box::new(SqliteStorage::open(&self.store_path)?),
        };
        Ok(storage)
    }
}
