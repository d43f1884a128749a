// Synchronous key-value storage backends

use crate::error::{Result, TaskListError};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const CURRENT_VERSION: u32 = 1;

/// A local, synchronous string key-value store
///
/// `set` replaces the whole value under a key; readers never observe a
/// partially written value.
pub trait KeyValueStorage {
    /// Read the value stored under `key`, `None` if the key was never set
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

impl<S: KeyValueStorage + ?Sized> KeyValueStorage for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// Keys double as file names, so keep them to a safe alphabet
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty()
        || key.len() > 64
        || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(TaskListError::InvalidKey(key.to_string()));
    }
    Ok(())
}

// ============================================================================
// File backend
// ============================================================================

/// One `<key>.json` file per key inside a directory
///
/// Writes hold an exclusive lock on `.lock` and land via temp file + rename,
/// so concurrent writers from separate processes are last-write-wins.
#[derive(Debug)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Open or create a file store rooted at `path`
    ///
    /// A new directory gets a `.version` marker; an existing one must carry a
    /// version this build can read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        let location = base_path.display().to_string();

        fs::create_dir_all(&base_path).map_err(|e| TaskListError::unavailable(location.clone(), e))?;

        let version_path = base_path.join(".version");
        if version_path.exists() {
            let found = fs::read_to_string(&version_path)
                .map_err(|e| TaskListError::unavailable(location.clone(), e))?;
            match found.trim().parse::<u32>() {
                Ok(version) if version <= CURRENT_VERSION => {}
                _ => {
                    return Err(TaskListError::UnsupportedVersion {
                        location,
                        found: found.trim().to_string(),
                        supported: CURRENT_VERSION,
                    });
                }
            }
        } else {
            fs::write(&version_path, CURRENT_VERSION.to_string())
                .map_err(|e| TaskListError::unavailable(location, e))?;
        }

        debug!(path = ?base_path, "Opened file storage");
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", key))
    }

    fn lock_file(&self) -> std::io::Result<fs::File> {
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.base_path.join(".lock"))
    }

    fn write_atomic(&self, key: &str, value: &str) -> std::io::Result<()> {
        let lock = self.lock_file()?;
        lock.lock_exclusive()?;

        let mut tmp = NamedTempFile::new_in(&self.base_path)?;
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.key_path(key)).map_err(|e| e.error)?;

        // Lock is released when `lock` is dropped
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;

        match fs::read_to_string(self.key_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TaskListError::unavailable(key, e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;

        self.write_atomic(key, value)
            .map_err(|e| TaskListError::unavailable(key, e))?;

        debug!(key, bytes = value.len(), "Wrote key to file storage");
        Ok(())
    }
}

// ============================================================================
// SQLite backend
// ============================================================================

/// A single `kv` table in `tasklist.db`
pub struct SqliteStorage {
    db: Connection,
}

impl SqliteStorage {
    /// Open or create `tasklist.db` inside the directory `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref();
        let location = base_path.display().to_string();

        fs::create_dir_all(base_path).map_err(|e| TaskListError::unavailable(location.clone(), e))?;

        let db = Connection::open(base_path.join("tasklist.db"))
            .map_err(|e| TaskListError::unavailable(location, e))?;

        let storage = Self { db };
        storage.create_schema()?;
        Ok(storage)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().map_err(|e| TaskListError::unavailable(":memory:", e))?;
        let storage = Self { db };
        storage.create_schema()?;
        Ok(storage)
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating kv schema");

        self.db
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS kv (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );
                "#,
            )
            .map_err(|e| TaskListError::unavailable("kv", e))?;

        Ok(())
    }
}

impl KeyValueStorage for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;

        self.db
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .map_err(|e| TaskListError::unavailable(key, e))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;

        self.db
            .execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, value],
            )
            .map_err(|e| TaskListError::unavailable(key, e))?;

        debug!(key, bytes = value.len(), "Wrote key to sqlite storage");
        Ok(())
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Process-local map, for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
