// Error taxonomy for the task store and its storage backends

use crate::models::TaskId;
use thiserror::Error;

/// Errors surfaced by [`crate::TaskStore`] and the storage backends
#[derive(Debug, Error)]
pub enum TaskListError {
    /// The key-value store could not be read or written
    #[error("storage unavailable at '{location}': {source}")]
    StorageUnavailable {
        location: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// Persisted data exists but is not an array of tasks
    #[error("malformed data under key '{key}': {source}")]
    MalformedStorage {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Update/Delete targeted a task that is not in the list
    #[error("no task with id {0}")]
    InvalidReference(TaskId),

    /// The storage directory was written by a newer or unknown format
    #[error("unsupported storage version '{found}' at '{location}' (this build reads version {supported})")]
    UnsupportedVersion {
        location: String,
        found: String,
        supported: u32,
    },

    #[error("invalid storage key '{0}' (must be 1-64 alphanumeric chars with _/-)")]
    InvalidKey(String),

    #[error("failed to serialize task list: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl TaskListError {
    pub(crate) fn unavailable<E>(location: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TaskListError::StorageUnavailable {
            location: location.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, TaskListError>;
