// Tasklist - task list manager over a synchronous key-value store

pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod storage;
pub mod store;

// Re-export main types for convenience
pub use config::{Backend, Config};
pub use error::{Result, TaskListError};
pub use models::{Task, TaskDraft, TaskEntry, TaskId, TaskState};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, SqliteStorage};
pub use store::{MalformedPolicy, TASKS_KEY, TaskStore};
