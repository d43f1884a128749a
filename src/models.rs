// Data models for the task list

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Progress of a task
///
/// Serialized with its display name (`"Not done"`), which is also the
/// persisted form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    #[serde(rename = "Done")]
    Done,
    #[default]
    #[serde(rename = "Not done")]
    NotDone,
    #[serde(rename = "Doing right now")]
    Doing,
}

impl TaskState {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Done => "Done",
            TaskState::NotDone => "Not done",
            TaskState::Doing => "Doing right now",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown task state '{0}' (expected done, not-done or doing)")]
pub struct ParseStateError(String);

impl FromStr for TaskState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "done" => Ok(TaskState::Done),
            "not done" | "notdone" | "todo" => Ok(TaskState::NotDone),
            "doing" | "doing right now" => Ok(TaskState::Doing),
            _ => Err(ParseStateError(s.to_string())),
        }
    }
}

/// One persisted task record
///
/// The on-disk shape is exactly `{"title", "summary", "state"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub state: TaskState,
}

impl Task {
    pub fn new(title: impl Into<String>, summary: impl Into<String>, state: TaskState) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            state,
        }
    }
}

/// Session-scoped identity of a task in the store
///
/// Assigned when a task enters the in-memory list and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A task paired with its session id, as held by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntry {
    pub id: TaskId,
    pub task: Task,
}

/// Field values collected by the UI for a create or an edit
///
/// `state: None` means "not chosen" and becomes `Not done` when applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub summary: String,
    pub state: Option<TaskState>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn state(mut self, state: TaskState) -> Self {
        self.state = Some(state);
        self
    }

    /// Pre-fill a draft with every field of an existing task
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            summary: task.summary.clone(),
            state: Some(task.state),
        }
    }

    pub fn into_task(self) -> Task {
        Task {
            title: self.title,
            summary: self.summary,
            state: self.state.unwrap_or_default(),
        }
    }
}
