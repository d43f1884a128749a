// Input handling shared by the command-line front end

use crate::models::{Task, TaskDraft, TaskId, TaskState};
use crate::storage::KeyValueStorage;
use crate::store::TaskStore;
use eyre::{Result, eyre};

/// Reject titles that are empty or only whitespace
pub fn require_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(eyre!("Title is required"));
    }
    Ok(())
}

/// Translate a 1-based list position into the task's id
pub fn id_at_position<S: KeyValueStorage>(store: &TaskStore<S>, position: usize) -> Result<TaskId> {
    position
        .checked_sub(1)
        .and_then(|index| store.id_at(index))
        .ok_or_else(|| eyre!("No task at position {} (have {})", position, store.len()))
}

/// Build the draft for an edit: fields left as `None` keep the task's current value
pub fn edit_draft(
    current: &Task,
    title: Option<String>,
    summary: Option<String>,
    state: Option<TaskState>,
) -> Result<TaskDraft> {
    let mut draft = TaskDraft::from_task(current);
    if let Some(title) = title {
        require_title(&title)?;
        draft.title = title;
    }
    if let Some(summary) = summary {
        draft.summary = summary;
    }
    if let Some(state) = state {
        draft.state = Some(state);
    }
    Ok(draft)
}
