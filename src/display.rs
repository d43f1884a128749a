// Text rendering for the task list

use crate::models::{Task, TaskEntry, TaskState};
use colored::{ColoredString, Colorize};

pub const NO_SUMMARY: &str = "No summary was provided for this task";
pub const NO_TASKS: &str = "You have no tasks";

/// Summary text to show, falling back to the placeholder when empty
pub fn summary_text(task: &Task) -> &str {
    if task.summary.is_empty() { NO_SUMMARY } else { &task.summary }
}

/// Label for the button-style "show X first" sort choices
pub fn sort_label(state: TaskState) -> &'static str {
    match state {
        TaskState::Done => "'Done' first",
        TaskState::NotDone => "'Not done' first",
        TaskState::Doing => "'Doing' first",
    }
}

/// Header naming the active sort, `None` while the list is in insertion order
pub fn sort_banner(last_sort: Option<TaskState>) -> Option<String> {
    last_sort.map(|state| format!("Showing {}", sort_label(state)))
}

fn state_colored(state: TaskState) -> ColoredString {
    match state {
        TaskState::Done => state.as_str().green(),
        TaskState::NotDone => state.as_str().red(),
        TaskState::Doing => state.as_str().yellow(),
    }
}

/// Render one task as a numbered card (position is 1-based)
pub fn render_task(position: usize, task: &Task) -> String {
    let summary = if task.summary.is_empty() {
        summary_text(task).dimmed()
    } else {
        summary_text(task).normal()
    };

    format!(
        "{}. {}\n   {}\n   State: {}",
        position,
        task.title.bold(),
        summary,
        state_colored(task.state).bold()
    )
}

/// Render the whole list, or the empty-list message
pub fn render_list(entries: &[TaskEntry]) -> String {
    if entries.is_empty() {
        return NO_TASKS.dimmed().to_string();
    }

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| render_task(i + 1, &entry.task))
        .collect::<Vec<_>>()
        .join("\n\n")
}
