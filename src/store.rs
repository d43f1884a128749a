// Task store: in-memory list mirrored to key-value storage

use crate::error::{Result, TaskListError};
use crate::models::{Task, TaskDraft, TaskEntry, TaskId, TaskState};
use crate::storage::KeyValueStorage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Storage key holding the JSON array of tasks
pub const TASKS_KEY: &str = "tasks";

/// What `load` does when the stored list cannot be parsed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Surface `MalformedStorage` to the caller
    #[default]
    Fail,
    /// Log a warning and start empty; stored bytes are left alone until the next write
    Empty,
}

/// Authoritative task list backed by a [`KeyValueStorage`]
///
/// Every mutation serializes the complete new list, writes it, and only then
/// replaces the in-memory list. A failed write leaves both sides unchanged.
pub struct TaskStore<S: KeyValueStorage> {
    storage: S,
    entries: Vec<TaskEntry>,
    last_sort: Option<TaskState>,
}

impl<S: KeyValueStorage> TaskStore<S> {
    /// Hydrate a store from `storage`, failing on malformed data
    pub fn load(storage: S) -> Result<Self> {
        Self::load_with_policy(storage, MalformedPolicy::Fail)
    }

    /// Hydrate a store from `storage` using an explicit malformed-data policy
    pub fn load_with_policy(storage: S, policy: MalformedPolicy) -> Result<Self> {
        let tasks = match storage.get(TASKS_KEY)? {
            None => {
                debug!("No persisted tasks, starting empty");
                Vec::new()
            }
            // A blank value counts as "nothing stored", not as malformed data
            Some(raw) if raw.trim().is_empty() => {
                debug!("Persisted tasks value is blank, starting empty");
                Vec::new()
            }
            Some(raw) => match serde_json::from_str::<Vec<Task>>(&raw) {
                Ok(tasks) => tasks,
                Err(e) => match policy {
                    MalformedPolicy::Fail => {
                        return Err(TaskListError::MalformedStorage {
                            key: TASKS_KEY.to_string(),
                            source: e,
                        });
                    }
                    MalformedPolicy::Empty => {
                        warn!(key = TASKS_KEY, error = %e, "Malformed task list, starting empty");
                        Vec::new()
                    }
                },
            },
        };

        info!(count = tasks.len(), "Loaded tasks");

        let entries = tasks
            .into_iter()
            .map(|task| TaskEntry { id: TaskId::new(), task })
            .collect();

        Ok(Self {
            storage,
            entries,
            last_sort: None,
        })
    }

    // ========================================================================
    // Read accessors
    // ========================================================================

    /// Current tasks in display order
    pub fn tasks(&self) -> &[TaskEntry] {
        &self.entries
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.task)
    }

    /// Id of the task currently shown at `position` (0-based)
    pub fn id_at(&self, position: usize) -> Option<TaskId> {
        self.entries.get(position).map(|e| e.id)
    }

    pub fn position(&self, id: TaskId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// State passed to the most recent `sort_by_state`, if any
    pub fn last_sort(&self) -> Option<TaskState> {
        self.last_sort
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Append a task built from `draft`
    pub fn create(&mut self, draft: TaskDraft) -> Result<TaskId> {
        let id = TaskId::new();
        let mut next = self.entries.clone();
        next.push(TaskEntry {
            id,
            task: draft.into_task(),
        });

        self.commit(next)?;
        debug!(%id, "Created task");
        Ok(id)
    }

    /// Replace every field of the task `id` with the draft's values
    pub fn update(&mut self, id: TaskId, draft: TaskDraft) -> Result<()> {
        let position = self.position(id).ok_or(TaskListError::InvalidReference(id))?;

        let mut next = self.entries.clone();
        next[position].task = draft.into_task();

        self.commit(next)?;
        debug!(%id, position, "Updated task");
        Ok(())
    }

    /// Remove the task `id`, returning it
    pub fn delete(&mut self, id: TaskId) -> Result<Task> {
        let position = self.position(id).ok_or(TaskListError::InvalidReference(id))?;

        let mut next = self.entries.clone();
        let removed = next.remove(position);

        self.commit(next)?;
        debug!(%id, position, "Deleted task");
        Ok(removed.task)
    }

    /// Move tasks in `target` state ahead of the rest, keeping relative order
    pub fn sort_by_state(&mut self, target: TaskState) -> Result<()> {
        let mut next = self.entries.clone();
        // `sort_by_key` is stable and `false < true`
        next.sort_by_key(|e| e.task.state != target);

        self.commit(next)?;
        self.last_sort = Some(target);
        debug!(state = %target, "Sorted tasks by state");
        Ok(())
    }

    /// Persist `next` in full, then adopt it as the in-memory list
    fn commit(&mut self, next: Vec<TaskEntry>) -> Result<()> {
        let tasks: Vec<&Task> = next.iter().map(|e| &e.task).collect();
        let json = serde_json::to_string(&tasks).map_err(TaskListError::Serialize)?;

        self.storage.set(TASKS_KEY, &json)?;
        self.entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage, SqliteStorage};
    use tempfile::TempDir;

    /// Storage whose writes can be switched off, as when quota is exhausted
    #[derive(Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        fail_writes: bool,
    }

    impl KeyValueStorage for FlakyStorage {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            if self.fail_writes {
                return Err(TaskListError::unavailable(
                    key,
                    std::io::Error::other("quota exceeded"),
                ));
            }
            self.inner.set(key, value)
        }
    }

    struct UnreadableStorage;

    impl KeyValueStorage for UnreadableStorage {
        fn get(&self, key: &str) -> Result<Option<String>> {
            Err(TaskListError::unavailable(
                key,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "storage disabled"),
            ))
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            unreachable!("nothing is written before load succeeds")
        }
    }

    fn task(title: &str, state: TaskState) -> TaskDraft {
        TaskDraft::new(title).state(state)
    }

    fn titles<S: KeyValueStorage>(store: &TaskStore<S>) -> Vec<String> {
        store.tasks().iter().map(|e| e.task.title.clone()).collect()
    }

    fn plain_tasks<S: KeyValueStorage>(store: &TaskStore<S>) -> Vec<Task> {
        store.tasks().iter().map(|e| e.task.clone()).collect()
    }

    /// Reload the persisted list and compare with memory
    fn assert_persisted_matches<S: KeyValueStorage>(store: &TaskStore<S>) {
        let raw = store.storage().get(TASKS_KEY).unwrap().unwrap();
        let persisted: Vec<Task> = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted, plain_tasks(store));
    }

    fn store_with(drafts: Vec<TaskDraft>) -> TaskStore<MemoryStorage> {
        let mut store = TaskStore::load(MemoryStorage::new()).unwrap();
        for draft in drafts {
            store.create(draft).unwrap();
        }
        store
    }

    #[test]
    fn test_load_empty_storage() {
        let store = TaskStore::load(MemoryStorage::new()).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert_eq!(store.last_sort(), None);
    }

    #[test]
    fn test_load_existing_tasks() {
        let mut storage = MemoryStorage::new();
        storage
            .set(
                TASKS_KEY,
                r#"[{"title":"A","summary":"x","state":"Done"},{"title":"B","summary":"","state":"Doing right now"}]"#,
            )
            .unwrap();

        let store = TaskStore::load(storage).unwrap();
        assert_eq!(
            plain_tasks(&store),
            vec![
                Task::new("A", "x", TaskState::Done),
                Task::new("B", "", TaskState::Doing)
            ]
        );
        assert_ne!(store.tasks()[0].id, store.tasks()[1].id);
    }

    #[test]
    fn test_load_empty_string_is_empty_list() {
        let mut storage = MemoryStorage::new();
        storage.set(TASKS_KEY, "").unwrap();
        let store = TaskStore::load(storage).unwrap();
        assert!(store.is_empty());

        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("tasks.json"), "").unwrap();
        let mut store = TaskStore::load(FileStorage::open(temp.path()).unwrap()).unwrap();
        assert!(store.is_empty());

        // First write replaces the blank file with a real list
        store.create(TaskDraft::new("A")).unwrap();
        assert_persisted_matches(&store);
    }

    #[test]
    fn test_load_whitespace_value_is_empty_list() {
        let mut storage = MemoryStorage::new();
        storage.set(TASKS_KEY, "  \n").unwrap();

        let store = TaskStore::load(storage).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_malformed_fails_by_default() {
        let mut storage = MemoryStorage::new();
        storage.set(TASKS_KEY, "{not json").unwrap();

        let err = TaskStore::load(storage).err().unwrap();
        assert!(matches!(err, TaskListError::MalformedStorage { .. }));
    }

    #[test]
    fn test_load_unknown_state_is_malformed() {
        let mut storage = MemoryStorage::new();
        storage
            .set(TASKS_KEY, r#"[{"title":"A","summary":"","state":"Blocked"}]"#)
            .unwrap();

        let err = TaskStore::load(storage).err().unwrap();
        assert!(matches!(err, TaskListError::MalformedStorage { .. }));
    }

    #[test]
    fn test_load_malformed_with_empty_policy_keeps_bytes() {
        let mut storage = MemoryStorage::new();
        storage.set(TASKS_KEY, "{not json").unwrap();

        let store = TaskStore::load_with_policy(storage, MalformedPolicy::Empty).unwrap();
        assert!(store.is_empty());
        assert_eq!(
            store.storage().get(TASKS_KEY).unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[test]
    fn test_load_storage_unavailable() {
        let err = TaskStore::load(UnreadableStorage).err().unwrap();
        assert!(matches!(err, TaskListError::StorageUnavailable { .. }));
    }

    #[test]
    fn test_create_buy_milk_persisted_form() {
        let mut store = TaskStore::load(MemoryStorage::new()).unwrap();
        store
            .create(TaskDraft::new("Buy milk").summary("").state(TaskState::NotDone))
            .unwrap();

        assert_eq!(plain_tasks(&store), vec![Task::new("Buy milk", "", TaskState::NotDone)]);
        assert_eq!(
            store.storage().get(TASKS_KEY).unwrap().as_deref(),
            Some(r#"[{"title":"Buy milk","summary":"","state":"Not done"}]"#)
        );
    }

    #[test]
    fn test_create_appends_with_default_state() {
        let mut store = store_with(vec![task("A", TaskState::Done)]);
        let before = store.len();

        let id = store.create(TaskDraft::new("B").summary("later")).unwrap();

        assert_eq!(store.len(), before + 1);
        assert_eq!(store.position(id), Some(before));
        assert_eq!(store.get(id), Some(&Task::new("B", "later", TaskState::NotDone)));
        assert_persisted_matches(&store);
    }

    #[test]
    fn test_create_does_not_validate_title() {
        let mut store = TaskStore::load(MemoryStorage::new()).unwrap();
        let id = store.create(TaskDraft::new("")).unwrap();
        assert_eq!(store.get(id).unwrap().title, "");
    }

    #[test]
    fn test_update_overwrites_all_fields() {
        let mut store = store_with(vec![TaskDraft::new("A").summary("keep me").state(TaskState::Doing)]);
        let id = store.id_at(0).unwrap();

        // Caller supplies only a title: summary and state are overwritten too
        store.update(id, TaskDraft::new("A2")).unwrap();

        assert_eq!(store.get(id), Some(&Task::new("A2", "", TaskState::NotDone)));
        assert_persisted_matches(&store);
    }

    #[test]
    fn test_update_with_prefilled_draft_keeps_prior_values() {
        let mut store = store_with(vec![TaskDraft::new("A").summary("keep me").state(TaskState::Doing)]);
        let id = store.id_at(0).unwrap();

        let mut draft = TaskDraft::from_task(store.get(id).unwrap());
        draft.title = "A2".to_string();
        store.update(id, draft).unwrap();

        assert_eq!(store.get(id), Some(&Task::new("A2", "keep me", TaskState::Doing)));
    }

    #[test]
    fn test_update_targets_one_of_duplicates() {
        let mut store = store_with(vec![task("Same", TaskState::NotDone), task("Same", TaskState::NotDone)]);
        let second = store.id_at(1).unwrap();

        store.update(second, task("Changed", TaskState::Done)).unwrap();

        assert_eq!(titles(&store), vec!["Same", "Changed"]);
    }

    #[test]
    fn test_update_unknown_id_leaves_list_unchanged() {
        let mut store = store_with(vec![task("A", TaskState::Done)]);
        let before = plain_tasks(&store);

        let err = store.update(TaskId::new(), TaskDraft::new("X")).unwrap_err();

        assert!(matches!(err, TaskListError::InvalidReference(_)));
        assert_eq!(plain_tasks(&store), before);
        assert_persisted_matches(&store);
    }

    #[test]
    fn test_delete_middle_preserves_order() {
        let mut store = store_with(vec![
            task("A", TaskState::Done),
            task("B", TaskState::NotDone),
            task("C", TaskState::Doing),
        ]);
        let id = store.id_at(1).unwrap();

        let removed = store.delete(id).unwrap();

        assert_eq!(removed.title, "B");
        assert_eq!(titles(&store), vec!["A", "C"]);
        assert_eq!(store.get(id), None);
        assert_persisted_matches(&store);
    }

    #[test]
    fn test_delete_after_delete_is_invalid_reference() {
        let mut store = store_with(vec![task("A", TaskState::Done), task("B", TaskState::Done)]);
        let id = store.id_at(0).unwrap();
        store.delete(id).unwrap();

        let err = store.delete(id).unwrap_err();

        assert!(matches!(err, TaskListError::InvalidReference(got) if got == id));
        assert_eq!(titles(&store), vec!["B"]);
    }

    #[test]
    fn test_sort_by_state_stable_partition() {
        let mut store = store_with(vec![
            task("A", TaskState::Done),
            task("B", TaskState::NotDone),
            task("C", TaskState::Done),
        ]);

        store.sort_by_state(TaskState::Done).unwrap();

        assert_eq!(titles(&store), vec!["A", "C", "B"]);
        assert_eq!(store.last_sort(), Some(TaskState::Done));
        assert_persisted_matches(&store);
    }

    #[test]
    fn test_sort_by_state_keeps_order_within_rest() {
        let mut store = store_with(vec![
            task("A", TaskState::Done),
            task("B", TaskState::Doing),
            task("C", TaskState::NotDone),
            task("D", TaskState::Doing),
            task("E", TaskState::Done),
        ]);

        store.sort_by_state(TaskState::Doing).unwrap();

        assert_eq!(titles(&store), vec!["B", "D", "A", "C", "E"]);
    }

    #[test]
    fn test_sort_keeps_ids_attached() {
        let mut store = store_with(vec![task("A", TaskState::NotDone), task("B", TaskState::Done)]);
        let b = store.id_at(1).unwrap();

        store.sort_by_state(TaskState::Done).unwrap();

        assert_eq!(store.position(b), Some(0));
        assert_eq!(store.get(b).unwrap().title, "B");
    }

    #[test]
    fn test_create_after_sort_appends() {
        let mut store = store_with(vec![task("A", TaskState::NotDone), task("B", TaskState::Done)]);
        store.sort_by_state(TaskState::Done).unwrap();

        store.create(task("C", TaskState::Done)).unwrap();

        assert_eq!(titles(&store), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_failed_write_leaves_state_unchanged() {
        let mut store = TaskStore::load(FlakyStorage::default()).unwrap();
        store.create(task("A", TaskState::NotDone)).unwrap();
        store.create(task("B", TaskState::Done)).unwrap();
        let a = store.id_at(0).unwrap();
        let before = plain_tasks(&store);

        store.storage.fail_writes = true;

        assert!(matches!(
            store.create(TaskDraft::new("C")),
            Err(TaskListError::StorageUnavailable { .. })
        ));
        assert!(store.update(a, TaskDraft::new("A2")).is_err());
        assert!(store.delete(a).is_err());
        assert!(store.sort_by_state(TaskState::Done).is_err());

        assert_eq!(plain_tasks(&store), before);
        assert_eq!(store.last_sort(), None);
        assert_persisted_matches(&store);
    }

    #[test]
    fn test_reload_matches_after_every_operation() {
        let mut store = TaskStore::load(MemoryStorage::new()).unwrap();

        store.create(task("A", TaskState::Done)).unwrap();
        assert_persisted_matches(&store);
        store.create(task("B", TaskState::NotDone)).unwrap();
        assert_persisted_matches(&store);
        store.create(task("C", TaskState::Done)).unwrap();
        assert_persisted_matches(&store);

        let b = store.id_at(1).unwrap();
        store.update(b, task("B2", TaskState::Doing)).unwrap();
        assert_persisted_matches(&store);

        store.sort_by_state(TaskState::Doing).unwrap();
        assert_persisted_matches(&store);

        let c = store.id_at(2).unwrap();
        store.delete(c).unwrap();
        assert_persisted_matches(&store);

        let expected = plain_tasks(&store);
        let reloaded = TaskStore::load(store.into_storage()).unwrap();
        assert_eq!(plain_tasks(&reloaded), expected);
    }

    #[test]
    fn test_file_backend_survives_reopen() {
        let temp = TempDir::new().unwrap();

        {
            let mut store = TaskStore::load(FileStorage::open(temp.path()).unwrap()).unwrap();
            store.create(task("A", TaskState::Done)).unwrap();
            store.create(task("B", TaskState::NotDone)).unwrap();
            store.sort_by_state(TaskState::NotDone).unwrap();
        }

        let store = TaskStore::load(FileStorage::open(temp.path()).unwrap()).unwrap();
        assert_eq!(titles(&store), vec!["B", "A"]);
    }

    #[test]
    fn test_sqlite_backend_survives_reopen() {
        let temp = TempDir::new().unwrap();

        {
            let mut store = TaskStore::load(SqliteStorage::open(temp.path()).unwrap()).unwrap();
            store.create(task("A", TaskState::Done)).unwrap();
            let a = store.id_at(0).unwrap();
            store.update(a, task("A2", TaskState::Doing)).unwrap();
        }

        let store = TaskStore::load(SqliteStorage::open(temp.path()).unwrap()).unwrap();
        assert_eq!(plain_tasks(&store), vec![Task::new("A2", "", TaskState::Doing)]);
    }
}
