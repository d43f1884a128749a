//! Demo 01: Basic Usage
//!
//! Creates, edits, sorts, and deletes tasks against a file-backed store,
//! then reopens the store to show the list survived.
//!
//! Run with: cargo run --example 01_basic_usage

use eyre::Result;
use tasklist::display;
use tasklist::{FileStorage, TaskDraft, TaskState, TaskStore};

fn main() -> Result<()> {
    // Create a temporary directory for this demo
    let temp_dir = tempfile::tempdir()?;
    let store_path = temp_dir.path().to_path_buf();

    println!("Tasklist Basic Usage Demo");
    println!("=========================\n");
    println!("Store path: {}\n", store_path.display());

    let mut store = TaskStore::load(FileStorage::open(&store_path)?)?;
    println!("{}\n", display::render_list(store.tasks()));

    println!("1. CREATE - Adding three tasks...");
    store.create(TaskDraft::new("Buy milk"))?;
    let report = store.create(
        TaskDraft::new("Write report")
            .summary("Quarterly numbers")
            .state(TaskState::Doing),
    )?;
    store.create(TaskDraft::new("Book flights").state(TaskState::Done))?;
    println!("{}\n", display::render_list(store.tasks()));

    println!("2. UPDATE - Marking the report done...");
    if let Some(task) = store.get(report) {
        let mut draft = TaskDraft::from_task(task);
        draft.state = Some(TaskState::Done);
        store.update(report, draft)?;
    }
    println!("{}\n", display::render_list(store.tasks()));

    println!("3. SORT - Moving finished tasks up...");
    store.sort_by_state(TaskState::Done)?;
    if let Some(banner) = display::sort_banner(store.last_sort()) {
        println!("   {}", banner);
    }
    println!("{}\n", display::render_list(store.tasks()));

    println!("4. DELETE - Removing the first task...");
    if let Some(id) = store.id_at(0) {
        let removed = store.delete(id)?;
        println!("   Removed: {}\n", removed.title);
    }

    println!("5. RELOAD - Reopening the store...");
    drop(store);
    let store = TaskStore::load(FileStorage::open(&store_path)?)?;
    println!("{}\n", display::render_list(store.tasks()));

    println!("Demo complete!");
    Ok(())
}
