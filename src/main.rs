use clap::{Parser, Subcommand};
use eyre::{Context, Result, eyre};
use std::path::PathBuf;
use tasklist::cli::{edit_draft, id_at_position, require_title};
use tasklist::display;
use tasklist::{Backend, Config, TaskDraft, TaskState, TaskStore};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "tasklist")]
#[command(about = "Tasklist CLI - create, edit, delete and sort your tasks")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to the config file (default: <config dir>/tasklist/config.yml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the task storage (overrides the config file)
    #[arg(short = 'p', long, global = true)]
    store_path: Option<PathBuf>,

    /// Storage backend (overrides the config file)
    #[arg(long, value_enum, global = true)]
    backend: Option<Backend>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show all tasks (default)
    List,

    /// Create a new task at the end of the list
    Add {
        title: String,

        #[arg(short, long, default_value = "")]
        summary: String,

        /// done, not-done or doing (default: not-done)
        #[arg(long)]
        state: Option<TaskState>,
    },

    /// Edit the task at a position; omitted fields keep their current value
    Edit {
        /// 1-based position as shown by `list`
        position: usize,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        summary: Option<String>,

        #[arg(long)]
        state: Option<TaskState>,
    },

    /// Delete the task at a position
    Delete {
        /// 1-based position as shown by `list`
        position: usize,
    },

    /// Show tasks in the given state first
    Sort { state: TaskState },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(store_path) = cli.store_path {
        config.store_path = store_path;
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    // Setup tracing
    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        config
            .log_level
            .parse::<LevelFilter>()
            .with_context(|| format!("Invalid log_level '{}'", config.log_level))?
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let storage = config.open_storage().context("Failed to open task storage")?;
    let mut store =
        TaskStore::load_with_policy(storage, config.on_malformed).context("Failed to load tasks")?;

    match cli.command.unwrap_or(Commands::List) {
        Commands::List => {
            println!("{}", display::render_list(store.tasks()));
        }
        Commands::Add { title, summary, state } => {
            require_title(&title)?;
            let mut draft = TaskDraft::new(title).summary(summary);
            draft.state = state;
            store.create(draft)?;
            println!("Created task {}", store.len());
        }
        Commands::Edit {
            position,
            title,
            summary,
            state,
        } => {
            let id = id_at_position(&store, position)?;
            let current = store.get(id).ok_or_else(|| eyre!("No task at position {}", position))?;
            let draft = edit_draft(current, title, summary, state)?;

            store.update(id, draft)?;
            println!("Updated task {}", position);
        }
        Commands::Delete { position } => {
            let id = id_at_position(&store, position)?;
            let removed = store.delete(id)?;
            println!("Deleted task {}: {}", position, removed.title);
        }
        Commands::Sort { state } => {
            store.sort_by_state(state)?;
            if let Some(banner) = display::sort_banner(store.last_sort()) {
                println!("{}\n", banner);
            }
            println!("{}", display::render_list(store.tasks()));
        }
    }

    Ok(())
}
