//! `todosync`: offline-tolerant todo list client.
//!
//! Every invocation loads the list (from the backend, else from the saved
//! snapshot), replays queued creations when the backend answered, then runs
//! one subcommand. Configuration via CLI flags, environment variables, or
//! config file (`~/.config/todosync/config.toml`).
//!
//! ```bash
//! # Start the mock backend, then use the client against it
//! cargo run --bin todosync-server
//! cargo run --bin todosync -- add "Buy milk" --due 2026-05-01
//! cargo run --bin todosync -- list --filter active
//!
//! # Keep running and replay queued creations when the backend comes back
//! cargo run --bin todosync -- watch
//! ```

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::{Mutex, mpsc};
use tracing_appender::non_blocking::WorkerGuard;

use todosync::api::TaskApi;
use todosync::client::{ClientError, LoadOutcome, TodoClient};
use todosync::config::{CliArgs, ClientConfig, Command};
use todosync::connectivity::{self, Connectivity};
use todosync::events::ClientEvent;
use todosync::stats::TaskStats;
use todosync::store::file::FileStore;
use todosync::transport::http::{HttpSetupError, HttpTransport};
use todosync_proto::task::{ChecklistItem, Filter, SyncStatus, Task, TaskDraft};

type Client = TodoClient<HttpTransport, FileStore>;

/// Errors that end a CLI invocation.
#[derive(Debug, thiserror::Error)]
enum CliError {
    /// The HTTP transport could not be set up.
    #[error(transparent)]
    Setup(#[from] HttpSetupError),

    /// A client operation failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// User input was rejected before reaching the client.
    #[error("{0}")]
    InvalidInput(String),

    /// Waiting for Ctrl-C failed.
    #[error("signal handling failed: {0}")]
    Signal(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Logs go to a file so command output stays clean.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!(
        api_url = %config.api_url,
        data_dir = %config.data_dir.display(),
        "todosync starting"
    );

    let command = cli.command.unwrap_or(Command::List {
        filter: "all".to_string(),
    });

    match run(command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("todosync.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

async fn run(command: Command, config: &ClientConfig) -> Result<(), CliError> {
    let transport = HttpTransport::new(&config.http_options())?;
    let store = FileStore::new(&config.data_dir);
    let (mut client, events) = TodoClient::new(
        TaskApi::new(transport),
        store,
        config.replay_policy(),
        config.event_buffer,
    );

    let online = match client.load_all().await {
        Ok(outcome) => {
            if let Some(notice) = outcome.notice() {
                eprintln!("{notice}");
            }
            outcome == LoadOutcome::Fresh
        }
        // Creating and watching still make sense with nothing loaded.
        Err(e @ ClientError::DataUnavailable(_)) => {
            if !matches!(command, Command::Add { .. } | Command::Watch) {
                return Err(e.into());
            }
            eprintln!("{e}");
            false
        }
        Err(e) => return Err(e.into()),
    };

    if online && command != Command::Sync {
        let report = client.replay_pending().await;
        if report.promoted > 0 {
            println!("Synced {} queued task(s).", report.promoted);
        }
    }

    match command {
        Command::List { filter } => {
            let filter = filter.parse::<Filter>().unwrap_or_default();
            print_tasks(&client.filtered(filter));
        }
        Command::Add {
            text,
            due,
            description,
            checklist,
        } => {
            let text = require_text(&text)?;
            let mut draft = TaskDraft::new(text).with_checklist(
                checklist
                    .iter()
                    .filter(|item| !item.trim().is_empty())
                    .map(|item| ChecklistItem::new(item.trim()))
                    .collect(),
            );
            if let Some(due) = due.filter(|d| !d.trim().is_empty()) {
                draft = draft.with_due_date(due.trim());
            }
            if let Some(description) = description {
                draft = draft.with_description(description);
            }

            let task = client.create(draft).await;
            if task.offline {
                println!(
                    "Saved offline as {}; it will sync when the server is reachable.",
                    task.id
                );
            } else {
                println!("Added {}.", task.id);
            }
        }
        Command::Toggle { id } => {
            let id = client.resolve(&id)?;
            let task = client.toggle(&id).await?;
            println!("{}", format_task(&task));
        }
        Command::Edit {
            id,
            text,
            due,
            description,
        } => {
            let id = client.resolve(&id)?;
            let mut task = client.find(&id)?.clone();
            if let Some(text) = text {
                task.text = require_text(&text)?.to_string();
            }
            if let Some(due) = due {
                let due = due.trim();
                task.due_date = (!due.is_empty()).then(|| due.to_string());
            }
            if let Some(description) = description {
                task.description = description;
            }
            let task = client.update(task).await?;
            println!("{}", format_task(&task));
        }
        Command::Delete { id } => {
            let id = client.resolve(&id)?;
            client.remove(&id).await?;
            println!("Deleted {id}.");
        }
        Command::Sync => {
            if !online {
                println!("Server not available; queued tasks stay queued.");
                return Ok(());
            }
            let report = client.replay_pending().await;
            println!(
                "Attempted {}, synced {}, failed {}, skipped {} (retry limit reached).",
                report.attempted, report.promoted, report.failed, report.skipped
            );
        }
        Command::Retry { id } => {
            let id = client.resolve(&id)?;
            if client.retry(&id).await? {
                println!("Synced {id}.");
            } else {
                let retries = client.find(&id).map_or(0, |t| t.retries);
                println!("Retry failed ({retries} attempts so far).");
            }
        }
        Command::Stats => print_stats(&TaskStats::from_tasks(client.list(), chrono::Utc::now())),
        Command::Watch => watch(client, events, config, online).await?,
    }

    Ok(())
}

/// Runs until Ctrl-C: probes the backend, replays queued creations on
/// reconnect and prints client events.
async fn watch(
    client: Client,
    mut events: mpsc::Receiver<ClientEvent>,
    config: &ClientConfig,
    online: bool,
) -> Result<(), CliError> {
    let api = client.api().clone();
    let client = Arc::new(Mutex::new(client));
    let connectivity = Connectivity::new(online);

    let reconnect = connectivity::spawn_reconnect_task(Arc::clone(&client), connectivity.subscribe());
    let probe = connectivity::spawn_health_probe(api, connectivity.clone(), config.probe_interval);
    let mut status = connectivity.subscribe();

    println!(
        "Watching {} ({}). Press Ctrl-C to stop.",
        config.api_url,
        if online { "online" } else { "offline" }
    );

    let result = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => break signal.map_err(CliError::from),
            Ok(()) = status.changed() => {
                let now_online = *status.borrow_and_update();
                println!("{}", if now_online { "Back online." } else { "Offline." });
            }
            Some(event) = events.recv() => print_event(&event),
        }
    };

    probe.abort();
    reconnect.abort();
    result
}

fn require_text(text: &str) -> Result<&str, CliError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CliError::InvalidInput(
            "task text must not be empty".to_string(),
        ));
    }
    Ok(text)
}

fn print_tasks(tasks: &[&Task]) {
    if tasks.is_empty() {
        println!("No tasks.");
        return;
    }
    for task in tasks {
        println!("{}", format_task(task));
    }
}

fn format_task(task: &Task) -> String {
    let mut line = format!(
        "[{}] {}  {}",
        if task.completed { "x" } else { " " },
        task.id,
        task.text
    );
    if let Some(due) = &task.due_date {
        line.push_str(&format!("  (due {due})"));
    }
    if !task.checklist.is_empty() {
        let done = task.checklist.iter().filter(|item| item.done).count();
        line.push_str(&format!("  [{done}/{}]", task.checklist.len()));
    }
    if task.offline {
        let status = task.sync_status.unwrap_or(SyncStatus::Pending);
        line.push_str(&format!("  <offline: {status}"));
        if task.retries > 0 {
            line.push_str(&format!(", {} failed", task.retries));
        }
        line.push('>');
    }
    line
}

fn print_stats(stats: &TaskStats) {
    println!("Total:          {}", stats.total);
    println!("Completed:      {}", stats.completed);
    println!("Remaining:      {}", stats.remaining);
    println!("With due date:  {}", stats.with_due_date);
    println!("Overdue:        {}", stats.overdue);
    println!("Checklists:     {}%", stats.checklist_progress);
}

fn print_event(event: &ClientEvent) {
    match event {
        ClientEvent::Promoted {
            temporary,
            permanent,
        } => println!("Synced {temporary} as {permanent}."),
        ClientEvent::SyncStatusChanged {
            id,
            status: SyncStatus::Error,
            retries,
        } => println!("Sync of {id} failed ({retries} attempts)."),
        ClientEvent::ReplayAbandoned { id } => {
            println!("Giving up on {id}; use `todosync retry {id}` to try again.");
        }
        ClientEvent::Loaded(LoadOutcome::Cached(kind)) => println!("{}", kind.stale_message()),
        _ => tracing::trace!(?event, "event not shown"),
    }
}
