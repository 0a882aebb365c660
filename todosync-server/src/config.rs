//! Command-line configuration for the mock backend.
//!
//! Every flag falls back to a `TODOSYNC_SERVER_*` environment variable and
//! then to a compiled default. The backend reads no config file.

use std::path::PathBuf;

use crate::server::{SeedError, ServerState};

/// Address the backend listens on when nothing else is given. Matches the
/// client's default API URL.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Flags of the `todosync-server` binary.
#[derive(clap::Parser, Debug, Clone)]
#[command(version, about = "Mock REST backend serving /todos for todosync")]
pub struct ServerArgs {
    /// Listen address; port 0 picks a free port.
    #[arg(short, long, default_value = DEFAULT_BIND_ADDR, env = "TODOSYNC_SERVER_ADDR")]
    pub bind: String,

    /// JSON file with initial records (`[...]` or `{ "todos": [...] }`).
    #[arg(long, env = "TODOSYNC_SERVER_SEED")]
    pub seed: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info", env = "TODOSYNC_SERVER_LOG")]
    pub log_level: String,
}

impl ServerArgs {
    /// Builds the collection to serve: the seed file's records, or nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError`] if the seed file is unreadable or malformed.
    pub fn initial_state(&self) -> Result<ServerState, SeedError> {
        self.seed
            .as_deref()
            .map_or_else(|| Ok(ServerState::new()), ServerState::from_seed_file)
    }
}
