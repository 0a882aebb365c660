//! Configuration for the `todosync` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/todosync/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::reconciler::ReplayPolicy;
use crate::transport::http::HttpOptions;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    api: ApiFileConfig,
    storage: StorageFileConfig,
    sync: SyncFileConfig,
}

/// `[api]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ApiFileConfig {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    connect_timeout_secs: Option<u64>,
}

/// `[storage]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    data_dir: Option<PathBuf>,
}

/// `[sync]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SyncFileConfig {
    max_retries: Option<u32>,
    probe_interval_secs: Option<u64>,
    event_buffer: Option<usize>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- API --
    /// Root URL of the REST backend.
    pub api_url: String,
    /// Total time allowed per request.
    pub request_timeout: Duration,
    /// Time allowed to establish a connection.
    pub connect_timeout: Duration,

    // -- Storage --
    /// Directory holding the snapshot cache and the pending queue.
    pub data_dir: PathBuf,

    // -- Sync --
    /// Failed attempts after which automatic replay skips an entry.
    pub max_retries: u32,
    /// Interval between health probes in `watch` mode.
    pub probe_interval: Duration,
    /// Buffer size for the client event channel.
    pub event_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".to_string(),
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            data_dir: default_data_dir(),
            max_retries: ReplayPolicy::default().max_retries,
            probe_interval: Duration::from_secs(15),
            event_buffer: 64,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed, or if the default config file exists but is invalid.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            api_url: cli
                .api_url
                .clone()
                .or_else(|| file.api.base_url.clone())
                .unwrap_or(defaults.api_url),
            request_timeout: file
                .api
                .timeout_secs
                .map_or(defaults.request_timeout, Duration::from_secs),
            connect_timeout: file
                .api
                .connect_timeout_secs
                .map_or(defaults.connect_timeout, Duration::from_secs),
            data_dir: cli
                .data_dir
                .clone()
                .or_else(|| file.storage.data_dir.clone())
                .unwrap_or(defaults.data_dir),
            max_retries: file.sync.max_retries.unwrap_or(defaults.max_retries),
            probe_interval: file
                .sync
                .probe_interval_secs
                .map_or(defaults.probe_interval, Duration::from_secs),
            event_buffer: file.sync.event_buffer.unwrap_or(defaults.event_buffer),
        }
    }

    /// Options for the HTTP transport.
    #[must_use]
    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            base_url: self.api_url.clone(),
            timeout: self.request_timeout,
            connect_timeout: self.connect_timeout,
        }
    }

    /// Replay limits for the reconciler.
    #[must_use]
    pub const fn replay_policy(&self) -> ReplayPolicy {
        ReplayPolicy {
            max_retries: self.max_retries,
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Offline-tolerant todo list client")]
pub struct CliArgs {
    /// Root URL of the REST backend.
    #[arg(long, env = "TODOSYNC_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Directory for the snapshot cache and pending queue.
    #[arg(long, env = "TODOSYNC_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Path to config file (default: `~/.config/todosync/config.toml`).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TODOSYNC_LOG", global = true)]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/todosync.log`).
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// What to do; defaults to `list`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands of the `todosync` binary.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show tasks.
    List {
        /// Which tasks to show: all, active or done.
        #[arg(long, default_value = "all")]
        filter: String,
    },
    /// Create a task.
    Add {
        /// Task text.
        text: String,
        /// Due date, e.g. `2026-05-01` or `2026-05-01T09:00`.
        #[arg(long)]
        due: Option<String>,
        /// Longer description.
        #[arg(long)]
        description: Option<String>,
        /// Checklist item; repeat for several.
        #[arg(long = "check")]
        checklist: Vec<String>,
    },
    /// Flip a task between done and not done.
    Toggle {
        /// Task id as shown by `list`.
        id: String,
    },
    /// Change a task's text, due date or description.
    Edit {
        /// Task id as shown by `list`.
        id: String,
        /// New text.
        #[arg(long)]
        text: Option<String>,
        /// New due date; an empty value clears it.
        #[arg(long)]
        due: Option<String>,
        /// New description.
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a task.
    Delete {
        /// Task id as shown by `list`.
        id: String,
    },
    /// Replay queued creations now.
    Sync,
    /// Retry one queued creation, even past the retry limit.
    Retry {
        /// Temporary task id as shown by `list`.
        id: String,
    },
    /// Show task statistics.
    Stats,
    /// Stay running, replaying queued creations whenever the backend comes back.
    Watch,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn default_data_dir() -> PathBuf {
    dirs::data_dir().map_or_else(|| PathBuf::from(".todosync"), |dir| dir.join("todosync"))
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(path) = explicit_path {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        return Ok(toml::from_str(&contents)?);
    }

    let Some(config_dir) = dirs::config_dir() else {
        return Ok(ConfigFile::default());
    };
    let path = config_dir.join("todosync").join("config.toml");

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(source) => Err(ConfigError::ReadFile { path, source }),
    }
}
