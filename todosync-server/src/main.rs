//! `todosync-server` -- in-memory REST backend for the `todosync` client.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 127.0.0.1:3000
//! cargo run --bin todosync-server
//!
//! # Custom address and initial records
//! cargo run --bin todosync-server -- --bind 0.0.0.0:8080 --seed db.json
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use todosync_server::config::ServerArgs;
use todosync_server::server;

#[tokio::main]
async fn main() -> ExitCode {
    let args = ServerArgs::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let state = match args.initial_state() {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "failed to load seed file");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        addr = %args.bind,
        records = state.len().await,
        "starting todosync server"
    );

    match server::start_server_with_state(&args.bind, Arc::new(state)).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "todosync server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "todosync server task failed");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start todosync server");
            ExitCode::FAILURE
        }
    }
}
