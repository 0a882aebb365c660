//! `todosync` mock backend library.
//!
//! Exposes the REST server for use in tests and embedding. Records are kept
//! in memory and lost on shutdown.

pub mod config;
pub mod server;
