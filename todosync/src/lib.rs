//! `todosync`: offline-tolerant todo list client library.

pub mod api;
pub mod client;
pub mod config;
pub mod connectivity;
pub mod events;
pub mod registry;
pub mod stats;
pub mod store;
pub mod transport;
