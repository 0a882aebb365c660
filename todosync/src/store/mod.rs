//! Durable local storage for the task list and the pending creation queue.
//!
//! Defines the [`DurableStore`] trait with two independent slots, each
//! written as a whole value:
//! - the snapshot cache: the last known-good task list
//! - the pending queue: creations not yet acknowledged by the remote store
//!
//! Implementations:
//! - [`file::FileStore`]: JSON files in a data directory
//! - [`memory::MemoryStore`]: process-local slots for tests

pub mod file;
pub mod memory;

use std::path::PathBuf;

use todosync_proto::mutation::PendingMutation;
use todosync_proto::task::Task;

/// File name of the snapshot cache slot.
pub const SNAPSHOT_FILE: &str = "tasks-snapshot.json";

/// File name of the pending queue slot.
pub const QUEUE_FILE: &str = "pending-mutation-queue.json";

/// Which of the two durable slots an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The snapshot cache.
    Snapshot,
    /// The pending creation queue.
    Queue,
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Snapshot => write!(f, "snapshot"),
            Self::Queue => write!(f, "queue"),
        }
    }
}

/// Errors that can occur during durable storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The snapshot slot has never been written.
    #[error("no saved snapshot")]
    Empty,

    /// Reading or writing a slot failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        /// Path of the file involved.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A slot exists but its contents cannot be decoded.
    #[error("corrupt {slot} slot: {reason}")]
    Corrupt {
        /// Slot that failed to decode.
        slot: Slot,
        /// Decoder message.
        reason: String,
    },

    /// A write was refused (used by test stores to simulate a full disk).
    #[error("write refused: {0}")]
    Unavailable(String),
}

/// Trait for persisting the two durable slots.
pub trait DurableStore: Send + Sync {
    /// Loads the snapshot cache.
    ///
    /// Returns [`StoreError::Empty`] if it was never written.
    fn load_snapshot(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Task>, StoreError>> + Send;

    /// Overwrites the snapshot cache.
    fn save_snapshot(
        &self,
        tasks: &[Task],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Loads the pending queue; an unwritten queue is empty.
    fn load_queue(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<PendingMutation>, StoreError>> + Send;

    /// Overwrites the pending queue.
    fn save_queue(
        &self,
        queue: &[PendingMutation],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
