//! In-memory [`DurableStore`] for tests.
//!
//! Clones share the same slots, so a test can hand one handle to the client
//! and inspect writes through another.

use std::sync::Arc;

use parking_lot::Mutex;
use todosync_proto::mutation::PendingMutation;
use todosync_proto::task::Task;

use super::{DurableStore, StoreError};

#[derive(Debug, Default)]
struct Slots {
    snapshot: Option<Vec<Task>>,
    queue: Option<Vec<PendingMutation>>,
    snapshot_writes: usize,
    queue_writes: usize,
    fail_writes: bool,
}

/// Process-local store with write counters.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Arc<Mutex<Slots>>,
}

impl MemoryStore {
    /// Creates a store with both slots unwritten.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose snapshot slot already holds `tasks`.
    #[must_use]
    pub fn with_snapshot(tasks: Vec<Task>) -> Self {
        let store = Self::new();
        store.slots.lock().snapshot = Some(tasks);
        store
    }

    /// Pre-fills the queue slot without counting a write.
    pub fn preload_queue(&self, queue: Vec<PendingMutation>) {
        self.slots.lock().queue = Some(queue);
    }

    /// Makes every subsequent save fail with [`StoreError::Unavailable`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.slots.lock().fail_writes = fail;
    }

    /// Current snapshot slot contents.
    #[must_use]
    pub fn snapshot(&self) -> Option<Vec<Task>> {
        self.slots.lock().snapshot.clone()
    }

    /// Current queue slot contents, empty if never written.
    #[must_use]
    pub fn queue(&self) -> Vec<PendingMutation> {
        self.slots.lock().queue.clone().unwrap_or_default()
    }

    /// Number of successful snapshot saves.
    #[must_use]
    pub fn snapshot_writes(&self) -> usize {
        self.slots.lock().snapshot_writes
    }

    /// Number of successful queue saves.
    #[must_use]
    pub fn queue_writes(&self) -> usize {
        self.slots.lock().queue_writes
    }
}

impl DurableStore for MemoryStore {
    async fn load_snapshot(&self) -> Result<Vec<Task>, StoreError> {
        self.slots.lock().snapshot.clone().ok_or(StoreError::Empty)
    }

    async fn save_snapshot(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let mut slots = self.slots.lock();
        if slots.fail_writes {
            return Err(StoreError::Unavailable("snapshot write refused".to_string()));
        }
        slots.snapshot = Some(tasks.to_vec());
        slots.snapshot_writes += 1;
        Ok(())
    }

    async fn load_queue(&self) -> Result<Vec<PendingMutation>, StoreError> {
        Ok(self.queue())
    }

    async fn save_queue(&self, queue: &[PendingMutation]) -> Result<(), StoreError> {
        let mut slots = self.slots.lock();
        if slots.fail_writes {
            return Err(StoreError::Unavailable("queue write refused".to_string()));
        }
        slots.queue = Some(queue.to_vec());
        slots.queue_writes += 1;
        Ok(())
    }
}
