//! Queued, not yet acknowledged task creations.

use serde::{Deserialize, Serialize};

use crate::task::{SyncStatus, Task, TaskDraft, TaskId};

/// A creation waiting to be replayed against the remote store.
///
/// `payload` is a value snapshot of the draft, so later edits to the
/// in-memory task only reach it through an explicit copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMutation {
    /// Temporary id of the task this creation belongs to.
    pub id: TaskId,
    /// Creation payload as submitted.
    pub payload: TaskDraft,
    /// Failed replay attempts, mirrored onto the task.
    #[serde(default)]
    pub retries: u32,
}

impl PendingMutation {
    /// Creates a fresh queue entry with no failed attempts.
    #[must_use]
    pub const fn new(id: TaskId, payload: TaskDraft) -> Self {
        Self {
            id,
            payload,
            retries: 0,
        }
    }

    /// Rebuilds the offline task this entry stands for.
    ///
    /// Entries that already failed at least once come back in the error
    /// state so the retry affordance stays visible.
    #[must_use]
    pub fn to_offline_task(&self) -> Task {
        let mut task = Task::offline(self.id.clone(), self.payload.clone());
        task.retries = self.retries;
        if self.retries > 0 {
            task.sync_status = Some(SyncStatus::Error);
        }
        task
    }
}
