//! Replay of queued creations for [`TodoClient`].
//!
//! Contains [`ReplayPolicy`] and the replay pass that resubmits every
//! queued creation once, promoting acknowledged tasks to their server ids
//! in place and counting failures on the ones that stay queued. Entries
//! that reached `max_retries` are skipped by automatic passes and only
//! attempted again through [`TodoClient::retry`].

use std::collections::HashSet;

use todosync_proto::task::{SyncStatus, TaskId};

use crate::events::ClientEvent;
use crate::store::DurableStore;
use crate::transport::Transport;

use super::{ClientError, TodoClient};

/// Limits for automatic replay.
#[derive(Debug, Clone)]
pub struct ReplayPolicy {
    /// Failed attempts after which automatic passes skip an entry.
    pub max_retries: u32,
}

impl Default for ReplayPolicy {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

/// Counts from one replay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Entries submitted to the remote store.
    pub attempted: usize,
    /// Entries acknowledged and promoted.
    pub promoted: usize,
    /// Entries whose submission failed.
    pub failed: usize,
    /// Entries left alone because they reached `max_retries`.
    pub skipped: usize,
}

impl<T: Transport, S: DurableStore> TodoClient<T, S> {
    /// Submits every queued creation once, in queue order.
    ///
    /// The set of entries is fixed when the pass starts. The queue is
    /// persisted after each attempt; the snapshot is saved once at the end
    /// if anything was attempted. An empty queue makes no calls and no
    /// writes. Failures never escape: they become retry counts on the
    /// entry and its task.
    pub async fn replay_pending(&mut self) -> ReplayReport {
        self.ensure_queue().await;
        let mut report = ReplayReport::default();
        if self.queue.is_empty() {
            return report;
        }

        let ids: Vec<TaskId> = self.queue.iter().map(|m| m.id.clone()).collect();
        tracing::info!(queue_len = ids.len(), "replaying pending creations");

        for id in ids {
            let Some(retries) = self.queue.iter().find(|m| m.id == id).map(|m| m.retries) else {
                continue;
            };
            if retries >= self.policy.max_retries {
                tracing::debug!(%id, retries, "skipping entry past retry limit");
                report.skipped += 1;
                continue;
            }

            report.attempted += 1;
            if self.replay_entry(&id).await {
                report.promoted += 1;
            } else {
                report.failed += 1;
            }
            self.persist_queue().await;
        }

        if report.attempted > 0 {
            self.persist_snapshot().await;
            self.emit(ClientEvent::TasksChanged);
        }

        tracing::info!(
            attempted = report.attempted,
            promoted = report.promoted,
            failed = report.failed,
            skipped = report.skipped,
            queue_len = self.queue.len(),
            "replay pass finished"
        );
        report
    }

    /// Makes one attempt for a single queued creation, regardless of its
    /// retry count. The count is not reset; a failure increments it.
    ///
    /// Returns `true` if the creation was acknowledged.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] if nothing with this id is queued.
    pub async fn retry(&mut self, id: &TaskId) -> Result<bool, ClientError> {
        self.ensure_queue().await;
        if !self.queue.iter().any(|m| m.id == *id) {
            return Err(ClientError::NotFound(id.clone()));
        }

        tracing::info!(%id, "manual retry");
        let promoted = self.replay_entry(id).await;
        self.persist_queue().await;
        self.persist_snapshot().await;
        self.emit(ClientEvent::TasksChanged);
        Ok(promoted)
    }

    /// Submits one queued creation and applies the outcome to the task
    /// list and the queue. Persistence is left to the caller.
    async fn replay_entry(&mut self, id: &TaskId) -> bool {
        let Some((payload, retries)) = self
            .queue
            .iter()
            .find(|m| m.id == *id)
            .map(|m| (m.payload.clone(), m.retries))
        else {
            return false;
        };

        self.set_task_sync_state(id, SyncStatus::Syncing, retries);

        match self.api.create(&payload).await {
            Ok(server_task) => {
                let permanent = server_task.id.clone();
                let synced = server_task.into_synced();
                if self.registry.replace(id, synced.clone()).is_err() {
                    tracing::warn!(%id, "promoted task was missing from the list, appending");
                    self.registry.push(synced);
                }
                self.queue.retain(|m| m.id != *id);
                tracing::info!(temporary = %id, %permanent, "queued creation acknowledged");
                self.emit(ClientEvent::Promoted {
                    temporary: id.clone(),
                    permanent,
                });
                true
            }
            Err(err) => {
                let retries = self
                    .queue
                    .iter_mut()
                    .find(|m| m.id == *id)
                    .map_or(retries + 1, |entry| {
                        entry.retries += 1;
                        entry.retries
                    });
                tracing::warn!(%id, retries, error = %err, "replay attempt failed");
                self.set_task_sync_state(id, SyncStatus::Error, retries);

                if retries >= self.policy.max_retries {
                    tracing::warn!(
                        %id,
                        retries,
                        max_retries = self.policy.max_retries,
                        "automatic replay gives up, entry stays queued for manual retry"
                    );
                    self.emit(ClientEvent::ReplayAbandoned { id: id.clone() });
                }
                false
            }
        }
    }

    fn set_task_sync_state(&mut self, id: &TaskId, status: SyncStatus, retries: u32) {
        if self.registry.set_sync_state(id, status, retries).is_err() {
            tracing::debug!(%id, %status, "queued creation has no task in the list");
            return;
        }
        self.emit(ClientEvent::SyncStatusChanged {
            id: id.clone(),
            status,
            retries,
        });
    }

    /// Restores the pairing between offline tasks and queued creations.
    ///
    /// Queued creations without a task are appended as offline tasks rebuilt
    /// from their payload. Offline tasks without a queued creation are
    /// dropped. Paired tasks get their status and retry count from the queue,
    /// which also clears a `syncing` status left by an interrupted pass.
    pub(super) fn reattach_pending(&mut self) {
        let queued: HashSet<TaskId> = self.queue.iter().map(|m| m.id.clone()).collect();

        let before = self.registry.len();
        self.registry
            .retain(|task| !task.offline || queued.contains(&task.id));
        let dropped = before - self.registry.len();

        let mut appended = 0usize;
        for entry in &self.queue {
            match self.registry.find_mut(&entry.id) {
                Ok(task) => {
                    let rebuilt = entry.to_offline_task();
                    task.offline = true;
                    task.sync_status = rebuilt.sync_status;
                    task.retries = rebuilt.retries;
                }
                Err(_) => {
                    self.registry.push(entry.to_offline_task());
                    appended += 1;
                }
            }
        }

        if dropped > 0 || appended > 0 {
            tracing::info!(dropped, appended, "reattached pending creations");
        }
    }
}
