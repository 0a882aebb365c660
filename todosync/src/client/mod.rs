//! Client facade for the offline-tolerant task list.
//!
//! [`TodoClient`] owns the in-memory [`TaskRegistry`], the pending creation
//! queue and the handles to the remote store and the durable store. Every
//! user intent goes through it:
//! - loads fall back to the snapshot cache when the remote store fails
//! - creations that fail at the transport become offline tasks with a
//!   temporary id and a queued [`PendingMutation`]
//! - updates and deletes on server-known tasks surface their failures
//!
//! Replay of the queue lives in [`reconciler`].

pub mod reconciler;

use std::collections::HashSet;

use tokio::sync::mpsc;

use todosync_proto::mutation::PendingMutation;
use todosync_proto::task::{Filter, Task, TaskDraft, TaskId};

use crate::api::TaskApi;
use crate::events::ClientEvent;
use crate::registry::{NotFound, TaskRegistry};
use crate::store::{DurableStore, StoreError};
use crate::transport::{FailureKind, Transport, TransportError};

use reconciler::ReplayPolicy;

/// Message shown when neither the remote store nor the cache has data.
pub const NO_DATA_MESSAGE: &str = "Could not load tasks and no saved copy exists.";

/// Where the list came from after [`TodoClient::load_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Fetched from the remote store.
    Fresh,
    /// Read from the snapshot cache because the remote load failed.
    Cached(FailureKind),
}

impl LoadOutcome {
    /// Notice to show alongside the list, if any.
    #[must_use]
    pub const fn notice(self) -> Option<&'static str> {
        match self {
            Self::Fresh => None,
            Self::Cached(kind) => Some(kind.stale_message()),
        }
    }
}

/// Errors surfaced to the presentation layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The remote load failed and there is no cached copy.
    #[error("{}", NO_DATA_MESSAGE)]
    DataUnavailable(FailureKind),

    /// No task (or queued creation) has this id.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// An update or delete on a server-known task failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The durable store failed where the caller asked for it directly.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<NotFound> for ClientError {
    fn from(err: NotFound) -> Self {
        Self::NotFound(err.0)
    }
}

/// Single owner of the task list, the pending queue and both stores.
///
/// All mutating operations take `&mut self`; share the client across tasks
/// through one `Arc<tokio::sync::Mutex<_>>`.
pub struct TodoClient<T: Transport, S: DurableStore> {
    /// Typed access to the remote store.
    api: TaskApi<T>,
    /// Snapshot cache and queue persistence.
    store: S,
    /// Tasks in display order.
    registry: TaskRegistry,
    /// Unacknowledged creations, oldest first.
    queue: Vec<PendingMutation>,
    /// Whether `queue` has been merged with the persisted queue yet.
    queue_loaded: bool,
    /// Whether the list reflects a completed load; until then the snapshot
    /// cache is never written.
    list_loaded: bool,
    /// Automatic replay limits.
    policy: ReplayPolicy,
    /// Channel for emitting events to the presentation layer.
    event_tx: mpsc::Sender<ClientEvent>,
}

impl<T: Transport, S: DurableStore> TodoClient<T, S> {
    /// Creates a client with an empty list.
    ///
    /// Returns the client and a receiver for [`ClientEvent`]s.
    pub fn new(
        api: TaskApi<T>,
        store: S,
        policy: ReplayPolicy,
        event_buffer: usize,
    ) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (event_tx, event_rx) = mpsc::channel(event_buffer.max(1));
        let client = Self {
            api,
            store,
            registry: TaskRegistry::new(),
            queue: Vec::new(),
            queue_loaded: false,
            list_loaded: false,
            policy,
            event_tx,
        };
        (client, event_rx)
    }

    /// Returns the typed API handle.
    #[must_use]
    pub const fn api(&self) -> &TaskApi<T> {
        &self.api
    }

    /// Returns the durable store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the replay policy.
    #[must_use]
    pub const fn policy(&self) -> &ReplayPolicy {
        &self.policy
    }

    /// All tasks in display order.
    #[must_use]
    pub fn list(&self) -> &[Task] {
        self.registry.list()
    }

    /// Tasks matching `filter`, in display order.
    #[must_use]
    pub fn filtered(&self, filter: Filter) -> Vec<&Task> {
        filter.apply(self.registry.list())
    }

    /// Creations still waiting for acknowledgement.
    #[must_use]
    pub fn pending(&self) -> &[PendingMutation] {
        &self.queue
    }

    /// Looks up a task by id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] if no task has this id.
    pub fn find(&self, id: &TaskId) -> Result<&Task, ClientError> {
        Ok(self.registry.find(id)?)
    }

    /// Maps user input to the id of a listed task.
    ///
    /// Matching is on the id's text form, so `7` finds a numeric id and
    /// `temp-1700000000000` finds a temporary one.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] if no listed task matches.
    pub fn resolve(&self, input: &str) -> Result<TaskId, ClientError> {
        let input = input.trim();
        self.registry
            .list()
            .iter()
            .find(|task| task.id.to_string() == input)
            .map(|task| task.id.clone())
            .ok_or_else(|| ClientError::NotFound(TaskId::parse(input)))
    }

    /// Loads the full list, from the remote store if possible.
    ///
    /// On success the list replaces the in-memory one and is written to the
    /// snapshot cache. On failure the cache is read instead and left
    /// untouched. Either way the pending queue is reattached afterwards so
    /// every queued creation shows up as an offline task.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::DataUnavailable`] if the remote load failed and
    /// no usable cache exists.
    pub async fn load_all(&mut self) -> Result<LoadOutcome, ClientError> {
        let outcome = match self.api.list().await {
            Ok(tasks) => {
                tracing::info!(count = tasks.len(), "loaded tasks from remote store");
                self.registry.replace_all(tasks);
                self.list_loaded = true;
                self.ensure_queue().await;
                self.reattach_pending();
                self.persist_snapshot().await;
                LoadOutcome::Fresh
            }
            Err(err) => {
                let kind = err.kind();
                tracing::warn!(error = %err, ?kind, "remote load failed, trying snapshot cache");
                match self.store.load_snapshot().await {
                    Ok(tasks) => {
                        tracing::info!(count = tasks.len(), "loaded tasks from snapshot cache");
                        self.registry.replace_all(tasks);
                        self.list_loaded = true;
                        self.ensure_queue().await;
                        self.reattach_pending();
                        LoadOutcome::Cached(kind)
                    }
                    Err(StoreError::Empty) => {
                        // Nothing saved that a later write could overwrite.
                        self.list_loaded = true;
                        tracing::warn!("no snapshot cache to fall back to");
                        return Err(ClientError::DataUnavailable(kind));
                    }
                    Err(store_err) => {
                        tracing::error!(error = %store_err, "snapshot cache unreadable");
                        return Err(ClientError::DataUnavailable(kind));
                    }
                }
            }
        };

        self.emit(ClientEvent::Loaded(outcome));
        self.emit(ClientEvent::TasksChanged);
        Ok(outcome)
    }

    /// Creates a task. Never fails from the caller's point of view.
    ///
    /// If the remote store acknowledges the creation, its copy is appended.
    /// Otherwise the task is appended as an offline task under a fresh
    /// temporary id and the draft is queued for replay.
    pub async fn create(&mut self, draft: TaskDraft) -> Task {
        match self.api.create(&draft).await {
            Ok(task) => {
                tracing::info!(id = %task.id, "task created");
                self.registry.push(task.clone());
                self.persist_snapshot().await;
                self.emit(ClientEvent::TasksChanged);
                task
            }
            Err(err) => {
                self.ensure_queue().await;
                let id = TaskId::temporary();
                tracing::info!(
                    %id,
                    error = %err,
                    queue_len = self.queue.len() + 1,
                    "create failed, queued for replay"
                );
                let task = Task::offline(id.clone(), draft.clone());
                self.registry.push(task.clone());
                self.queue.push(PendingMutation::new(id, draft));
                self.persist_queue().await;
                self.persist_snapshot().await;
                self.emit(ClientEvent::TasksChanged);
                task
            }
        }
    }

    /// Replaces a task's content.
    ///
    /// A task with a temporary id exists only locally: the change is applied
    /// to the in-memory task and to its queued payload, with no remote call.
    /// Other tasks are sent to the remote store and replaced by its copy on
    /// success; on failure nothing changes locally.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] for an unknown id, or
    /// [`ClientError::Transport`] if the remote update failed.
    pub async fn update(&mut self, task: Task) -> Result<Task, ClientError> {
        let current = self.registry.find(&task.id)?;

        if task.is_temporary() {
            let updated = Task {
                offline: current.offline,
                sync_status: current.sync_status,
                retries: current.retries,
                ..task
            };
            self.ensure_queue().await;
            if let Some(entry) = self.queue.iter_mut().find(|m| m.id == updated.id) {
                entry.payload = updated.to_draft();
            }
            self.registry.replace(&updated.id, updated.clone())?;
            tracing::debug!(id = %updated.id, "updated offline task locally");
            self.persist_queue().await;
            self.persist_snapshot().await;
            self.emit(ClientEvent::TasksChanged);
            return Ok(updated);
        }

        let saved = self.api.update(&task).await.inspect_err(|err| {
            tracing::warn!(id = %task.id, error = %err, "remote update failed");
        })?;
        self.registry.replace(&task.id, saved.clone())?;
        self.persist_snapshot().await;
        self.emit(ClientEvent::TasksChanged);
        Ok(saved)
    }

    /// Flips a task's `completed` flag through [`update`](Self::update).
    ///
    /// # Errors
    ///
    /// Same as [`update`](Self::update).
    pub async fn toggle(&mut self, id: &TaskId) -> Result<Task, ClientError> {
        let toggled = self.registry.find(id)?.toggled();
        self.update(toggled).await
    }

    /// Deletes a task.
    ///
    /// A temporary task is discarded together with its queued creation and
    /// the remote store is not contacted. Other tasks are removed locally
    /// only after the remote delete succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] for an unknown id, or
    /// [`ClientError::Transport`] if the remote delete failed.
    pub async fn remove(&mut self, id: &TaskId) -> Result<(), ClientError> {
        self.registry.find(id)?;

        if id.is_temporary() {
            self.ensure_queue().await;
            self.registry.remove(id)?;
            self.queue.retain(|m| m.id != *id);
            tracing::debug!(%id, "discarded offline task and its queued creation");
            self.persist_queue().await;
            self.persist_snapshot().await;
            self.emit(ClientEvent::TasksChanged);
            return Ok(());
        }

        self.api.delete(id).await.inspect_err(|err| {
            tracing::warn!(%id, error = %err, "remote delete failed");
        })?;
        self.registry.remove(id)?;
        self.persist_snapshot().await;
        self.emit(ClientEvent::TasksChanged);
        Ok(())
    }

    /// Merges the persisted queue into the in-memory one, once.
    ///
    /// Entries created before the first load are kept after the persisted
    /// ones, so an early creation never overwrites the saved queue.
    async fn ensure_queue(&mut self) {
        if self.queue_loaded {
            return;
        }
        self.queue_loaded = true;

        match self.store.load_queue().await {
            Ok(mut persisted) => {
                let known: HashSet<TaskId> = persisted.iter().map(|m| m.id.clone()).collect();
                persisted.extend(
                    std::mem::take(&mut self.queue)
                        .into_iter()
                        .filter(|m| !known.contains(&m.id)),
                );
                self.queue = persisted;
                tracing::debug!(queue_len = self.queue.len(), "pending queue loaded");
            }
            Err(err) => {
                tracing::error!(error = %err, "pending queue unreadable, starting empty");
            }
        }
    }

    async fn persist_snapshot(&self) {
        if !self.list_loaded {
            tracing::debug!("list not loaded yet, snapshot cache left as is");
            return;
        }
        if let Err(err) = self.store.save_snapshot(self.registry.list()).await {
            tracing::warn!(error = %err, "failed to save snapshot cache");
        }
    }

    async fn persist_queue(&self) {
        if let Err(err) = self.store.save_queue(&self.queue).await {
            tracing::warn!(
                error = %err,
                queue_len = self.queue.len(),
                "failed to save pending queue"
            );
        }
    }

    fn emit(&self, event: ClientEvent) {
        if let Err(err) = self.event_tx.try_send(event) {
            tracing::trace!(error = %err, "client event dropped");
        }
    }
}
