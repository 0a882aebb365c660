//! Notifications emitted by [`TodoClient`](crate::client::TodoClient).
//!
//! Events travel over a bounded channel created with the client. Sending is
//! best effort: when the receiver lags and the buffer is full, events are
//! dropped rather than stalling the client.

use todosync_proto::task::{SyncStatus, TaskId};

use crate::client::LoadOutcome;

/// State changes a presentation adapter may want to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A full load finished.
    Loaded(LoadOutcome),
    /// The task list changed in any way.
    TasksChanged,
    /// Replay bookkeeping of one task changed.
    SyncStatusChanged {
        /// The task concerned.
        id: TaskId,
        /// New status.
        status: SyncStatus,
        /// Failed attempts so far.
        retries: u32,
    },
    /// A queued creation was acknowledged and the task re-identified.
    Promoted {
        /// Id the task carried while offline.
        temporary: TaskId,
        /// Id assigned by the remote store.
        permanent: TaskId,
    },
    /// Automatic replay stopped for this task; only a manual retry will
    /// attempt it again.
    ReplayAbandoned {
        /// The task concerned.
        id: TaskId,
    },
}
