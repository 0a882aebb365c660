//! Online/offline signal and the background tasks that react to it.
//!
//! [`Connectivity`] publishes the current state over a
//! [`tokio::sync::watch`] channel. [`spawn_reconnect_task`] runs a replay
//! pass on every offline → online transition, and [`spawn_health_probe`]
//! feeds the signal from periodic `GET /health` calls.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::api::TaskApi;
use crate::client::TodoClient;
use crate::store::DurableStore;
use crate::transport::{Transport, TransportError};

/// Shared online/offline flag.
#[derive(Debug, Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    /// Creates the signal with an initial state.
    #[must_use]
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    /// Publishes a new state. Returns `true` if it differs from the old one.
    pub fn set_online(&self, online: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        })
    }

    /// Current state.
    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// New receiver positioned at the current state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Spawns a task that runs one replay pass per offline → online transition.
///
/// A pass holds the client lock until it finishes, so a transition that
/// arrives meanwhile queues behind it and the next pass sees whatever is
/// still queued. The task ends when every sender of `rx` is dropped.
pub fn spawn_reconnect_task<T, S>(
    client: Arc<Mutex<TodoClient<T, S>>>,
    mut rx: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    T: Transport + 'static,
    S: DurableStore + 'static,
{
    tokio::spawn(async move {
        let mut was_online = *rx.borrow_and_update();
        while rx.changed().await.is_ok() {
            let online = *rx.borrow_and_update();
            if online && !was_online {
                tracing::info!("connectivity restored, replaying pending creations");
                let report = client.lock().await.replay_pending().await;
                tracing::debug!(
                    attempted = report.attempted,
                    promoted = report.promoted,
                    "reconnect replay done"
                );
            }
            was_online = online;
        }
        tracing::debug!("connectivity signal closed, reconnect task exiting");
    })
}

/// Spawns a task that probes `GET /health` every `interval` and publishes
/// the result.
///
/// Only an unreachable store counts as offline; an error status still
/// proves the network path works.
pub fn spawn_health_probe<T>(
    api: TaskApi<T>,
    connectivity: Connectivity,
    interval: Duration,
) -> JoinHandle<()>
where
    T: Transport + 'static,
{
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            let online = !matches!(api.health().await, Err(TransportError::Unreachable(_)));
            if connectivity.set_online(online) {
                tracing::info!(online, "connectivity changed");
            }
        }
    })
}
