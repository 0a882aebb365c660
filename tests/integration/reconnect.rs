//! Integration tests for reconnect-driven replay.
//!
//! Validates:
//! - an offline → online transition triggers exactly one replay pass
//! - the health probe drives the transition on its own
//! - transitions that stay online or go offline trigger nothing

use std::sync::Arc;
use std::time::Duration;

use todosync::api::TaskApi;
use todosync::client::TodoClient;
use todosync::client::reconciler::ReplayPolicy;
use todosync::connectivity::{Connectivity, spawn_health_probe, spawn_reconnect_task};
use todosync::store::memory::MemoryStore;
use todosync::transport::memory::MemoryTransport;
use todosync_proto::task::TaskDraft;
use tokio::sync::Mutex;

type SharedClient = Arc<Mutex<TodoClient<MemoryTransport, MemoryStore>>>;

async fn offline_client_with_queue(transport: &MemoryTransport, count: usize) -> SharedClient {
    let (mut client, _events) = TodoClient::new(
        TaskApi::new(transport.clone()),
        MemoryStore::new(),
        ReplayPolicy::default(),
        64,
    );
    transport.set_online(false);
    for i in 0..count {
        client.create(TaskDraft::new(format!("queued {i}"))).await;
    }
    Arc::new(Mutex::new(client))
}

/// Polls until the client's queue is empty or the deadline passes.
async fn wait_for_drain(client: &SharedClient) -> bool {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if client.lock().await.pending().is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .is_ok()
}

#[tokio::test]
async fn coming_online_replays_queue() {
    let transport = MemoryTransport::new();
    let client = offline_client_with_queue(&transport, 2).await;
    let connectivity = Connectivity::new(false);
    let handle = spawn_reconnect_task(Arc::clone(&client), connectivity.subscribe());

    transport.set_online(true);
    connectivity.set_online(true);

    assert!(wait_for_drain(&client).await);
    assert_eq!(transport.records().len(), 2);
    assert!(client.lock().await.list().iter().all(|t| !t.offline));

    handle.abort();
}

#[tokio::test]
async fn going_offline_does_not_replay() {
    let transport = MemoryTransport::new();
    let client = offline_client_with_queue(&transport, 1).await;
    let connectivity = Connectivity::new(true);
    let handle = spawn_reconnect_task(Arc::clone(&client), connectivity.subscribe());
    let calls = transport.calls();

    connectivity.set_online(false);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(transport.calls(), calls);
    assert_eq!(client.lock().await.pending().len(), 1);

    handle.abort();
}

#[tokio::test]
async fn reconnect_task_ends_with_signal() {
    let transport = MemoryTransport::new();
    let client = offline_client_with_queue(&transport, 0).await;
    let connectivity = Connectivity::new(false);
    let handle = spawn_reconnect_task(client, connectivity.subscribe());

    drop(connectivity);

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("reconnect task should exit")
        .unwrap();
}

#[tokio::test]
async fn health_probe_triggers_replay() {
    let transport = MemoryTransport::new();
    let client = offline_client_with_queue(&transport, 3).await;
    let connectivity = Connectivity::new(false);
    let reconnect = spawn_reconnect_task(Arc::clone(&client), connectivity.subscribe());
    let api = client.lock().await.api().clone();
    let probe = spawn_health_probe(api, connectivity.clone(), Duration::from_millis(20));

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(!connectivity.is_online());
    assert_eq!(client.lock().await.pending().len(), 3);

    transport.set_online(true);

    assert!(wait_for_drain(&client).await);
    assert!(connectivity.is_online());
    let texts: Vec<String> = client
        .lock()
        .await
        .list()
        .iter()
        .map(|t| t.text.clone())
        .collect();
    assert_eq!(texts, vec!["queued 0", "queued 1", "queued 2"]);

    probe.abort();
    reconnect.abort();
}
