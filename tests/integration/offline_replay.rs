//! Integration tests for offline creation and queue replay.
//!
//! Validates the client end to end over the in-process transport:
//! - creations made while unreachable are queued and shown as offline tasks
//! - replay promotes queued tasks in place and drains the queue
//! - repeated failures stop automatic replay; manual retry still works
//! - the queue survives a restart through the file store

use todosync::api::TaskApi;
use todosync::client::TodoClient;
use todosync::client::reconciler::{ReplayPolicy, ReplayReport};
use todosync::events::ClientEvent;
use todosync::store::DurableStore;
use todosync::store::file::FileStore;
use todosync::store::memory::MemoryStore;
use todosync::transport::TransportError;
use todosync::transport::memory::MemoryTransport;
use todosync_proto::task::{SyncStatus, TaskDraft, TaskId};
use tokio::sync::mpsc;

fn make_client<S: DurableStore>(
    transport: &MemoryTransport,
    store: S,
) -> (TodoClient<MemoryTransport, S>, mpsc::Receiver<ClientEvent>) {
    TodoClient::new(
        TaskApi::new(transport.clone()),
        store,
        ReplayPolicy::default(),
        256,
    )
}

fn drain(rx: &mut mpsc::Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn offline_creations_replay_in_order_after_reconnect() {
    let transport = MemoryTransport::new();
    let store = MemoryStore::new();
    let (mut client, mut events) = make_client(&transport, store.clone());
    client.load_all().await.unwrap();

    let online = client.create(TaskDraft::new("online")).await;
    transport.set_online(false);
    let first = client.create(TaskDraft::new("first offline")).await;
    let second = client
        .create(TaskDraft::new("second offline").with_due_date("2030-01-01"))
        .await;

    assert!(!online.is_temporary());
    assert!(first.is_temporary() && second.is_temporary());
    assert_eq!(client.pending().len(), 2);
    assert_eq!(store.queue().len(), 2);

    transport.set_online(true);
    drain(&mut events);
    let report = client.replay_pending().await;

    assert_eq!(
        report,
        ReplayReport {
            attempted: 2,
            promoted: 2,
            failed: 0,
            skipped: 0,
        }
    );
    assert!(client.pending().is_empty());
    assert!(store.queue().is_empty());

    let texts: Vec<&str> = client.list().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["online", "first offline", "second offline"]);
    assert_eq!(client.list()[2].due_date.as_deref(), Some("2030-01-01"));
    assert!(client.list().iter().all(|t| !t.offline && !t.is_temporary()));

    // Snapshot matches the promoted list.
    assert_eq!(store.snapshot().unwrap(), client.list().to_vec());

    // Remote store now has all three.
    assert_eq!(transport.records().len(), 3);

    let promoted: Vec<TaskId> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            ClientEvent::Promoted { temporary, .. } => Some(temporary),
            _ => None,
        })
        .collect();
    assert_eq!(promoted, vec![first.id, second.id]);
}

#[tokio::test]
async fn three_failed_passes_then_only_manual_retry() {
    let transport = MemoryTransport::new();
    let (mut client, _events) = make_client(&transport, MemoryStore::new());
    transport.set_online(false);
    let task = client.create(TaskDraft::new("flaky")).await;

    for pass in 1..=3u32 {
        client.replay_pending().await;
        let shown = client.find(&task.id).unwrap();
        assert_eq!(shown.retries, pass);
        assert_eq!(shown.sync_status, Some(SyncStatus::Error));
        assert_eq!(client.pending()[0].retries, pass);
    }

    let before = transport.calls();
    let report = client.replay_pending().await;
    assert_eq!(report.skipped, 1);
    assert_eq!(transport.calls(), before);

    transport.set_online(true);
    assert_eq!(client.replay_pending().await.skipped, 1);
    assert_eq!(transport.calls(), before);

    assert!(client.retry(&task.id).await.unwrap());
    assert_eq!(transport.calls(), before + 1);
    assert!(client.pending().is_empty());
    assert_eq!(client.list().len(), 1);
    assert!(!client.list()[0].is_temporary());
}

#[tokio::test]
async fn server_errors_during_replay_count_as_failures() {
    let transport = MemoryTransport::new();
    let (mut client, _events) = make_client(&transport, MemoryStore::new());
    transport.set_online(false);
    let a = client.create(TaskDraft::new("a")).await;
    let b = client.create(TaskDraft::new("b")).await;
    transport.set_online(true);
    transport.fail_next(TransportError::Rejected(503));
    transport.fail_next(TransportError::Malformed("html".to_string()));

    let report = client.replay_pending().await;
    assert_eq!(report.failed, 2);
    assert_eq!(client.find(&a.id).unwrap().retries, 1);
    assert_eq!(client.find(&b.id).unwrap().retries, 1);

    let report = client.replay_pending().await;
    assert_eq!(report.promoted, 2);
    assert!(client.pending().is_empty());
}

#[tokio::test]
async fn empty_queue_twice_changes_nothing() {
    let transport = MemoryTransport::new();
    let store = MemoryStore::new();
    let (mut client, _events) = make_client(&transport, store.clone());
    client.load_all().await.unwrap();
    let list = client.list().to_vec();
    let calls = transport.calls();
    let writes = (store.snapshot_writes(), store.queue_writes());

    assert_eq!(client.replay_pending().await, ReplayReport::default());
    assert_eq!(client.replay_pending().await, ReplayReport::default());

    assert_eq!(client.list(), list.as_slice());
    assert_eq!(transport.calls(), calls);
    assert_eq!((store.snapshot_writes(), store.queue_writes()), writes);
}

#[tokio::test]
async fn queue_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let transport = MemoryTransport::new();
    transport.seed(serde_json::json!({ "id": 1, "text": "from server" })).unwrap();

    let temp_id = {
        let (mut client, _events) = make_client(&transport, FileStore::new(dir.path()));
        client.load_all().await.unwrap();
        transport.set_online(false);
        let task = client.create(TaskDraft::new("written offline")).await;
        client.replay_pending().await;
        task.id
    };

    // Restart while still offline: cache plus reattached queue.
    let (mut client, _events) = make_client(&transport, FileStore::new(dir.path()));
    client.load_all().await.unwrap();
    let restored = client.find(&temp_id).unwrap();
    assert!(restored.offline);
    assert_eq!(restored.retries, 1);
    assert_eq!(restored.sync_status, Some(SyncStatus::Error));
    assert_eq!(client.list().len(), 2);

    // Restart online: fresh load does not know the offline task, reattach
    // brings it back, and replay promotes it.
    transport.set_online(true);
    let (mut client, _events) = make_client(&transport, FileStore::new(dir.path()));
    client.load_all().await.unwrap();
    assert!(client.find(&temp_id).unwrap().offline);
    let report = client.replay_pending().await;
    assert_eq!(report.promoted, 1);

    let texts: Vec<&str> = client.list().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["from server", "written offline"]);

    let (mut reloaded, _events) = make_client(&transport, FileStore::new(dir.path()));
    reloaded.load_all().await.unwrap();
    assert!(reloaded.pending().is_empty());
    assert_eq!(reloaded.list().len(), 2);
}

#[tokio::test]
async fn editing_queued_task_changes_what_gets_replayed() {
    let transport = MemoryTransport::new();
    let (mut client, _events) = make_client(&transport, MemoryStore::new());
    transport.set_online(false);
    let task = client.create(TaskDraft::new("typo")).await;

    let mut fixed = task.clone();
    fixed.text = "fixed".to_string();
    client.update(fixed).await.unwrap();
    let toggled = client.toggle(&task.id).await.unwrap();
    assert!(toggled.completed);
    assert!(toggled.offline);

    transport.set_online(true);
    client.replay_pending().await;

    let records = transport.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["text"], "fixed");
    assert_eq!(records[0]["completed"], true);
}

#[tokio::test]
async fn deleting_queued_task_prevents_replay() {
    let transport = MemoryTransport::new();
    let (mut client, _events) = make_client(&transport, MemoryStore::new());
    transport.set_online(false);
    let task = client.create(TaskDraft::new("never mind")).await;
    client.remove(&task.id).await.unwrap();

    transport.set_online(true);
    let calls = transport.calls();
    assert_eq!(client.replay_pending().await, ReplayReport::default());
    assert_eq!(transport.calls(), calls);
    assert!(transport.records().is_empty());
}
