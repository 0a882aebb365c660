//! Integration tests for the HTTP transport.
//!
//! Validates:
//! - response classification against scripted responses (wiremock)
//! - the full client over HTTP against the real backend, including an
//!   offline session in between that queues a creation

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use todosync::api::TaskApi;
use todosync::client::reconciler::ReplayPolicy;
use todosync::client::{LoadOutcome, TodoClient};
use todosync::store::file::FileStore;
use todosync::transport::http::{HttpOptions, HttpTransport};
use todosync::transport::{FailureKind, Method, Transport, TransportError};
use todosync_proto::task::{TaskDraft, TaskId};
use todosync_server::server::{ServerState, start_server_with_state};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport_for(base_url: &str) -> HttpTransport {
    HttpTransport::new(&HttpOptions {
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(2),
        connect_timeout: Duration::from_secs(1),
    })
    .unwrap()
}

/// Address nothing listens on.
fn dead_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn server_error_status_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/todos"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = transport_for(&server.uri())
        .request(Method::Get, "/todos", None)
        .await;
    assert_eq!(result, Err(TransportError::Rejected(500)));
    assert_eq!(result.unwrap_err().kind(), FailureKind::Server);
}

#[tokio::test]
async fn html_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>login</html>", "text/html"))
        .mount(&server)
        .await;

    let result = transport_for(&server.uri())
        .request(Method::Get, "/todos", None)
        .await;
    assert!(matches!(result, Err(TransportError::Malformed(_))));
}

#[tokio::test]
async fn unparsable_json_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("[{\"id\":", "application/json"))
        .mount(&server)
        .await;

    let result = transport_for(&server.uri())
        .request(Method::Get, "/todos", None)
        .await;
    assert!(matches!(result, Err(TransportError::Malformed(_))));
}

#[tokio::test]
async fn no_content_is_null() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/todos/4"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let api = TaskApi::new(transport_for(&server.uri()));
    api.delete(&TaskId::Number(4)).await.unwrap();
}

#[tokio::test]
async fn item_ids_are_percent_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/todos/report%2F2026%3Fdraft"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let api = TaskApi::new(transport_for(&server.uri()));
    api.delete(&TaskId::Text("report/2026?draft".to_string()))
        .await
        .unwrap();
}

#[tokio::test]
async fn slow_response_is_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "ok": true }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&HttpOptions {
        base_url: server.uri(),
        timeout: Duration::from_millis(200),
        connect_timeout: Duration::from_millis(200),
    })
    .unwrap();
    let result = transport.request(Method::Get, "/health", None).await;
    assert!(matches!(result, Err(TransportError::Unreachable(_))));
}

#[tokio::test]
async fn base_path_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let api = TaskApi::new(transport_for(&format!("{}/api/v1", server.uri())));
    assert!(api.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_posts_draft_without_bookkeeping() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/todos"))
        .and(body_json(json!({
            "text": "Buy milk",
            "completed": false,
            "dueDate": "2026-05-01",
            "description": "",
            "checklist": [],
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 31,
            "text": "Buy milk",
            "completed": false,
            "dueDate": "2026-05-01",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = TaskApi::new(transport_for(&server.uri()));
    let task = api
        .create(&TaskDraft::new("Buy milk").with_due_date("2026-05-01"))
        .await
        .unwrap();
    assert_eq!(task.id, TaskId::Number(31));
    assert!(!task.offline);
}

#[tokio::test]
async fn fallback_marker_reads_as_offline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "fallback": true })))
        .mount(&server)
        .await;

    let api = TaskApi::new(transport_for(&server.uri()));
    let err = api.list().await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Offline);
}

// ---------------------------------------------------------------------------
// Full client against the real backend
// ---------------------------------------------------------------------------

#[tokio::test]
async fn offline_session_replays_against_real_backend() {
    let state = Arc::new(
        ServerState::with_records(vec![json!({ "id": 1, "text": "seeded" })]).unwrap(),
    );
    let (addr, server) = start_server_with_state("127.0.0.1:0", Arc::clone(&state))
        .await
        .unwrap();
    let live = format!("http://{addr}");
    let dir = tempfile::tempdir().unwrap();

    // Online session fills the cache.
    {
        let (mut client, _events) = TodoClient::new(
            TaskApi::new(transport_for(&live)),
            FileStore::new(dir.path()),
            ReplayPolicy::default(),
            16,
        );
        assert_eq!(client.load_all().await.unwrap(), LoadOutcome::Fresh);
        assert_eq!(client.list().len(), 1);
    }

    // Offline session: cached list, creation queued.
    let temp_id = {
        let (mut client, _events) = TodoClient::new(
            TaskApi::new(transport_for(&dead_address())),
            FileStore::new(dir.path()),
            ReplayPolicy::default(),
            16,
        );
        assert_eq!(
            client.load_all().await.unwrap(),
            LoadOutcome::Cached(FailureKind::Offline)
        );
        let task = client.create(TaskDraft::new("written offline")).await;
        assert!(task.is_temporary());
        task.id
    };
    assert_eq!(state.len().await, 1);

    // Back online: the queued creation reaches the backend.
    let (mut client, _events) = TodoClient::new(
        TaskApi::new(transport_for(&live)),
        FileStore::new(dir.path()),
        ReplayPolicy::default(),
        16,
    );
    client.load_all().await.unwrap();
    assert!(client.find(&temp_id).unwrap().offline);

    let report = client.replay_pending().await;
    assert_eq!(report.promoted, 1);
    assert!(client.pending().is_empty());
    assert!(client.find(&temp_id).is_err());
    assert_eq!(state.len().await, 2);

    // A fresh load sees the same tasks in the same order.
    let remote: Vec<TaskId> = client
        .api()
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    let shown: Vec<TaskId> = client.list().iter().map(|t| t.id.clone()).collect();
    assert_eq!(remote, shown);

    server.abort();
}

#[tokio::test]
async fn edits_and_deletes_reach_real_backend() {
    let (addr, server) = start_server_with_state("127.0.0.1:0", Arc::new(ServerState::new()))
        .await
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let (mut client, _events) = TodoClient::new(
        TaskApi::new(transport_for(&format!("http://{addr}"))),
        FileStore::new(dir.path()),
        ReplayPolicy::default(),
        16,
    );
    client.load_all().await.unwrap();

    let task = client.create(TaskDraft::new("draft")).await;
    assert!(!task.is_temporary());

    let toggled = client.toggle(&task.id).await.unwrap();
    assert!(toggled.completed);
    let remote = client.api().list().await.unwrap();
    assert!(remote[0].completed);

    client.remove(&task.id).await.unwrap();
    assert!(client.list().is_empty());
    assert!(client.api().list().await.unwrap().is_empty());

    server.abort();
}
