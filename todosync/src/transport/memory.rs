//! In-process transport for tests and demos.
//!
//! Serves the `/todos` and `/health` routes from a [`TodoCollection`] held
//! behind a lock. The transport can be switched offline, and individual
//! responses can be scripted ahead of time to simulate server errors or
//! malformed payloads. Cloning yields another handle onto the same backend,
//! so a test can keep inspecting it after handing a clone to the client.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};
use todosync_proto::collection::{CollectionError, TodoCollection};

use super::{Method, Transport, TransportError};

/// A request as seen by the memory backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// HTTP verb.
    pub method: Method,
    /// Request path.
    pub path: String,
}

#[derive(Debug)]
struct Backend {
    collection: TodoCollection,
    online: bool,
    scripted: VecDeque<Result<Value, TransportError>>,
    requests: Vec<RecordedRequest>,
}

/// [`Transport`] backed by an in-memory collection.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    backend: Arc<Mutex<Backend>>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    /// Creates an online transport over an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            backend: Arc::new(Mutex::new(Backend {
                collection: TodoCollection::new(),
                online: true,
                scripted: VecDeque::new(),
                requests: Vec::new(),
            })),
        }
    }

    /// Stores a record directly, bypassing the request log.
    ///
    /// Returns the stored record including its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::InvalidBody`] if `record` is not an object.
    pub fn seed(&self, record: Value) -> Result<Value, CollectionError> {
        self.backend.lock().collection.create(record)
    }

    /// Switches between answering requests and failing them as unreachable.
    pub fn set_online(&self, online: bool) {
        self.backend.lock().online = online;
    }

    /// Returns whether the backend currently answers requests.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.backend.lock().online
    }

    /// Scripts the outcome of the next request that reaches an online backend.
    ///
    /// Scripted outcomes are consumed in order and take precedence over the
    /// collection.
    pub fn enqueue_outcome(&self, outcome: Result<Value, TransportError>) {
        self.backend.lock().scripted.push_back(outcome);
    }

    /// Scripts a failure for the next online request.
    pub fn fail_next(&self, error: TransportError) {
        self.enqueue_outcome(Err(error));
    }

    /// Number of requests received, including those failed while offline.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.backend.lock().requests.len()
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.backend.lock().requests.clone()
    }

    /// Returns the records currently held by the backend.
    #[must_use]
    pub fn records(&self) -> Vec<Value> {
        self.backend.lock().collection.list()
    }
}

impl Transport for MemoryTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let mut backend = self.backend.lock();
        backend.requests.push(RecordedRequest {
            method,
            path: path.to_string(),
        });

        if !backend.online {
            return Err(TransportError::Unreachable("memory backend offline".to_string()));
        }
        if let Some(outcome) = backend.scripted.pop_front() {
            return outcome;
        }

        route(&mut backend.collection, method, path, body)
    }
}

fn route(
    collection: &mut TodoCollection,
    method: Method,
    path: &str,
    body: Option<&Value>,
) -> Result<Value, TransportError> {
    let decoded: Vec<String> = path
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::decode(s).map_or_else(|_| s.to_string(), Cow::into_owned))
        .collect();
    let segments: Vec<&str> = decoded.iter().map(String::as_str).collect();
    let body = body.cloned().unwrap_or(Value::Null);

    let result = match (method, segments.as_slice()) {
        (Method::Get, ["health"]) => Ok(json!({ "ok": true })),
        (Method::Get, ["todos"]) => Ok(Value::Array(collection.list())),
        (Method::Post, ["todos"]) => collection.create(body),
        (Method::Get, ["todos", id]) => collection.get(id),
        (Method::Put, ["todos", id]) => collection.update(id, body),
        (Method::Delete, ["todos", id]) => collection.delete(id).map(|()| json!({})),
        _ => return Err(TransportError::Rejected(404)),
    };

    result.map_err(|e| TransportError::Rejected(e.status_code()))
}
