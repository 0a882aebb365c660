//! Typed task operations over a [`Transport`].
//!
//! [`TaskApi`] maps each task operation onto one request against the
//! `/todos` collection and decodes the response into the proto types. Any
//! body that does not decode is reported as [`TransportError::Malformed`].

use std::sync::Arc;

use serde_json::Value;
use todosync_proto::codec;
use todosync_proto::task::{Task, TaskDraft, TaskId};

use crate::transport::{Method, Transport, TransportError};

/// Collection root on the remote store.
pub const TODOS_PATH: &str = "/todos";

/// Health endpoint used by the connectivity probe.
pub const HEALTH_PATH: &str = "/health";

/// Typed client for the remote task collection.
///
/// Cheap to clone; clones share the underlying transport.
pub struct TaskApi<T> {
    transport: Arc<T>,
}

impl<T> Clone for TaskApi<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> TaskApi<T> {
    /// Wraps a transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// Returns the underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetches the full task list.
    ///
    /// A `{ "fallback": true }` body is the offline marker served by a
    /// caching proxy in place of the real list, so it counts as unreachable.
    ///
    /// # Errors
    ///
    /// Returns the transport failure, or [`TransportError::Malformed`] if the
    /// body is not a task list.
    pub async fn list(&self) -> Result<Vec<Task>, TransportError> {
        let body = self.transport.request(Method::Get, TODOS_PATH, None).await?;
        if is_fallback_marker(&body) {
            return Err(TransportError::Unreachable(
                "offline fallback response".to_string(),
            ));
        }
        decode(body)
    }

    /// Creates a task and returns the server's copy.
    ///
    /// # Errors
    ///
    /// Returns the transport failure or a decode failure.
    pub async fn create(&self, draft: &TaskDraft) -> Result<Task, TransportError> {
        let body = codec::to_value(draft).map_err(|e| TransportError::Malformed(e.to_string()))?;
        let response = self
            .transport
            .request(Method::Post, TODOS_PATH, Some(&body))
            .await?;
        decode(response)
    }

    /// Replaces a task and returns the server's copy.
    ///
    /// # Errors
    ///
    /// Returns the transport failure or a decode failure.
    pub async fn update(&self, task: &Task) -> Result<Task, TransportError> {
        let body = codec::to_value(task).map_err(|e| TransportError::Malformed(e.to_string()))?;
        let response = self
            .transport
            .request(Method::Put, &item_path(&task.id), Some(&body))
            .await?;
        decode(response)
    }

    /// Deletes a task. The response body is ignored.
    ///
    /// # Errors
    ///
    /// Returns the transport failure.
    pub async fn delete(&self, id: &TaskId) -> Result<(), TransportError> {
        self.transport
            .request(Method::Delete, &item_path(id), None)
            .await
            .map(|_| ())
    }

    /// Checks that the remote store answers.
    ///
    /// # Errors
    ///
    /// Returns the transport failure.
    pub async fn health(&self) -> Result<(), TransportError> {
        self.transport
            .request(Method::Get, HEALTH_PATH, None)
            .await
            .map(|_| ())
    }
}

/// Path of one task; the id is percent-encoded as a single segment.
fn item_path(id: &TaskId) -> String {
    format!("{TODOS_PATH}/{}", urlencoding::encode(&id.to_string()))
}

fn is_fallback_marker(body: &Value) -> bool {
    body.get("fallback").and_then(Value::as_bool) == Some(true)
}

fn decode<D: serde::de::DeserializeOwned>(body: Value) -> Result<D, TransportError> {
    codec::from_value(body).map_err(|e| TransportError::Malformed(e.to_string()))
}
