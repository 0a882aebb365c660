//! HTTP front end for the todo collection: shared state, routes and handlers.
//!
//! Serves the REST surface the client talks to:
//! - `GET /todos`, `POST /todos`
//! - `GET /todos/{id}`, `PUT /todos/{id}`, `DELETE /todos/{id}`
//! - `GET /health`
//!
//! Records live in memory only. `GET` responses carry an `ETag` and a short
//! `Cache-Control` lifetime, and a matching `If-None-Match` gets a bare 304.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::{Value, json};
use todosync_proto::collection::{CollectionError, TodoCollection};
use tokio::sync::RwLock;

/// Lifetime advertised to caches for `GET` responses.
const CACHE_CONTROL: &str = "public, max-age=8";

/// Errors that can occur while preparing the server state.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    /// The seed file could not be read.
    #[error("failed to read seed file {path}: {source}")]
    Read {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The seed file is not JSON.
    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),

    /// The seed file has neither a top-level array nor a `todos` array.
    #[error("seed file must hold an array or an object with a `todos` array")]
    Shape,

    /// A seeded record was rejected by the collection.
    #[error("invalid seed record: {0}")]
    Record(#[from] CollectionError),
}

/// Shared server state holding the todo collection.
pub struct ServerState {
    /// All records, in creation order.
    todos: RwLock<TodoCollection>,
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerState {
    /// Creates a state with an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            todos: RwLock::new(TodoCollection::new()),
        }
    }

    /// Creates a state pre-filled with `records`.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::Record`] if a record is not a JSON object.
    pub fn with_records(records: Vec<Value>) -> Result<Self, SeedError> {
        let mut todos = TodoCollection::new();
        for record in records {
            todos.create(record)?;
        }
        Ok(Self {
            todos: RwLock::new(todos),
        })
    }

    /// Creates a state from a JSON seed file.
    ///
    /// Accepts either a bare array of records or a database-style object
    /// `{ "todos": [...] }`. Changes are never written back.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError`] if the file cannot be read or has the wrong shape.
    pub fn from_seed_file(path: &Path) -> Result<Self, SeedError> {
        let contents = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let records = match serde_json::from_str::<Value>(&contents)? {
            Value::Array(records) => records,
            Value::Object(mut db) => match db.remove("todos") {
                Some(Value::Array(records)) => records,
                _ => return Err(SeedError::Shape),
            },
            _ => return Err(SeedError::Shape),
        };
        Self::with_records(records)
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.todos.read().await.len()
    }

    /// Returns `true` if no records are stored.
    pub async fn is_empty(&self) -> bool {
        self.todos.read().await.is_empty()
    }
}

/// Collection failure mapped onto an HTTP response.
struct ApiError(CollectionError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<CollectionError> for ApiError {
    fn from(err: CollectionError) -> Self {
        Self(err)
    }
}

/// Builds the router over the given state.
pub fn router(state: Arc<ServerState>) -> axum::Router {
    axum::Router::new()
        .route("/health", get(health))
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/{id}",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
        .with_state(state)
}

/// Starts the server on the given address with an empty collection.
///
/// Returns the bound address (useful when binding to port 0) and the
/// server task handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(ServerState::new())).await
}

/// Starts the server with a pre-built [`ServerState`].
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<ServerState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "todo server error");
        }
    });

    Ok((bound_addr, handle))
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn list_todos(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    let records = state.todos.read().await.list();
    tracing::debug!(count = records.len(), "list todos");
    cacheable(&headers, &Value::Array(records))
}

async fn get_todo(
    State(state): State<Arc<ServerState>>,
    UrlPath(id): UrlPath<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let record = state.todos.read().await.get(&id)?;
    Ok(cacheable(&headers, &record))
}

async fn create_todo(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let record = state.todos.write().await.create(body)?;
    tracing::info!(id = %record["id"], "todo created");
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_todo(
    State(state): State<Arc<ServerState>>,
    UrlPath(id): UrlPath<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let record = state.todos.write().await.update(&id, body)?;
    tracing::info!(%id, "todo updated");
    Ok(Json(record))
}

async fn delete_todo(
    State(state): State<Arc<ServerState>>,
    UrlPath(id): UrlPath<String>,
) -> Result<Json<Value>, ApiError> {
    state.todos.write().await.delete(&id)?;
    tracing::info!(%id, "todo deleted");
    Ok(Json(json!({})))
}

/// Answers with `body` plus validators, or 304 if the client already has it.
fn cacheable(headers: &HeaderMap, body: &Value) -> Response {
    let etag = etag_for(body);
    let fresh = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == etag);

    let mut response = if fresh {
        StatusCode::NOT_MODIFIED.into_response()
    } else {
        Json(body).into_response()
    };

    let response_headers = response.headers_mut();
    response_headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CACHE_CONTROL),
    );
    if let Ok(value) = HeaderValue::from_str(&etag) {
        response_headers.insert(header::ETAG, value);
    }
    response
}

fn etag_for(body: &Value) -> String {
    let mut hasher = DefaultHasher::new();
    body.to_string().hash(&mut hasher);
    format!("\"{:016x}\"", hasher.finish())
}
