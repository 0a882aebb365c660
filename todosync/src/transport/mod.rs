//! Transport layer abstraction for `todosync`.
//!
//! Defines the [`Transport`] trait: one best-effort request against the
//! remote task collection, with every failure normalised into a
//! [`TransportError`]. Concrete implementations:
//! - [`http::HttpTransport`]: `reqwest`-backed REST client
//! - [`memory::MemoryTransport`]: in-process collection for tests
//!
//! Retrying is the reconciler's job; a transport never retries on its own.

pub mod http;
pub mod memory;

use std::fmt;

use serde_json::Value;

/// HTTP verb of a transport request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Read.
    Get,
    /// Create.
    Post,
    /// Replace.
    Put,
    /// Remove.
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// Errors that can occur during a transport request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// No network path to the remote store (DNS, refused, timeout).
    #[error("remote store unreachable: {0}")]
    Unreachable(String),

    /// The remote store answered with a non-success status.
    #[error("remote store rejected the request with status {0}")]
    Rejected(u16),

    /// The response had the wrong content type or an unparsable body.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl TransportError {
    /// Classifies this failure for user-facing messages.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Unreachable(_) => FailureKind::Offline,
            Self::Rejected(_) => FailureKind::Server,
            Self::Malformed(_) => FailureKind::Data,
        }
    }
}

/// Coarse failure class used to pick what to tell the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The network is unavailable.
    Offline,
    /// The server responded with an error.
    Server,
    /// The server responded with something unreadable.
    Data,
}

impl FailureKind {
    /// Message shown when falling back to the saved snapshot.
    #[must_use]
    pub const fn stale_message(self) -> &'static str {
        match self {
            Self::Offline => "You are offline. Showing saved tasks.",
            Self::Server => "The server is having problems. Showing saved tasks.",
            Self::Data => "The server sent unreadable data. Showing saved tasks.",
        }
    }
}

/// Async transport for the remote task collection.
///
/// `path` is relative to the collection root (e.g. `/todos/7`). Bodies and
/// responses are JSON values; an empty success response yields
/// [`Value::Null`].
pub trait Transport: Send + Sync {
    /// Performs a single request.
    ///
    /// Returns the parsed JSON body on a 2xx response, or the classified
    /// failure otherwise.
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> impl std::future::Future<Output = Result<Value, TransportError>> + Send;
}
