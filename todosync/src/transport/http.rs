//! REST transport over HTTP using `reqwest`.
//!
//! Each request is a single attempt. Connection-level failures (DNS,
//! refused connection, timeout) map to [`TransportError::Unreachable`],
//! non-2xx statuses to [`TransportError::Rejected`], and non-JSON or
//! unparsable success bodies to [`TransportError::Malformed`].

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use url::Url;

use super::{Method, Transport, TransportError};

/// Errors that can occur while building an [`HttpTransport`].
#[derive(Debug, thiserror::Error)]
pub enum HttpSetupError {
    /// The base URL could not be parsed.
    #[error("invalid base url {url}: {source}")]
    InvalidUrl {
        /// The URL as given.
        url: String,
        /// Underlying parse error.
        source: url::ParseError,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Timeouts and base URL for the HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Root of the REST API, e.g. `http://localhost:3000`.
    pub base_url: String,
    /// Total time allowed for one request.
    pub timeout: Duration,
    /// Time allowed for establishing the connection.
    pub connect_timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// `reqwest`-backed [`Transport`].
pub struct HttpTransport {
    client: reqwest::Client,
    /// Base URL, always ending in `/` so relative joins keep its path.
    base_url: Url,
}

impl HttpTransport {
    /// Creates a transport for the given API root.
    ///
    /// # Errors
    ///
    /// Returns [`HttpSetupError`] if the URL is invalid or the client cannot
    /// be built.
    pub fn new(options: &HttpOptions) -> Result<Self, HttpSetupError> {
        let mut base_url =
            Url::parse(&options.base_url).map_err(|source| HttpSetupError::InvalidUrl {
                url: options.base_url.clone(),
                source,
            })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Returns the normalised base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl Transport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::Unreachable(format!("invalid request url: {e}")))?;

        let mut builder = self.client.request(reqwest_method(method), url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::debug!(%method, path, error = %e, "request did not reach the server");
            TransportError::Unreachable(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%method, path, status = status.as_u16(), "server rejected request");
            return Err(TransportError::Rejected(status.as_u16()));
        }

        if status == StatusCode::NO_CONTENT || response.content_length() == Some(0) {
            return Ok(Value::Null);
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(is_json_content_type);
        if !is_json {
            return Err(TransportError::Malformed(
                "response is not application/json".to_string(),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Malformed(e.to_string()))
    }
}

const fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Accepts `application/json` and structured `+json` media types.
fn is_json_content_type(value: &str) -> bool {
    let essence = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}
