//! Normalized error type
//!
//! Every failure the client can produce, from a refused connection to a 404 or
//! a token endpoint that hands back no token, converges on [`ApiError`]. The
//! error records where the call was going and with which parameters, with
//! secrets scrubbed out before the error is built.

use crate::config::HttpMethod;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Marker that replaces secret parameter values in error dumps
pub const REDACTED: &str = "<REDACTED>";

/// Parameter keys whose values never leave the client inside an error
const SECRET_KEYS: &[&str] = &["client_secret", "refresh_token"];

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Low-level failure that caused an [`ApiError`]
///
/// This never holds an `ApiError` itself, so a normalized error cannot wrap
/// another one.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP layer failed (connection, TLS, body read, ...)
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured per-call timeout elapsed
    #[error("Request timed out after {0:?}")]
    TimedOut(Duration),

    /// The caller-supplied cancellation token fired
    #[error("Request was cancelled")]
    Cancelled,

    /// A response body could not be decoded into the requested type
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The server URL or path could not be turned into a valid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    /// Whether this failure was caused by the per-call timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::TimedOut(_) => true,
            TransportError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Error returned by every fallible client operation
///
/// # Examples
/// ```
/// use osu_client::{ApiError, HttpMethod};
/// use serde_json::json;
///
/// let error = ApiError::new(
///     "Server responded with status code 404",
///     "https://osu.ppy.sh",
///     HttpMethod::Get,
///     "api/v2/beatmaps/0",
///     &json!({"client_secret": "hunter2"}),
/// )
/// .with_status(404);
///
/// assert_eq!(error.status_code(), Some(404));
/// assert_eq!(error.parameters()["client_secret"], "<REDACTED>");
/// ```
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    message: String,
    server: String,
    method: HttpMethod,
    endpoint: String,
    parameters: Value,
    status_code: Option<u16>,
    #[source]
    cause: Option<Arc<TransportError>>,
}

impl ApiError {
    /// Create a new error; `parameters` are redacted on the way in
    pub fn new(
        message: impl Into<String>,
        server: impl Into<String>,
        method: HttpMethod,
        endpoint: impl Into<String>,
        parameters: &Value,
    ) -> Self {
        Self {
            message: message.into(),
            server: server.into(),
            method,
            endpoint: endpoint.into(),
            parameters: redact(parameters),
            status_code: None,
            cause: None,
        }
    }

    /// Attach the HTTP status code of the failed response
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Attach the transport failure that caused this error
    pub fn with_cause(mut self, cause: TransportError) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Human-readable message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Base server URL the call was sent to
    pub fn server(&self) -> &str {
        &self.server
    }

    /// HTTP method of the call
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Endpoint path, relative to the server
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Parameters of the call, with secrets redacted
    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    /// HTTP status code, if the server answered at all
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Underlying transport failure, if any
    pub fn cause(&self) -> Option<&TransportError> {
        self.cause.as_deref()
    }

    /// Whether the call failed because the per-call timeout elapsed
    pub fn is_timeout(&self) -> bool {
        self.cause().is_some_and(TransportError::is_timeout)
    }

    /// Whether the call failed because the caller cancelled it
    pub fn is_cancelled(&self) -> bool {
        matches!(self.cause(), Some(TransportError::Cancelled))
    }
}

/// Return a copy of `parameters` with every secret value replaced by [`REDACTED`]
pub fn redact(parameters: &Value) -> Value {
    match parameters {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let value = if SECRET_KEYS.contains(&key.as_str()) && !value.is_null() {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact(value)
                    };
                    (key.clone(), value)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}
