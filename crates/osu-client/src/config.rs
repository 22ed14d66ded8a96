//! Client configuration
//!
//! Builder-style settings for a [`Client`](crate::Client): where to send
//! requests, which headers to attach, how long to wait, how loudly to log and
//! when to retry.

use crate::correct::{ResponseTransformer, TypeCorrection};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default osu! server
pub const DEFAULT_SERVER: &str = "https://osu.ppy.sh";

/// Default route prefix of API calls
pub const DEFAULT_API_ROUTE: &str = "api/v2";

/// Default route of the OAuth2 token endpoint
pub const DEFAULT_TOKEN_ROUTE: &str = "oauth/token";

/// API version requested through the `x-api-version` header
pub const API_VERSION: &str = "20240529";

// =============================================================================
// HTTP Method
// =============================================================================

/// HTTP method of an API call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET request; parameters go to the query string
    Get,
    /// POST request; parameters go to the JSON body
    Post,
    /// PUT request
    Put,
    /// PATCH request
    Patch,
    /// DELETE request
    Delete,
}

impl HttpMethod {
    /// Upper-case method name
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

// =============================================================================
// Verbosity
// =============================================================================

/// How much the request engine reports through `tracing`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Report nothing
    #[default]
    None,
    /// Report failures only
    Errors,
    /// Report failures, retries and token refreshes
    All,
}

impl Verbosity {
    pub(crate) fn reports_errors(self) -> bool {
        !matches!(self, Verbosity::None)
    }

    pub(crate) fn reports_info(self) -> bool {
        matches!(self, Verbosity::All)
    }
}

// =============================================================================
// Retry Policy
// =============================================================================

/// When and how often a failed call is attempted again
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub maximum_amount: u32,
    /// Fixed wait before each retry
    pub delay: Duration,
    /// Retry a call that got a 401 once the token has been renewed
    pub on_new_token: bool,
    /// Status codes that make a call retryable
    pub on_status_codes: Vec<u16>,
    /// Retry a call that hit the per-call timeout
    pub on_timeout: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            maximum_amount: 4,
            delay: Duration::from_secs(2),
            on_new_token: true,
            on_status_codes: vec![429],
            on_timeout: false,
        }
    }
}

impl RetryPolicy {
    /// Create a policy allowing `maximum_amount` retries
    pub fn new(maximum_amount: u32) -> Self {
        Self {
            maximum_amount,
            ..Default::default()
        }
    }

    /// Never retry anything
    pub fn disabled() -> Self {
        Self {
            maximum_amount: 0,
            on_new_token: false,
            on_status_codes: Vec::new(),
            ..Default::default()
        }
    }

    /// Set the wait before each retry
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set whether a call is retried after a 401 led to a new token
    pub fn with_on_new_token(mut self, enabled: bool) -> Self {
        self.on_new_token = enabled;
        self
    }

    /// Replace the set of status codes that make a call retryable
    pub fn with_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.on_status_codes = codes.into_iter().collect();
        self
    }

    /// Set whether a timed-out call is retried
    pub fn with_on_timeout(mut self, enabled: bool) -> Self {
        self.on_timeout = enabled;
        self
    }

    /// Whether `status` is in the retry set
    pub fn retries_status(&self, status: u16) -> bool {
        self.on_status_codes.contains(&status)
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// OAuth2 client credentials of an osu! application
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: u64,
    client_secret: String,
}

impl Credentials {
    /// Create credentials from the id and secret shown on the osu! account settings page
    pub fn new(client_id: u64, client_secret: impl Into<String>) -> Self {
        Self {
            client_id,
            client_secret: client_secret.into(),
        }
    }

    /// Application id
    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    /// Application secret
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Code handed to the redirect URI after a user authorized the application
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    /// The `code` query parameter received on the redirect URI
    pub code: String,
    /// Redirect URI registered for the application
    pub redirect_uri: String,
}

impl AuthorizationCode {
    /// Create an authorization code pair
    pub fn new(code: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            redirect_uri: redirect_uri.into(),
        }
    }
}

impl fmt::Debug for AuthorizationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationCode")
            .field("code", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration of a [`Client`](crate::Client)
#[derive(Clone)]
pub struct ClientConfig {
    /// Application credentials, absent when only a bearer token is used
    pub credentials: Option<Credentials>,
    /// Access token to start with
    pub access_token: Option<String>,
    /// Refresh token to start with
    pub refresh_token: Option<String>,
    /// Base server URL
    pub server: String,
    /// Route prefix of API calls
    pub api_route: String,
    /// Route of the token endpoint
    pub token_route: String,
    /// Headers sent with every call
    pub headers: HashMap<String, String>,
    /// Per-call timeout, `Duration::ZERO` for none
    pub timeout: Duration,
    /// Caller-owned signal that aborts in-flight calls
    pub cancellation: Option<CancellationToken>,
    /// Logging verbosity of the request engine
    pub verbosity: Verbosity,
    /// Retry behavior
    pub retry: RetryPolicy,
    /// Fetch a token when connecting with credentials
    pub set_token_on_creation: bool,
    /// Fetch a new token when the server answers 401
    pub set_token_on_401: bool,
    /// Fetch a new token when the current one expires
    pub set_token_on_expires: bool,
    /// Post-processing applied to every decoded JSON response
    pub transformer: Arc<dyn ResponseTransformer>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let mut headers = HashMap::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert(
            "User-Agent".to_string(),
            format!("osu-client/{}", env!("CARGO_PKG_VERSION")),
        );
        headers.insert("x-api-version".to_string(), API_VERSION.to_string());

        Self {
            credentials: None,
            access_token: None,
            refresh_token: None,
            server: DEFAULT_SERVER.to_string(),
            api_route: DEFAULT_API_ROUTE.to_string(),
            token_route: DEFAULT_TOKEN_ROUTE.to_string(),
            headers,
            timeout: Duration::from_secs(20),
            cancellation: None,
            verbosity: Verbosity::default(),
            retry: RetryPolicy::default(),
            set_token_on_creation: true,
            set_token_on_401: true,
            set_token_on_expires: false,
            transformer: Arc::new(TypeCorrection::default()),
        }
    }
}

impl ClientConfig {
    /// Create a config using the given application credentials
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
            ..Default::default()
        }
    }

    /// Set the base server URL
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the API route prefix
    pub fn with_api_route(mut self, route: impl Into<String>) -> Self {
        self.api_route = route.into();
        self
    }

    /// Set the token endpoint route
    pub fn with_token_route(mut self, route: impl Into<String>) -> Self {
        self.token_route = route.into();
        self
    }

    /// Start from an existing token instead of fetching one
    pub fn with_token(
        mut self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
    ) -> Self {
        self.access_token = Some(access_token.into());
        self.refresh_token = refresh_token;
        self
    }

    /// Add or override a header sent with every call
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the per-call timeout, `Duration::ZERO` for none
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Abort in-flight calls when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set the logging verbosity
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set whether connecting with credentials fetches a token right away
    pub fn with_set_token_on_creation(mut self, enabled: bool) -> Self {
        self.set_token_on_creation = enabled;
        self
    }

    /// Set whether a 401 triggers a token refresh
    pub fn with_set_token_on_401(mut self, enabled: bool) -> Self {
        self.set_token_on_401 = enabled;
        self
    }

    /// Set whether the token is refreshed in the background when it expires
    pub fn with_set_token_on_expires(mut self, enabled: bool) -> Self {
        self.set_token_on_expires = enabled;
        self
    }

    /// Replace the response post-processing step
    pub fn with_transformer(mut self, transformer: Arc<dyn ResponseTransformer>) -> Self {
        self.transformer = transformer;
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("credentials", &self.credentials)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("server", &self.server)
            .field("api_route", &self.api_route)
            .field("token_route", &self.token_route)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("verbosity", &self.verbosity)
            .field("retry", &self.retry)
            .field("set_token_on_creation", &self.set_token_on_creation)
            .field("set_token_on_401", &self.set_token_on_401)
            .field("set_token_on_expires", &self.set_token_on_expires)
            .field("transformer", &self.transformer)
            .finish_non_exhaustive()
    }
}
