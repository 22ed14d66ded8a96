//! osu! API client session
//!
//! [`Client`] owns the token of one application actor and every call made on
//! its behalf. It:
//! - obtains tokens through the client-credentials, authorization-code and
//!   refresh-token grants
//! - shares one in-flight refresh between all concurrent callers
//! - refreshes reactively on 401 and, optionally, proactively on expiry
//! - retries failed calls under a [`RetryPolicy`](crate::RetryPolicy)
//! - normalizes every failure into an [`ApiError`]

use crate::config::{AuthorizationCode, ClientConfig, HttpMethod};
use crate::error::{ApiError, Result, TransportError};
use crate::query;
use crate::token::{decode_claims, failure_detail, ExpiryTimer, Grant, IssuedToken, TokenState};
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

/// Refresh shared by every caller that needs a token while one is being fetched
type PendingRefresh = Shared<BoxFuture<'static, Result<bool>>>;

/// Where a call is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Authenticated API call under the API route
    Api,
    /// Unauthenticated call to the OAuth2 token endpoint
    Token,
}

/// Body of a successful response
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// JSON body, after the response transformer ran
    Json(Value),
    /// Body that was not valid JSON
    Text(String),
}

impl Payload {
    /// The JSON value, or the raw text as a JSON string
    pub fn into_value(self) -> Value {
        match self {
            Payload::Json(value) => value,
            Payload::Text(text) => Value::String(text),
        }
    }

    /// The JSON value, if the body was JSON
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }
}

/// Outcome of an attempt that did not succeed
enum Failure {
    Status(Response),
    Transport(TransportError),
}

struct Inner {
    http: reqwest::Client,
    config: ClientConfig,
    token: RwLock<TokenState>,
    pending: Mutex<Option<PendingRefresh>>,
    timer: Mutex<ExpiryTimer>,
}

impl Inner {
    fn token(&self) -> RwLockReadGuard<'_, TokenState> {
        self.token.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn token_mut(&self) -> RwLockWriteGuard<'_, TokenState> {
        self.token.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn pending(&self) -> MutexGuard<'_, Option<PendingRefresh>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn timer(&self) -> MutexGuard<'_, ExpiryTimer> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to an osu! API session
///
/// Cloning is cheap; all clones share the same token and refresh state.
/// Dropping the last clone cancels the expiry timer.
///
/// # Examples
/// ```no_run
/// use osu_client::{Client, ClientConfig, Credentials, HttpMethod};
/// use serde_json::json;
///
/// async fn example() -> Result<(), osu_client::ApiError> {
///     let config = ClientConfig::new(Credentials::new(1234, "secret"));
///     let client = Client::connect(config).await?;
///
///     let beatmap = client
///         .request(HttpMethod::Get, &["beatmaps", "388463"], json!({}))
///         .await?;
///     println!("{:?}", beatmap);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    /// Create a session without contacting the server
    ///
    /// Use [`ClientConfig::with_token`] to start from an existing token.
    pub fn new(config: ClientConfig) -> Self {
        let token = TokenState::seeded(config.access_token.clone(), config.refresh_token.clone());
        let timer = ExpiryTimer::new(config.set_token_on_expires);

        let client = Self {
            inner: Arc::new(Inner {
                http: reqwest::Client::new(),
                config,
                token: RwLock::new(token),
                pending: Mutex::new(None),
                timer: Mutex::new(timer),
            }),
        };
        client.reschedule();
        client
    }

    /// Create a session and, with credentials and `set_token_on_creation`,
    /// fetch a token through the client-credentials grant
    ///
    /// A token seeded through [`ClientConfig::with_token`] is used as is.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let fetch_token = config.set_token_on_creation
            && config.credentials.is_some()
            && config.access_token.is_none();

        let client = Self::new(config);
        if fetch_token {
            client.refresh_token().await?;
        }
        Ok(client)
    }

    /// Create a session acting on behalf of the user who granted `code`
    pub async fn authorize(config: ClientConfig, code: AuthorizationCode) -> Result<Self> {
        let client = Self::new(config);
        client.acquire_token(Some(&code)).await?;
        Ok(client)
    }

    // =========================================================================
    // Token state
    // =========================================================================

    /// Configuration of this session
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Current access token, empty when none was obtained yet or it was revoked
    pub fn access_token(&self) -> String {
        self.inner.token().access_token.clone()
    }

    /// Type of the current token, usually `Bearer`
    pub fn token_type(&self) -> String {
        self.inner.token().token_type.clone()
    }

    /// Current refresh token
    pub fn refresh_token_value(&self) -> Option<String> {
        self.inner.token().refresh_token.clone()
    }

    /// When the current token expires
    pub fn expires(&self) -> DateTime<Utc> {
        self.inner.token().expires
    }

    /// Scopes granted to the current token
    pub fn scopes(&self) -> Vec<String> {
        self.inner.token().scopes.clone()
    }

    /// Id of the user the token acts for, `None` for client-credentials tokens
    pub fn user(&self) -> Option<u64> {
        self.inner.token().user
    }

    /// Whether a token refresh is in flight
    pub fn is_refreshing(&self) -> bool {
        self.inner.pending().is_some()
    }

    /// Whether a proactive refresh is scheduled
    pub fn has_scheduled_refresh(&self) -> bool {
        self.inner.timer().is_armed()
    }

    /// Whether the token is refreshed when it expires
    pub fn token_on_expires(&self) -> bool {
        self.inner.timer().is_enabled()
    }

    /// Override the expiry of the current token and reschedule the timer
    pub fn set_expires(&self, expires: DateTime<Utc>) {
        self.inner.token_mut().expires = expires;
        self.reschedule();
    }

    /// Enable or disable the proactive refresh and reschedule the timer
    pub fn set_token_on_expires(&self, enabled: bool) {
        self.inner.timer().set_enabled(enabled);
        self.reschedule();
    }

    fn reschedule(&self) {
        let expires = self.inner.token().expires;
        self.schedule_expiry(expires);
    }

    fn schedule_expiry(&self, expires: DateTime<Utc>) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.timer().arm(expires, move |generation| async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let client = Client { inner };

            if !client.inner.timer().begin_firing(generation) {
                return;
            }
            if let Err(e) = client.refresh_token().await {
                tracing::warn!("Failed to refresh the expired token: {}", e);
            }
            client.inner.timer().finish_firing(generation);
        });
    }

    // =========================================================================
    // Token lifecycle
    // =========================================================================

    /// Obtain a new token
    ///
    /// With an authorization code the code is exchanged, after any refresh
    /// already in flight has finished. Without one, this is
    /// [`refresh_token`](Self::refresh_token).
    ///
    /// Returns whether the access token changed.
    pub async fn acquire_token(&self, code: Option<&AuthorizationCode>) -> Result<bool> {
        let Some(code) = code else {
            return self.refresh_token().await;
        };

        loop {
            let pending = {
                let mut slot = self.inner.pending();
                match slot.as_ref() {
                    Some(pending) => Err(pending.clone()),
                    None => {
                        let pending = self.begin_refresh(Some(code.clone()));
                        *slot = Some(pending.clone());
                        Ok(pending)
                    }
                }
            };

            match pending {
                Ok(ours) => return ours.await,
                Err(theirs) => {
                    let _ = theirs.await;
                }
            }
        }
    }

    /// Refresh the token, joining a refresh already in flight
    ///
    /// Uses the stored refresh token if there is one, the client-credentials
    /// grant otherwise. Returns whether the access token changed.
    pub async fn refresh_token(&self) -> Result<bool> {
        let pending = {
            let mut slot = self.inner.pending();
            match slot.as_ref() {
                Some(pending) => pending.clone(),
                None => {
                    let pending = self.begin_refresh(None);
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Revoke the current token and tear the session down
    pub async fn revoke_token(&self) -> Result<()> {
        self.request(HttpMethod::Delete, &["oauth", "tokens", "current"], Value::Null)
            .await?;

        self.inner.token_mut().clear();
        self.inner.timer().cancel();
        Ok(())
    }

    fn current_refresh(&self) -> Option<PendingRefresh> {
        self.inner.pending().clone()
    }

    fn begin_refresh(&self, code: Option<AuthorizationCode>) -> PendingRefresh {
        let weak = Arc::downgrade(&self.inner);

        async move {
            let Some(inner) = weak.upgrade() else {
                return Ok(false);
            };
            let client = Client { inner };

            let result = client.exchange(code.as_ref()).await;
            *client.inner.pending() = None;
            result
        }
        .boxed()
        .shared()
    }

    async fn exchange(&self, code: Option<&AuthorizationCode>) -> Result<bool> {
        let config = &self.inner.config;
        let endpoint = self.endpoint(Target::Token, &[]);

        let Some(credentials) = config.credentials.as_ref() else {
            return Err(ApiError::new(
                "Client credentials are required to obtain a token",
                &config.server,
                HttpMethod::Post,
                endpoint,
                &Value::Null,
            ));
        };

        let (grant, scopes) = {
            let state = self.inner.token();
            (Grant::select(code, &state), state.scopes.clone())
        };
        let body = grant.body(credentials, &scopes);

        if config.verbosity.reports_info() {
            tracing::info!("Requesting a new token with the {:?} grant", grant);
        }

        let response = self
            .fetch(Target::Token, HttpMethod::Post, &[], &body)
            .await?;
        let status = response.status().as_u16();
        let payload = response.json::<Value>().await.unwrap_or(Value::Null);

        let Some(token) = IssuedToken::from_body(&payload) else {
            let message = failure_detail(&payload)
                .unwrap_or_else(|| "No access token in the token endpoint response".to_string());
            let error = ApiError::new(message, &config.server, HttpMethod::Post, endpoint, &body)
                .with_status(status);
            if config.verbosity.reports_errors() {
                tracing::error!("Token request failed: {}", error);
            }
            return Err(error);
        };

        let claims = match decode_claims(&token.access_token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                if config.verbosity.reports_errors() {
                    tracing::warn!("Could not decode the access token payload: {}", e);
                }
                None
            }
        };

        let (changed, expires) = {
            let mut state = self.inner.token_mut();
            let changed = state.apply(token, claims, Utc::now());
            (changed, state.expires)
        };
        self.schedule_expiry(expires);

        if config.verbosity.reports_info() {
            tracing::info!("Token obtained, expires at {}", expires);
        }
        Ok(changed)
    }

    // =========================================================================
    // Request engine
    // =========================================================================

    /// Send a call with token handling and retries, returning the raw response
    ///
    /// # Arguments
    ///
    /// * `target` - API call or token endpoint call
    /// * `method` - HTTP method
    /// * `path` - Path segments under the target's route, percent-encoded here
    /// * `parameters` - Query parameters for GET, JSON body otherwise
    pub async fn fetch(
        &self,
        target: Target,
        method: HttpMethod,
        path: &[&str],
        parameters: &Value,
    ) -> Result<Response> {
        let config = &self.inner.config;
        let mut attempt: u32 = 1;
        let mut reauthenticated = false;

        loop {
            if target == Target::Api {
                if let Some(pending) = self.current_refresh() {
                    let _ = pending.await;
                }
            }

            let url = match self.url(target, method, path, parameters) {
                Ok(url) => url,
                Err(e) => {
                    return Err(self
                        .fail(target, method, path, parameters, Failure::Transport(e))
                        .await)
                }
            };

            let mut request = self.inner.http.request(method.into(), url);
            for (key, value) in &config.headers {
                request = request.header(key, value);
            }

            let mut sent_token = None;
            if target == Target::Api {
                let (authorization, token) = {
                    let state = self.inner.token();
                    (
                        format!("{} {}", state.token_type, state.access_token),
                        state.access_token.clone(),
                    )
                };
                request = request.header(AUTHORIZATION, authorization);
                sent_token = Some(token);
            }

            if method != HttpMethod::Get && !parameters.is_null() {
                request = request.json(parameters);
            }

            let mut retryable = false;
            let failure = match self.send(request).await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    if config.retry.retries_status(status.as_u16()) {
                        retryable = true;
                    }

                    if target == Target::Api
                        && status == StatusCode::UNAUTHORIZED
                        && config.set_token_on_401
                        && !reauthenticated
                    {
                        reauthenticated = true;
                        let rotated = self.renew_after_unauthorized(sent_token.as_deref()).await;
                        if rotated && config.retry.on_new_token {
                            retryable = true;
                        }
                    }

                    if matches!(status.as_u16(), 403 | 422 | 429)
                        && config.verbosity.reports_errors()
                    {
                        tracing::warn!(
                            "{} {} answered {}",
                            method,
                            self.endpoint(target, path),
                            status
                        );
                    }

                    Failure::Status(response)
                }
                Err(e) => {
                    if e.is_timeout() && config.retry.on_timeout {
                        retryable = true;
                    }
                    Failure::Transport(e)
                }
            };

            if retryable && attempt <= config.retry.maximum_amount {
                if config.verbosity.reports_info() {
                    tracing::info!(
                        "Retrying {} {} ({}/{})",
                        method,
                        self.endpoint(target, path),
                        attempt,
                        config.retry.maximum_amount
                    );
                }
                if !self.pause(config.retry.delay).await {
                    let cancelled = Failure::Transport(TransportError::Cancelled);
                    return Err(self.fail(target, method, path, parameters, cancelled).await);
                }
                attempt += 1;
                continue;
            }

            return Err(self.fail(target, method, path, parameters, failure).await);
        }
    }

    /// Call an API endpoint
    ///
    /// Returns `None` for 204 responses. JSON bodies go through the configured
    /// response transformer; anything else comes back as text.
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &[&str],
        parameters: Value,
    ) -> Result<Option<Payload>> {
        let response = self.fetch(Target::Api, method, path, &parameters).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = match self.bounded(response.text()).await {
            Ok(body) => body,
            Err(e) => {
                return Err(self
                    .error("Failed to read the response body", method, path, &parameters)
                    .with_cause(e));
            }
        };

        match serde_json::from_str::<Value>(&body) {
            Ok(value) => Ok(Some(Payload::Json(
                self.inner.config.transformer.transform(value),
            ))),
            Err(_) => Ok(Some(Payload::Text(body))),
        }
    }

    /// Call an API endpoint and deserialize the response into `T`
    ///
    /// A 204 response deserializes from `null`, so `T` can be `()` or an
    /// `Option`.
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &[&str],
        parameters: Value,
    ) -> Result<T> {
        let payload = self.request(method, path, parameters.clone()).await?;
        let value = payload.map(Payload::into_value).unwrap_or(Value::Null);

        serde_json::from_value(value).map_err(|e| {
            self.error("Failed to decode the response", method, path, &parameters)
                .with_cause(TransportError::Decode(e))
        })
    }

    /// Renew the token after a 401, returning whether it rotated
    async fn renew_after_unauthorized(&self, sent_token: Option<&str>) -> bool {
        if self.current_refresh().is_some() {
            return true;
        }
        if sent_token.is_some_and(|sent| sent != self.inner.token().access_token) {
            return true;
        }

        match self.refresh_token().await {
            Ok(changed) => changed,
            Err(e) => {
                if self.inner.config.verbosity.reports_errors() {
                    tracing::error!("Failed to renew the token after a 401: {}", e);
                }
                false
            }
        }
    }

    async fn send(&self, request: RequestBuilder) -> std::result::Result<Response, TransportError> {
        self.bounded(request.send()).await
    }

    /// Run a reqwest future under the per-call timeout and the cancellation token
    async fn bounded<T>(
        &self,
        future: impl Future<Output = reqwest::Result<T>>,
    ) -> std::result::Result<T, TransportError> {
        let timeout = self.inner.config.timeout;

        let running = async move {
            if timeout.is_zero() {
                return future.await.map_err(TransportError::from);
            }
            match tokio::time::timeout(timeout, future).await {
                Ok(result) => result.map_err(TransportError::from),
                Err(_) => Err(TransportError::TimedOut(timeout)),
            }
        };

        match &self.inner.config.cancellation {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(TransportError::Cancelled),
                    result = running => result,
                }
            }
            None => running.await,
        }
    }

    /// Wait out the retry delay, returning `false` when the call was cancelled meanwhile
    async fn pause(&self, delay: std::time::Duration) -> bool {
        match &self.inner.config.cancellation {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => false,
                    _ = tokio::time::sleep(delay) => true,
                }
            }
            None => {
                tokio::time::sleep(delay).await;
                true
            }
        }
    }

    fn url(
        &self,
        target: Target,
        method: HttpMethod,
        path: &[&str],
        parameters: &Value,
    ) -> std::result::Result<Url, TransportError> {
        let config = &self.inner.config;
        let mut url = Url::parse(&config.server)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", config.server, e)))?;

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| TransportError::InvalidUrl(config.server.clone()))?;
            segments.pop_if_empty();
            segments.extend(self.route(target).split('/').filter(|s| !s.is_empty()));
            segments.extend(path.iter().filter(|s| !s.is_empty()));
        }

        if method == HttpMethod::Get {
            query::append_query(&mut url, parameters);
        }
        Ok(url)
    }

    fn route(&self, target: Target) -> &str {
        match target {
            Target::Api => &self.inner.config.api_route,
            Target::Token => &self.inner.config.token_route,
        }
    }

    fn endpoint(&self, target: Target, path: &[&str]) -> String {
        std::iter::once(self.route(target))
            .chain(path.iter().copied())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn error(
        &self,
        message: &str,
        method: HttpMethod,
        path: &[&str],
        parameters: &Value,
    ) -> ApiError {
        ApiError::new(
            message,
            &self.inner.config.server,
            method,
            self.endpoint(Target::Api, path),
            parameters,
        )
    }

    async fn fail(
        &self,
        target: Target,
        method: HttpMethod,
        path: &[&str],
        parameters: &Value,
        failure: Failure,
    ) -> ApiError {
        let config = &self.inner.config;
        let endpoint = self.endpoint(target, path);

        let error = match failure {
            Failure::Status(response) => {
                let status = response.status().as_u16();
                let mut message = format!("Server responded with status code {}", status);
                if target == Target::Token {
                    if let Some(detail) = response
                        .json::<Value>()
                        .await
                        .ok()
                        .as_ref()
                        .and_then(failure_detail)
                    {
                        message = detail;
                    }
                }
                ApiError::new(message, &config.server, method, endpoint, parameters)
                    .with_status(status)
            }
            Failure::Transport(cause) => ApiError::new(
                "No response from the server",
                &config.server,
                method,
                endpoint,
                parameters,
            )
            .with_cause(cause),
        };

        if config.verbosity.reports_errors() {
            tracing::error!(
                "{} {} failed: {} ({:?})",
                method,
                error.endpoint(),
                error,
                error.cause()
            );
        }
        error
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("token", &*self.inner.token())
            .field("is_refreshing", &self.is_refreshing())
            .finish()
    }
}
