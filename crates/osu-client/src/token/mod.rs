//! OAuth2 token state
//!
//! This module holds everything the client knows about its current token and
//! the pieces needed to obtain a new one:
//! - the token state itself ([`TokenState`])
//! - grant selection and the token endpoint body
//! - token endpoint response parsing
//! - JWT claim inspection (scopes and subject, no signature check)

mod timer;

pub(crate) use timer::ExpiryTimer;

use crate::config::{AuthorizationCode, Credentials};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;

/// Token lifetime in seconds assumed when the server does not state one
const DEFAULT_LIFETIME_SECS: i64 = 86_400;

fn default_lifetime() -> Duration {
    Duration::seconds(DEFAULT_LIFETIME_SECS)
}

/// Current token of a session
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct TokenState {
    pub(crate) access_token: String,
    pub(crate) token_type: String,
    pub(crate) refresh_token: Option<String>,
    pub(crate) expires: DateTime<Utc>,
    pub(crate) scopes: Vec<String>,
    pub(crate) user: Option<u64>,
}

impl Default for TokenState {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            token_type: "Bearer".to_string(),
            refresh_token: None,
            expires: Utc::now() + default_lifetime(),
            scopes: Vec::new(),
            user: None,
        }
    }
}

impl std::fmt::Debug for TokenState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenState")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires", &self.expires)
            .field("scopes", &self.scopes)
            .field("user", &self.user)
            .finish()
    }
}

impl TokenState {
    /// Seed the state with an existing token
    pub(crate) fn seeded(access_token: Option<String>, refresh_token: Option<String>) -> Self {
        let mut state = Self {
            access_token: access_token.unwrap_or_default(),
            refresh_token,
            ..Default::default()
        };

        if let Ok(claims) = decode_claims(&state.access_token) {
            state.apply_claims(claims);
        }
        state
    }

    /// Store a freshly issued token, returning whether the access token changed
    ///
    /// `claims` is `None` when the token payload could not be decoded, in which
    /// case the previous scopes and subject are kept.
    pub(crate) fn apply(
        &mut self,
        token: IssuedToken,
        claims: Option<TokenClaims>,
        now: DateTime<Utc>,
    ) -> bool {
        let changed = self.access_token != token.access_token;

        self.access_token = token.access_token;
        if let Some(token_type) = token.token_type {
            self.token_type = token_type;
        }
        if token.refresh_token.is_some() {
            self.refresh_token = token.refresh_token;
        }
        self.expires = token
            .expires_in
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or_else(|| now + default_lifetime());

        if let Some(claims) = claims {
            self.apply_claims(claims);
        }

        changed
    }

    /// Forget the token after it was revoked
    pub(crate) fn clear(&mut self) {
        self.access_token.clear();
        self.refresh_token = None;
    }

    fn apply_claims(&mut self, claims: TokenClaims) {
        self.scopes = claims.scopes;
        self.user = claims.sub.and_then(|sub| sub.parse().ok());
    }
}

// =============================================================================
// Grants
// =============================================================================

/// OAuth2 grant used to obtain a token
#[derive(Clone, PartialEq, Eq)]
pub(crate) enum Grant {
    AuthorizationCode(AuthorizationCode),
    RefreshToken(String),
    ClientCredentials,
}

impl Grant {
    /// Pick the grant for a token request
    pub(crate) fn select(code: Option<&AuthorizationCode>, state: &TokenState) -> Self {
        match (code, &state.refresh_token) {
            (Some(code), _) => Grant::AuthorizationCode(code.clone()),
            (None, Some(refresh_token)) => Grant::RefreshToken(refresh_token.clone()),
            (None, None) => Grant::ClientCredentials,
        }
    }

    /// Wire name of the grant
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Grant::AuthorizationCode(_) => "authorization_code",
            Grant::RefreshToken(_) => "refresh_token",
            Grant::ClientCredentials => "client_credentials",
        }
    }

    /// JSON body posted to the token endpoint
    pub(crate) fn body(&self, credentials: &Credentials, scopes: &[String]) -> Value {
        let mut body = json!({
            "grant_type": self.as_str(),
            "client_id": credentials.client_id(),
            "client_secret": credentials.client_secret(),
        });

        match self {
            Grant::AuthorizationCode(code) => {
                body["redirect_uri"] = Value::String(code.redirect_uri.clone());
                body["code"] = Value::String(code.code.clone());
            }
            Grant::RefreshToken(refresh_token) => {
                body["refresh_token"] = Value::String(refresh_token.clone());
                body["scope"] = Value::String(scopes.join(" "));
            }
            Grant::ClientCredentials => {
                body["scope"] = Value::String("public".to_string());
            }
        }

        body
    }
}

impl std::fmt::Debug for Grant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Token Endpoint Response
// =============================================================================

/// Successful token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IssuedToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl IssuedToken {
    /// Extract the token from a response body, `None` if it carries no access token
    pub(crate) fn from_body(body: &Value) -> Option<Self> {
        serde_json::from_value::<IssuedToken>(body.clone())
            .ok()
            .filter(|token| !token.access_token.is_empty())
    }
}

/// Human-readable reason given by the token endpoint, if any
pub(crate) fn failure_detail(body: &Value) -> Option<String> {
    ["error_description", "message", "error"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

// =============================================================================
// JWT Claims
// =============================================================================

/// Claims of an osu! access token that the client cares about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the user id, or empty for client-credentials tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Granted scopes
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Decode the claims of an access token without checking its signature
///
/// The token is only inspected for its scopes and subject; the server remains
/// the authority on whether it is valid.
pub fn decode_claims(token: &str) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
    let header = decode_header(token)?;

    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    let token_data = decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(token_data.claims)
}
