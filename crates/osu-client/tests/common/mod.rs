//! Shared helpers for the integration tests

#![allow(dead_code)]

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use osu_client::{ClientConfig, Credentials, RetryPolicy};
use serde_json::{json, Value};
use std::sync::Once;
use std::time::Duration;
use wiremock::ResponseTemplate;

pub const CLIENT_ID: u64 = 1234;
pub const CLIENT_SECRET: &str = "super-secret-client-secret";

static TRACING: Once = Once::new();

/// Install a test subscriber once so `RUST_LOG` shows client diagnostics
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Mint an osu!-shaped access token
pub fn mint_token(sub: &str, scopes: &[&str]) -> String {
    let claims = json!({
        "aud": CLIENT_ID.to_string(),
        "jti": format!("{}-{}", sub, Utc::now().timestamp_nanos_opt().unwrap_or_default()),
        "sub": sub,
        "scopes": scopes,
        "iat": Utc::now().timestamp(),
        "exp": (Utc::now() + ChronoDuration::hours(24)).timestamp(),
    });

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"test_secret"),
    )
    .unwrap()
}

/// Token endpoint body
pub fn token_body(access_token: &str, refresh_token: Option<&str>) -> Value {
    let mut body = json!({
        "token_type": "Bearer",
        "expires_in": 86400,
        "access_token": access_token,
    });
    if let Some(refresh_token) = refresh_token {
        body["refresh_token"] = json!(refresh_token);
    }
    body
}

/// Successful token endpoint response
pub fn token_response(access_token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(token_body(access_token, None))
}

/// Credentials config pointed at a mock server, with fast retries
pub fn test_config(server: &str) -> ClientConfig {
    init_tracing();

    ClientConfig::new(Credentials::new(CLIENT_ID, CLIENT_SECRET))
        .with_server(server)
        .with_retry(RetryPolicy::default().with_delay(Duration::from_millis(10)))
}
