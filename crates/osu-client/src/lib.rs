//! osu! API v2 Client Library
//!
//! This crate provides the session core of an osu! API client: OAuth2 token
//! management, an authenticated request engine with retries, and one
//! normalized error type for every failure.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod authorize;
pub mod client;
pub mod config;
pub mod correct;
pub mod error;
pub mod query;
mod token;

pub use authorize::{authorization_url, Scope};
pub use client::{Client, Payload, Target};
pub use config::{
    AuthorizationCode, ClientConfig, Credentials, HttpMethod, RetryPolicy, Verbosity,
    API_VERSION, DEFAULT_API_ROUTE, DEFAULT_SERVER, DEFAULT_TOKEN_ROUTE,
};
pub use correct::{Identity, ResponseTransformer, TypeCorrection};
pub use error::{ApiError, Result, TransportError, REDACTED};
pub use token::{decode_claims, TokenClaims};
