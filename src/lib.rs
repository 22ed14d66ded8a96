//! osu! API v2
//!
//! Endpoint wrappers over the [`osu_client`] session core. Each function builds
//! a path and a parameter object and hands them to [`Client::request_as`];
//! token handling, retries and errors are the client's business.
//!
//! # Example
//!
//! ```rust,no_run
//! use osu_api::{users, Client, ClientConfig, Credentials, Ruleset};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new(Credentials::new(1234, "secret"));
//!     let client = Client::connect(config).await?;
//!
//!     let user = users::get_user(&client, "peppy", Some(Ruleset::Osu)).await?;
//!     println!("{} has id {}", user.username, user.id);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod beatmaps;
pub mod chat;
pub mod models;
pub mod users;

pub use models::{Beatmap, ChatMessage, NewPrivateChannel, Ruleset, User, UserRef};
pub use osu_client::*;
