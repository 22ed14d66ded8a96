//! Response models
//!
//! Only the fields the wrappers rely on are typed; everything else the server
//! sends is kept in `extra`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Game mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ruleset {
    /// osu!standard
    Osu,
    /// osu!taiko
    Taiko,
    /// osu!catch
    Fruits,
    /// osu!mania
    Mania,
}

impl Ruleset {
    /// Name used in paths and parameters
    pub fn as_str(&self) -> &'static str {
        match self {
            Ruleset::Osu => "osu",
            Ruleset::Taiko => "taiko",
            Ruleset::Fruits => "fruits",
            Ruleset::Mania => "mania",
        }
    }
}

impl fmt::Display for Ruleset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user, by id or by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    /// Numeric user id
    Id(u64),
    /// Username
    Name(String),
}

impl UserRef {
    /// Path segment identifying the user
    pub fn segment(&self) -> String {
        match self {
            UserRef::Id(id) => id.to_string(),
            UserRef::Name(name) => name.clone(),
        }
    }

    /// Value of the `key` parameter telling the server how to read the segment
    pub fn key(&self) -> &'static str {
        match self {
            UserRef::Id(_) => "id",
            UserRef::Name(_) => "username",
        }
    }
}

impl From<u64> for UserRef {
    fn from(id: u64) -> Self {
        UserRef::Id(id)
    }
}

impl From<&str> for UserRef {
    fn from(name: &str) -> Self {
        UserRef::Name(name.to_string())
    }
}

impl From<String> for UserRef {
    fn from(name: String) -> Self {
        UserRef::Name(name)
    }
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        UserRef::Id(user.id)
    }
}

/// A user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User id
    pub id: u64,
    /// Current username
    pub username: String,
    /// Two-letter country code
    #[serde(default)]
    pub country_code: Option<String>,
    /// Ruleset the user plays the most
    #[serde(default)]
    pub playmode: Option<Ruleset>,
    /// When the account was created
    #[serde(default)]
    pub join_date: Option<DateTime<Utc>>,
    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A beatmap (one difficulty of a beatmapset)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beatmap {
    /// Beatmap id
    pub id: u64,
    /// Id of the beatmapset this difficulty belongs to
    pub beatmapset_id: u64,
    /// Difficulty name
    pub version: String,
    /// Ruleset of the beatmap
    pub mode: Ruleset,
    /// Star rating
    pub difficulty_rating: f64,
    /// Length in seconds
    #[serde(default)]
    pub total_length: Option<u64>,
    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message id
    pub message_id: u64,
    /// Id of the sender
    pub sender_id: u64,
    /// Id of the channel the message was sent to
    pub channel_id: u64,
    /// Message text
    pub content: String,
    /// Whether this is a `/me` action
    #[serde(default)]
    pub is_action: bool,
    /// When the message was sent
    pub timestamp: DateTime<Utc>,
}

/// Result of opening a private conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPrivateChannel {
    /// Id of the private channel
    pub new_channel_id: u64,
    /// The message that was sent
    pub message: ChatMessage,
    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
