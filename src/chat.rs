//! Chat endpoints

use crate::models::NewPrivateChannel;
use osu_client::{Client, HttpMethod, Result};
use serde_json::json;

/// Send a private message, opening the conversation if needed
///
/// Requires the `chat.write` scope. `uuid` is echoed back by the server and
/// lets the caller match the message to its own bookkeeping.
pub async fn send_private_message(
    client: &Client,
    target_id: u64,
    message: &str,
    is_action: bool,
    uuid: Option<&str>,
) -> Result<NewPrivateChannel> {
    let mut parameters = json!({
        "target_id": target_id,
        "message": message,
        "is_action": is_action,
    });
    if let Some(uuid) = uuid {
        parameters["uuid"] = json!(uuid);
    }

    client
        .request_as(HttpMethod::Post, &["chat", "new"], parameters)
        .await
}
