//! Beatmap endpoints

use crate::models::Beatmap;
use osu_client::{Client, HttpMethod, Result};
use serde_json::json;

/// Get a beatmap by id
pub async fn get_beatmap(client: &Client, id: u64) -> Result<Beatmap> {
    client
        .request_as(HttpMethod::Get, &["beatmaps", &id.to_string()], json!({}))
        .await
}
