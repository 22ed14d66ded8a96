//! User endpoints

use crate::models::{Ruleset, User, UserRef};
use osu_client::{Client, HttpMethod, Result};
use serde::Deserialize;
use serde_json::json;

/// Get the user the token acts for
///
/// Requires a token obtained through the authorization-code grant with the
/// `identify` scope.
pub async fn get_resource_owner(client: &Client, ruleset: Option<Ruleset>) -> Result<User> {
    let mut path = vec!["me"];
    if let Some(ruleset) = ruleset {
        path.push(ruleset.as_str());
    }

    client.request_as(HttpMethod::Get, &path, json!({})).await
}

/// Get a user by id or username
///
/// # Arguments
///
/// * `client` - Session to call through
/// * `user` - User id, username or an already fetched [`User`]
/// * `ruleset` - Ruleset whose statistics to include, the user's default if `None`
pub async fn get_user(
    client: &Client,
    user: impl Into<UserRef>,
    ruleset: Option<Ruleset>,
) -> Result<User> {
    let user = user.into();
    let segment = user.segment();

    let mut path = vec!["users", segment.as_str()];
    if let Some(ruleset) = ruleset {
        path.push(ruleset.as_str());
    }

    client
        .request_as(HttpMethod::Get, &path, json!({"key": user.key()}))
        .await
}

#[derive(Deserialize)]
struct Users {
    users: Vec<User>,
}

/// Get up to 50 users by id
pub async fn get_users(client: &Client, ids: &[u64]) -> Result<Vec<User>> {
    let response: Users = client
        .request_as(HttpMethod::Get, &["users"], json!({"ids": ids}))
        .await?;
    Ok(response.users)
}
