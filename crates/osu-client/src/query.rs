//! Query string encoding for GET calls
//!
//! Arrays repeat their key with a `[]` suffix, nested objects flatten into
//! `key[sub]`, nulls are dropped and RFC 3339 date strings are normalized to UTC.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Url;
use serde_json::Value;

/// Flatten a parameter object into ordered `(key, value)` pairs
///
/// Anything other than a JSON object yields no pairs.
///
/// # Examples
/// ```
/// use osu_client::query::query_pairs;
/// use serde_json::json;
///
/// let pairs = query_pairs(&json!({"ids": [2, 3], "mode": "osu", "cursor": null}));
/// assert_eq!(
///     pairs,
///     vec![
///         ("ids[]".to_string(), "2".to_string()),
///         ("ids[]".to_string(), "3".to_string()),
///         ("mode".to_string(), "osu".to_string()),
///     ]
/// );
/// ```
pub fn query_pairs(params: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let Value::Object(map) = params {
        for (key, value) in map {
            encode(key.clone(), value, &mut pairs);
        }
    }
    pairs
}

/// Append the encoded parameters to the query string of `url`
pub fn append_query(url: &mut Url, params: &Value) {
    let pairs = query_pairs(params);
    if pairs.is_empty() {
        return;
    }

    let mut query = url.query_pairs_mut();
    for (key, value) in &pairs {
        query.append_pair(key, value);
    }
}

fn encode(key: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            let key = format!("{}[]", key);
            for item in items {
                encode(key.clone(), item, out);
            }
        }
        Value::Object(map) => {
            for (sub, item) in map {
                encode(format!("{}[{}]", key, sub), item, out);
            }
        }
        Value::String(s) => out.push((key, normalize_date(s).unwrap_or_else(|| s.clone()))),
        Value::Bool(b) => out.push((key, b.to_string())),
        Value::Number(n) => out.push((key, n.to_string())),
    }
}

/// Re-emit an RFC 3339 timestamp as UTC with millisecond precision
fn normalize_date(s: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true))
}
