//! Response type correction
//!
//! The osu! API is not always consistent about types: numbers sometimes arrive
//! as strings and dates come in several shapes. [`TypeCorrection`] walks every
//! decoded JSON response once and fixes both, leaving a known set of free-text
//! fields alone.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::{Number, Value};
use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::OnceLock;

/// Post-processing step applied to every successful JSON response
pub trait ResponseTransformer: Debug + Send + Sync {
    /// Transform a decoded response body
    fn transform(&self, value: Value) -> Value;
}

/// Transformer that returns responses untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl ResponseTransformer for Identity {
    fn transform(&self, value: Value) -> Value {
        value
    }
}

/// Keys whose string values are user-provided text and must stay strings
const KEEP_AS_STRING: &[&str] = &[
    "name",
    "artist",
    "title",
    "location",
    "interests",
    "occupation",
    "twitter",
    "discord",
    "version",
    "display_version",
    "author",
    "raw",
    "bbcode",
    "message",
    "creator",
    "source",
    "username",
    "content",
];

fn date_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[+-]?[0-9]+-[0-9]{2}-[0-9]{2}($|[ T].*)").ok())
        .as_ref()
}

/// Default [`ResponseTransformer`]: dates to UTC ISO-8601, numeric strings to numbers
#[derive(Debug, Clone)]
pub struct TypeCorrection {
    keep_as_string: HashSet<String>,
}

impl Default for TypeCorrection {
    fn default() -> Self {
        Self {
            keep_as_string: KEEP_AS_STRING.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl TypeCorrection {
    /// Create a transformer with the default set of string-typed keys
    pub fn new() -> Self {
        Self::default()
    }

    /// Also keep the values of `key` as strings
    pub fn keep_as_string(mut self, key: impl Into<String>) -> Self {
        self.keep_as_string.insert(key.into());
        self
    }

    fn correct(&self, value: Value) -> Value {
        match value {
            Value::String(s) => correct_string(s),
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|v| self.correct(v)).collect())
            }
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| {
                        let value = if value.is_string() && self.keep_as_string.contains(&key) {
                            value
                        } else {
                            self.correct(value)
                        };
                        (key, value)
                    })
                    .collect(),
            ),
            other => other,
        }
    }
}

impl ResponseTransformer for TypeCorrection {
    fn transform(&self, value: Value) -> Value {
        self.correct(value)
    }
}

fn correct_string(s: String) -> Value {
    if date_pattern().is_some_and(|re| re.is_match(&s)) {
        return match parse_date(&s) {
            Some(date) => Value::String(date.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => Value::String(s),
        };
    }

    match parse_number(&s) {
        Some(number) => Value::Number(number),
        None => Value::String(s),
    }
}

/// Parse the date shapes the API emits, assuming UTC when no offset is given
pub(crate) fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let mut normalized = s.trim().replacen(' ', "T", 1);

    // "+09" style offsets
    let bytes = normalized.as_bytes();
    if normalized.contains('T') && bytes.len() > 3 {
        let sign = bytes[bytes.len() - 3];
        let tail = &bytes[bytes.len() - 2..];
        if (sign == b'+' || sign == b'-') && tail.iter().all(u8::is_ascii_digit) {
            normalized.push_str(":00");
        }
    }

    if let Ok(date) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(date.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_number(s: &str) -> Option<Number> {
    if s.is_empty()
        || !s
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return None;
    }

    if let Ok(int) = s.parse::<i64>() {
        return Some(Number::from(int));
    }

    s.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
}
