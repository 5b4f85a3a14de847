// src/article.rs
//! Article as delivered by the query service and the live channel.
//!
//! The core only reads `id`, `source`, `biasLevel`, `verified` and
//! `publishedAt`; everything else is carried through in `extra`.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Upstream ids are strings from the backend but numbers from some mocks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArticleId {
    Text(String),
    Number(i64),
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArticleId::Text(s) => f.write_str(s),
            ArticleId::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for ArticleId {
    fn from(s: &str) -> Self {
        ArticleId::Text(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiasLevel {
    Low,
    Medium,
    High,
}

impl BiasLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(BiasLevel::Low),
            "medium" => Some(BiasLevel::Medium),
            "high" => Some(BiasLevel::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BiasLevel::Low => "low",
            BiasLevel::Medium => "medium",
            BiasLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ArticleId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(
        default,
        deserialize_with = "lenient_bias",
        skip_serializing_if = "Option::is_none"
    )]
    pub bias_level: Option<BiasLevel>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub verified: bool,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_at: Option<DateTime<Utc>>,
    /// Display-only enrichment, set on the selected article copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Article {
    /// Minimal article, mostly useful for tests and fixtures.
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: Some(ArticleId::Text(id.into())),
            source: source.into(),
            bias_level: None,
            verified: false,
            published_at: None,
            analysis: None,
            extra: Map::new(),
        }
    }

    pub fn with_bias(mut self, bias: BiasLevel) -> Self {
        self.bias_level = Some(bias);
        self
    }

    pub fn verified(mut self, verified: bool) -> Self {
        self.verified = verified;
        self
    }

    /// Fill in a missing `publishedAt` with the time the article was received.
    pub fn stamp_received(&mut self, now: DateTime<Utc>) {
        self.published_at.get_or_insert(now);
    }

    /// Key for list rendering: the id when present, else the list position.
    pub fn display_key(&self, position: usize) -> String {
        match &self.id {
            Some(id) => id.to_string(),
            None => format!("#{position}"),
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.extra.get("title").and_then(Value::as_str)
    }
}

/// `null` decodes like an absent field.
fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

fn lenient_bias<'de, D>(de: D) -> Result<Option<BiasLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(de)?;
    Ok(match raw {
        Some(Value::String(s)) => {
            let parsed = BiasLevel::parse(&s);
            if parsed.is_none() {
                tracing::debug!(label = %s, "unknown bias label treated as absent");
            }
            parsed
        }
        _ => None,
    })
}

pub(crate) fn lenient_timestamp<'de, D>(de: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(de)?;
    Ok(raw.as_ref().and_then(parse_timestamp))
}

/// Accepts RFC 3339, zone-less ISO 8601 (taken as UTC) and unix seconds or
/// milliseconds. Anything else yields `None`.
pub(crate) fn parse_timestamp(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| naive.and_utc())
        }
        Value::Number(n) => {
            let raw = n.as_i64()?;
            if raw.abs() > 100_000_000_000 {
                Utc.timestamp_millis_opt(raw).single()
            } else {
                Utc.timestamp_opt(raw, 0).single()
            }
        }
        _ => None,
    }
}
