// src/live/message.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::article::Article;
use crate::error::ChannelError;
use crate::stats::StatsPatch;

/// Channel the client subscribes to right after a connection opens.
pub const DEFAULT_CHANNEL: &str = "politics";

/// Outbound control frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    Subscribe { channel: String },
}

impl ControlMessage {
    pub fn subscribe(channel: &str) -> Self {
        ControlMessage::Subscribe {
            channel: channel.to_string(),
        }
    }
}

/// Inbound frame, discriminated on its `type` field.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveMessage {
    NewArticle(Box<Article>),
    StatsUpdate(StatsPatch),
    /// Any other `type` (server acks, future events). Raw handlers still see it.
    Other {
        kind: String,
        payload: Map<String, Value>,
    },
}

impl LiveMessage {
    /// Decode one text frame. Anything that is not a JSON object with a
    /// string `type`, or whose known payload does not decode, is malformed.
    pub fn parse(text: &str) -> Result<Self, ChannelError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ChannelError::MalformedFrame(e.to_string()))?;
        let Value::Object(mut obj) = value else {
            return Err(ChannelError::MalformedFrame(
                "frame is not a JSON object".into(),
            ));
        };
        let kind = match obj.remove("type") {
            Some(Value::String(s)) => s,
            _ => {
                return Err(ChannelError::MalformedFrame(
                    "frame has no string `type`".into(),
                ))
            }
        };

        match kind.as_str() {
            "new_article" => {
                let raw = obj.remove("article").ok_or_else(|| {
                    ChannelError::MalformedFrame("new_article without `article`".into())
                })?;
                let article: Article = serde_json::from_value(raw)
                    .map_err(|e| ChannelError::MalformedFrame(format!("article: {e}")))?;
                Ok(LiveMessage::NewArticle(Box::new(article)))
            }
            "stats_update" => {
                let patch = match obj.remove("stats") {
                    None | Some(Value::Null) => StatsPatch::default(),
                    Some(raw) => serde_json::from_value(raw)
                        .map_err(|e| ChannelError::MalformedFrame(format!("stats: {e}")))?,
                };
                Ok(LiveMessage::StatsUpdate(patch))
            }
            _ => Ok(LiveMessage::Other { kind, payload: obj }),
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            LiveMessage::NewArticle(_) => "new_article",
            LiveMessage::StatsUpdate(_) => "stats_update",
            LiveMessage::Other { kind, .. } => kind,
        }
    }
}
