use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use super::axis::Axis;
use super::message::{Message, Role};
use super::tool::Tool;

/// Message sent in place of user text to fetch a session's opener.
pub const INIT_MESSAGE: &str = "__init__";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

/// Body of `POST /dialogue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DialogueRequest {
    pub session_id: String,
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub system_override: Option<String>,
}

impl DialogueRequest {
    pub fn opener(tool: Tool, session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: INIT_MESSAGE.to_string(),
            history: Vec::new(),
            tool: Some(tool.slug().to_string()),
            system_override: None,
        }
    }

    pub fn turn(
        tool: Tool,
        session_id: impl Into<String>,
        message: impl Into<String>,
        prior: &[Message],
    ) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            history: history_from(prior),
            tool: Some(tool.slug().to_string()),
            system_override: None,
        }
    }

    pub fn is_opener(&self) -> bool {
        self.message == INIT_MESSAGE && self.history.is_empty()
    }
}

/// Conversation history as the dialogue service expects it: user and
/// assistant turns only, in their original order.
pub fn history_from(messages: &[Message]) -> Vec<HistoryTurn> {
    messages
        .iter()
        .filter(|m| m.role.is_conversational())
        .map(|m| HistoryTurn {
            role: m.role,
            content: m.text.clone(),
        })
        .collect()
}

/// Body returned by `POST /dialogue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DialogueReply {
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axes: Option<Vec<Axis>>,
}

impl DialogueReply {
    pub fn text(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            axes: None,
        }
    }

    /// Interprets a response body leniently: anything that isn't an object
    /// with a string `reply` becomes the reply text verbatim.
    pub fn from_body(body: &str) -> Self {
        let value: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(_) => return Self::text(body.trim()),
        };

        match value {
            Value::Object(map) => {
                let axes = map
                    .get("axes")
                    .cloned()
                    .and_then(|axes| serde_json::from_value::<Vec<Axis>>(axes).ok());
                let reply = map.get("reply").map(|reply| match reply {
                    Value::String(reply) => reply.clone(),
                    other => other.to_string(),
                });
                match reply {
                    Some(reply) => Self { reply, axes },
                    None => Self::text(Value::Object(map).to_string()),
                }
            }
            Value::String(reply) => Self::text(reply),
            other => Self::text(other.to_string()),
        }
    }
}
