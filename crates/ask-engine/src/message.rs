//! Conversation message types.
//!
//! A conversation is a plain `Vec<Message>`: array position is the only
//! ordering, and the JSON array encoding of that vector is exactly what gets
//! persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker that prefixes every agent message produced by a failed request.
pub const FAILURE_MARKER: &str = "❌";

/// Full prefix written by [`Message::failure`].
const FAILURE_PREFIX: &str = "❌ Error: ";

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Text typed by the user.
    User,
    /// Answer (or failure report) from the remote endpoint.
    Agent,
}

impl Role {
    /// Label shown next to the message in the UI.
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Agent => "Agent",
        }
    }
}

/// A single turn in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who produced the message.
    pub role: Role,
    /// Message body.
    pub content: String,
    /// Creation time. Informational only.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new agent message.
    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create the agent message that reports a failed request.
    pub fn failure(reason: impl std::fmt::Display) -> Self {
        Self::agent(format!("{FAILURE_PREFIX}{reason}. Please try again."))
    }

    /// Whether this message reads as a failure report.
    ///
    /// Only meant for styling restored history. The outcome of a live
    /// request is the one returned by `ChatController::resolve`.
    pub fn is_failure(&self) -> bool {
        self.role == Role::Agent && self.content.starts_with(FAILURE_PREFIX)
    }
}

/// Decode a persisted conversation.
pub fn decode_conversation(raw: &str) -> Result<Vec<Message>, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Encode a conversation for persistence.
pub fn encode_conversation(messages: &[Message]) -> Result<String, serde_json::Error> {
    serde_json::to_string(messages)
}
