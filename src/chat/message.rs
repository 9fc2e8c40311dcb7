//! Wire-level chat events.
//!
//! Every event the hub fans out is a [`Message`], encoded as one JSON object:
//!
//! ```json
//! {"type":"chat","content":"hi","username":"alice","timestamp":"2024-01-01T00:00:00Z"}
//! ```
//!
//! Peers only need to send `{"content": "..."}`; see [`InboundFrame`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sender name used for server-generated errors.
pub const SYSTEM_USERNAME: &str = "System";

/// Kind of chat event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Regular chat message.
    Chat,
    /// User joined notification.
    Join,
    /// User left notification.
    Leave,
    /// Server-generated error.
    Error,
}

impl MessageKind {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Chat => "chat",
            MessageKind::Join => "join",
            MessageKind::Leave => "leave",
            MessageKind::Error => "error",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A chat event. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    kind: MessageKind,
    content: String,
    username: String,
    timestamp: DateTime<Utc>,
}

impl Message {
    fn new(kind: MessageKind, username: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            username: username.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a chat message.
    pub fn chat(username: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(MessageKind::Chat, username, content)
    }

    /// Create a join notification.
    pub fn join(username: impl Into<String>) -> Self {
        let name = username.into();
        let content = format!("{name} joined the chat");
        Self::new(MessageKind::Join, name, content)
    }

    /// Create a leave notification.
    pub fn leave(username: impl Into<String>) -> Self {
        let name = username.into();
        let content = format!("{name} left the chat");
        Self::new(MessageKind::Leave, name, content)
    }

    /// Create an error message. The sender is always [`SYSTEM_USERNAME`].
    pub fn error(content: impl Into<String>) -> Self {
        Self::new(MessageKind::Error, SYSTEM_USERNAME, content)
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Encode as a JSON object.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decode a full message.
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

/// A frame received from a peer.
///
/// Only `content` is trusted. `type`, `username` and `timestamp` may be
/// present but are ignored; the server stamps its own.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    pub content: String,
}

impl InboundFrame {
    /// Decode a peer frame.
    pub fn parse(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }
}
