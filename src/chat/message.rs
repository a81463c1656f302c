use serde::{Deserialize, Serialize};

/// A chat message as the backend reports it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Backend assigned identifier, not every backend sends one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Username of the author at the time of sending
    pub sender: String,
    /// Message payload
    pub content: String,
    /// ISO-8601 creation time
    #[serde(default)]
    pub timestamp: String,
}

impl Message {
    /// Identity used for deduplication: the id when present, else the timestamp.
    pub fn key(&self) -> MessageKey {
        match self.id.as_deref() {
            Some(id) if !id.is_empty() => MessageKey(id.to_string()),
            _ => MessageKey(self.timestamp.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageKey(String);

impl MessageKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Body of `GET /api/messages`.
#[derive(Deserialize, Debug, Default)]
pub struct MessagePage {
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Body of `POST /api/messages`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub room: String,
    pub sender: String,
    pub content: String,
}
