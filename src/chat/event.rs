use serde::{Deserialize, Serialize};

use super::message::Message;

/// Notifications published to the front-end whenever the session changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChatEvent {
    #[serde(rename_all = "camelCase")]
    Connected { room: String, username: String },
    /// The user changed the name future messages are sent under.
    #[serde(rename_all = "camelCase")]
    Renamed { username: String },
    /// A fetch succeeded. Carries the whole merged collection.
    #[serde(rename_all = "camelCase")]
    Synced {
        messages: Vec<Message>,
        since: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Sending { active: bool },
    /// The input buffer was consumed by a successful send.
    DraftCleared,
    #[serde(rename_all = "camelCase")]
    Errored { message: String },
    #[serde(rename_all = "camelCase")]
    Disconnected { room: String },
}
