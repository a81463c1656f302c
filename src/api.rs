//! Thin client for the two backend endpoints.

use crate::{
    chat::{Message, MessagePage, OutgoingMessage},
    config::Config,
    error::{ChatError, Result},
};

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    messages_url: String,
}

impl BackendClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            messages_url: config.messages_url(),
        })
    }

    /// `GET /api/messages?room=..[&since=..]`
    pub async fn list_messages(&self, room: &str, since: Option<&str>) -> Result<Vec<Message>> {
        let mut query = vec![("room", room)];
        if let Some(since) = since {
            query.push(("since", since));
        }
        let res = self.http.get(&self.messages_url).query(&query).send().await?;
        if !res.status().is_success() {
            return Err(ChatError::FetchStatus(res.status().as_u16()));
        }
        let page: MessagePage = res.json().await?;
        Ok(page.messages)
    }

    /// `POST /api/messages`. The response body is ignored.
    pub async fn post_message(&self, message: &OutgoingMessage) -> Result<()> {
        let res = self.http.post(&self.messages_url).json(message).send().await?;
        if !res.status().is_success() {
            return Err(ChatError::SendFailed(res.status().as_u16()));
        }
        Ok(())
    }
}
