//! Keeps the local message collection in step with the backend by polling.

use std::{sync::Arc, time::Duration};

use n0_future::task::{self, AbortOnDropHandle};
use serde::Serialize;
use tokio::{
    select,
    sync::{broadcast, Mutex as TokioMutex},
    time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    api::BackendClient,
    chat::{ChatEvent, Message, MessageLog, OutgoingMessage},
    config::Config,
    error::{ChatError, Result},
    utils::advances_cursor,
};

const EVENT_CAPACITY: usize = 64;

/// Everything the front-end renders. Mutated only through [`Synchronizer`]
/// and the connection controller.
#[derive(Debug, Default)]
pub struct SessionState {
    pub room: String,
    pub username: String,
    pub connected: bool,
    /// Timestamp of the most recently observed message.
    pub since: Option<String>,
    pub messages: MessageLog,
    /// Input buffer, cleared once a send goes through.
    pub draft: String,
    pub sending: bool,
    pub error: Option<String>,
    /// Live while connected. Results captured under a cancelled token are dropped.
    pub(crate) session: Option<CancellationToken>,
}

impl SessionState {
    /// Start a fresh session: wipe the collection and cursor, keep the draft.
    pub(crate) fn reset(&mut self, room: &str, username: &str, session: CancellationToken) {
        self.room = room.to_string();
        self.username = username.to_string();
        self.connected = true;
        self.since = None;
        self.messages.clear();
        self.error = None;
        self.session = Some(session);
    }

    fn record_error(&mut self, err: &ChatError) -> Option<ChatEvent> {
        if !err.is_reported() {
            return None;
        }
        let message = err.to_string();
        self.error = Some(message.clone());
        Some(ChatEvent::Errored { message })
    }

    /// Overlay a fetched batch and move the cursor to its last element.
    fn apply_batch(&mut self, batch: Vec<Message>) -> usize {
        if let Some(last) = batch.last() {
            if advances_cursor(self.since.as_deref(), &last.timestamp) {
                self.since = Some(last.timestamp.clone());
            }
        }
        self.messages.merge(batch)
    }
}

/// Serialisable snapshot of the session for full renders.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub room: String,
    pub username: String,
    pub connected: bool,
    pub since: Option<String>,
    pub messages: Vec<Message>,
    pub draft: String,
    pub sending: bool,
    pub error: Option<String>,
}

impl From<&SessionState> for SessionView {
    fn from(state: &SessionState) -> Self {
        Self {
            room: state.room.clone(),
            username: state.username.clone(),
            connected: state.connected,
            since: state.since.clone(),
            messages: state.messages.to_vec(),
            draft: state.draft.clone(),
            sending: state.sending,
            error: state.error.clone(),
        }
    }
}

/// Fetches, merges and sends on behalf of one chat session.
///
/// Cheap to clone; clones share the same state and event channel.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    client: BackendClient,
    state: Arc<TokioMutex<SessionState>>,
    events: broadcast::Sender<ChatEvent>,
    poll_interval: Duration,
}

impl Synchronizer {
    pub fn new(client: BackendClient, config: &Config) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let state = SessionState {
            room: config.default_room.clone(),
            ..Default::default()
        };
        Self {
            client,
            state: Arc::new(TokioMutex::new(state)),
            events,
            poll_interval: config.poll_interval,
        }
    }

    pub(crate) fn state(&self) -> &Arc<TokioMutex<SessionState>> {
        &self.state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: ChatEvent) {
        // No receivers is fine, nobody is rendering.
        let _ = self.events.send(event);
    }

    pub async fn snapshot(&self) -> SessionView {
        SessionView::from(&*self.state.lock().await)
    }

    /// Fetch the room once. `initial` ignores the cursor and pulls the full history.
    pub async fn fetch_messages(&self, initial: bool) -> Result<()> {
        let session = self
            .state
            .lock()
            .await
            .session
            .clone()
            .ok_or(ChatError::NotConnected)?;
        self.fetch_in_session(initial, &session).await
    }

    async fn fetch_in_session(&self, initial: bool, session: &CancellationToken) -> Result<()> {
        let (room, since) = {
            let state = self.state.lock().await;
            let since = if initial { None } else { state.since.clone() };
            (state.room.clone(), since)
        };
        debug!(%room, ?since, initial, "fetching messages");
        let result = self.client.list_messages(&room, since.as_deref()).await;

        let mut state = self.state.lock().await;
        if session.is_cancelled() {
            debug!(%room, "dropping response for a closed session");
            return Err(ChatError::Stale);
        }
        match result {
            Ok(batch) => {
                let had_error = state.error.take().is_some();
                if batch.is_empty() && !had_error {
                    return Ok(());
                }
                let fetched = batch.len();
                let added = state.apply_batch(batch);
                debug!(%room, fetched, added, since = ?state.since, "merged messages");
                self.emit(ChatEvent::Synced {
                    messages: state.messages.to_vec(),
                    since: state.since.clone(),
                });
                Ok(())
            }
            Err(err) => {
                warn!(%room, "fetch failed: {err}");
                if let Some(event) = state.record_error(&err) {
                    self.emit(event);
                }
                Err(err)
            }
        }
    }

    /// Post `content` as the current user, then sync once so it shows up.
    ///
    /// There is no optimistic insert: the message appears when the backend
    /// echoes it back.
    pub async fn send_message(&self, content: &str) -> Result<()> {
        let (outgoing, session) = {
            let mut state = self.state.lock().await;
            state.draft = content.to_string();
            let content = content.trim();
            if content.is_empty() {
                return Err(ChatError::EmptyMessage);
            }
            let Some(session) = state.session.clone() else {
                return Err(ChatError::NotConnected);
            };
            let sender = state.username.trim().to_string();
            if sender.is_empty() {
                let err = ChatError::MissingUsername;
                if let Some(event) = state.record_error(&err) {
                    self.emit(event);
                }
                return Err(err);
            }
            state.sending = true;
            let outgoing = OutgoingMessage {
                room: state.room.clone(),
                sender,
                content: content.to_string(),
            };
            (outgoing, session)
        };
        self.emit(ChatEvent::Sending { active: true });

        let result = self.deliver(&outgoing, &session).await;

        self.state.lock().await.sending = false;
        self.emit(ChatEvent::Sending { active: false });
        result
    }

    async fn deliver(&self, outgoing: &OutgoingMessage, session: &CancellationToken) -> Result<()> {
        let posted = self.client.post_message(outgoing).await;
        {
            let mut state = self.state.lock().await;
            if session.is_cancelled() {
                return Err(ChatError::Stale);
            }
            if let Err(err) = posted {
                warn!(room = %outgoing.room, "send failed: {err}");
                if let Some(event) = state.record_error(&err) {
                    self.emit(event);
                }
                return Err(err);
            }
            state.draft.clear();
        }
        info!(room = %outgoing.room, sender = %outgoing.sender, "message sent");
        self.emit(ChatEvent::DraftCleared);

        // A failed follow-up fetch is already recorded and the next tick retries.
        if let Err(err) = self.fetch_in_session(false, session).await {
            debug!("follow-up fetch after send failed: {err}");
        }
        Ok(())
    }

    /// Spawn the polling loop: one full fetch now, then an incremental fetch
    /// every `poll_interval`, until `stop` or `session` is cancelled.
    ///
    /// Each fetch runs as its own task, so a slow response does not delay the
    /// next tick.
    pub fn start_polling(
        &self,
        session: CancellationToken,
        stop: CancellationToken,
    ) -> AbortOnDropHandle<()> {
        let sync = self.clone();
        let period = self.poll_interval;

        AbortOnDropHandle::new(task::spawn(async move {
            sync.spawn_fetch(true, &session);
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                select! {
                    biased; // never fire a tick once stopped
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => sync.spawn_fetch(false, &session),
                }
            }
            debug!("polling stopped");
        }))
    }

    fn spawn_fetch(&self, initial: bool, session: &CancellationToken) {
        let sync = self.clone();
        let session = session.clone();
        task::spawn(async move {
            match sync.fetch_in_session(initial, &session).await {
                Ok(()) | Err(ChatError::Stale) => {}
                Err(err) => debug!("poll fetch failed: {err}"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str, timestamp: &str) -> Message {
        Message {
            id: Some(id.to_string()),
            sender: "bob".to_string(),
            content: format!("message {id}"),
            timestamp: timestamp.to_string(),
        }
    }

    #[test]
    fn cursor_follows_the_last_element_of_the_response() {
        let mut state = SessionState::default();
        state.apply_batch(vec![msg("2", "T2"), msg("1", "T1")]);
        assert_eq!(state.since.as_deref(), Some("T1"));
        assert_eq!(state.messages.len(), 2);
    }

    #[test]
    fn reset_wipes_collection_and_cursor() {
        let mut state = SessionState::default();
        state.apply_batch(vec![msg("1", "T1")]);
        state.error = Some("Failed to fetch: 500".to_string());
        state.draft = "half typed".to_string();

        state.reset("random", "alex", CancellationToken::new());

        assert!(state.connected);
        assert_eq!(state.room, "random");
        assert!(state.messages.is_empty());
        assert_eq!(state.since, None);
        assert_eq!(state.error, None);
        assert_eq!(state.draft, "half typed");
    }

    #[test]
    fn only_visible_errors_take_the_slot() {
        let mut state = SessionState::default();
        assert!(state.record_error(&ChatError::EmptyMessage).is_none());
        assert_eq!(state.error, None);

        let event = state.record_error(&ChatError::FetchStatus(404));
        assert_eq!(
            event,
            Some(ChatEvent::Errored {
                message: "Failed to fetch: 404".to_string()
            })
        );
        // last write wins
        state.record_error(&ChatError::SendFailed(500));
        assert_eq!(state.error.as_deref(), Some("Failed to send"));
    }
}
