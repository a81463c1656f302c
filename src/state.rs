use crate::{
    api::BackendClient,
    chat::ChatEvent,
    config::Config,
    error::{ChatError, Result},
    sync::{SessionView, Synchronizer},
};
use n0_future::task::AbortOnDropHandle;
use tokio::sync::{broadcast, Mutex as TokioMutex};
use tokio_util::sync::CancellationToken;

/// Holds the currently running polling loop.
struct ActivePoll {
    stop: CancellationToken,
    _handle: AbortOnDropHandle<()>,
}

impl ActivePoll {
    fn new(stop: CancellationToken, handle: AbortOnDropHandle<()>) -> Self {
        Self {
            stop,
            _handle: handle,
        }
    }
}

/// Holds the application's runtime context: the user's identity, the
/// synchronizer and the handle of the polling task.
pub struct ChatContext {
    config: Config,
    sync: Synchronizer,
    active_poll: TokioMutex<Option<ActivePoll>>,
}

impl ChatContext {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let client = BackendClient::new(&config)?;
        let sync = Synchronizer::new(client, &config);
        Ok(Self {
            config,
            sync,
            active_poll: TokioMutex::new(None),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.sync.subscribe()
    }

    pub async fn snapshot(&self) -> SessionView {
        self.sync.snapshot().await
    }

    /// Join `room` as `username`, starting from a clean slate even when the
    /// room is the one we are already in.
    pub async fn connect(&self, room: &str, username: &str) -> Result<()> {
        self.stop_polling().await;
        let session = CancellationToken::new();
        {
            let mut state = self.sync.state().lock().await;
            if let Some(previous) = state.session.take() {
                previous.cancel();
            }
            state.reset(room, username, session);
        }
        tracing::info!("Connected to room {room} as {username:?}");
        self.sync.emit(ChatEvent::Connected {
            room: room.to_string(),
            username: username.to_string(),
        });
        self.start_polling().await
    }

    /// Close the session. Returns the room that was left, if any.
    pub async fn disconnect(&self) -> Option<String> {
        self.stop_polling().await;
        let room = {
            let mut state = self.sync.state().lock().await;
            let session = state.session.take()?;
            session.cancel();
            state.connected = false;
            state.room.clone()
        };
        tracing::info!("Left room {room}");
        self.sync.emit(ChatEvent::Disconnected { room: room.clone() });
        Some(room)
    }

    /// (Re)start the polling loop for the current session.
    pub async fn start_polling(&self) -> Result<()> {
        let session = self
            .sync
            .state()
            .lock()
            .await
            .session
            .clone()
            .ok_or(ChatError::NotConnected)?;

        let mut active_poll = self.active_poll.lock().await;
        if let Some(previous) = active_poll.take() {
            previous.stop.cancel();
        }
        let stop = session.child_token();
        let handle = self.sync.start_polling(session, stop.clone());
        *active_poll = Some(ActivePoll::new(stop, handle));
        tracing::debug!(
            "Polling every {}ms",
            self.config.poll_interval.as_millis()
        );
        Ok(())
    }

    /// Stop the polling loop. A no-op when it isn't running.
    pub async fn stop_polling(&self) {
        if let Some(poll) = self.active_poll.lock().await.take() {
            poll.stop.cancel();
        }
    }

    pub async fn fetch_messages(&self, initial: bool) -> Result<()> {
        self.sync.fetch_messages(initial).await
    }

    pub async fn send_message(&self, content: &str) -> Result<()> {
        self.sync.send_message(content).await
    }

    /// Change the name messages are sent under. Takes effect on the next send.
    pub async fn set_username(&self, username: &str) {
        self.sync.state().lock().await.username = username.to_string();
        self.sync.emit(ChatEvent::Renamed {
            username: username.to_string(),
        });
    }

    /// Change the room. While connected this reconnects to the new room.
    pub async fn set_room(&self, room: &str) -> Result<()> {
        let (connected, username) = {
            let mut state = self.sync.state().lock().await;
            if state.room == room {
                return Ok(());
            }
            if !state.connected {
                state.room = room.to_string();
            }
            (state.connected, state.username.clone())
        };
        if connected {
            self.connect(room, &username).await?;
        }
        Ok(())
    }

    pub async fn set_draft(&self, draft: &str) {
        self.sync.state().lock().await.draft = draft.to_string();
    }
}
