use crate::{chat::ChatEvent, error::ChatError, state::ChatContext, sync::SessionView};
use tauri::{Emitter as _, Manager as _};
use tokio::sync::broadcast::{self, error::RecvError};

fn into_tauri(err: ChatError) -> tauri::Error {
    anyhow::Error::from(err).into()
}

#[tauri::command]
/// Join a room, dropping whatever the previous session had collected.
pub async fn connect(
    room: String,
    username: String,
    state: tauri::State<'_, ChatContext>,
) -> tauri::Result<SessionView> {
    state.connect(&room, &username).await.map_err(into_tauri)?;
    Ok(state.snapshot().await)
}

#[tauri::command]
/// Leave the current room. Returns the room that was left.
pub async fn disconnect(state: tauri::State<'_, ChatContext>) -> tauri::Result<Option<String>> {
    Ok(state.disconnect().await)
}

#[tauri::command]
/// Send a message to the room
pub async fn send_message(
    content: String,
    state: tauri::State<'_, ChatContext>,
) -> tauri::Result<()> {
    match state.send_message(&content).await {
        Ok(()) | Err(ChatError::EmptyMessage) | Err(ChatError::Stale) => Ok(()),
        Err(err) => Err(into_tauri(err)),
    }
}

#[tauri::command]
pub async fn set_username(
    username: String,
    state: tauri::State<'_, ChatContext>,
) -> tauri::Result<()> {
    tracing::info!("Username set to: {}", &username);
    state.set_username(&username).await;
    Ok(())
}

#[tauri::command]
pub async fn set_room(room: String, state: tauri::State<'_, ChatContext>) -> tauri::Result<()> {
    state.set_room(&room).await.map_err(into_tauri)
}

#[tauri::command]
/// Keep the input buffer in sync with the text box.
pub async fn set_draft(draft: String, state: tauri::State<'_, ChatContext>) -> tauri::Result<()> {
    state.set_draft(&draft).await;
    Ok(())
}

#[tauri::command]
/// Fetch new messages without waiting for the next tick.
pub async fn refresh(state: tauri::State<'_, ChatContext>) -> tauri::Result<()> {
    state.fetch_messages(false).await.map_err(into_tauri)
}

#[tauri::command]
/// Read the whole session for a full render
pub async fn get_session(state: tauri::State<'_, ChatContext>) -> tauri::Result<SessionView> {
    Ok(state.snapshot().await)
}

#[tauri::command]
pub fn get_backend_url(state: tauri::State<'_, ChatContext>) -> String {
    state.config().backend_url.clone()
}

/// Forward every chat event to the webview as `chat-event`.
pub fn spawn_event_forwarder(app: &tauri::AppHandle) {
    let events = app.state::<ChatContext>().subscribe();
    let app = app.clone();
    tauri::async_runtime::spawn(forward_events(app, events));
}

async fn forward_events(app: tauri::AppHandle, mut events: broadcast::Receiver<ChatEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Err(e) = app.emit("chat-event", &event) {
                    tracing::error!("Failed to emit event to frontend: {}", e);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Frontend missed {} chat events", skipped);
            }
            Err(RecvError::Closed) => {
                tracing::info!("Chat event stream ended.");
                break;
            }
        }
    }
}
