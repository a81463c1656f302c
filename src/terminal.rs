//! Line-oriented front-end: commands start with `/`, anything else is sent.

use std::{collections::HashMap, sync::Arc};

use n0_future::task::{self, AbortOnDropHandle};
use tokio::{
    io::{stdin, AsyncBufReadExt as _, BufReader},
    sync::broadcast::{self, error::RecvError},
};

use crate::{
    chat::{ChatEvent, Message, MessageKey},
    error::ChatError,
    state::ChatContext,
    utils::format_time,
};

const HELP: &str = "\
commands:
  /connect [room] [username]  join a room (defaults to the current ones)
  /name <username>            change your username
  /room <room>                switch room
  /leave                      disconnect
  /refresh                    fetch new messages now
  /help                       show this help
  /quit                       exit
anything else is sent to the room";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect {
        room: Option<String>,
        username: Option<String>,
    },
    Name(String),
    Room(String),
    Leave,
    Refresh,
    Help,
    Quit,
    Say(String),
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let Some(rest) = line.trim_start().strip_prefix('/') else {
            return Command::Say(line.to_string());
        };
        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next().map(str::to_string);
        match (name, arg) {
            ("connect" | "join", room) => Command::Connect {
                room,
                username: parts.next().map(str::to_string),
            },
            ("name" | "nick", Some(username)) => Command::Name(username),
            ("room", Some(room)) => Command::Room(room),
            ("leave", _) => Command::Leave,
            ("refresh", _) => Command::Refresh,
            ("help", _) => Command::Help,
            ("quit" | "exit", _) => Command::Quit,
            _ => Command::Unknown(line.trim().to_string()),
        }
    }
}

/// Format one message the way the chat window shows it.
pub fn render_message(message: &Message, own: bool) -> String {
    let marker = if own { '>' } else { ' ' };
    let time = format_time(&message.timestamp);
    if time.is_empty() {
        format!("{marker} {}: {}", message.sender, message.content)
    } else {
        format!("{marker} [{time}] {}: {}", message.sender, message.content)
    }
}

/// Run the interactive loop until `/quit` or end of input.
pub async fn run(context: Arc<ChatContext>) -> anyhow::Result<()> {
    let config = context.config();
    println!("Backend: {}", config.backend_url);
    println!(
        "Polling every {:.1}s. Type /help for commands.",
        config.poll_interval.as_secs_f32()
    );

    let _printer = AbortOnDropHandle::new(task::spawn(print_events(context.subscribe())));

    let mut lines = BufReader::new(stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !handle_line(&context, &line).await {
            break;
        }
    }

    context.disconnect().await;
    Ok(())
}

/// Returns false once the user asked to quit.
async fn handle_line(context: &ChatContext, line: &str) -> bool {
    let result = match Command::parse(line) {
        Command::Connect { room, username } => {
            let session = context.snapshot().await;
            let room = room.unwrap_or(session.room);
            let username = username.unwrap_or(session.username);
            context.connect(&room, &username).await
        }
        Command::Name(username) => {
            context.set_username(&username).await;
            Ok(())
        }
        Command::Room(room) => context.set_room(&room).await,
        Command::Leave => {
            context.disconnect().await;
            Ok(())
        }
        Command::Refresh => context.fetch_messages(false).await,
        Command::Help => {
            println!("{HELP}");
            Ok(())
        }
        Command::Quit => return false,
        Command::Say(text) => context.send_message(&text).await,
        Command::Unknown(text) => {
            println!("! unknown command {text}, try /help");
            Ok(())
        }
    };
    match result {
        // Reported errors already reached the screen as an event.
        Err(err @ ChatError::NotConnected) => println!("! {err}"),
        Err(err) => tracing::debug!("command failed: {err}"),
        Ok(()) => {}
    }
    true
}

/// What the terminal has already printed for the current session.
#[derive(Debug, Default)]
pub struct Transcript {
    username: String,
    printed: HashMap<MessageKey, Message>,
}

impl Transcript {
    /// Forget everything printed so far, as on a fresh connect.
    pub fn restart(&mut self, username: &str) {
        self.printed.clear();
        self.rename(username);
    }

    pub fn rename(&mut self, username: &str) {
        self.username = username.trim().to_string();
    }

    /// Lines for messages not printed yet, or printed with different content.
    pub fn fresh_lines(&mut self, messages: Vec<Message>) -> Vec<String> {
        let mut lines = Vec::new();
        for message in messages {
            let key = message.key();
            if self.printed.get(&key) == Some(&message) {
                continue;
            }
            lines.push(render_message(&message, message.sender == self.username));
            self.printed.insert(key, message);
        }
        lines
    }
}

async fn print_events(mut events: broadcast::Receiver<ChatEvent>) {
    let mut transcript = Transcript::default();
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("terminal fell behind by {skipped} events");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        match event {
            ChatEvent::Connected { room, username } => {
                println!("* connected to {room} as {username}");
                if username.trim().is_empty() {
                    println!("* pick a username with /name before sending");
                }
                transcript.restart(&username);
            }
            ChatEvent::Renamed { username } => {
                println!("* you are now {username}");
                transcript.rename(&username);
            }
            ChatEvent::Synced { messages, .. } => {
                for line in transcript.fresh_lines(messages) {
                    println!("{line}");
                }
            }
            ChatEvent::Errored { message } => println!("! {message}"),
            ChatEvent::Disconnected { room } => println!("* left {room}"),
            ChatEvent::Sending { .. } | ChatEvent::DraftCleared => {}
        }
    }
}
