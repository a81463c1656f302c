//! In-process stand-in for the chat backend.

#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use pollchat_lib::{config::Config, ChatContext, SessionView};
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};

/// What the backend answers to the next `GET /api/messages`.
pub enum Reply {
    Messages(Vec<Value>),
    Status(u16),
    Delayed(Duration, Vec<Value>),
}

#[derive(Default)]
struct Inner {
    replies: VecDeque<Reply>,
    gets: Vec<HashMap<String, String>>,
    posts: Vec<Value>,
    post_status: Option<u16>,
    post_delay: Option<Duration>,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MockBackend {
    /// Queue replies; once they run out every GET returns an empty list.
    pub fn reply(&self, reply: Reply) {
        self.inner.lock().unwrap().replies.push_back(reply);
    }

    pub fn fail_posts_with(&self, status: u16) {
        self.inner.lock().unwrap().post_status = Some(status);
    }

    /// Hold every POST for `delay` after it has been recorded.
    pub fn delay_posts(&self, delay: Duration) {
        self.inner.lock().unwrap().post_delay = Some(delay);
    }

    pub fn gets(&self) -> Vec<HashMap<String, String>> {
        self.inner.lock().unwrap().gets.clone()
    }

    pub fn posts(&self) -> Vec<Value> {
        self.inner.lock().unwrap().posts.clone()
    }

    /// Serve on an ephemeral port and return the base URL.
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/api/messages", get(list_messages).post(create_message))
            .with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    pub async fn wait_for_gets(&self, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.gets().len() < count {
            assert!(Instant::now() < deadline, "expected {count} GET requests");
            sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn wait_for_posts(&self, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.posts().len() < count {
            assert!(Instant::now() < deadline, "expected {count} POST requests");
            sleep(Duration::from_millis(10)).await;
        }
    }
}

async fn list_messages(
    State(backend): State<MockBackend>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let reply = {
        let mut inner = backend.inner.lock().unwrap();
        inner.gets.push(query);
        inner.replies.pop_front()
    };
    match reply {
        None => Json(json!({ "messages": [] })).into_response(),
        Some(Reply::Messages(messages)) => Json(json!({ "messages": messages })).into_response(),
        Some(Reply::Status(status)) => StatusCode::from_u16(status).unwrap().into_response(),
        Some(Reply::Delayed(delay, messages)) => {
            sleep(delay).await;
            Json(json!({ "messages": messages })).into_response()
        }
    }
}

async fn create_message(State(backend): State<MockBackend>, Json(body): Json<Value>) -> Response {
    let (status, delay) = {
        let mut inner = backend.inner.lock().unwrap();
        if let Some(status) = inner.post_status {
            return StatusCode::from_u16(status).unwrap().into_response();
        }
        inner.posts.push(body);
        (StatusCode::CREATED, inner.post_delay)
    };
    if let Some(delay) = delay {
        sleep(delay).await;
    }
    (status, Json(json!({ "ok": true }))).into_response()
}

pub fn message(id: Option<&str>, sender: &str, content: &str, timestamp: &str) -> Value {
    match id {
        Some(id) => json!({ "id": id, "sender": sender, "content": content, "timestamp": timestamp }),
        None => json!({ "sender": sender, "content": content, "timestamp": timestamp }),
    }
}

/// A context against `backend` whose timer never fires during a test.
pub async fn quiet_context(backend: &MockBackend) -> ChatContext {
    context_polling_every(backend, Duration::from_secs(3600)).await
}

pub async fn context_polling_every(backend: &MockBackend, interval: Duration) -> ChatContext {
    let url = backend.spawn().await;
    let config = Config::default()
        .with_backend_url(&url)
        .with_poll_interval(interval);
    ChatContext::new(config).unwrap()
}

pub async fn wait_for_session<F>(context: &ChatContext, check: F) -> SessionView
where
    F: Fn(&SessionView) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let session = context.snapshot().await;
        if check(&session) {
            return session;
        }
        assert!(Instant::now() < deadline, "session never settled: {session:?}");
        sleep(Duration::from_millis(10)).await;
    }
}

pub fn contents(session: &SessionView) -> Vec<&str> {
    session.messages.iter().map(|m| m.content.as_str()).collect()
}
