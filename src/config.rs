use anyhow::{anyhow, Context as _};
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_ROOM: &str = "general";

/// Runtime settings, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the chat backend, without a trailing slash.
    pub backend_url: String,
    /// Period between two incremental fetches.
    pub poll_interval: Duration,
    /// Room offered before the user picks one.
    pub default_room: String,
    pub log_level: tracing::Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            default_room: DEFAULT_ROOM.to_string(),
            log_level: tracing::Level::INFO,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source. Unset or blank keys keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("CHAT_BACKEND_URL").or_else(|| get("BACKEND_URL")) {
            config = config.with_backend_url(&url);
        }
        if let Some(ms) = get("CHAT_POLL_INTERVAL_MS") {
            let ms: u64 = ms
                .trim()
                .parse()
                .with_context(|| format!("CHAT_POLL_INTERVAL_MS is not a number: {ms}"))?;
            if ms == 0 {
                return Err(anyhow!("CHAT_POLL_INTERVAL_MS must be positive"));
            }
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(room) = get("CHAT_ROOM") {
            config.default_room = room.trim().to_string();
        }
        if let Some(level) = get("CHAT_LOG_LEVEL") {
            config.log_level = level
                .trim()
                .parse()
                .map_err(|_| anyhow!("unknown log level: {level}"))?;
        }
        Ok(config)
    }

    pub fn with_backend_url(mut self, url: &str) -> Self {
        self.backend_url = url.trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Endpoint serving both the message listing and message creation.
    pub fn messages_url(&self) -> String {
        format!("{}/api/messages", self.backend_url)
    }
}
