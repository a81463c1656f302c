use thiserror::Error;

/// Failures of the synchronizer operations.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Nothing to send")]
    EmptyMessage,

    #[error("Enter a username first")]
    MissingUsername,

    #[error("Connect to start chatting")]
    NotConnected,

    #[error("Failed to fetch: {0}")]
    FetchStatus(u16),

    #[error("Failed to send")]
    SendFailed(u16),

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The session this result belongs to was torn down while it was in flight.
    #[error("Session closed before the response arrived")]
    Stale,
}

impl ChatError {
    /// Whether this error is shown in the session's error slot.
    pub fn is_reported(&self) -> bool {
        !matches!(
            self,
            ChatError::EmptyMessage | ChatError::NotConnected | ChatError::Stale
        )
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_what_the_user_sees() {
        assert_eq!(ChatError::FetchStatus(500).to_string(), "Failed to fetch: 500");
        assert_eq!(ChatError::SendFailed(503).to_string(), "Failed to send");
        assert_eq!(ChatError::MissingUsername.to_string(), "Enter a username first");
    }

    #[test]
    fn silent_errors_are_not_reported() {
        assert!(!ChatError::EmptyMessage.is_reported());
        assert!(!ChatError::Stale.is_reported());
        assert!(!ChatError::NotConnected.is_reported());
        assert!(ChatError::FetchStatus(502).is_reported());
    }
}
