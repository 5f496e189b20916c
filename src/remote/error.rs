// src/remote/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Remote store reported a uniqueness conflict")]
    Conflict,

    #[error("Invalid remote payload: {0}")]
    InvalidPayload(String),
}

impl RemoteError {
    /// Write failures that should queue the record locally rather than fail
    /// the attempt. A conflict means the row is already there; a 4xx or a
    /// malformed payload will not get better on retry.
    pub fn is_retriable(&self) -> bool {
        match self {
            RemoteError::Transport(_) => true,
            RemoteError::Api { status, .. } => *status >= 500,
            RemoteError::Conflict | RemoteError::InvalidPayload(_) => false,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(error: reqwest::Error) -> Self {
        RemoteError::Transport(error.to_string())
    }
}
