//! Error types for the Deriv client

use thiserror::Error;

/// Errors surfaced by the Deriv WebSocket client
///
/// Transport and authorization failures are fatal to the connection; quote,
/// order, and timeout failures abort only the current order attempt.
#[derive(Debug, Error)]
pub enum DerivError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("no matching reply after {attempts} messages")]
    ResponseTimeout { attempts: usize },

    #[error("quote rejected: {0}")]
    QuoteRejected(String),

    #[error("order rejected: {0}")]
    OrderRejected(String),

    #[error("not connected; call connect() and authorize() first")]
    NotConnected,
}

impl DerivError {
    pub fn transport(msg: impl Into<String>) -> Self {
        DerivError::Transport(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        DerivError::Auth(msg.into())
    }

    /// True for errors that end the session rather than one order attempt
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DerivError::Transport(_) | DerivError::Auth(_) | DerivError::NotConnected
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for DerivError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        DerivError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for DerivError {
    fn from(err: serde_json::Error) -> Self {
        DerivError::Transport(format!("failed to encode request: {}", err))
    }
}

/// Result type alias for Deriv client operations
pub type DerivResult<T> = Result<T, DerivError>;
