//! Error types for the aurora-bot crate.

use aurora_alerts::AlertError;
use thiserror::Error;

/// Errors raised by the chat front end.
#[derive(Debug, Error)]
pub enum BotError {
    /// A configuration value is missing or out of range.
    #[error("configuration error: {0}")]
    Config(String),

    /// The HTTP round trip to the Bot API failed.
    #[error("bot api request {method} failed: {reason}")]
    Http {
        /// The API method being called.
        method: String,
        /// The underlying transport error.
        reason: String,
    },

    /// The Bot API answered with `ok: false`.
    #[error("bot api rejected {method}: {description}")]
    Api {
        /// The API method being called.
        method: String,
        /// The description returned by the API.
        description: String,
    },

    /// An error from the alert engine.
    #[error(transparent)]
    Alert(#[from] AlertError),
}

impl From<BotError> for AlertError {
    fn from(err: BotError) -> Self {
        match err {
            BotError::Alert(inner) => inner,
            other => Self::NotificationFailed {
                reason: other.to_string(),
            },
        }
    }
}

/// Result type for bot operations.
pub type Result<T> = std::result::Result<T, BotError>;
