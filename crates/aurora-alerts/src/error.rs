//! Error types for the aurora-alerts crate.

use thiserror::Error;

/// Errors raised while fetching or decoding a Kp feed.
///
/// A fetch is all-or-nothing: any of these aborts the whole request so that a
/// missing sample can never mask (or fake) a storm condition.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP request could not be completed (connect, timeout, body read).
    #[error("request to {url} failed: {reason}")]
    Request {
        /// The feed URL.
        url: String,
        /// The underlying transport error.
        reason: String,
    },

    /// The feed answered with a non-success status.
    #[error("feed {url} returned HTTP {status}")]
    Status {
        /// The feed URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The body is not an array of row arrays.
    #[error("unexpected feed shape: {reason}")]
    Shape {
        /// What was wrong with the document.
        reason: String,
    },

    /// A data row could not be normalized into a sample.
    #[error("malformed row {row}: {reason}")]
    MalformedRow {
        /// Index of the row in the feed document (header is row 0).
        row: usize,
        /// Which cell failed and why.
        reason: String,
    },
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Shape {
            reason: err.to_string(),
        }
    }
}

/// Errors that can occur in the alerting engine.
#[derive(Debug, Error)]
pub enum AlertError {
    /// A feed could not be fetched or decoded.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Notification delivery failed.
    #[error("notification failed: {reason}")]
    NotificationFailed {
        /// The reason the notification failed.
        reason: String,
    },

    /// Invalid engine configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// The reason the configuration is invalid.
        reason: String,
    },
}

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;
