//! Outbound message delivery.
//!
//! The engine pushes alerts through the [`Messenger`] trait; the chat
//! transport implements it. [`LogMessenger`] writes alerts to the tracing
//! log instead, for dry runs.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// Identifier of the conversation or channel a message is pushed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatTarget(pub i64);

impl ChatTarget {
    /// Returns the raw identifier.
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ChatTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trait for outbound message delivery.
pub trait Messenger: Send + Sync + fmt::Debug {
    /// Returns the name of this messenger, for logs.
    fn name(&self) -> &str;

    /// Sends `text` to `target`.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::NotificationFailed` if the message was not delivered.
    fn send_message<'a>(
        &'a self,
        target: ChatTarget,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// A messenger that logs messages instead of delivering them.
#[derive(Debug, Clone)]
pub struct LogMessenger {
    name: String,
}

impl LogMessenger {
    /// Creates a new log messenger.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LogMessenger {
    fn default() -> Self {
        Self::new("log")
    }
}

impl Messenger for LogMessenger {
    fn name(&self) -> &str {
        &self.name
    }

    fn send_message<'a>(
        &'a self,
        target: ChatTarget,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            warn!(messenger = %self.name, target = %target, text = %text, "ALERT");
            debug!(bytes = text.len(), "logged message");
            Ok(())
        })
    }
}
