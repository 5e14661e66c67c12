//! Telegram Bot API transport.
//!
//! Only the three methods the bot needs are wrapped: `getMe` to check the
//! token at startup, `getUpdates` for long polling and `sendMessage` for
//! replies and alerts. Every call is a JSON POST to
//! `{api}/bot{token}/{method}`; an `ok: false` envelope is an error even
//! when the HTTP status is 200.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use aurora_alerts::{AlertError, ChatTarget, Messenger};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{BotError, Result};

/// Extra time the HTTP client waits beyond the server-side long-poll timeout.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Response envelope shared by every Bot API method.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the call succeeded.
    pub ok: bool,
    /// The payload, present when `ok` is true.
    pub result: Option<T>,
    /// Human-readable error, present when `ok` is false.
    pub description: Option<String>,
}

/// An inbound update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    /// Monotonic update identifier.
    pub update_id: i64,
    /// New incoming message, if this update carries one.
    #[serde(default)]
    pub message: Option<Message>,
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier inside the chat.
    pub message_id: i64,
    /// The conversation the message belongs to.
    pub chat: Chat,
    /// Sender, absent for channel posts.
    #[serde(default)]
    pub from: Option<User>,
    /// Text content.
    #[serde(default)]
    pub text: Option<String>,
}

/// A conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    /// Chat identifier.
    pub id: i64,
}

/// A user or bot account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: i64,
    /// Username without the leading `@`.
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'static [&'static str],
}

/// A source of inbound updates.
pub trait UpdateSource: Send + Sync + fmt::Debug {
    /// Returns the next batch of updates with `update_id >= offset`.
    ///
    /// Implementations may wait up to their long-poll timeout before
    /// returning an empty batch.
    fn next_batch<'a>(
        &'a self,
        offset: Option<i64>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Update>>> + Send + 'a>>;
}

/// Bot API client.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    api: String,
    token: String,
    poll_timeout: Duration,
}

impl fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api", &self.api)
            .field("token", &"<redacted>")
            .field("poll_timeout", &self.poll_timeout)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// Creates a client for `api` (for example `https://api.telegram.org`).
    ///
    /// # Errors
    ///
    /// Returns `BotError::Config` if the HTTP client cannot be built.
    pub fn new(api: impl Into<String>, token: impl Into<String>, poll_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(poll_timeout.saturating_add(POLL_GRACE))
            .user_agent(concat!("aurora-bot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BotError::Config(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            api: api.into().trim_end_matches('/').to_string(),
            token: token.into(),
            poll_timeout,
        })
    }

    /// Returns the configured long-poll timeout.
    #[must_use]
    pub const fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    /// Returns the bot's own account.
    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", &json!({})).await
    }

    /// Long-polls for updates starting at `offset`.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>> {
        let params = GetUpdates {
            offset,
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: &["message"],
        };
        self.call("getUpdates", &params).await
    }

    /// Sends a plain-text message.
    pub async fn send_text(&self, chat_id: i64, text: &str) -> Result<Message> {
        let params = json!({
            "chat_id": chat_id,
            "text": text,
        });
        self.call("sendMessage", &params).await
    }

    async fn call<P, R>(&self, method: &str, params: &P) -> Result<R>
    where
        P: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/bot{}/{method}", self.api, self.token);

        let response = self
            .http
            .post(&url)
            .json(params)
            .send()
            .await
            .map_err(|e| transport_error(method, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(method, e))?;

        debug!(method, status = status.as_u16(), bytes = body.len(), "bot api response");
        decode(method, &body).inspect_err(|e| {
            warn!(method, status = status.as_u16(), error = %e, "bot api call failed");
        })
    }
}

impl UpdateSource for TelegramClient {
    fn next_batch<'a>(
        &'a self,
        offset: Option<i64>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Update>>> + Send + 'a>> {
        Box::pin(self.get_updates(offset))
    }
}

impl Messenger for TelegramClient {
    fn name(&self) -> &str {
        "telegram"
    }

    fn send_message<'a>(
        &'a self,
        target: ChatTarget,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = aurora_alerts::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.send_text(target.id(), text)
                .await
                .map(|_| ())
                .map_err(AlertError::from)
        })
    }
}

/// Decodes a Bot API envelope, turning `ok: false` into an error.
///
/// # Errors
///
/// Returns `BotError::Http` if the body is not an envelope and
/// `BotError::Api` if the API refused the call.
pub fn decode<R: DeserializeOwned>(method: &str, body: &[u8]) -> Result<R> {
    let envelope: ApiResponse<R> = serde_json::from_slice(body).map_err(|e| BotError::Http {
        method: method.to_string(),
        reason: format!("invalid response body: {e}"),
    })?;

    match envelope {
        ApiResponse {
            ok: true,
            result: Some(result),
            ..
        } => Ok(result),
        ApiResponse {
            ok: true,
            result: None,
            ..
        } => Err(BotError::Api {
            method: method.to_string(),
            description: "response has no result".to_string(),
        }),
        ApiResponse { description, .. } => Err(BotError::Api {
            method: method.to_string(),
            description: description.unwrap_or_else(|| "unknown error".to_string()),
        }),
    }
}

// reqwest errors embed the request URL, which carries the token.
fn transport_error(method: &str, err: reqwest::Error) -> BotError {
    let reason = if err.is_timeout() {
        "timed out".to_string()
    } else if err.is_connect() {
        "connection failed".to_string()
    } else {
        err.without_url().to_string()
    };

    BotError::Http {
        method: method.to_string(),
        reason,
    }
}
