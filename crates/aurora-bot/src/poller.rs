//! Inbound update loop.
//!
//! The poller long-polls an [`UpdateSource`], advances its offset past every
//! update it sees and hands each recognised command to its own task, so a
//! slow feed never holds up the next poll. Replies still in flight when the
//! poller stops are awaited before it exits.

use std::sync::Arc;
use std::time::Duration;

use aurora_alerts::{ChatTarget, Messenger};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::commands::{Command, CommandRouter};
use crate::telegram::{Update, UpdateSource};

/// Pause after a failed poll before trying again.
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Handle to a running poller.
#[derive(Debug)]
pub struct PollerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Returns true while the task has not exited.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops polling and waits for replies already being sent. A poll in
    /// flight is abandoned.
    ///
    /// # Errors
    ///
    /// Returns the join error if the task panicked or was aborted.
    pub async fn shutdown(self) -> Result<(), tokio::task::JoinError> {
        let _ = self.shutdown_tx.send(true);
        self.task.await
    }
}

/// Routes chat commands to replies.
#[derive(Debug, Clone)]
pub struct UpdatePoller {
    source: Arc<dyn UpdateSource>,
    replies: Arc<dyn Messenger>,
    router: CommandRouter,
    bot_username: Option<String>,
}

impl UpdatePoller {
    /// Creates a poller that reads from `source` and answers through `replies`.
    #[must_use]
    pub fn new(
        source: Arc<dyn UpdateSource>,
        replies: Arc<dyn Messenger>,
        router: CommandRouter,
    ) -> Self {
        Self {
            source,
            replies,
            router,
            bot_username: None,
        }
    }

    /// Only accept `/cmd@name` addressed to this username.
    #[must_use]
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    /// Spawns the poll loop on the current runtime.
    #[must_use]
    pub fn spawn(self) -> PollerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));

        PollerHandle { shutdown_tx, task }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut offset: Option<i64> = None;
        let mut in_flight = JoinSet::new();
        info!(replies = %self.replies.name(), "starting update poller");

        loop {
            tokio::select! {
                batch = self.source.next_batch(offset) => {
                    match batch {
                        Ok(updates) => {
                            for update in updates {
                                offset = Some(next_offset(offset, update.update_id));
                                self.dispatch(update, &mut in_flight);
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "polling updates failed");
                            tokio::select! {
                                () = tokio::time::sleep(RETRY_DELAY) => {}
                                _ = shutdown.changed() => break,
                            }
                        }
                    }
                }
                _ = shutdown.changed() => break,
            }

            while let Some(finished) = in_flight.try_join_next() {
                log_reply_task(finished);
            }
        }

        if !in_flight.is_empty() {
            info!(pending = in_flight.len(), "waiting for in-flight replies");
        }
        while let Some(finished) = in_flight.join_next().await {
            log_reply_task(finished);
        }

        info!("update poller shutting down");
    }

    fn dispatch(&self, update: Update, in_flight: &mut JoinSet<()>) {
        let Some(message) = update.message else {
            return;
        };
        let Some(command) = message
            .text
            .as_deref()
            .and_then(|text| Command::parse(text, self.bot_username.as_deref()))
        else {
            return;
        };

        debug!(
            command = %command,
            user_id = message.from.as_ref().map(|u| u.id),
            chat_id = message.chat.id,
            "received command"
        );

        let router = self.router.clone();
        let replies = Arc::clone(&self.replies);
        let chat = ChatTarget(message.chat.id);
        in_flight.spawn(async move {
            let text = router.reply(command).await;
            if let Err(e) = replies.send_message(chat, &text).await {
                warn!(command = %command, chat = %chat, error = %e, "failed to send reply");
            }
        });
    }
}

fn log_reply_task(finished: Result<(), tokio::task::JoinError>) {
    if let Err(e) = finished {
        warn!(error = %e, "reply task did not complete");
    }
}

/// Offset to request next so `update_id` is acknowledged.
fn next_offset(current: Option<i64>, update_id: i64) -> i64 {
    let next = update_id.saturating_add(1);
    current.map_or(next, |c| c.max(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;

    use aurora_alerts::{FeedKind, FeedSource, FetchError, ManualClock, QueryService, Series};
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;

    use crate::commands::{FETCH_FAILED, WELCOME};
    use crate::error::BotError;
    use crate::telegram::{Chat, Message, User};

    type Batch = crate::error::Result<Vec<Update>>;

    #[derive(Debug, Default)]
    struct ScriptedUpdates {
        batches: Mutex<VecDeque<Batch>>,
        offsets: Mutex<Vec<Option<i64>>>,
    }

    impl ScriptedUpdates {
        fn push(&self, batch: Batch) {
            self.batches.lock().push_back(batch);
        }

        fn offsets(&self) -> Vec<Option<i64>> {
            self.offsets.lock().clone()
        }
    }

    impl UpdateSource for ScriptedUpdates {
        fn next_batch<'a>(
            &'a self,
            offset: Option<i64>,
        ) -> Pin<Box<dyn Future<Output = Batch> + Send + 'a>> {
            Box::pin(async move {
                self.offsets.lock().push(offset);
                let next = self.batches.lock().pop_front();
                match next {
                    Some(batch) => batch,
                    None => {
                        // Behave like an idle long poll.
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        Ok(Vec::new())
                    }
                }
            })
        }
    }

    #[derive(Debug, Default)]
    struct Replies {
        sent: Mutex<Vec<(ChatTarget, String)>>,
        delay: Duration,
    }

    impl Replies {
        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }
    }

    impl Messenger for Replies {
        fn name(&self) -> &str {
            "replies"
        }

        fn send_message<'a>(
            &'a self,
            target: ChatTarget,
            text: &'a str,
        ) -> Pin<Box<dyn Future<Output = aurora_alerts::Result<()>> + Send + 'a>> {
            Box::pin(async move {
                tokio::time::sleep(self.delay).await;
                self.sent.lock().push((target, text.to_string()));
                Ok(())
            })
        }
    }

    #[derive(Debug)]
    struct DownFeed;

    impl FeedSource for DownFeed {
        fn fetch<'a>(
            &'a self,
            kind: FeedKind,
        ) -> Pin<Box<dyn Future<Output = Result<Series, FetchError>> + Send + 'a>> {
            Box::pin(async move {
                Err(FetchError::Status {
                    url: format!("test://{kind}"),
                    status: 503,
                })
            })
        }
    }

    fn message_update(update_id: i64, chat: i64, text: &str) -> Update {
        Update {
            update_id,
            message: Some(Message {
                message_id: update_id,
                chat: Chat { id: chat },
                from: Some(User {
                    id: 42,
                    username: None,
                }),
                text: Some(text.to_string()),
            }),
        }
    }

    fn poller(source: &Arc<ScriptedUpdates>, replies: &Arc<Replies>) -> UpdatePoller {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap());
        let queries = QueryService::new(Arc::new(DownFeed), Arc::new(clock));
        UpdatePoller::new(source.clone(), replies.clone(), CommandRouter::new(queries))
            .with_bot_username("aurora_bot")
    }

    #[test]
    fn offset_only_moves_forward() {
        assert_eq!(next_offset(None, 10), 11);
        assert_eq!(next_offset(Some(11), 12), 13);
        assert_eq!(next_offset(Some(20), 12), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn answers_commands_and_acknowledges_updates() {
        let source = Arc::new(ScriptedUpdates::default());
        let replies = Arc::new(Replies::default());
        source.push(Ok(vec![
            message_update(100, 5, "/start"),
            message_update(101, 5, "just chatting"),
            Update {
                update_id: 102,
                message: None,
            },
            message_update(103, 6, "/k@aurora_bot"),
            message_update(104, 6, "/k@someone_else"),
        ]));

        let handle = poller(&source, &replies).spawn();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let mut sent = replies.sent.lock().clone();
        sent.sort_by_key(|(chat, _)| chat.id());
        assert_eq!(
            sent,
            vec![
                (ChatTarget(5), WELCOME.to_string()),
                (ChatTarget(6), FETCH_FAILED.to_string()),
            ]
        );
        assert_eq!(source.offsets(), vec![None, Some(105)]);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_polling_after_errors() {
        let source = Arc::new(ScriptedUpdates::default());
        let replies = Arc::new(Replies::default());
        source.push(Err(BotError::Http {
            method: "getUpdates".to_string(),
            reason: "connection failed".to_string(),
        }));
        source.push(Ok(vec![message_update(7, 1, "/start")]));

        let handle = poller(&source, &replies).spawn();

        tokio::time::sleep(RETRY_DELAY / 2).await;
        assert_eq!(source.offsets(), vec![None]);

        tokio::time::sleep(RETRY_DELAY).await;
        assert_eq!(replies.sent.lock().len(), 1);
        assert_eq!(source.offsets(), vec![None, None, Some(8)]);

        assert!(handle.is_running());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_idle_poll() {
        let source = Arc::new(ScriptedUpdates::default());
        let replies = Arc::new(Replies::default());

        let handle = poller(&source, &replies).spawn();
        tokio::time::sleep(Duration::from_secs(1)).await;

        handle.shutdown().await.unwrap();
        assert!(replies.sent.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_replies_in_flight() {
        let source = Arc::new(ScriptedUpdates::default());
        let replies = Arc::new(Replies::slow(Duration::from_secs(10)));
        source.push(Ok(vec![message_update(1, 5, "/start")]));

        let handle = poller(&source, &replies).spawn();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(replies.sent.lock().is_empty());

        handle.shutdown().await.unwrap();

        assert_eq!(
            replies.sent.lock().clone(),
            vec![(ChatTarget(5), WELCOME.to_string())]
        );
    }
}
