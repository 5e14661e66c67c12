//! Periodic driver for the [`AlertEvaluator`].
//!
//! The scheduler task owns the evaluator outright and awaits each tick before
//! taking the next one, so alert state has a single writer and ticks can
//! never overlap. Ticks that fall behind are skipped, not bunched up.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::evaluator::{AlertEvaluator, TickOutcome};

/// Handle to a running alert scheduler.
///
/// Dropping the handle without calling [`SchedulerHandle::shutdown`] also
/// stops the task at its next wake-up.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<AlertEvaluator>,
}

impl SchedulerHandle {
    /// Returns true while the task has not exited.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops the task and hands back the evaluator.
    ///
    /// A tick in progress is allowed to finish first.
    ///
    /// # Errors
    ///
    /// Returns the join error if the task panicked or was aborted.
    pub async fn shutdown(self) -> Result<AlertEvaluator, tokio::task::JoinError> {
        // The receiver may already be gone if the task exited on its own.
        let _ = self.shutdown_tx.send(true);
        self.task.await
    }
}

/// Runs an evaluator on a fixed period.
#[derive(Debug)]
pub struct AlertScheduler;

impl AlertScheduler {
    /// Spawns the tick loop on the current runtime.
    ///
    /// Ticks follow the evaluator's validated tick period; the first one
    /// happens one period after spawning.
    #[must_use]
    pub fn spawn(evaluator: AlertEvaluator) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(evaluator, shutdown_rx));

        SchedulerHandle { shutdown_tx, task }
    }
}

async fn run(mut evaluator: AlertEvaluator, mut shutdown: watch::Receiver<bool>) -> AlertEvaluator {
    let period = evaluator.tick_period();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        period_secs = period.as_secs(),
        target = %evaluator.target(),
        "starting alert scheduler"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match evaluator.tick().await {
                    Ok(TickOutcome::Fired { sample }) => {
                        debug!(kp = sample.kp, "tick fired alert");
                    }
                    Ok(outcome) => {
                        debug!(outcome = ?outcome, "tick complete");
                    }
                    Err(e) => {
                        warn!(error = %e, "alert tick failed, retrying next period");
                    }
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("alert scheduler shutting down");
                    break;
                }
            }
        }
    }

    evaluator
}
