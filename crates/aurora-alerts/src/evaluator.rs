//! Storm alert evaluation.
//!
//! The [`AlertEvaluator`] is driven by a periodic tick. On each tick it
//! checks its cooldown, reads the forecast, looks at the nearest future
//! point and pushes an alert when that point reaches the storm threshold.
//!
//! The evaluator has two phases:
//!
//! - **Armed**: no alert has been sent, or the last one is older than the
//!   cooldown. A tick may fetch and fire.
//! - **Cooling**: an alert went out within the cooldown. A tick returns
//!   immediately without touching the network.
//!
//! Armed becomes Cooling only after a successful dispatch. Cooling becomes
//! Armed lazily, at the first tick after the cooldown has strictly elapsed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::channels::{ChatTarget, Messenger};
use crate::clock::Clock;
use crate::error::{AlertError, Result};
use crate::feed::FeedSource;
use crate::format::{DetailMode, SampleFormatter};
use crate::types::{FeedKind, Sample, upcoming};

/// Timing configuration for alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertConfig {
    /// How often the evaluator runs.
    pub tick_period: Duration,
    /// Minimum time between two alerts.
    pub cooldown: Duration,
}

impl AlertConfig {
    /// Default tick period (5 minutes).
    pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(5 * 60);
    /// Default cooldown (1 hour).
    pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60 * 60);

    /// Sets the tick period.
    #[must_use]
    pub const fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Sets the cooldown.
    #[must_use]
    pub const fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConfig` if the tick period is zero or the
    /// cooldown is shorter than the tick period.
    pub fn validate(&self) -> Result<()> {
        if self.tick_period.is_zero() {
            return Err(AlertError::InvalidConfig {
                reason: "tick period must be greater than 0".to_string(),
            });
        }

        if self.cooldown < self.tick_period {
            return Err(AlertError::InvalidConfig {
                reason: format!(
                    "cooldown ({}s) must not be shorter than the tick period ({}s)",
                    self.cooldown.as_secs(),
                    self.tick_period.as_secs()
                ),
            });
        }

        Ok(())
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            tick_period: Self::DEFAULT_TICK_PERIOD,
            cooldown: Self::DEFAULT_COOLDOWN,
        }
    }
}

/// Whether the evaluator may fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPhase {
    /// Eligible to fire.
    Armed,
    /// An alert went out recently.
    Cooling {
        /// Instant after which the evaluator re-arms.
        until: DateTime<Utc>,
    },
}

/// Mutable alert bookkeeping. Lives only as long as its evaluator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertState {
    last_notified_at: Option<DateTime<Utc>>,
}

impl AlertState {
    /// Creates a state with no prior notification.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_notified_at: None,
        }
    }

    /// When the last alert was dispatched.
    #[must_use]
    pub const fn last_notified_at(&self) -> Option<DateTime<Utc>> {
        self.last_notified_at
    }

    /// Phase at `now` for the given cooldown.
    #[must_use]
    pub fn phase(&self, now: DateTime<Utc>, cooldown: chrono::Duration) -> AlertPhase {
        match self.last_notified_at {
            Some(last) if now - last <= cooldown => AlertPhase::Cooling {
                until: last + cooldown,
            },
            _ => AlertPhase::Armed,
        }
    }

    fn record_dispatch(&mut self, at: DateTime<Utc>) {
        self.last_notified_at = Some(at);
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Still inside the cooldown; nothing was fetched.
    Cooling {
        /// Instant after which the evaluator re-arms.
        until: DateTime<Utc>,
    },
    /// The forecast had no point at or after now.
    NoForecast,
    /// The nearest forecast point is below the storm threshold.
    BelowThreshold {
        /// The point that was evaluated.
        sample: Sample,
    },
    /// An alert was dispatched.
    Fired {
        /// The point that triggered the alert.
        sample: Sample,
    },
}

impl TickOutcome {
    /// Returns true if an alert went out.
    #[must_use]
    pub const fn fired(&self) -> bool {
        matches!(self, Self::Fired { .. })
    }
}

/// Decides when to push a storm alert and enforces the cooldown.
#[derive(Debug)]
pub struct AlertEvaluator {
    feed: Arc<dyn FeedSource>,
    messenger: Arc<dyn Messenger>,
    clock: Arc<dyn Clock>,
    target: ChatTarget,
    tick_period: Duration,
    cooldown: chrono::Duration,
    formatter: SampleFormatter,
    state: AlertState,
}

impl AlertEvaluator {
    /// Creates an armed evaluator.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConfig` if `config` is invalid.
    pub fn new(
        feed: Arc<dyn FeedSource>,
        messenger: Arc<dyn Messenger>,
        clock: Arc<dyn Clock>,
        target: ChatTarget,
        config: &AlertConfig,
    ) -> Result<Self> {
        config.validate()?;

        let cooldown =
            chrono::Duration::from_std(config.cooldown).map_err(|e| AlertError::InvalidConfig {
                reason: format!("cooldown out of range: {e}"),
            })?;

        Ok(Self {
            feed,
            messenger,
            clock,
            target,
            tick_period: config.tick_period,
            cooldown,
            formatter: SampleFormatter::new(),
            state: AlertState::new(),
        })
    }

    /// Sets the formatter used for the alert line.
    #[must_use]
    pub const fn with_formatter(mut self, formatter: SampleFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Returns the alert bookkeeping.
    #[must_use]
    pub const fn state(&self) -> &AlertState {
        &self.state
    }

    /// Returns the channel alerts are pushed to.
    #[must_use]
    pub const fn target(&self) -> ChatTarget {
        self.target
    }

    /// Returns the validated period between two ticks.
    #[must_use]
    pub const fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> AlertPhase {
        self.state.phase(self.clock.now(), self.cooldown)
    }

    /// Runs one evaluation.
    ///
    /// Only the first forecast point at or after now is considered; later
    /// points wait for a later tick.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Fetch` if the forecast could not be read and
    /// `AlertError::NotificationFailed` if the alert could not be delivered.
    /// The alert state is left untouched in both cases.
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        let now = self.clock.now();

        if let AlertPhase::Cooling { until } = self.state.phase(now, self.cooldown) {
            debug!(until = %until, "alert cooling down, skipping tick");
            return Ok(TickOutcome::Cooling { until });
        }

        let forecast = self.feed.fetch(FeedKind::Forecast).await?;

        let Some(next) = upcoming(forecast, now).into_iter().next() else {
            debug!("no upcoming forecast point");
            return Ok(TickOutcome::NoForecast);
        };

        if !next.is_storm() {
            debug!(kp = next.kp, at = %next.timestamp, "forecast below storm threshold");
            return Ok(TickOutcome::BelowThreshold { sample: next });
        }

        let text = self.alert_text(&next);
        self.messenger.send_message(self.target, &text).await?;

        let sent_at = self.clock.now();
        self.state.record_dispatch(sent_at);

        info!(
            kp = next.kp,
            at = %next.timestamp,
            target = %self.target,
            messenger = %self.messenger.name(),
            "storm alert sent"
        );

        Ok(TickOutcome::Fired { sample: next })
    }

    fn alert_text(&self, sample: &Sample) -> String {
        format!(
            "Aurora is coming (maybe)!\nKp is {:.1} ({})\n{}",
            sample.kp,
            sample.severity(),
            self.formatter.render_one(sample, DetailMode::Calendar)
        )
    }
}
