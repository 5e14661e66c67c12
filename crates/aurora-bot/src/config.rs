//! Command-line and environment configuration.

use std::time::Duration;

use aurora_alerts::{AlertConfig, ChatTarget, FeedEndpoints};
use chrono::FixedOffset;
use clap::Parser;

use crate::error::{BotError, Result};

/// Longest long-poll timeout the Bot API honours, in seconds.
pub const MAX_POLL_TIMEOUT_SECS: u64 = 50;

/// Telegram front end for the aurora Kp alert engine.
#[derive(Parser, Debug, Clone)]
#[command(name = "aurora-bot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Bot API token.
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    pub bot_token: String,

    /// Chat or channel that receives storm alerts.
    #[arg(long, env = "CHANNEL_ID", allow_negative_numbers = true)]
    pub channel_id: i64,

    /// Seconds between two alert evaluations.
    #[arg(long, env = "AURORA_TICK_SECS", default_value_t = 300)]
    pub tick_secs: u64,

    /// Minimum seconds between two alerts.
    #[arg(long, env = "AURORA_COOLDOWN_SECS", default_value_t = 3600)]
    pub cooldown_secs: u64,

    /// Timeout for a single feed request, in seconds.
    #[arg(long, env = "AURORA_FETCH_TIMEOUT_SECS", default_value_t = 30)]
    pub fetch_timeout_secs: u64,

    /// Long-poll timeout for inbound updates, in seconds.
    #[arg(long, env = "AURORA_POLL_TIMEOUT_SECS", default_value_t = 30)]
    pub poll_timeout_secs: u64,

    /// Offset from UTC applied to rendered timestamps, in minutes.
    #[arg(
        long,
        env = "AURORA_UTC_OFFSET_MINUTES",
        default_value_t = 0,
        allow_negative_numbers = true
    )]
    pub utc_offset_minutes: i32,

    /// Historical 3-hour Kp feed.
    #[arg(long, env = "AURORA_HISTORICAL_URL", default_value = FeedEndpoints::HISTORICAL)]
    pub historical_url: String,

    /// 1-minute estimated Kp feed.
    #[arg(long, env = "AURORA_MINUTE_URL", default_value = FeedEndpoints::MINUTE)]
    pub minute_url: String,

    /// 3-hour Kp forecast feed.
    #[arg(long, env = "AURORA_FORECAST_URL", default_value = FeedEndpoints::FORECAST)]
    pub forecast_url: String,

    /// Bot API base URL.
    #[arg(long, env = "AURORA_TELEGRAM_API", default_value = "https://api.telegram.org")]
    pub telegram_api: String,

    /// Write alerts to the log instead of the channel.
    #[arg(long, env = "AURORA_DRY_RUN")]
    pub dry_run: bool,

    /// Emit JSON log lines.
    #[arg(long, env = "AURORA_LOG_JSON")]
    pub log_json: bool,
}

impl Cli {
    /// Checks every value before any service is contacted.
    ///
    /// # Errors
    ///
    /// Returns `BotError::Config` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.bot_token.trim().is_empty() {
            return Err(BotError::Config("bot token must not be empty".to_string()));
        }

        if self.channel_id == 0 {
            return Err(BotError::Config("channel id must not be 0".to_string()));
        }

        self.alert_config()
            .validate()
            .map_err(|e| BotError::Config(e.to_string()))?;

        if self.fetch_timeout_secs == 0 || self.fetch_timeout_secs >= self.tick_secs {
            return Err(BotError::Config(format!(
                "fetch timeout ({}s) must be positive and shorter than the tick period ({}s)",
                self.fetch_timeout_secs, self.tick_secs
            )));
        }

        if !(1..=MAX_POLL_TIMEOUT_SECS).contains(&self.poll_timeout_secs) {
            return Err(BotError::Config(format!(
                "poll timeout ({}s) must be between 1 and {MAX_POLL_TIMEOUT_SECS} seconds",
                self.poll_timeout_secs
            )));
        }

        self.utc_offset()?;

        for (name, url) in [
            ("historical url", &self.historical_url),
            ("minute url", &self.minute_url),
            ("forecast url", &self.forecast_url),
            ("telegram api", &self.telegram_api),
        ] {
            if url.trim().is_empty() {
                return Err(BotError::Config(format!("{name} must not be empty")));
            }
        }

        Ok(())
    }

    /// Timing configuration for the alert engine.
    #[must_use]
    pub const fn alert_config(&self) -> AlertConfig {
        AlertConfig {
            tick_period: Duration::from_secs(self.tick_secs),
            cooldown: Duration::from_secs(self.cooldown_secs),
        }
    }

    /// Feed URLs.
    #[must_use]
    pub fn endpoints(&self) -> FeedEndpoints {
        FeedEndpoints {
            historical: self.historical_url.clone(),
            minute: self.minute_url.clone(),
            forecast: self.forecast_url.clone(),
        }
    }

    /// Alert destination.
    #[must_use]
    pub const fn channel(&self) -> ChatTarget {
        ChatTarget(self.channel_id)
    }

    /// Feed request timeout.
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Long-poll timeout.
    #[must_use]
    pub const fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    /// Display offset for timestamps.
    ///
    /// # Errors
    ///
    /// Returns `BotError::Config` if the offset is a full day or more.
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).ok_or_else(|| {
            BotError::Config(format!(
                "utc offset ({} minutes) must be within +/-24h",
                self.utc_offset_minutes
            ))
        })
    }
}
