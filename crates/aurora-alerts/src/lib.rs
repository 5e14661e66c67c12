//! Geomagnetic storm alerting on the planetary K-index.
//!
//! `aurora-alerts` polls the NOAA SWPC Kp products, renders readings as
//! compact text lines and pushes an alert when the nearest forecast point
//! reaches storm level (Kp 5), at most once per cooldown window.
//!
//! # Features
//!
//! - **Feeds**: historical 3-hour, 1-minute estimate and 3-hour forecast,
//!   fetched fresh on every call
//! - **Rendering**: severity glyph, one-decimal value, eight-cell bar, timestamp
//! - **Alerting**: threshold plus cooldown, evaluated on a fixed tick
//! - **Queries**: latest, forecast and history text for chat replies
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use aurora_alerts::{
//!     AlertConfig, AlertEvaluator, AlertScheduler, ChatTarget, FeedEndpoints,
//!     HttpFeedSource, LogMessenger, QueryService, SystemClock,
//! };
//!
//! # async fn run() -> aurora_alerts::Result<()> {
//! let feed = Arc::new(HttpFeedSource::new(
//!     FeedEndpoints::default(),
//!     HttpFeedSource::DEFAULT_TIMEOUT,
//! )?);
//! let clock = Arc::new(SystemClock);
//!
//! let queries = QueryService::new(feed.clone(), clock.clone());
//! println!("{}", queries.upcoming_forecast().await?);
//!
//! let config = AlertConfig::default();
//! let evaluator = AlertEvaluator::new(
//!     feed,
//!     Arc::new(LogMessenger::default()),
//!     clock,
//!     ChatTarget(-1_001_234_567_890),
//!     &config,
//! )?;
//! let handle = AlertScheduler::spawn(evaluator);
//! // ...
//! let _ = handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod channels;
pub mod clock;
pub mod error;
pub mod evaluator;
pub mod feed;
pub mod format;
pub mod query;
pub mod scheduler;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use channels::{ChatTarget, LogMessenger, Messenger};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AlertError, FetchError, Result};
pub use evaluator::{AlertConfig, AlertEvaluator, AlertPhase, AlertState, TickOutcome};
pub use feed::{FeedSource, HttpFeedSource, parse_series, parse_timestamp};
pub use format::{DetailMode, SampleFormatter, bar_gauge};
pub use query::QueryService;
pub use scheduler::{AlertScheduler, SchedulerHandle};
pub use types::{
    FeedEndpoints, FeedKind, STORM_THRESHOLD, Sample, Series, Severity, severity_bucket, upcoming,
};
