//! On-demand Kp queries.
//!
//! Each query performs its own fetch and returns ready-to-send text. An empty
//! series renders as an empty string; callers decide how to present that.

use std::sync::Arc;

use tracing::debug;

use crate::clock::Clock;
use crate::error::FetchError;
use crate::feed::FeedSource;
use crate::format::{DetailMode, SampleFormatter};
use crate::types::{FeedKind, Sample, upcoming};

/// Number of most recent minute samples considered by [`QueryService::latest_reading`].
pub const LATEST_WINDOW: usize = 50;

/// Keep one minute sample out of this many.
pub const LATEST_STRIDE: usize = 5;

/// Number of 3-hour samples returned by [`QueryService::recent_history`].
pub const HISTORY_WINDOW: usize = 10;

/// Answers the latest / forecast / history queries.
#[derive(Debug, Clone)]
pub struct QueryService {
    feed: Arc<dyn FeedSource>,
    clock: Arc<dyn Clock>,
    formatter: SampleFormatter,
}

impl QueryService {
    /// Creates a query service.
    #[must_use]
    pub fn new(feed: Arc<dyn FeedSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            feed,
            clock,
            formatter: SampleFormatter::new(),
        }
    }

    /// Sets the formatter.
    #[must_use]
    pub const fn with_formatter(mut self, formatter: SampleFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Recent minute readings, thinned to every fifth of the last fifty.
    pub async fn latest_reading(&self) -> Result<String, FetchError> {
        let series = self.feed.fetch(FeedKind::Minute).await?;
        let thinned = thin(last(&series, LATEST_WINDOW), LATEST_STRIDE);

        debug!(samples = series.len(), kept = thinned.len(), "latest reading");
        Ok(self.formatter.render_many(&thinned, DetailMode::Clock))
    }

    /// Forecast points at or after now.
    pub async fn upcoming_forecast(&self) -> Result<String, FetchError> {
        let series = self.feed.fetch(FeedKind::Forecast).await?;
        let remaining = upcoming(series, self.clock.now());

        debug!(kept = remaining.len(), "upcoming forecast");
        Ok(self.formatter.render_many(&remaining, DetailMode::Calendar))
    }

    /// The last ten observed 3-hour values.
    pub async fn recent_history(&self) -> Result<String, FetchError> {
        let series = self.feed.fetch(FeedKind::Historical).await?;
        let recent = last(&series, HISTORY_WINDOW);

        debug!(samples = series.len(), kept = recent.len(), "recent history");
        Ok(self.formatter.render_many(recent, DetailMode::Calendar))
    }
}

fn last(series: &[Sample], count: usize) -> &[Sample] {
    &series[series.len().saturating_sub(count)..]
}

/// Keeps indices 0, stride, 2*stride... of `samples`.
fn thin(samples: &[Sample], stride: usize) -> Vec<Sample> {
    samples.iter().step_by(stride.max(1)).copied().collect()
}
