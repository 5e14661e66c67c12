//! Text rendering of Kp samples.
//!
//! Each sample becomes one line: severity glyph, value with one decimal, an
//! eight-cell bar and a timestamp, e.g. `🟡5.3 █████░░░ 10 May - 03h`.

use chrono::{FixedOffset, Offset, Utc};

use crate::types::{MAX_BUCKET, Sample};

/// Glyph for a filled bar cell.
pub const BAR_FILLED: char = '█';

/// Glyph for an empty bar cell.
pub const BAR_EMPTY: char = '░';

/// How the timestamp suffix is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailMode {
    /// `HH:MM`, for 1-minute data.
    Clock,
    /// `DD Mon - HHh`, for 3-hour buckets.
    #[default]
    Calendar,
}

impl DetailMode {
    const fn pattern(self) -> &'static str {
        match self {
            Self::Clock => "%H:%M",
            Self::Calendar => "%d %b - %Hh",
        }
    }
}

/// Renders samples into fixed-layout lines.
#[derive(Debug, Clone, Copy)]
pub struct SampleFormatter {
    offset: FixedOffset,
}

impl SampleFormatter {
    /// Creates a formatter that prints timestamps in UTC.
    #[must_use]
    pub fn new() -> Self {
        Self::with_offset(Utc.fix())
    }

    /// Creates a formatter that prints timestamps at a fixed UTC offset.
    #[must_use]
    pub const fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Returns the display offset.
    #[must_use]
    pub const fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Renders one sample.
    #[must_use]
    pub fn render_one(&self, sample: &Sample, mode: DetailMode) -> String {
        let bucket = sample.bucket();
        format!(
            "{}{:.1} {} {}",
            sample.severity().glyph(),
            sample.kp,
            bar_gauge(bucket),
            sample
                .timestamp
                .with_timezone(&self.offset)
                .format(mode.pattern()),
        )
    }

    /// Renders samples one per line, in input order. Empty input renders as
    /// an empty string.
    #[must_use]
    pub fn render_many(&self, samples: &[Sample], mode: DetailMode) -> String {
        samples
            .iter()
            .map(|sample| self.render_one(sample, mode))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for SampleFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Eight-cell linear gauge with `bucket` filled cells.
#[must_use]
pub fn bar_gauge(bucket: u8) -> String {
    let filled = usize::from(bucket.min(MAX_BUCKET));
    let empty = usize::from(MAX_BUCKET) - filled;

    let mut bar = String::with_capacity(usize::from(MAX_BUCKET) * BAR_FILLED.len_utf8());
    bar.extend(std::iter::repeat_n(BAR_FILLED, filled));
    bar.extend(std::iter::repeat_n(BAR_EMPTY, empty));
    bar
}
