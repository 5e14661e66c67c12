//! Core types for the Kp engine.
//!
//! - [`FeedKind`]: which of the three SWPC products to read
//! - [`FeedEndpoints`]: where each product lives
//! - [`Sample`]: one normalized Kp reading
//! - [`Severity`]: the storm class a reading falls in

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kp value at or above which a forecast point is a geomagnetic storm (G1).
pub const STORM_THRESHOLD: f64 = 5.0;

/// Highest severity bucket. Raw Kp reaches 9 but buckets stop at 8.
pub const MAX_BUCKET: u8 = 8;

/// The three Kp products published by NOAA SWPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    /// Observed 3-hour planetary Kp.
    Historical,
    /// 1-minute estimated planetary Kp.
    Minute,
    /// 3-hour Kp forecast.
    Forecast,
}

impl FeedKind {
    /// Every feed kind, in declaration order.
    pub const ALL: [Self; 3] = [Self::Historical, Self::Minute, Self::Forecast];

    /// Returns the kind as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Historical => "historical",
            Self::Minute => "minute",
            Self::Forecast => "forecast",
        }
    }

    /// Column holding a numeric secondary metric, if the product has one.
    ///
    /// Only the minute product carries a fractional estimate next to the
    /// integer index. Column 2 of the historical product is the running
    /// a-index and column 2 of the forecast is an observed/predicted label.
    #[must_use]
    pub const fn fraction_column(&self) -> Option<usize> {
        match self {
            Self::Minute => Some(2),
            Self::Historical | Self::Forecast => None,
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// URLs of the three feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEndpoints {
    /// Observed 3-hour Kp.
    pub historical: String,
    /// 1-minute estimated Kp.
    pub minute: String,
    /// 3-hour forecast.
    pub forecast: String,
}

impl FeedEndpoints {
    /// Default historical product URL.
    pub const HISTORICAL: &'static str =
        "https://services.swpc.noaa.gov/products/noaa-planetary-k-index.json";
    /// Default minute product URL.
    pub const MINUTE: &'static str =
        "https://services.swpc.noaa.gov/products/noaa-estimated-planetary-k-index-1-minute.json";
    /// Default forecast product URL.
    pub const FORECAST: &'static str =
        "https://services.swpc.noaa.gov/products/noaa-planetary-k-index-forecast.json";

    /// Returns the URL serving the given feed.
    #[must_use]
    pub fn url(&self, kind: FeedKind) -> &str {
        match kind {
            FeedKind::Historical => &self.historical,
            FeedKind::Minute => &self.minute,
            FeedKind::Forecast => &self.forecast,
        }
    }
}

impl Default for FeedEndpoints {
    fn default() -> Self {
        Self {
            historical: Self::HISTORICAL.to_string(),
            minute: Self::MINUTE.to_string(),
            forecast: Self::FORECAST.to_string(),
        }
    }
}

/// One normalized Kp reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the reading applies (UTC).
    pub timestamp: DateTime<Utc>,
    /// Planetary K-index, nominally 0 to 9.
    pub kp: f64,
    /// Secondary fractional estimate, when the feed provides one.
    pub kp_fraction: Option<f64>,
}

impl Sample {
    /// Creates a sample without a secondary metric.
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, kp: f64) -> Self {
        Self {
            timestamp,
            kp,
            kp_fraction: None,
        }
    }

    /// Sets the secondary metric.
    #[must_use]
    pub const fn with_fraction(mut self, fraction: f64) -> Self {
        self.kp_fraction = Some(fraction);
        self
    }

    /// Rounded, clamped severity bucket in `0..=8`.
    #[must_use]
    pub fn bucket(&self) -> u8 {
        severity_bucket(self.kp)
    }

    /// Severity class of this reading.
    #[must_use]
    pub fn severity(&self) -> Severity {
        Severity::from_bucket(self.bucket())
    }

    /// True when the reading reaches the storm threshold.
    #[must_use]
    pub fn is_storm(&self) -> bool {
        self.kp >= STORM_THRESHOLD
    }
}

/// Ordered samples of a single feed, oldest first.
pub type Series = Vec<Sample>;

/// Keeps the samples dated at or after `now`, preserving order.
#[must_use]
pub fn upcoming(series: Series, now: DateTime<Utc>) -> Series {
    series
        .into_iter()
        .filter(|sample| sample.timestamp >= now)
        .collect()
}

/// Rounds `kp` to the nearest integer and clamps it to `0..=8`.
///
/// Halves round up (4.5 becomes 5). NaN maps to 0.
#[must_use]
pub fn severity_bucket(kp: f64) -> u8 {
    if kp.is_nan() {
        return 0;
    }
    kp.round().clamp(0.0, f64::from(MAX_BUCKET)) as u8
}

/// Storm class of a Kp bucket, following the NOAA G-scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Kp 0 to 2.
    Quiet,
    /// Kp 3.
    Unsettled,
    /// Kp 4.
    Active,
    /// Kp 5 (G1).
    MinorStorm,
    /// Kp 6 (G2).
    ModerateStorm,
    /// Kp 7 (G3).
    StrongStorm,
    /// Kp 8 and above (G4+).
    SevereStorm,
}

impl Severity {
    /// Maps a bucket to its class. Buckets above 8 are treated as 8.
    #[must_use]
    pub const fn from_bucket(bucket: u8) -> Self {
        match bucket {
            0..=2 => Self::Quiet,
            3 => Self::Unsettled,
            4 => Self::Active,
            5 => Self::MinorStorm,
            6 => Self::ModerateStorm,
            7 => Self::StrongStorm,
            _ => Self::SevereStorm,
        }
    }

    /// Colored marker shown in front of each rendered line.
    #[must_use]
    pub const fn glyph(&self) -> &'static str {
        match self {
            Self::Quiet => "🟢",
            Self::Unsettled => "🔵",
            Self::Active => "🟣",
            Self::MinorStorm => "🟡",
            Self::ModerateStorm => "🟠",
            Self::StrongStorm | Self::SevereStorm => "🔴",
        }
    }

    /// Returns the class as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Quiet => "quiet",
            Self::Unsettled => "unsettled",
            Self::Active => "active",
            Self::MinorStorm => "minor storm",
            Self::ModerateStorm => "moderate storm",
            Self::StrongStorm => "strong storm",
            Self::SevereStorm => "severe storm",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
