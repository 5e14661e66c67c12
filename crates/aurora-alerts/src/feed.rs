//! Kp feed retrieval and normalization.
//!
//! SWPC publishes each product as a JSON array of rows. Row 0 names the
//! columns and is discarded; every other row starts with
//! `[timestamp, kp, ...]`. [`parse_series`] turns such a document into a
//! [`Series`], and [`HttpFeedSource`] fetches documents over HTTP.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AlertError, FetchError, Result};
use crate::types::{FeedEndpoints, FeedKind, Sample, Series};

/// Timestamp layouts seen in SWPC products, tried in order after RFC 3339.
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Largest Kp value the index can take.
const KP_MAX: f64 = 9.0;

/// A source of Kp series.
///
/// Every call performs a fresh fetch; implementations must not cache.
pub trait FeedSource: Send + Sync + fmt::Debug {
    /// Fetches and normalizes one feed.
    fn fetch<'a>(
        &'a self,
        kind: FeedKind,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<Series, FetchError>> + Send + 'a>>;
}

/// Fetches feeds from their HTTP endpoints.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: reqwest::Client,
    endpoints: FeedEndpoints,
}

impl HttpFeedSource {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a source for the given endpoints.
    ///
    /// `timeout` bounds each request end to end; keep it below the alert
    /// tick period so a hung fetch cannot hold up the next tick.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConfig` if the HTTP client cannot be built.
    pub fn new(endpoints: FeedEndpoints, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("aurora-alerts/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AlertError::InvalidConfig {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client, endpoints })
    }

    /// Returns the configured endpoints.
    #[must_use]
    pub const fn endpoints(&self) -> &FeedEndpoints {
        &self.endpoints
    }

    async fn fetch_document(&self, url: &str) -> std::result::Result<Value, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| FetchError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(serde_json::from_slice(&body)?)
    }
}

impl FeedSource for HttpFeedSource {
    fn fetch<'a>(
        &'a self,
        kind: FeedKind,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<Series, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.endpoints.url(kind);
            debug!(feed = %kind, url = %url, "fetching feed");

            let series = self
                .fetch_document(url)
                .await
                .and_then(|body| parse_series(kind, &body))
                .inspect_err(|e| warn!(feed = %kind, error = %e, "feed fetch failed"))?;

            debug!(feed = %kind, samples = series.len(), "fetched feed");
            Ok(series)
        })
    }
}

/// Normalizes a feed document into a series.
///
/// The header row is dropped, so the result holds exactly one sample per
/// remaining row, in document order. Any bad row fails the whole document.
///
/// # Errors
///
/// Returns `FetchError::Shape` if the document is not an array of arrays or
/// lacks the header row, and `FetchError::MalformedRow` if a row cannot be
/// parsed.
pub fn parse_series(kind: FeedKind, body: &Value) -> std::result::Result<Series, FetchError> {
    let rows = body.as_array().ok_or_else(|| FetchError::Shape {
        reason: "document is not an array".to_string(),
    })?;

    if rows.is_empty() {
        return Err(FetchError::Shape {
            reason: "document has no header row".to_string(),
        });
    }

    rows.iter()
        .enumerate()
        .skip(1)
        .map(|(index, row)| parse_row(kind, index, row))
        .collect()
}

fn parse_row(kind: FeedKind, index: usize, row: &Value) -> std::result::Result<Sample, FetchError> {
    let cells = row.as_array().ok_or_else(|| FetchError::Shape {
        reason: format!("row {index} is not an array"),
    })?;

    let malformed = |reason: String| FetchError::MalformedRow { row: index, reason };

    let time_cell = cells
        .first()
        .ok_or_else(|| malformed("missing timestamp".to_string()))?;
    let timestamp = time_cell
        .as_str()
        .and_then(parse_timestamp)
        .ok_or_else(|| malformed(format!("invalid timestamp {time_cell}")))?;

    let kp_cell = cells
        .get(1)
        .ok_or_else(|| malformed("missing kp".to_string()))?;
    let kp = parse_number(kp_cell)
        .filter(|kp| (0.0..=KP_MAX).contains(kp))
        .ok_or_else(|| malformed(format!("invalid kp {kp_cell}")))?;

    let kp_fraction = match kind.fraction_column().and_then(|column| cells.get(column)) {
        None | Some(Value::Null) => None,
        Some(cell) => Some(
            parse_number(cell).ok_or_else(|| malformed(format!("invalid kp fraction {cell}")))?,
        ),
    };

    Ok(Sample {
        timestamp,
        kp,
        kp_fraction,
    })
}

/// Parses an SWPC timestamp. Values without an offset are UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Reads a finite number from a string or numeric cell.
fn parse_number(cell: &Value) -> Option<f64> {
    match cell {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}
