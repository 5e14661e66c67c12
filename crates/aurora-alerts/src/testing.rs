//! In-memory doubles shared by the unit tests.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

use crate::channels::{ChatTarget, Messenger};
use crate::error::{AlertError, FetchError, Result};
use crate::feed::FeedSource;
use crate::types::{FeedKind, Sample, Series};

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
}

/// Samples starting at `start`, spaced `step` apart, one per kp value.
pub(crate) fn series_from(start: DateTime<Utc>, step: Duration, kps: &[f64]) -> Series {
    kps.iter()
        .enumerate()
        .map(|(i, kp)| Sample::new(start + step * i as i32, *kp))
        .collect()
}

#[derive(Debug, Default)]
pub(crate) struct StubFeed {
    series: Mutex<HashMap<FeedKind, Series>>,
    failing: AtomicBool,
    fetches: AtomicUsize,
}

impl StubFeed {
    pub(crate) fn set(&self, kind: FeedKind, series: Series) {
        self.series.lock().insert(kind, series);
    }

    pub(crate) fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl FeedSource for StubFeed {
    fn fetch<'a>(
        &'a self,
        kind: FeedKind,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<Series, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(FetchError::Status {
                    url: format!("stub://{kind}"),
                    status: 503,
                });
            }
            Ok(self.series.lock().get(&kind).cloned().unwrap_or_default())
        })
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingMessenger {
    sent: Mutex<Vec<(ChatTarget, String)>>,
    failing: AtomicBool,
}

impl RecordingMessenger {
    pub(crate) fn sent(&self) -> Vec<(ChatTarget, String)> {
        self.sent.lock().clone()
    }

    pub(crate) fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Messenger for RecordingMessenger {
    fn name(&self) -> &str {
        "recording"
    }

    fn send_message<'a>(
        &'a self,
        target: ChatTarget,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if self.failing.load(Ordering::SeqCst) {
                return Err(AlertError::NotificationFailed {
                    reason: "recording messenger set to fail".to_string(),
                });
            }
            self.sent.lock().push((target, text.to_string()));
            Ok(())
        })
    }
}
