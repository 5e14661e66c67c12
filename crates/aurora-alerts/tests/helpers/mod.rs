//! Shared doubles for the aurora-alerts integration tests.

#![allow(dead_code)]

pub mod http;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use aurora_alerts::{
    AlertError, ChatTarget, FeedKind, FeedSource, FetchError, Messenger, Series, parse_series,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::{Value, json};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
}

/// Builds an SWPC-style document: header row plus one row per kp value.
pub fn document(start: DateTime<Utc>, step: Duration, kps: &[f64]) -> Value {
    let mut rows = vec![json!(["time_tag", "kp"])];
    for (i, kp) in kps.iter().enumerate() {
        let ts = start + step * i as i32;
        rows.push(json!([
            ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            format!("{kp:.2}")
        ]));
    }
    Value::Array(rows)
}

/// Serves raw JSON documents through the real feed parser.
#[derive(Debug, Default)]
pub struct JsonFeed {
    documents: Mutex<HashMap<FeedKind, Value>>,
}

impl JsonFeed {
    pub fn set(&self, kind: FeedKind, document: Value) {
        self.documents.lock().insert(kind, document);
    }
}

impl FeedSource for JsonFeed {
    fn fetch<'a>(
        &'a self,
        kind: FeedKind,
    ) -> Pin<Box<dyn Future<Output = Result<Series, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let document = self
                .documents
                .lock()
                .get(&kind)
                .cloned()
                .ok_or_else(|| FetchError::Request {
                    url: format!("test://{kind}"),
                    reason: "no document".to_string(),
                })?;
            parse_series(kind, &document)
        })
    }
}

#[derive(Debug, Default)]
pub struct Outbox {
    sent: Mutex<Vec<(ChatTarget, String)>>,
}

impl Outbox {
    pub fn sent(&self) -> Vec<(ChatTarget, String)> {
        self.sent.lock().clone()
    }
}

impl Messenger for Outbox {
    fn name(&self) -> &str {
        "outbox"
    }

    fn send_message<'a>(
        &'a self,
        target: ChatTarget,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), AlertError>> + Send + 'a>> {
        Box::pin(async move {
            self.sent.lock().push((target, text.to_string()));
            Ok(())
        })
    }
}
