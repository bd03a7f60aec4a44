use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::info;

/// Start/finish bookkeeping for one `get_recommendations` run.
#[derive(Debug)]
pub struct QueryTimer {
    query: String,
    started_at: DateTime<Utc>,
    started_perf: Instant,
    completed: bool,
}

impl QueryTimer {
    pub fn start(query: &str) -> Self {
        let query = query.replace('\n', " ");
        let query = if query.chars().count() > 300 {
            query.chars().take(300).collect()
        } else {
            query
        };
        let timer = QueryTimer {
            query,
            started_at: Utc::now(),
            started_perf: Instant::now(),
            completed: false,
        };
        info!(
            target: "recommend.timing",
            "event=query_received received_at={} query={:?}",
            timer.started_at.to_rfc3339(),
            timer.query
        );
        timer
    }

    pub fn complete(&mut self, status: &str, detail: Option<String>) {
        if self.completed {
            return;
        }
        self.completed = true;
        let completed_at = Utc::now();
        let duration = self.started_perf.elapsed().as_secs_f64();
        info!(
            target: "recommend.timing",
            "event=query_completed query={:?} started_at={} completed_at={} duration_s={:.3} status={} detail={}",
            self.query,
            self.started_at.to_rfc3339(),
            completed_at.to_rfc3339(),
            duration,
            status,
            detail.unwrap_or_default()
        );
    }
}

pub async fn log_call_timing<T, F, Fut>(
    provider: &str,
    model: &str,
    operation: &str,
    metadata: Option<JsonValue>,
    call: F,
) -> Result<T, anyhow::Error>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let started_at = Utc::now();
    let started_perf = Instant::now();
    let metadata_text = metadata
        .as_ref()
        .map(|value| value.to_string())
        .unwrap_or_else(|| "{}".to_string());
    info!(
        target: "recommend.timing",
        "event=call_started provider={} model={} operation={} started_at={} metadata={}",
        provider,
        model,
        operation,
        started_at.to_rfc3339(),
        metadata_text
    );

    let result = call().await;
    let status = if result.is_err() { "error" } else { "success" };

    let completed_at = Utc::now();
    let duration = started_perf.elapsed().as_secs_f64();
    info!(
        target: "recommend.timing",
        "event=call_completed provider={} model={} operation={} completed_at={} duration_s={:.3} status={} metadata={}",
        provider,
        model,
        operation,
        completed_at.to_rfc3339(),
        duration,
        status,
        metadata_text
    );

    result
}
