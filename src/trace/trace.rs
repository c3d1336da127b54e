use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::monitor::pipeline::PipelineStage;

/// One JSONL line: a page's pipeline entered `stage`.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub page: String,
    pub stage: PipelineStage,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl TraceEvent {
    pub fn now(page: &str, stage: PipelineStage) -> Self {
        Self {
            timestamp_ms: now_ms(),
            page: page.to_string(),
            stage,
            score: None,
            detail: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}

/// Milliseconds since the Unix epoch; 0 if the clock is before it.
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
