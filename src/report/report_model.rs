use serde::{Deserialize, Serialize};

use crate::monitor::pipeline::PageOutcome;

/// Result of one page's pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageReport {
    pub name: String,
    pub url: String,

    /// Sanitized storage key
    pub key: String,

    pub outcome: PageOutcome,

    /// Similarity against the previous baseline; absent on bootstrap and
    /// render failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    pub threshold: f64,

    /// Number of outlined regions in the diff
    pub regions: usize,

    /// Whether this run's capture became the baseline
    pub committed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_path: Option<String>,

    /// Cause of a render, alert, or commit failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Non-fatal remarks, e.g. a forced breach or an unreadable old baseline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    pub checked_at_ms: u128,

    /// Set to `checked_at_ms` when this run detected a change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_changed_ms: Option<u128>,

    pub duration_ms: u128,
}

impl PageReport {
    /// Pages with a failed step: render, alert delivery, or baseline commit.
    pub fn has_failure(&self) -> bool {
        self.outcome.is_failure() || self.error.is_some()
    }
}

/// Aggregated result of a full run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub total: usize,
    pub bootstrapped: usize,
    pub unchanged: usize,
    pub changed: usize,
    pub failed: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,

    pub generated_at_ms: u128,

    /// In page-list order
    pub pages: Vec<PageReport>,
}

impl RunReport {
    pub fn from_pages(pages: Vec<PageReport>, generated_at_ms: u128) -> Self {
        let count = |f: fn(&PageReport) -> bool| pages.iter().filter(|&p| f(p)).count();
        Self {
            total: pages.len(),
            bootstrapped: count(|p| p.outcome == PageOutcome::Bootstrap),
            unchanged: count(|p| p.outcome == PageOutcome::Unchanged),
            changed: count(|p| p.outcome.is_change()),
            failed: count(|p| p.has_failure()),
            duration_ms: None,
            generated_at_ms,
            pages,
        }
    }

    pub fn with_duration(mut self, duration_ms: u128) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn page(&self, name: &str) -> Option<&PageReport> {
        self.pages.iter().find(|p| p.name == name)
    }
}
