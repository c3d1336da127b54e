use serde::Serialize;

use crate::report::report_model::{PageReport, RunReport};

/// Status feed consumed by dashboards: one item per page.
#[derive(Debug, Serialize)]
pub struct StatusFeed<'a> {
    pub generated_at: u128,
    pub items: Vec<StatusItem<'a>>,
}

#[derive(Debug, Serialize)]
pub struct StatusItem<'a> {
    pub name: &'a str,
    pub url: &'a str,
    /// `ok`, `changed`, or `error`
    pub state: &'static str,
    pub score: Option<f64>,
    pub threshold: f64,
    pub last_checked: u128,
    pub last_changed: Option<u128>,
    /// File names relative to the storage root
    pub latest_screenshot: Option<String>,
    pub latest_diff: Option<String>,
    pub error: Option<&'a str>,
}

fn state_of(page: &PageReport) -> &'static str {
    if page.outcome.is_change() {
        "changed"
    } else if page.has_failure() {
        "error"
    } else {
        "ok"
    }
}

fn file_name(path: &Option<String>) -> Option<String> {
    path.as_deref()
        .and_then(|p| std::path::Path::new(p).file_name())
        .map(|n| n.to_string_lossy().into_owned())
}

pub fn status_feed(report: &RunReport) -> StatusFeed<'_> {
    StatusFeed {
        generated_at: report.generated_at_ms,
        items: report
            .pages
            .iter()
            .map(|p| StatusItem {
                name: &p.name,
                url: &p.url,
                state: state_of(p),
                score: p.score,
                threshold: p.threshold,
                last_checked: p.checked_at_ms,
                last_changed: p.last_changed_ms,
                latest_screenshot: file_name(&p.baseline_path),
                latest_diff: file_name(&p.diff_path),
                error: p.error.as_deref(),
            })
            .collect(),
    }
}

/// Pretty-printed status feed.
pub fn generate_status_json(report: &RunReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&status_feed(report))
}
