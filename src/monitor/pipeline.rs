use serde::{Deserialize, Serialize};

/// Stages a single page passes through during one run.
///
/// ```text
/// Start -> Rendered -> [Compared -> [Alerted]] -> Committed -> Done
///   \-> Done   (render failed: baseline untouched)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Start,
    Rendered,
    Compared,
    Alerted,
    Committed,
    Done,
}

/// What happened to a page during a run. Exactly one per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageOutcome {
    /// No baseline existed; the capture became the first one
    Bootstrap,

    /// Score at or above the threshold
    Unchanged,

    /// Score below the threshold and the alert went out
    ChangedAlerted,

    /// Score below the threshold but delivery failed
    ChangedAlertFailed,

    /// Capture failed; baseline left as it was
    RenderFailed,
}

impl PageOutcome {
    pub fn is_change(&self) -> bool {
        matches!(self, PageOutcome::ChangedAlerted | PageOutcome::ChangedAlertFailed)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, PageOutcome::ChangedAlertFailed | PageOutcome::RenderFailed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PageOutcome::Bootstrap => "bootstrap",
            PageOutcome::Unchanged => "unchanged",
            PageOutcome::ChangedAlerted => "changed+alerted",
            PageOutcome::ChangedAlertFailed => "changed+alert-failed",
            PageOutcome::RenderFailed => "render-failed",
        }
    }
}

/// Whether `score` counts as a breach of `threshold`.
pub fn is_breach(score: f64, threshold: f64) -> bool {
    score < threshold
}
