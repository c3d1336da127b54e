use crate::monitor::pipeline::PageOutcome;
use crate::report::report_model::RunReport;

// ============================================================================
// Console reporter: formatted terminal output
// ============================================================================

/// Format a run report for terminal output.
///
/// Produces output like:
/// ```text
/// === Visual check: 3 pages ===
///
/// + NEW      Home  (baseline created)
/// = SAME     Pricing  score 0.9991
/// ! CHANGED  Blog  score 0.9500 < 0.9800, 2 regions, alert sent
///     [ERROR] alert delivery failed: Webhook returned 500: boom
///
/// === Results: 1 bootstrapped, 1 unchanged, 1 changed, 0 failed in 4.2s ===
/// ```
pub fn format_console_report(report: &RunReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Visual check: {} pages ===\n\n", report.total));

    for page in &report.pages {
        let marker = match page.outcome {
            PageOutcome::Bootstrap => "+ NEW    ",
            PageOutcome::Unchanged => "= SAME   ",
            PageOutcome::ChangedAlerted | PageOutcome::ChangedAlertFailed => "! CHANGED",
            PageOutcome::RenderFailed => "x FAILED ",
        };

        let detail = match (page.outcome, page.score) {
            (PageOutcome::Bootstrap, _) => "(baseline created)".to_string(),
            (PageOutcome::RenderFailed, _) => "(baseline untouched)".to_string(),
            (PageOutcome::Unchanged, Some(score)) => format!("score {:.4}", score),
            (outcome, Some(score)) => format!(
                "score {:.4} < {:.4}, {} regions, {}",
                score,
                page.threshold,
                page.regions,
                if outcome == PageOutcome::ChangedAlerted {
                    "alert sent"
                } else {
                    "alert NOT sent"
                }
            ),
            (_, None) => String::new(),
        };

        out.push_str(&format!("{}  {}  {}\n", marker, page.name, detail));

        if let Some(ref note) = page.note {
            out.push_str(&format!("    [NOTE] {}\n", note));
        }
        if let Some(ref error) = page.error {
            out.push_str(&format!("    [ERROR] {}\n", error));
        }
    }

    out.push_str(&format!(
        "\n=== Results: {} bootstrapped, {} unchanged, {} changed, {} failed",
        report.bootstrapped, report.unchanged, report.changed, report.failed
    ));

    if let Some(ms) = report.duration_ms {
        let secs = ms as f64 / 1000.0;
        out.push_str(&format!(" in {:.1}s", secs));
    }

    out.push_str(" ===\n");

    out
}
