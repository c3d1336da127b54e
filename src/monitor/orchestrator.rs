use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use log::{debug, error, info, warn};

use crate::alert::dispatcher::{AlertEvent, AlertSink};
use crate::browser::renderer::PageRenderer;
use crate::diff::bitmap::Bitmap;
use crate::diff::differ::compare;
use crate::error::ConfigError;
use crate::monitor::pipeline::{is_breach, PageOutcome, PipelineStage};
use crate::page::page_model::{validate_pages, PageSpec};
use crate::report::report_model::{PageReport, RunReport};
use crate::store::baseline::BaselineStore;
use crate::trace::logger::TraceLogger;
use crate::trace::trace::{now_ms, TraceEvent};

pub const DEFAULT_THRESHOLD: f64 = 0.98;

/// Deployment-wide settings the pipeline runs under.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Alert when similarity drops below this; in (0, 1]
    pub threshold: f64,

    /// `None` means alerts are only logged
    pub webhook_url: Option<String>,

    pub storage_root: PathBuf,

    /// Pages processed concurrently; 1 = strictly sequential
    pub jobs: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            webhook_url: None,
            storage_root: PathBuf::from("screenshots"),
            jobs: 1,
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(ConfigError::InvalidSetting {
                field: "threshold",
                reason: format!("{} is outside (0, 1]", self.threshold),
            });
        }
        if self.jobs == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "jobs",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// What the comparison step concluded.
struct Verdict {
    score: f64,
    regions: usize,
    /// Image attached to an alert
    evidence: Bitmap,
    diff_path: Option<String>,
    note: Option<String>,
}

/// Runs render -> compare -> alert -> commit for each page.
///
/// Pages are independent: a failure in one is recorded on its report and
/// never stops the others. Baseline keys are disjoint per page, so workers
/// never write the same file.
pub struct Monitor {
    threshold: f64,
    jobs: usize,
    renderer: Box<dyn PageRenderer>,
    sink: Box<dyn AlertSink>,
    store: BaselineStore,
    tracer: TraceLogger,
}

impl Monitor {
    pub fn new(
        config: &MonitorConfig,
        renderer: Box<dyn PageRenderer>,
        sink: Box<dyn AlertSink>,
        store: BaselineStore,
    ) -> Self {
        Self {
            threshold: config.threshold,
            jobs: config.jobs.max(1),
            renderer,
            sink,
            store,
            tracer: TraceLogger::disabled(),
        }
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = tracer;
        self
    }

    /// Process every page and collect one report per page, in input order.
    pub fn run(&self, pages: &[PageSpec]) -> Result<RunReport, ConfigError> {
        validate_pages(pages)?;
        let started = Instant::now();

        let reports = if self.jobs <= 1 || pages.len() <= 1 {
            pages.iter().map(|p| self.run_page(p)).collect()
        } else {
            self.run_parallel(pages)
        };

        Ok(RunReport::from_pages(reports, now_ms()).with_duration(started.elapsed().as_millis()))
    }

    fn run_parallel(&self, pages: &[PageSpec]) -> Vec<PageReport> {
        let next = AtomicUsize::new(0);
        let slots: Mutex<Vec<Option<PageReport>>> = Mutex::new(vec![None; pages.len()]);
        let workers = self.jobs.min(pages.len());
        debug!("Running {} pages on {} workers", pages.len(), workers);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        let i = next.fetch_add(1, Ordering::SeqCst);
                        let Some(page) = pages.get(i) else { break };
                        let report = self.run_page(page);
                        if let Ok(mut slots) = slots.lock() {
                            slots[i] = Some(report);
                        }
                    }
                });
            }
        });

        slots
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .into_iter()
            .flatten()
            .collect()
    }

    /// Run the full pipeline for one page.
    pub fn run_page(&self, spec: &PageSpec) -> PageReport {
        let started = Instant::now();
        let key = spec.storage_key();
        let mut report = PageReport {
            name: spec.name.clone(),
            url: spec.url.clone(),
            key: key.clone(),
            outcome: PageOutcome::Bootstrap,
            score: None,
            threshold: self.threshold,
            regions: 0,
            committed: false,
            baseline_path: None,
            diff_path: None,
            error: None,
            note: None,
            checked_at_ms: now_ms(),
            last_changed_ms: None,
            duration_ms: 0,
        };

        self.tracer.stage(&spec.name, PipelineStage::Start);

        let current = match self.renderer.render(spec) {
            Ok(bitmap) => bitmap,
            Err(e) => {
                warn!("[{}] render failed: {}", spec.name, e);
                report.outcome = PageOutcome::RenderFailed;
                report.error = Some(e.to_string());
                return self.finish(report, started);
            }
        };
        self.tracer.stage(&spec.name, PipelineStage::Rendered);

        match self.previous_baseline(spec, &mut report) {
            None => report.outcome = PageOutcome::Bootstrap,
            Some(baseline) => {
                let verdict = self.evaluate(spec, &baseline, &current);
                self.tracer.emit(
                    &TraceEvent::now(&spec.name, PipelineStage::Compared).with_score(verdict.score),
                );

                report.score = Some(verdict.score);
                report.regions = verdict.regions;
                report.diff_path = verdict.diff_path.clone();
                if verdict.note.is_some() {
                    report.note = verdict.note.clone();
                }

                report.outcome = if is_breach(verdict.score, self.threshold) {
                    report.last_changed_ms = Some(report.checked_at_ms);
                    self.dispatch(spec, &key, verdict, &mut report)
                } else {
                    PageOutcome::Unchanged
                };
            }
        }

        match self.store.commit(&spec.name, &current) {
            Ok(path) => {
                report.committed = true;
                report.baseline_path = Some(path.display().to_string());
                self.tracer.stage(&spec.name, PipelineStage::Committed);
            }
            Err(e) => {
                error!("[{}] baseline commit failed: {}", spec.name, e);
                let cause = format!("baseline commit failed: {}", e);
                report.error = Some(match report.error.take() {
                    Some(prev) => format!("{}; {}", prev, cause),
                    None => cause,
                });
            }
        }

        self.finish(report, started)
    }

    /// Load the stored baseline, treating an unreadable one as absent.
    fn previous_baseline(&self, spec: &PageSpec, report: &mut PageReport) -> Option<Bitmap> {
        if !self.store.exists(&spec.name) {
            return None;
        }
        match self.store.load(&spec.name) {
            Ok(bitmap) => Some(bitmap),
            Err(e) => {
                warn!("[{}] stored baseline unreadable, re-bootstrapping: {}", spec.name, e);
                report.note = Some(format!("previous baseline unreadable: {}", e));
                None
            }
        }
    }

    fn evaluate(&self, spec: &PageSpec, baseline: &Bitmap, current: &Bitmap) -> Verdict {
        if baseline.fingerprint() == current.fingerprint() {
            debug!("[{}] capture is pixel-identical to baseline", spec.name);
            return Verdict {
                score: 1.0,
                regions: 0,
                evidence: current.clone(),
                diff_path: None,
                note: None,
            };
        }

        match compare(baseline, current) {
            Ok(diff) => {
                let diff_path = if diff.regions.is_empty() {
                    None
                } else {
                    match self.store.save_diff(&spec.name, &diff.annotated) {
                        Ok(path) => Some(path.display().to_string()),
                        Err(e) => {
                            warn!("[{}] could not write diff image: {}", spec.name, e);
                            None
                        }
                    }
                };
                Verdict {
                    score: diff.score,
                    regions: diff.regions.len(),
                    evidence: diff.annotated,
                    diff_path,
                    note: None,
                }
            }
            Err(e) => {
                warn!("[{}] forcing breach, images not comparable: {}", spec.name, e);
                Verdict {
                    score: 0.0,
                    regions: 0,
                    evidence: current.clone(),
                    diff_path: None,
                    note: Some(format!("forced breach: {}", e)),
                }
            }
        }
    }

    fn dispatch(
        &self,
        spec: &PageSpec,
        key: &str,
        verdict: Verdict,
        report: &mut PageReport,
    ) -> PageOutcome {
        let event = AlertEvent {
            page_name: spec.name.clone(),
            url: spec.url.clone(),
            score: verdict.score,
            threshold: self.threshold,
            image: verdict.evidence,
            attachment_name: format!("{}_diff.png", key),
            note: verdict.note,
        };

        match self.sink.notify(&event) {
            Ok(()) => {
                self.tracer.stage(&spec.name, PipelineStage::Alerted);
                PageOutcome::ChangedAlerted
            }
            Err(e) => {
                warn!("[{}] alert delivery failed: {}", spec.name, e);
                report.error = Some(format!("alert delivery failed: {}", e));
                PageOutcome::ChangedAlertFailed
            }
        }
    }

    fn finish(&self, mut report: PageReport, started: Instant) -> PageReport {
        report.duration_ms = started.elapsed().as_millis();
        self.tracer
            .emit(&TraceEvent::now(&report.name, PipelineStage::Done).with_detail(report.outcome.label()));

        let score = report
            .score
            .map(|s| format!("{:.4}", s))
            .unwrap_or_else(|| "-".to_string());
        if report.has_failure() {
            warn!("[{}] {} (score {})", report.name, report.outcome.label(), score);
        } else {
            info!("[{}] {} (score {})", report.name, report.outcome.label(), score);
        }
        report
    }
}
