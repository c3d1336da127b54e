use std::path::Path;

use log::{info, warn};

use crate::alert::dispatcher::{AlertSink, LogDispatcher, WebhookDispatcher};
use crate::browser::renderer::PlaywrightRenderer;
use crate::cli::config::{build_monitor_config, AppConfig, RunOverrides, WEBHOOK_ENV};
use crate::diff::bitmap::Bitmap;
use crate::diff::differ::compare;
use crate::monitor::orchestrator::{Monitor, MonitorConfig};
use crate::monitor::pipeline::is_breach;
use crate::page::page_model::load_pages;
use crate::report::console::format_console_report;
use crate::report::json::generate_status_json;
use crate::report::report_model::RunReport;
use crate::store::baseline::BaselineStore;
use crate::trace::logger::TraceLogger;

// ============================================================================
// run subcommand
// ============================================================================

/// Everything `run` needs beyond the settings file.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub pages: Option<String>,
    pub overrides: RunOverrides,
    pub format: String,
    pub output: Option<String>,
    pub trace: Option<String>,
}

/// Run one monitoring pass over every configured page.
///
/// Configuration problems are returned as errors before any page is touched;
/// per-page failures only show up in the returned report.
pub fn cmd_run(args: &RunArgs, config: &AppConfig) -> Result<RunReport, Box<dyn std::error::Error>> {
    let monitor_config = build_monitor_config(
        &args.overrides,
        config,
        std::env::var(WEBHOOK_ENV).ok(),
    )?;
    let pages_path = args.pages.as_deref().unwrap_or(&config.pages);
    let pages = load_pages(Path::new(pages_path))?;

    info!(
        "Checking {} pages (threshold {:.4}, storage {})",
        pages.len(),
        monitor_config.threshold,
        monitor_config.storage_root.display()
    );

    let store = BaselineStore::open(&monitor_config.storage_root)?;
    let renderer = PlaywrightRenderer::new(config.renderer.clone());
    let sink = build_sink(&monitor_config)?;
    let tracer = match &args.trace {
        Some(path) => TraceLogger::open(Path::new(path)),
        None => TraceLogger::disabled(),
    };

    let monitor = Monitor::new(&monitor_config, Box::new(renderer), sink, store).with_tracer(tracer);
    let report = monitor.run(&pages)?;

    let output_content = match args.format.as_str() {
        "json" => generate_status_json(&report)?,
        _ => format_console_report(&report),
    };

    match &args.output {
        Some(path) => std::fs::write(path, &output_content)?,
        None => print!("{}", output_content),
    }

    Ok(report)
}

/// Webhook dispatcher when a URL is configured, log-only otherwise.
fn build_sink(config: &MonitorConfig) -> Result<Box<dyn AlertSink>, Box<dyn std::error::Error>> {
    match &config.webhook_url {
        Some(url) => Ok(Box::new(WebhookDispatcher::new(url)?)),
        None => {
            warn!("No webhook configured (set {} or webhook_url); alerts will only be logged", WEBHOOK_ENV);
            Ok(Box::new(LogDispatcher))
        }
    }
}

// ============================================================================
// compare subcommand
// ============================================================================

/// Compare two image files; prints the score and returns whether it breaches.
pub fn cmd_compare(
    baseline: &str,
    current: &str,
    out: Option<&str>,
    threshold: f64,
) -> Result<bool, Box<dyn std::error::Error>> {
    let baseline = Bitmap::decode(&std::fs::read(baseline)?)?;
    let current = Bitmap::decode(&std::fs::read(current)?)?;

    let diff = compare(&baseline, &current)?;

    if let Some(path) = out {
        std::fs::write(path, diff.annotated.encode_png()?)?;
        info!("Wrote annotated diff to {}", path);
    }

    let breach = is_breach(diff.score, threshold);
    println!(
        "Similarity score: {:.4} ({} changed regions): {}",
        diff.score,
        diff.regions.len(),
        if breach { "CHANGED" } else { "unchanged" }
    );
    for region in &diff.regions {
        println!(
            "  region x={} y={} w={} h={}",
            region.x, region.y, region.width, region.height
        );
    }

    Ok(breach)
}

// ============================================================================
// validate subcommand
// ============================================================================

pub fn cmd_validate(pages_path: &str, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pages = load_pages(Path::new(pages_path))?;
    let store_root = Path::new(&config.storage_root);

    println!("{} pages OK in {}", pages.len(), pages_path);
    for page in &pages {
        println!(
            "  {} -> {} [{}x{}] key={}",
            page.name,
            page.url,
            page.viewport.width,
            page.viewport.height,
            store_root.join(format!("{}.png", page.storage_key())).display()
        );
        if let Some(selector) = &page.wait_for {
            println!("      wait_for: {}", selector);
        }
        if !page.mask.is_empty() {
            println!("      mask: {}", page.mask.join(", "));
        }
    }
    Ok(())
}
