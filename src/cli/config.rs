use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::browser::renderer::RendererSettings;
use crate::error::ConfigError;
use crate::monitor::orchestrator::{MonitorConfig, DEFAULT_THRESHOLD};

/// Environment variable consulted when no webhook is given on the command
/// line or in the settings file.
pub const WEBHOOK_ENV: &str = "DISCORD_WEBHOOK";

pub const DEFAULT_CONFIG_FILE: &str = "screen-watch.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "screen-watch",
    version,
    about = "Screenshot-based visual change monitor"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to settings file (default: screen-watch.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture every configured page, compare against its baseline, alert on change
    Run {
        /// Page list YAML file
        #[arg(long)]
        pages: Option<String>,

        /// Directory holding baselines and diff images
        #[arg(long)]
        storage_root: Option<String>,

        /// Similarity below which an alert is sent
        #[arg(long)]
        threshold: Option<f64>,

        /// Webhook receiving alerts
        #[arg(long)]
        webhook_url: Option<String>,

        /// Pages captured concurrently
        #[arg(long)]
        jobs: Option<usize>,

        /// Output format: console, json
        #[arg(long, default_value = "console")]
        format: String,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<String>,

        /// Append pipeline stage events to this JSONL file
        #[arg(long)]
        trace: Option<String>,
    },

    /// Compare two PNG files and write the annotated diff
    Compare {
        baseline: String,
        current: String,

        /// Where to write the annotated diff
        #[arg(long)]
        out: Option<String>,

        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Load and check the page list without capturing anything
    Validate {
        #[arg(long)]
        pages: Option<String>,
    },
}

// ============================================================================
// Settings File Model (optional YAML)
// ============================================================================

/// Optional YAML settings file: `screen-watch.yaml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default = "default_storage_root")]
    pub storage_root: String,

    #[serde(default = "default_pages")]
    pub pages: String,

    #[serde(default = "default_jobs")]
    pub jobs: usize,

    #[serde(default)]
    pub renderer: RendererSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            webhook_url: None,
            storage_root: default_storage_root(),
            pages: default_pages(),
            jobs: default_jobs(),
            renderer: RendererSettings::default(),
        }
    }
}

// Serde default helpers
fn default_threshold() -> f64 { DEFAULT_THRESHOLD }
fn default_storage_root() -> String { "screenshots".to_string() }
fn default_pages() -> String { "pages.yaml".to_string() }
fn default_jobs() -> usize { 1 }

// ============================================================================
// Settings File Loading
// ============================================================================

/// Load settings from YAML.
///
/// With no explicit path a missing default file yields defaults. An explicit
/// path that cannot be read, or any malformed file, is an error.
pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let explicit = path.is_some();
    let config_path = Path::new(path.unwrap_or(DEFAULT_CONFIG_FILE));

    let content = match std::fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(AppConfig::default());
        }
        Err(e) => {
            return Err(ConfigError::Read {
                path: config_path.to_path_buf(),
                source: e,
            });
        }
    };

    parse_config(&content, config_path)
}

pub fn parse_config(content: &str, origin: &Path) -> Result<AppConfig, ConfigError> {
    if content.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
        path: origin.to_path_buf(),
        source: e,
    })
}

// ============================================================================
// Config Builders (merge CLI args with settings file)
// ============================================================================

/// Command-line overrides for a monitoring run.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub storage_root: Option<String>,
    pub threshold: Option<f64>,
    pub webhook_url: Option<String>,
    pub jobs: Option<usize>,
}

/// Resolve the monitor configuration: CLI > settings file > environment > defaults.
pub fn build_monitor_config(
    overrides: &RunOverrides,
    config: &AppConfig,
    env_webhook: Option<String>,
) -> Result<MonitorConfig, ConfigError> {
    let webhook_url = overrides
        .webhook_url
        .clone()
        .or_else(|| config.webhook_url.clone())
        .or(env_webhook)
        .filter(|u| !u.trim().is_empty());

    let resolved = MonitorConfig {
        threshold: overrides.threshold.unwrap_or(config.threshold),
        webhook_url,
        storage_root: PathBuf::from(
            overrides
                .storage_root
                .as_deref()
                .unwrap_or(&config.storage_root),
        ),
        jobs: overrides.jobs.unwrap_or(config.jobs),
    };
    resolved.validate()?;
    Ok(resolved)
}
