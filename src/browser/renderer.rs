use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::browser::mask::mask_styles;
use crate::diff::bitmap::Bitmap;
use crate::error::RenderError;
use crate::page::page_model::{PageSpec, Viewport};

/// Produces a full-page bitmap for one page.
///
/// Implementations must give every call a fresh page context; nothing from a
/// previous capture may leak into the next one.
pub trait PageRenderer: Send + Sync {
    fn render(&self, spec: &PageSpec) -> Result<Bitmap, RenderError>;
}

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// Extra wall-clock time granted on top of the page timeouts for browser
/// launch and teardown before the capture process is killed.
const LAUNCH_SLACK: Duration = Duration::from_secs(30);

/// How the capture script is invoked and how long it may wait.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RendererSettings {
    #[serde(default = "default_node")]
    pub node: String,

    #[serde(default = "default_script")]
    pub script: String,

    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_ms: u64,

    #[serde(default = "default_selector_timeout")]
    pub selector_timeout_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_scale")]
    pub device_scale_factor: f64,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            node: default_node(),
            script: default_script(),
            navigation_timeout_ms: default_navigation_timeout(),
            selector_timeout_ms: default_selector_timeout(),
            user_agent: default_user_agent(),
            device_scale_factor: default_scale(),
        }
    }
}

fn default_node() -> String { "node".to_string() }
fn default_script() -> String { "node/capture.js".to_string() }
fn default_navigation_timeout() -> u64 { 60_000 }
fn default_selector_timeout() -> u64 { 30_000 }
fn default_user_agent() -> String { DEFAULT_USER_AGENT.to_string() }
fn default_scale() -> f64 { 1.0 }

/// Request handed to capture.js as its single argument.
#[derive(Debug, Serialize)]
pub struct CaptureRequest<'a> {
    pub url: &'a str,
    pub viewport: Viewport,
    #[serde(rename = "waitFor", skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<&'a str>,
    #[serde(rename = "maskStyles")]
    pub mask_styles: Vec<String>,
    pub output: String,
    #[serde(rename = "userAgent")]
    pub user_agent: &'a str,
    #[serde(rename = "navigationTimeoutMs")]
    pub navigation_timeout_ms: u64,
    #[serde(rename = "selectorTimeoutMs")]
    pub selector_timeout_ms: u64,
    #[serde(rename = "deviceScaleFactor")]
    pub device_scale_factor: f64,
}

/// Failure category reported by capture.js.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureFailure {
    NavigationTimeout,
    SelectorTimeout,
    Browser,
}

/// Last stdout line printed by capture.js.
#[derive(Debug, Deserialize)]
pub struct CaptureResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub failure: Option<CaptureFailure>,
}

impl CaptureResponse {
    /// Convert a reported failure into the matching error.
    pub fn into_error(self, spec: &PageSpec, settings: &RendererSettings) -> RenderError {
        let message = self.error.unwrap_or_else(|| "Unknown error".into());
        match self.failure {
            Some(CaptureFailure::NavigationTimeout) => RenderError::NavigationTimeout {
                url: spec.url.clone(),
                timeout_ms: settings.navigation_timeout_ms,
            },
            Some(CaptureFailure::SelectorTimeout) => RenderError::SelectorTimeout {
                selector: spec.wait_for.clone().unwrap_or_default(),
                timeout_ms: settings.selector_timeout_ms,
            },
            Some(CaptureFailure::Browser) | None => RenderError::Browser(message),
        }
    }
}

/// Launches one headless Chromium per capture through the Playwright
/// capture script, and reads back the PNG it writes.
#[derive(Debug, Clone, Default)]
pub struct PlaywrightRenderer {
    settings: RendererSettings,
}

impl PlaywrightRenderer {
    pub fn new(settings: RendererSettings) -> Self {
        Self { settings }
    }

    /// Build the request for `spec`, writing the screenshot to `output`.
    pub fn request<'a>(&'a self, spec: &'a PageSpec, output: String) -> CaptureRequest<'a> {
        CaptureRequest {
            url: &spec.url,
            viewport: spec.viewport,
            wait_for: spec.wait_for.as_deref(),
            mask_styles: mask_styles(&spec.mask),
            output,
            user_agent: &self.settings.user_agent,
            navigation_timeout_ms: self.settings.navigation_timeout_ms,
            selector_timeout_ms: self.settings.selector_timeout_ms,
            device_scale_factor: self.settings.device_scale_factor,
        }
    }

    fn deadline(&self, spec: &PageSpec) -> Duration {
        let mut budget = Duration::from_millis(self.settings.navigation_timeout_ms);
        if spec.wait_for.is_some() {
            budget += Duration::from_millis(self.settings.selector_timeout_ms);
        }
        budget + LAUNCH_SLACK
    }
}

impl PageRenderer for PlaywrightRenderer {
    fn render(&self, spec: &PageSpec) -> Result<Bitmap, RenderError> {
        let shot = tempfile::Builder::new()
            .prefix("screen-watch-")
            .suffix(".png")
            .tempfile()?
            .into_temp_path();

        let request = self.request(spec, shot.display().to_string());
        let request_json = serde_json::to_string(&request)
            .map_err(|e| RenderError::Protocol(format!("Failed to serialize request: {}", e)))?;

        debug!("Capturing '{}' ({})", spec.name, spec.url);

        let child = Command::new(&self.settings.node)
            .arg(&self.settings.script)
            .arg(&request_json)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RenderError::Spawn {
                script: self.settings.script.clone(),
                source: e,
            })?;

        let (stdout, stderr) = wait_with_deadline(child, self.deadline(spec))?;

        if !stderr.trim().is_empty() {
            trace!("[capture.js] {}", stderr.trim());
        }

        let line = stdout
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| {
                RenderError::Browser(format!(
                    "capture.js produced no output (stderr: {})",
                    stderr.trim()
                ))
            })?;

        let response: CaptureResponse = serde_json::from_str(line.trim()).map_err(|e| {
            RenderError::Protocol(format!("{} (stdout: {})", e, line.trim()))
        })?;

        if !response.success {
            return Err(response.into_error(spec, &self.settings));
        }

        let bytes = std::fs::read(&shot)?;
        Ok(Bitmap::decode(&bytes)?)
    }
}

/// Wait for the capture process, killing it once `limit` has elapsed.
/// Output pipes are drained on their own threads so a chatty browser can
/// never block on a full pipe.
fn wait_with_deadline(mut child: Child, limit: Duration) -> Result<(String, String), RenderError> {
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let started = Instant::now();

    loop {
        if child.try_wait()?.is_some() {
            break;
        }
        if started.elapsed() >= limit {
            let _ = child.kill();
            let _ = child.wait();
            return Err(RenderError::Browser(format!(
                "capture process exceeded {}s and was killed",
                limit.as_secs()
            )));
        }
        thread::sleep(Duration::from_millis(50));
    }

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();
    Ok((stdout, stderr))
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    })
}
