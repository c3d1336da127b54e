use std::path::PathBuf;

use thiserror::Error;

/// Page list or settings could not be loaded. Fatal: the run aborts before
/// any page is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed YAML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid page '{page}': {reason}")]
    InvalidPage { page: String, reason: String },

    #[error("Duplicate page name '{0}'")]
    DuplicateName(String),

    #[error("Pages '{first}' and '{second}' map to the same storage key '{key}'")]
    KeyCollision {
        first: String,
        second: String,
        key: String,
    },

    #[error("Invalid setting '{field}': {reason}")]
    InvalidSetting { field: &'static str, reason: String },
}

/// Capture of a single page failed. Recovered per page.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Node.js subprocess failed to spawn
    #[error("Failed to spawn {script} (is Node.js installed?): {source}")]
    Spawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("Selector '{selector}' did not appear within {timeout_ms}ms")]
    SelectorTimeout { selector: String, timeout_ms: u64 },

    /// Browser launch, crash, or any other failure reported by the capture script
    #[error("Browser failure: {0}")]
    Browser(String),

    #[error("Unreadable response from capture script: {0}")]
    Protocol(String),

    #[error("Screenshot could not be decoded: {0}")]
    Decode(#[from] image::ImageError),

    #[error("I/O error during capture: {0}")]
    Io(#[from] std::io::Error),
}

/// The two bitmaps cannot be compared structurally.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DiffError {
    #[error("Dimension mismatch: baseline {baseline:?} vs current {current:?}")]
    DimensionMismatch {
        baseline: (u32, u32),
        current: (u32, u32),
    },

    #[error("Image {width}x{height} is smaller than the {window}x{window} similarity window")]
    TooSmall { width: u32, height: u32, window: u32 },

    #[error("Similarity computation failed: {0}")]
    Similarity(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No baseline stored for '{0}'")]
    NotFound(String),

    #[error("Storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored image is unreadable: {0}")]
    Image(#[from] image::ImageError),
}

/// Alert delivery failed. Logged, never fatal.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Webhook returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Alert payload could not be built: {0}")]
    Payload(String),
}
