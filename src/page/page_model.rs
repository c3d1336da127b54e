use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Browser viewport in CSS pixels. Written as `[width, height]` in YAML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl From<(u32, u32)> for Viewport {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl From<Viewport> for (u32, u32) {
    fn from(v: Viewport) -> Self {
        (v.width, v.height)
    }
}

/// One monitored target. Immutable once loaded; drives exactly one
/// pipeline execution per run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageSpec {
    /// Unique identifier; also the source of the storage key
    pub name: String,

    pub url: String,

    pub viewport: Viewport,

    /// Selector the capture blocks on before taking the screenshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<String>,

    /// Selectors hidden before capture, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mask: Vec<String>,
}

impl PageSpec {
    /// Filesystem-safe token derived from `name`.
    pub fn storage_key(&self) -> String {
        sanitize_name(&self.name)
    }
}

/// Top-level shape of the page list file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageList {
    pub pages: Vec<PageSpec>,
}

/// Normalize whitespace and path-unsafe characters into `_`.
///
/// `"Pricing page"` becomes `"Pricing_page"`; `"a/b"` becomes `"a_b"`.
/// Case is preserved, so two names differing only by case stay distinct.
pub fn sanitize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Load and validate the page list. Any problem here is fatal for the run.
pub fn load_pages(path: &Path) -> Result<Vec<PageSpec>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_pages(&content, path)
}

/// Parse a page list document; `origin` is only used in error messages.
pub fn parse_pages(content: &str, origin: &Path) -> Result<Vec<PageSpec>, ConfigError> {
    let list: PageList = serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
        path: origin.to_path_buf(),
        source: e,
    })?;
    validate_pages(&list.pages)?;
    Ok(list.pages)
}

/// Check per-entry fields and cross-entry uniqueness of names and keys.
pub fn validate_pages(pages: &[PageSpec]) -> Result<(), ConfigError> {
    let mut keys: HashMap<String, &str> = HashMap::new();

    for page in pages {
        let invalid = |reason: &str| ConfigError::InvalidPage {
            page: page.name.clone(),
            reason: reason.to_string(),
        };

        if page.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if page.url.trim().is_empty() {
            return Err(invalid("url is empty"));
        }
        if page.viewport.width == 0 || page.viewport.height == 0 {
            return Err(invalid("viewport dimensions must be positive"));
        }
        if page.mask.iter().any(|s| s.trim().is_empty()) {
            return Err(invalid("mask contains an empty selector"));
        }
        if page.mask.iter().any(|s| s.contains(['{', '}'])) {
            return Err(invalid("mask selector must not contain '{' or '}'"));
        }

        let key = page.storage_key();
        if let Some(first) = keys.get(&key) {
            if *first == page.name {
                return Err(ConfigError::DuplicateName(page.name.clone()));
            }
            return Err(ConfigError::KeyCollision {
                first: first.to_string(),
                second: page.name.clone(),
                key,
            });
        }
        keys.insert(key, &page.name);
    }

    Ok(())
}
