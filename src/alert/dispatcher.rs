use std::time::Duration;

use log::{info, warn};
use reqwest::blocking::multipart::{Form, Part};
use serde_json::json;

use crate::diff::bitmap::Bitmap;
use crate::error::DispatchError;

/// A threshold breach for one page.
#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub page_name: String,
    pub url: String,
    pub score: f64,
    pub threshold: f64,

    /// Annotated diff, or the raw capture when no diff could be computed
    pub image: Bitmap,

    /// File name the image is attached under
    pub attachment_name: String,

    /// Extra context, e.g. why the comparison was forced to fail
    pub note: Option<String>,
}

/// Delivers alerts. Failures are reported to the caller, who logs them and
/// carries on.
pub trait AlertSink: Send + Sync {
    fn notify(&self, event: &AlertEvent) -> Result<(), DispatchError>;
}

/// Human-readable alert text. The score always has four decimals.
pub fn format_alert_message(event: &AlertEvent) -> String {
    let mut msg = format!(
        "\u{1F6A8} **Visual change detected**\n**{}**\n{}\nSimilarity score: `{:.4}` (threshold {:.4})",
        event.page_name, event.url, event.score, event.threshold
    );
    if let Some(note) = &event.note {
        msg.push_str(&format!("\n_{}_", note));
    }
    msg
}

/// Posts a Discord-style multipart message: a `payload_json` part holding
/// `{"content": ...}` and the image as part `file`.
pub struct WebhookDispatcher {
    url: String,
    client: reqwest::blocking::Client,
}

impl WebhookDispatcher {
    pub fn new(url: &str) -> Result<Self, DispatchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    fn form(event: &AlertEvent) -> Result<Form, DispatchError> {
        let png = event
            .image
            .encode_png()
            .map_err(|e| DispatchError::Payload(format!("PNG encode failed: {}", e)))?;

        let file = Part::bytes(png)
            .file_name(event.attachment_name.clone())
            .mime_str("image/png")?;

        let payload = json!({ "content": format_alert_message(event) });

        Ok(Form::new()
            .text("payload_json", payload.to_string())
            .part("file", file))
    }
}

impl AlertSink for WebhookDispatcher {
    fn notify(&self, event: &AlertEvent) -> Result<(), DispatchError> {
        let response = self
            .client
            .post(&self.url)
            .multipart(Self::form(event)?)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_else(|_| "unknown".to_string());
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!("Alert delivered for '{}'", event.page_name);
        Ok(())
    }
}

/// Used when no webhook is configured: the alert only reaches the log.
pub struct LogDispatcher;

impl AlertSink for LogDispatcher {
    fn notify(&self, event: &AlertEvent) -> Result<(), DispatchError> {
        warn!(
            "ALERT (no webhook configured): {}",
            format_alert_message(event).replace('\n', " | ")
        );
        Ok(())
    }
}
