use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use log::warn;

use crate::monitor::pipeline::PipelineStage;
use crate::trace::trace::TraceEvent;

/// Appends pipeline stage transitions to a JSONL file, one line per event.
///
/// Shared by every worker; writes are serialized by the inner mutex. A
/// trace problem is logged and the event dropped, the pipeline never fails
/// because of it.
pub struct TraceLogger {
    sink: Option<Mutex<File>>,
}

impl TraceLogger {
    pub fn open(path: &Path) -> Self {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => Self {
                sink: Some(Mutex::new(f)),
            },
            Err(e) => {
                warn!("Tracing disabled, cannot open '{}': {}", path.display(), e);
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Record that `page` entered `stage` with no extra data.
    pub fn stage(&self, page: &str, stage: PipelineStage) {
        if self.is_enabled() {
            self.emit(&TraceEvent::now(page, stage));
        }
    }

    pub fn emit(&self, event: &TraceEvent) {
        let Some(sink) = &self.sink else { return };

        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                warn!("Dropping unserializable trace event: {}", e);
                return;
            }
        };

        match sink.lock() {
            Ok(mut file) => {
                if let Err(e) = writeln!(file, "{}", line) {
                    warn!("Failed to append trace event: {}", e);
                }
            }
            Err(e) => warn!("Trace sink poisoned: {}", e),
        }
    }
}
