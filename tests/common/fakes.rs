#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use screen_watch::alert::dispatcher::{AlertEvent, AlertSink};
use screen_watch::browser::renderer::PageRenderer;
use screen_watch::diff::bitmap::Bitmap;
use screen_watch::error::{DispatchError, RenderError};
use screen_watch::page::page_model::{PageSpec, Viewport};

pub fn page(name: &str) -> PageSpec {
    PageSpec {
        name: name.to_string(),
        url: format!("https://example.com/{}", name.to_lowercase().replace(' ', "-")),
        viewport: Viewport {
            width: 64,
            height: 64,
        },
        wait_for: None,
        mask: vec![],
    }
}

/// Serves queued captures per page name; an `Err` entry simulates a
/// browser failure.
#[derive(Default)]
pub struct ScriptedRenderer {
    frames: Mutex<HashMap<String, VecDeque<Result<Bitmap, String>>>>,
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, name: &str, frame: Bitmap) {
        self.queue(name, Ok(frame));
    }

    pub fn push_failure(&self, name: &str, message: &str) {
        self.queue(name, Err(message.to_string()));
    }

    fn queue(&self, name: &str, entry: Result<Bitmap, String>) {
        self.frames
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .push_back(entry);
    }
}

/// Lets a test keep a handle on the renderer after handing it to a Monitor.
#[derive(Clone, Default)]
pub struct SharedRenderer(pub Arc<ScriptedRenderer>);

impl PageRenderer for SharedRenderer {
    fn render(&self, spec: &PageSpec) -> Result<Bitmap, RenderError> {
        let next = self
            .0
            .frames
            .lock()
            .unwrap()
            .get_mut(&spec.name)
            .and_then(|q| q.pop_front());
        match next {
            Some(Ok(frame)) => Ok(frame),
            Some(Err(msg)) => Err(RenderError::Browser(msg)),
            None => Err(RenderError::Browser(format!("no frame queued for {}", spec.name))),
        }
    }
}

/// Records every alert; optionally fails delivery.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<AlertEvent>>,
    pub fail: bool,
}

#[derive(Clone, Default)]
pub struct SharedSink(pub Arc<RecordingSink>);

impl SharedSink {
    pub fn failing() -> Self {
        Self(Arc::new(RecordingSink {
            events: Mutex::new(vec![]),
            fail: true,
        }))
    }

    pub fn events(&self) -> Vec<AlertEvent> {
        self.0.events.lock().unwrap().clone()
    }
}

impl AlertSink for SharedSink {
    fn notify(&self, event: &AlertEvent) -> Result<(), DispatchError> {
        self.0.events.lock().unwrap().push(event.clone());
        if self.0.fail {
            return Err(DispatchError::Rejected {
                status: 503,
                body: "webhook unavailable".into(),
            });
        }
        Ok(())
    }
}
