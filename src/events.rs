//! Capture progress events delivered over channels to external observers

use crate::output::CaptureOutput;
use serde::Serialize;
use tokio::sync::mpsc;

/// Position of one source within the batch being captured
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub input: String,
    pub total: usize,
    /// 1-based index of the source in the batch
    pub current: usize,
    pub remaining: usize,
}

/// Progress notifications emitted while a batch runs.
///
/// `Started` always precedes `Finished` for the same source, and events never
/// interleave across sources since captures run strictly one at a time.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CaptureEvent {
    Started {
        progress: Progress,
    },
    Finished {
        progress: Progress,
        output: Option<CaptureOutput>,
        duration_ms: u64,
        error: Option<String>,
    },
    Failed {
        progress: Progress,
        error: String,
    },
}

/// Fan-out of capture events to any number of subscribers.
///
/// Senders whose receiver has been dropped are pruned on the next emit.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<mpsc::UnboundedSender<CaptureEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer and hand back its receiving end
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<CaptureEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver an event to every live subscriber
    pub fn emit(&mut self, event: CaptureEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
