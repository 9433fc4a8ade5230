//! `InlineExecutor` runs each request synchronously inside `submit`.
//!
//! Events are queued and handed out by `poll_event` exactly as a threaded
//! worker would deliver them, which keeps virtual-clock simulations and
//! controller tests deterministic.

use std::collections::VecDeque;
use std::sync::atomic::Ordering;

use tracing::debug;

use super::{
    execute, DetectionExecutor, DetectionRequest, DiagnosticsSnapshot, WorkerDiagnostics,
    WorkerEvent,
};
use crate::decode::MediaDecoder;
use crate::error::{Result, SilviError};

pub struct InlineExecutor {
    decoder: Box<dyn MediaDecoder>,
    queue: VecDeque<WorkerEvent>,
    diagnostics: WorkerDiagnostics,
    stopped: bool,
}

impl InlineExecutor {
    pub fn new<D: MediaDecoder>(decoder: D) -> Self {
        Self {
            decoder: Box::new(decoder),
            queue: VecDeque::new(),
            diagnostics: WorkerDiagnostics::default(),
            stopped: false,
        }
    }
}

impl DetectionExecutor for InlineExecutor {
    fn submit(&mut self, request: DetectionRequest) -> Result<()> {
        if self.stopped {
            return Err(SilviError::WorkerUnavailable);
        }
        debug!(job = %request.job, "running detection inline");
        self.diagnostics
            .jobs_submitted
            .fetch_add(1, Ordering::Relaxed);

        self.queue
            .push_back(WorkerEvent::Accepted { job: request.job });
        let event = execute(self.decoder.as_mut(), &request);
        self.diagnostics.record(&event);
        self.queue.push_back(event);
        Ok(())
    }

    fn poll_event(&mut self) -> Option<WorkerEvent> {
        self.queue.pop_front()
    }

    fn shutdown(&mut self) {
        self.stopped = true;
        self.queue.clear();
    }

    fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }
}
