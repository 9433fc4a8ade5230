//! `ThreadWorker` runs detection on a dedicated OS thread.
//!
//! ## Threading
//!
//! The decoder moves into the worker thread and never leaves it. Requests and
//! events cross over `crossbeam-channel` queues. `shutdown()` clears the shared
//! running flag and closes the request queue; a run already in progress
//! finishes on its own, but its result is dropped instead of sent.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, warn};

use super::{
    execute, DetectionExecutor, DetectionRequest, DiagnosticsSnapshot, WorkerDiagnostics,
    WorkerEvent,
};
use crate::decode::MediaDecoder;
use crate::error::{Result, SilviError};

pub struct ThreadWorker {
    /// `None` after shutdown.
    request_tx: Option<Sender<DetectionRequest>>,
    event_rx: Receiver<WorkerEvent>,
    /// `true` until shutdown.
    running: Arc<AtomicBool>,
    diagnostics: Arc<WorkerDiagnostics>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadWorker {
    /// Move `decoder` onto a new worker thread and start serving requests.
    ///
    /// # Errors
    /// `SilviError::Io` if the OS refuses to spawn the thread.
    pub fn spawn<D: MediaDecoder>(decoder: D) -> Result<Self> {
        let (request_tx, request_rx) = crossbeam_channel::unbounded::<DetectionRequest>();
        let (event_tx, event_rx) = crossbeam_channel::unbounded::<WorkerEvent>();
        let running = Arc::new(AtomicBool::new(true));
        let diagnostics = Arc::new(WorkerDiagnostics::default());

        let thread_running = Arc::clone(&running);
        let thread_diagnostics = Arc::clone(&diagnostics);
        let handle = std::thread::Builder::new()
            .name("silvi-detect".into())
            .spawn(move || {
                worker_loop(
                    decoder,
                    request_rx,
                    event_tx,
                    thread_running,
                    thread_diagnostics,
                )
            })?;

        Ok(Self {
            request_tx: Some(request_tx),
            event_rx,
            running,
            diagnostics,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Shut down and wait for the worker thread to exit.
    ///
    /// Blocks for as long as the current run takes to finish.
    pub fn join(mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("detection worker thread panicked");
            }
        }
    }
}

impl DetectionExecutor for ThreadWorker {
    fn submit(&mut self, request: DetectionRequest) -> Result<()> {
        if !self.is_running() {
            return Err(SilviError::WorkerUnavailable);
        }
        let tx = self
            .request_tx
            .as_ref()
            .ok_or(SilviError::WorkerUnavailable)?;
        tx.send(request).map_err(|_| SilviError::WorkerUnavailable)?;
        self.diagnostics
            .jobs_submitted
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn poll_event(&mut self) -> Option<WorkerEvent> {
        self.event_rx.try_recv().ok()
    }

    fn shutdown(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("detection worker shutdown requested");
        }
        self.request_tx = None;
        // Drop anything that already arrived.
        while self.event_rx.try_recv().is_ok() {}
    }

    fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }
}

impl Drop for ThreadWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop<D: MediaDecoder>(
    mut decoder: D,
    request_rx: Receiver<DetectionRequest>,
    event_tx: Sender<WorkerEvent>,
    running: Arc<AtomicBool>,
    diagnostics: Arc<WorkerDiagnostics>,
) {
    info!("detection worker started");

    for request in request_rx.iter() {
        if !running.load(Ordering::Relaxed) {
            break;
        }
        if event_tx
            .send(WorkerEvent::Accepted { job: request.job })
            .is_err()
        {
            break;
        }

        let event = execute(&mut decoder, &request);

        if !running.load(Ordering::Relaxed) {
            debug!(job = %request.job, "discarding detection result after shutdown");
            break;
        }
        diagnostics.record(&event);
        if event_tx.send(event).is_err() {
            break;
        }
    }

    let snap = diagnostics.snapshot();
    info!(
        jobs_submitted = snap.jobs_submitted,
        jobs_completed = snap.jobs_completed,
        jobs_failed = snap.jobs_failed,
        intervals_found = snap.intervals_found,
        "detection worker stopped"
    );
}
