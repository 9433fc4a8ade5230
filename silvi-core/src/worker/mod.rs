//! Detection task offload.
//!
//! ## Message flow
//!
//! ```text
//! controller ──DetectionRequest──► executor: decode(span) → detect()
//! controller ◄──WorkerEvent─────── Accepted → Completed | Failed
//! ```
//!
//! A request owns its span and config; the completion owns its interval list.
//! Nothing is shared between the controller and the running job.

pub mod inline;
pub mod thread;

pub use inline::InlineExecutor;
pub use thread::ThreadWorker;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use tracing::{error, info, info_span};

use crate::buffering::chunk_start;
use crate::decode::{MediaDecoder, MediaSpan};
use crate::detect::{detect, DetectionConfig, SilenceInterval};
use crate::error::{Result, SilviError};

/// What a detection run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionJob {
    /// One fixed-duration chunk of the timeline.
    Chunk(u64),
    /// The whole media in a single pass.
    WholeMedia,
}

impl DetectionJob {
    pub fn span(&self, chunk_duration: f64) -> MediaSpan {
        match *self {
            DetectionJob::Chunk(index) => MediaSpan::new(
                chunk_start(index, chunk_duration),
                chunk_start(index + 1, chunk_duration),
            ),
            DetectionJob::WholeMedia => MediaSpan::whole(),
        }
    }

    pub fn chunk(&self) -> Option<u64> {
        match *self {
            DetectionJob::Chunk(index) => Some(index),
            DetectionJob::WholeMedia => None,
        }
    }
}

impl fmt::Display for DetectionJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionJob::Chunk(index) => write!(f, "part {}", index + 1),
            DetectionJob::WholeMedia => f.write_str("whole media"),
        }
    }
}

/// One unit of work handed to an executor.
#[derive(Debug, Clone)]
pub struct DetectionRequest {
    pub job: DetectionJob,
    pub span: MediaSpan,
    pub config: DetectionConfig,
}

impl DetectionRequest {
    pub fn new(job: DetectionJob, chunk_duration: f64, config: DetectionConfig) -> Self {
        Self {
            job,
            span: job.span(chunk_duration),
            config,
        }
    }
}

/// Progress reported back by an executor.
#[derive(Debug)]
pub enum WorkerEvent {
    /// The executor picked the request up.
    Accepted { job: DetectionJob },
    /// Detection finished.
    Completed {
        job: DetectionJob,
        intervals: Vec<SilenceInterval>,
        /// Media time up to which the run analysed audio.
        analyzed_until: f64,
    },
    /// Decoding or detection failed.
    Failed { job: DetectionJob, error: SilviError },
}

impl WorkerEvent {
    pub fn job(&self) -> DetectionJob {
        match self {
            WorkerEvent::Accepted { job }
            | WorkerEvent::Completed { job, .. }
            | WorkerEvent::Failed { job, .. } => *job,
        }
    }
}

/// Contract for detection executors.
pub trait DetectionExecutor: Send {
    /// Queue a request. Ownership of the request moves to the executor.
    ///
    /// # Errors
    /// `SilviError::WorkerUnavailable` once the executor has shut down.
    fn submit(&mut self, request: DetectionRequest) -> Result<()>;

    /// Next pending event, without blocking.
    fn poll_event(&mut self) -> Option<WorkerEvent>;

    /// Stop accepting work and discard results still in flight.
    fn shutdown(&mut self);

    fn diagnostics(&self) -> DiagnosticsSnapshot;
}

#[derive(Default)]
pub struct WorkerDiagnostics {
    pub jobs_submitted: AtomicUsize,
    pub jobs_completed: AtomicUsize,
    pub jobs_failed: AtomicUsize,
    pub intervals_found: AtomicUsize,
}

impl WorkerDiagnostics {
    pub fn record(&self, event: &WorkerEvent) {
        match event {
            WorkerEvent::Accepted { .. } => {}
            WorkerEvent::Completed { intervals, .. } => {
                self.jobs_completed.fetch_add(1, Ordering::Relaxed);
                self.intervals_found
                    .fetch_add(intervals.len(), Ordering::Relaxed);
            }
            WorkerEvent::Failed { .. } => {
                self.jobs_failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            jobs_submitted: self.jobs_submitted.load(Ordering::Relaxed),
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            intervals_found: self.intervals_found.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub jobs_submitted: usize,
    pub jobs_completed: usize,
    pub jobs_failed: usize,
    pub intervals_found: usize,
}

/// Decode and analyse one request, turning panics into `SilviError::Worker`.
pub(crate) fn execute(decoder: &mut dyn MediaDecoder, request: &DetectionRequest) -> WorkerEvent {
    let span = info_span!("detection", job = %request.job);
    let _enter = span.enter();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let buffer = decoder.decode(request.span).map_err(|e| {
            if e.is_run_failure() {
                e
            } else {
                SilviError::Decode(e.to_string())
            }
        })?;
        let analyzed_until = buffer.end_time();
        let intervals =
            detect(&buffer, &request.config).map_err(|e| SilviError::Worker(e.to_string()))?;
        Ok::<_, SilviError>((intervals, analyzed_until))
    }));

    let job = request.job;
    match outcome {
        Ok(Ok((intervals, analyzed_until))) => {
            info!(
                intervals = intervals.len(),
                analyzed_until, "detection run complete"
            );
            WorkerEvent::Completed {
                job,
                intervals,
                analyzed_until,
            }
        }
        Ok(Err(error)) => {
            error!(error = %error, "detection run failed");
            WorkerEvent::Failed { job, error }
        }
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            error!(reason = %reason, "detection run panicked");
            WorkerEvent::Failed {
                job,
                error: SilviError::Worker(format!("analysis panicked: {reason}")),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::buffering::chunk::SampleBuffer;

    /// Decoder whose every call fails or panics, for failure-path tests.
    pub struct BrokenDecoder {
        pub panic: bool,
    }

    impl MediaDecoder for BrokenDecoder {
        fn decode(&mut self, _span: MediaSpan) -> Result<SampleBuffer> {
            if self.panic {
                panic!("decoder exploded");
            }
            Err(SilviError::Decode("corrupt stream".into()))
        }

        fn duration_secs(&self) -> f64 {
            600.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::BrokenDecoder;
    use super::*;
    use crate::decode::MemoryDecoder;

    #[test]
    fn chunk_job_spans_its_chunk() {
        let span = DetectionJob::Chunk(2).span(300.0);
        assert_eq!(span, MediaSpan::new(600.0, 900.0));
        assert_eq!(DetectionJob::Chunk(2).to_string(), "part 3");
        assert_eq!(DetectionJob::WholeMedia.span(300.0), MediaSpan::whole());
    }

    #[test]
    fn execute_reports_intervals_and_coverage() {
        let mut samples = vec![0.5f32; 100];
        samples.extend(vec![0.0f32; 300]);
        let mut decoder = MemoryDecoder::new(samples, 100);
        let config = DetectionConfig {
            sample_step: 10,
            ..DetectionConfig::default()
        };

        let event = execute(
            &mut decoder,
            &DetectionRequest::new(DetectionJob::Chunk(0), 300.0, config),
        );
        match event {
            WorkerEvent::Completed {
                intervals,
                analyzed_until,
                ..
            } => {
                assert_eq!(intervals, vec![SilenceInterval::new(1.0, 4.0)]);
                assert_eq!(analyzed_until, 4.0);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn execute_maps_decoder_failure() {
        let mut decoder = BrokenDecoder { panic: false };
        let event = execute(
            &mut decoder,
            &DetectionRequest::new(DetectionJob::Chunk(1), 300.0, DetectionConfig::default()),
        );
        assert!(matches!(
            event,
            WorkerEvent::Failed {
                job: DetectionJob::Chunk(1),
                error: SilviError::Decode(_)
            }
        ));
    }

    #[test]
    fn execute_contains_panics() {
        let mut decoder = BrokenDecoder { panic: true };
        let event = execute(
            &mut decoder,
            &DetectionRequest::new(DetectionJob::WholeMedia, 300.0, DetectionConfig::default()),
        );
        match event {
            WorkerEvent::Failed {
                error: SilviError::Worker(msg),
                ..
            } => assert!(msg.contains("decoder exploded"), "{msg}"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn diagnostics_count_outcomes() {
        let diagnostics = WorkerDiagnostics::default();
        diagnostics.record(&WorkerEvent::Completed {
            job: DetectionJob::Chunk(0),
            intervals: vec![SilenceInterval::new(0.0, 1.0); 3],
            analyzed_until: 300.0,
        });
        diagnostics.record(&WorkerEvent::Failed {
            job: DetectionJob::Chunk(1),
            error: SilviError::WorkerUnavailable,
        });
        let snap = diagnostics.snapshot();
        assert_eq!(snap.jobs_completed, 1);
        assert_eq!(snap.jobs_failed, 1);
        assert_eq!(snap.intervals_found, 3);
    }
}
