//! `PlaybackSkipController` turns detected silence into playback commands.
//!
//! ## Lifecycle
//!
//! ```text
//! PlaybackSkipController::new()     → config validated, status = Idle
//!     └─► begin()                   → chunk 0 (or whole media) requested
//!         └─► tick() / tick_at()    → drain worker events, schedule, skip
//!             └─► stop()            → worker shut down, status = Stopped
//! ```
//!
//! Subscribe to status and skip events between `new()` and `begin()`; events
//! sent before a subscriber exists are not replayed.
//!
//! ## Per-chunk state
//!
//! ```text
//! Idle ─► Requested(i) ─► Processing(i) ─► Completed(i)
//!                                 └──────► Failed(i)  (Idle again after retry_failed())
//! ```
//!
//! The controller is single-threaded. Worker events are drained at the start
//! of every tick, so a merge never happens half way through a tick.

pub mod ledger;
pub mod preload;
pub mod silence_map;
pub mod ticker;

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    buffering::{chunk_index, chunk_range},
    decode::MediaDecoder,
    detect::{DetectionConfig, SilenceInterval},
    error::{Result, SilviError},
    ipc::events::{ControllerStatus, SkipEvent, SkipKind, StatusEvent},
    player::Player,
    worker::{
        DetectionExecutor, DetectionJob, DetectionRequest, DiagnosticsSnapshot, ThreadWorker,
        WorkerEvent,
    },
};

use ledger::ChunkLedger;
use preload::{in_preload_window, PreloadTimer};
use silence_map::SilenceMap;

/// Broadcast channel capacity for status and skip events.
const BROADCAST_CAP: usize = 256;

/// Rates closer than this are considered equal.
const RATE_EPSILON: f64 = 1e-3;

/// How the controller reacts to playback entering a silent interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseMode {
    /// Jump straight to the end of the interval.
    Seek,
    /// Play the interval at `ramp_rate`.
    #[default]
    SpeedRamp,
}

/// How much of the media one detection run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    /// Fixed-duration chunks, requested ahead of the playhead.
    #[default]
    Chunked,
    /// One run over the whole media at session start.
    WholeFile,
}

/// Configuration for `PlaybackSkipController`.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub detection: DetectionConfig,
    /// Length of one analysis chunk in seconds. Default: 300.
    pub chunk_duration: f64,
    /// Distance from the end of a chunk (seconds) at which the next chunk is
    /// requested. Default: 60.
    pub preload_threshold: f64,
    /// Delay between arming a chunk request and submitting it. Default: 1 s.
    pub preload_debounce: Duration,
    pub response: ResponseMode,
    pub granularity: Granularity,
    /// Playback rate used inside silence in speed-ramp mode. Default: 4.0.
    pub ramp_rate: f64,
    /// How long a skip notice should stay visible. Default: 1 s.
    pub skip_notice: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            chunk_duration: 300.0,
            preload_threshold: 60.0,
            preload_debounce: Duration::from_secs(1),
            response: ResponseMode::default(),
            granularity: Granularity::default(),
            ramp_rate: 4.0,
            skip_notice: Duration::from_secs(1),
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<()> {
        self.detection.validate()?;
        if !self.chunk_duration.is_finite() || self.chunk_duration <= 0.0 {
            return Err(SilviError::InvalidConfig(format!(
                "chunk_duration must be > 0 s (got {})",
                self.chunk_duration
            )));
        }
        if !self.preload_threshold.is_finite() || self.preload_threshold < 0.0 {
            return Err(SilviError::InvalidConfig(format!(
                "preload_threshold must be >= 0 s (got {})",
                self.preload_threshold
            )));
        }
        if !self.ramp_rate.is_finite() || self.ramp_rate <= 0.0 {
            return Err(SilviError::InvalidConfig(format!(
                "ramp_rate must be > 0 (got {})",
                self.ramp_rate
            )));
        }
        if self.preload_threshold >= self.chunk_duration {
            warn!(
                preload_threshold = self.preload_threshold,
                chunk_duration = self.chunk_duration,
                "preload threshold covers the whole chunk; next chunk is requested immediately"
            );
        }
        Ok(())
    }
}

/// Counters kept by the controller over a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerStats {
    pub ticks: u64,
    pub seeks: u64,
    pub rate_changes: u64,
    pub skip_events: u64,
    pub requests: u64,
    pub completions: u64,
    pub failures: u64,
}

pub struct PlaybackSkipController<P: Player> {
    config: ControllerConfig,
    player: P,
    executor: Box<dyn DetectionExecutor>,
    silence_map: SilenceMap,
    ledger: ChunkLedger,
    preload: PreloadTimer,
    enabled: bool,
    /// Interval whose seek has been issued but not yet acknowledged.
    seeking: Option<SilenceInterval>,
    /// Last interval skipped by seeking; not skipped again until left.
    last_skipped: Option<SilenceInterval>,
    /// Interval currently played at `ramp_rate`.
    ramping: Option<SilenceInterval>,
    status: ControllerStatus,
    status_tx: broadcast::Sender<StatusEvent>,
    skip_tx: broadcast::Sender<SkipEvent>,
    skip_seq: u64,
    stats: ControllerStats,
    stopped: bool,
}

impl<P: Player> PlaybackSkipController<P> {
    /// Create a controller. Nothing is requested until `begin()`.
    ///
    /// # Errors
    /// `SilviError::InvalidConfig` if `config` is rejected.
    pub fn new(
        config: ControllerConfig,
        player: P,
        executor: Box<dyn DetectionExecutor>,
    ) -> Result<Self> {
        config.validate()?;
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (skip_tx, _) = broadcast::channel(BROADCAST_CAP);

        Ok(Self {
            silence_map: SilenceMap::new(config.chunk_duration),
            preload: PreloadTimer::new(config.preload_debounce),
            config,
            player,
            executor,
            ledger: ChunkLedger::new(),
            enabled: true,
            seeking: None,
            last_skipped: None,
            ramping: None,
            status: ControllerStatus::Idle,
            status_tx,
            skip_tx,
            skip_seq: 0,
            stats: ControllerStats::default(),
            stopped: false,
        })
    }

    /// Spawn a `ThreadWorker` over `decoder`, create the controller and
    /// request the first analysis.
    pub fn start<D: MediaDecoder>(config: ControllerConfig, player: P, decoder: D) -> Result<Self> {
        config.validate()?;
        let worker = ThreadWorker::spawn(decoder)?;
        let mut controller = Self::new(config, player, Box::new(worker))?;
        controller.begin()?;
        Ok(controller)
    }

    /// Request analysis of chunk 0, or of the whole media in whole-file mode.
    /// Calling it again while that request is pending or done does nothing.
    ///
    /// # Errors
    /// `SilviError::WorkerUnavailable` after `stop()` or if the worker is gone.
    pub fn begin(&mut self) -> Result<()> {
        if self.stopped {
            return Err(SilviError::WorkerUnavailable);
        }
        if !self.ledger.needs_analysis(0) {
            return Ok(());
        }
        info!(
            granularity = ?self.config.granularity,
            response = ?self.config.response,
            chunk_duration = self.config.chunk_duration,
            "silence skipping session started"
        );
        let job = self.job_for(0);
        self.ledger.mark_requested(0);
        if let Err(e) = self.submit(job) {
            self.ledger.mark_failed(0);
            return Err(e);
        }
        Ok(())
    }

    /// One polling step at the current instant.
    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    /// One polling step at `now`.
    ///
    /// Worker events are always drained. Scheduling and skipping only happen
    /// while enabled and playing. Returns `true` if the controller acted on
    /// playback this tick.
    pub fn tick_at(&mut self, now: Instant) -> bool {
        self.stats.ticks += 1;
        self.process_worker_events();

        if self.stopped || !self.enabled {
            return false;
        }
        let state = self.player.state();
        if !state.is_playing() {
            return false;
        }

        if let Some(chunk) = self.preload.poll(now) {
            if self.ledger.is_unrequested(chunk) {
                self.request_chunk(chunk);
            } else {
                debug!(chunk, "preload fired for a chunk already handled");
            }
        }
        self.schedule(state.current_time, now);

        match self.config.response {
            ResponseMode::Seek => self.apply_seek(state.current_time),
            ResponseMode::SpeedRamp => self.apply_ramp(state.current_time, state.playback_rate),
        }
        true
    }

    /// Acknowledge that the player finished the seek issued for a skip.
    ///
    /// If the player landed short, still inside the skipped interval, that
    /// interval is not skipped again until playback leaves it. Otherwise the
    /// guard is dropped, so a later rewind into the interval skips it anew.
    pub fn on_seek_completed(&mut self) {
        match self.seeking.take() {
            Some(interval) => {
                let landed = self.player.state().current_time;
                debug!(to = interval.end, landed, "seek completed");
                self.last_skipped = interval.contains(landed).then_some(interval);
                self.player.set_controls_enabled(true);
            }
            None => debug!("seek completion with no skip pending ignored"),
        }
    }

    /// Make failed chunks eligible for analysis again. They are re-requested
    /// by later ticks once playback is inside or near them, and a repeated
    /// failure reports one more `Error` status. Returns how many were cleared.
    pub fn retry_failed(&mut self) -> usize {
        let cleared = self.ledger.clear_failed();
        if !cleared.is_empty() {
            info!(chunks = ?cleared, "failed chunks cleared for retry");
        }
        cleared.len()
    }

    /// Turn silence skipping on or off. Analysis results keep being merged
    /// while disabled.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        info!(enabled, "silence skipping toggled");
        if !enabled {
            self.preload.cancel();
            if self.ramping.take().is_some() {
                let rate = self.player.state().playback_rate;
                self.set_rate(rate, 1.0);
            }
        }
    }

    /// Merge a completed chunk's intervals and mark it processed. Returns the
    /// number of new map entries; re-applying a completion adds nothing.
    pub fn apply_completion(&mut self, chunk: u64, intervals: &[SilenceInterval]) -> usize {
        let added = self.silence_map.merge(intervals);
        self.ledger.mark_completed(chunk);
        added
    }

    /// Drain and apply every pending worker event. Returns how many were
    /// handled. Does nothing once stopped.
    pub fn process_worker_events(&mut self) -> usize {
        if self.stopped {
            return 0;
        }
        let mut handled = 0;
        while let Some(event) = self.executor.poll_event() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Shut the worker down and restore the player. In-flight results are
    /// discarded. Idempotent.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.executor.shutdown();
        self.preload.cancel();

        if self.ramping.take().is_some() {
            let rate = self.player.state().playback_rate;
            self.set_rate(rate, 1.0);
        }
        if self.seeking.take().is_some() {
            self.player.set_controls_enabled(true);
        }

        self.set_status(ControllerStatus::Stopped, None, None);
        info!(
            ticks = self.stats.ticks,
            seeks = self.stats.seeks,
            rate_changes = self.stats.rate_changes,
            chunks_processed = self.ledger.processed_count(),
            intervals = self.silence_map.all().len(),
            "silence skipping session stopped"
        );
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusEvent> {
        self.status_tx.subscribe()
    }

    pub fn subscribe_skips(&self) -> broadcast::Receiver<SkipEvent> {
        self.skip_tx.subscribe()
    }

    pub fn status(&self) -> ControllerStatus {
        self.status
    }

    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    pub fn silence_map(&self) -> &SilenceMap {
        &self.silence_map
    }

    pub fn ledger(&self) -> &ChunkLedger {
        &self.ledger
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn is_seeking(&self) -> bool {
        self.seeking.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn worker_diagnostics(&self) -> DiagnosticsSnapshot {
        self.executor.diagnostics()
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn job_for(&self, chunk: u64) -> DetectionJob {
        match self.config.granularity {
            Granularity::Chunked => DetectionJob::Chunk(chunk),
            Granularity::WholeFile => DetectionJob::WholeMedia,
        }
    }

    /// Whole-media runs are tracked under chunk 0 until they complete.
    fn ledger_chunk(job: DetectionJob) -> u64 {
        job.chunk().unwrap_or(0)
    }

    fn submit(&mut self, job: DetectionJob) -> Result<()> {
        let request = DetectionRequest::new(job, self.config.chunk_duration, self.config.detection);
        self.executor.submit(request)?;
        self.stats.requests += 1;
        info!(%job, "detection requested");
        Ok(())
    }

    fn request_chunk(&mut self, chunk: u64) {
        let job = self.job_for(chunk);
        self.ledger.mark_requested(chunk);
        if let Err(e) = self.submit(job) {
            warn!(chunk, error = %e, "could not submit detection request");
            self.ledger.mark_failed(chunk);
            self.set_status(ControllerStatus::Error, Some(chunk), Some(e.to_string()));
        }
    }

    fn schedule(&mut self, time: f64, now: Instant) {
        let target = match self.config.granularity {
            Granularity::WholeFile => Some(0).filter(|&c| self.ledger.is_unrequested(c)),
            Granularity::Chunked => {
                let current = chunk_index(time, self.config.chunk_duration);
                let next = current + 1;
                // Failed chunks stay put until `retry_failed`.
                if self.ledger.is_unrequested(current) {
                    Some(current)
                } else if in_preload_window(
                    time,
                    self.config.chunk_duration,
                    self.config.preload_threshold,
                ) && self.ledger.is_unrequested(next)
                {
                    Some(next)
                } else {
                    None
                }
            }
        };

        if let Some(chunk) = target {
            if self.preload.arm(chunk, now) {
                debug!(chunk, time, "chunk request armed");
            }
        }
    }

    fn apply_seek(&mut self, time: f64) {
        if self.seeking.is_some() {
            return;
        }
        if let Some(last) = self.last_skipped {
            if last.contains(time) {
                return;
            }
            self.last_skipped = None;
        }

        let chunk = chunk_index(time, self.config.chunk_duration);
        let Some(interval) = self.silence_map.find(chunk, time) else {
            return;
        };

        debug!(from = time, to = interval.end, "skipping silence by seek");
        self.seeking = Some(interval);
        self.player.set_controls_enabled(false);
        self.emit_skip(SkipKind::Seek, time, interval.end);
        self.player.seek(interval.end);
        self.stats.seeks += 1;
    }

    fn apply_ramp(&mut self, time: f64, current_rate: f64) {
        let chunk = chunk_index(time, self.config.chunk_duration);
        match self.silence_map.find(chunk, time) {
            Some(interval) => {
                if self.ramping != Some(interval) {
                    debug!(from = time, to = interval.end, "ramping through silence");
                    self.ramping = Some(interval);
                    self.emit_skip(SkipKind::Ramp, time, interval.end);
                }
                self.set_rate(current_rate, self.config.ramp_rate);
            }
            None => {
                self.ramping = None;
                self.set_rate(current_rate, 1.0);
            }
        }
    }

    fn set_rate(&mut self, current: f64, target: f64) {
        if (current - target).abs() > RATE_EPSILON {
            self.player.set_playback_rate(target);
            self.stats.rate_changes += 1;
        }
    }

    fn handle_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Accepted { job } => {
                let chunk = Self::ledger_chunk(job);
                self.ledger.mark_processing(chunk);
                self.set_status(
                    ControllerStatus::Processing,
                    Some(chunk),
                    Some(format!("processing {job}")),
                );
            }
            WorkerEvent::Completed {
                job,
                intervals,
                analyzed_until,
            } => {
                let added = match job {
                    DetectionJob::Chunk(chunk) => self.apply_completion(chunk, &intervals),
                    DetectionJob::WholeMedia => {
                        let added = self.silence_map.merge(&intervals);
                        for chunk in chunk_range(0.0, analyzed_until, self.config.chunk_duration) {
                            self.ledger.mark_completed(chunk);
                        }
                        added
                    }
                };
                self.stats.completions += 1;
                info!(%job, intervals = intervals.len(), added, "silence ranges merged");
                self.set_status(
                    ControllerStatus::Ready,
                    Some(Self::ledger_chunk(job)),
                    Some("ready to play".into()),
                );
            }
            WorkerEvent::Failed { job, error } => {
                let chunk = Self::ledger_chunk(job);
                self.ledger.mark_failed(chunk);
                self.stats.failures += 1;
                warn!(%job, error = %error, "detection failed; chunk left unprocessed");
                self.set_status(ControllerStatus::Error, Some(chunk), Some(error.to_string()));
            }
        }
    }

    fn emit_skip(&mut self, kind: SkipKind, from: f64, to: f64) {
        self.skip_seq += 1;
        self.stats.skip_events += 1;
        let _ = self.skip_tx.send(SkipEvent {
            seq: self.skip_seq,
            kind,
            from,
            to,
            clear_after_ms: self.config.skip_notice.as_millis() as u64,
        });
    }

    fn set_status(&mut self, status: ControllerStatus, chunk: Option<u64>, detail: Option<String>) {
        self.status = status;
        let _ = self.status_tx.send(StatusEvent {
            status,
            chunk,
            detail,
        });
    }
}

impl<P: Player> Drop for PlaybackSkipController<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::ledger::ChunkState;
    use super::*;
    use crate::decode::MemoryDecoder;
    use crate::player::{simulated::SimulatedPlayer, PlayerCommand};
    use crate::worker::test_support::BrokenDecoder;
    use crate::worker::InlineExecutor;

    const RATE: u32 = 100;

    /// Build a mono track from `(seconds, amplitude)` segments at `RATE`.
    fn track(segments: &[(f64, f32)]) -> Vec<f32> {
        segments
            .iter()
            .flat_map(|&(secs, amp)| vec![amp; (secs * RATE as f64) as usize])
            .collect()
    }

    fn config(response: ResponseMode) -> ControllerConfig {
        ControllerConfig {
            detection: DetectionConfig {
                sample_step: 10,
                ..DetectionConfig::default()
            },
            response,
            ..ControllerConfig::default()
        }
    }

    fn controller(
        config: ControllerConfig,
        samples: Vec<f32>,
    ) -> (PlaybackSkipController<SimulatedPlayer>, SimulatedPlayer) {
        let duration = samples.len() as f64 / RATE as f64;
        let player = SimulatedPlayer::new(duration);
        let executor = InlineExecutor::new(MemoryDecoder::new(samples, RATE));
        let controller =
            PlaybackSkipController::new(config, player.clone(), Box::new(executor)).unwrap();
        (controller, player)
    }

    #[test]
    fn seek_mode_skips_interval_once() {
        let samples = track(&[(2.0, 0.5), (3.0, 0.0), (5.0, 0.5)]);
        let (mut c, player) = controller(config(ResponseMode::Seek), samples);
        let mut skips = c.subscribe_skips();
        c.begin().unwrap();

        let base = Instant::now();
        player.play();
        player.set_position(2.5);
        assert!(c.tick_at(base));
        assert_eq!(
            player.commands(),
            vec![
                PlayerCommand::SetControlsEnabled(false),
                PlayerCommand::Seek(5.0)
            ]
        );
        assert!(c.is_seeking());
        assert!(!player.controls_enabled());

        // Waiting for the player: no further commands.
        c.tick_at(base + Duration::from_millis(16));
        c.tick_at(base + Duration::from_millis(32));
        assert_eq!(player.commands().len(), 2);

        assert!(player.complete_seek());
        c.on_seek_completed();
        assert!(player.controls_enabled());
        assert!(!c.is_seeking());

        c.tick_at(base + Duration::from_millis(48));
        player.advance(0.5);
        c.tick_at(base + Duration::from_millis(64));

        let seeks = player
            .commands()
            .into_iter()
            .filter(|cmd| matches!(cmd, PlayerCommand::Seek(_)))
            .count();
        assert_eq!(seeks, 1);
        assert_eq!(c.stats().seeks, 1);

        let event = skips.try_recv().unwrap();
        assert_eq!(event.kind, SkipKind::Seek);
        assert_eq!(event.from, 2.5);
        assert_eq!(event.to, 5.0);
        assert_eq!(event.clear_after_ms, 1_000);
        assert!(skips.try_recv().is_err());
    }

    #[test]
    fn seek_is_not_repeated_while_still_inside_skipped_interval() {
        let samples = track(&[(2.0, 0.5), (3.0, 0.0), (5.0, 0.5)]);
        let (mut c, player) = controller(config(ResponseMode::Seek), samples);
        c.begin().unwrap();

        let base = Instant::now();
        player.play();
        player.set_position(2.5);
        c.tick_at(base);
        player.complete_seek();
        // The player landed short of the target.
        player.set_position(4.9);
        c.on_seek_completed();

        c.tick_at(base + Duration::from_millis(16));
        assert_eq!(c.stats().seeks, 1);
    }

    #[test]
    fn rewind_into_skipped_interval_skips_again() {
        let samples = track(&[(2.0, 0.5), (3.0, 0.0), (5.0, 0.5)]);
        let (mut c, player) = controller(config(ResponseMode::Seek), samples);
        c.begin().unwrap();

        let base = Instant::now();
        player.play();
        player.set_position(2.5);
        c.tick_at(base);
        assert!(player.complete_seek());
        c.on_seek_completed();

        // User scrubs back into the silence before any tick sees 5.0.
        player.set_position(3.0);
        c.tick_at(base + Duration::from_millis(16));
        assert_eq!(c.stats().seeks, 2);
        assert_eq!(player.commands().last(), Some(&PlayerCommand::Seek(5.0)));
    }

    #[test]
    fn speed_ramp_changes_rate_only_on_transitions() {
        let samples = track(&[(10.0, 0.5), (2.0, 0.0), (3.0, 0.5)]);
        let (mut c, player) = controller(config(ResponseMode::SpeedRamp), samples);
        let mut skips = c.subscribe_skips();
        c.begin().unwrap();

        let base = Instant::now();
        player.play();
        for (i, position) in [9.0, 10.5, 11.0, 11.5, 12.1, 12.5].into_iter().enumerate() {
            player.set_position(position);
            c.tick_at(base + Duration::from_millis(16 * i as u64));
        }

        assert_eq!(
            player.commands(),
            vec![
                PlayerCommand::SetPlaybackRate(4.0),
                PlayerCommand::SetPlaybackRate(1.0)
            ]
        );
        let event = skips.try_recv().unwrap();
        assert_eq!(event.kind, SkipKind::Ramp);
        assert_eq!(event.to, 12.0);
        assert!(skips.try_recv().is_err());
    }

    #[test]
    fn preload_is_debounced() {
        let samples = track(&[(15.0, 0.5)]);
        let cfg = ControllerConfig {
            chunk_duration: 5.0,
            preload_threshold: 2.0,
            ..config(ResponseMode::SpeedRamp)
        };
        let (mut c, player) = controller(cfg, samples);
        c.begin().unwrap();

        let base = Instant::now();
        player.play();
        player.set_position(1.0);
        c.tick_at(base);
        assert!(c.ledger().is_processed(0));
        assert_eq!(c.worker_diagnostics().jobs_submitted, 1);

        player.set_position(3.5);
        c.tick_at(base);
        c.tick_at(base + Duration::from_millis(500));
        assert_eq!(c.worker_diagnostics().jobs_submitted, 1);

        c.tick_at(base + Duration::from_millis(1_000));
        assert_eq!(c.worker_diagnostics().jobs_submitted, 2);

        c.tick_at(base + Duration::from_millis(1_016));
        c.tick_at(base + Duration::from_millis(3_000));
        assert!(c.ledger().is_processed(1));
        assert_eq!(c.worker_diagnostics().jobs_submitted, 2);
        assert_eq!(c.stats().requests, 2);
    }

    fn broken_controller(
        granularity: Granularity,
    ) -> (PlaybackSkipController<SimulatedPlayer>, SimulatedPlayer) {
        let player = SimulatedPlayer::new(600.0);
        let executor = InlineExecutor::new(BrokenDecoder { panic: false });
        let cfg = ControllerConfig {
            granularity,
            ..config(ResponseMode::SpeedRamp)
        };
        let controller =
            PlaybackSkipController::new(cfg, player.clone(), Box::new(executor)).unwrap();
        (controller, player)
    }

    /// Tick every 16 ms for `secs` seconds of virtual time from `base`.
    fn run_for(c: &mut PlaybackSkipController<SimulatedPlayer>, base: Instant, secs: u64) {
        for i in 0..secs * 1_000 / 16 {
            c.tick_at(base + Duration::from_millis(16 * i));
        }
    }

    fn errors(status: &mut broadcast::Receiver<StatusEvent>) -> Vec<StatusEvent> {
        let mut found = Vec::new();
        while let Ok(event) = status.try_recv() {
            if event.status == ControllerStatus::Error {
                found.push(event);
            }
        }
        found
    }

    #[test]
    fn failed_chunk_reports_error_once() {
        let (mut c, player) = broken_controller(Granularity::Chunked);
        let mut status = c.subscribe_status();
        c.begin().unwrap();

        let base = Instant::now();
        player.play();
        player.set_position(1.0);
        c.tick_at(base);

        let processing = status.try_recv().unwrap();
        assert_eq!(processing.status, ControllerStatus::Processing);
        assert_eq!(processing.detail.as_deref(), Some("processing part 1"));
        let failed = status.try_recv().unwrap();
        assert_eq!(failed.status, ControllerStatus::Error);
        assert_eq!(failed.chunk, Some(0));
        assert!(status.try_recv().is_err());

        run_for(&mut c, base, 10);

        assert!(errors(&mut status).is_empty());
        assert_eq!(c.worker_diagnostics().jobs_submitted, 1);
        assert_eq!(c.stats().failures, 1);
        assert_eq!(c.ledger().state(0), Some(ChunkState::Failed));
        // Unanalysed media plays normally.
        assert!(player.commands().is_empty());
    }

    #[test]
    fn failed_whole_file_pass_is_not_decoded_again() {
        let (mut c, player) = broken_controller(Granularity::WholeFile);
        let mut status = c.subscribe_status();
        c.begin().unwrap();

        player.play();
        player.set_position(1.0);
        run_for(&mut c, Instant::now(), 10);

        assert_eq!(errors(&mut status).len(), 1);
        assert_eq!(c.worker_diagnostics().jobs_submitted, 1);
    }

    #[test]
    fn retry_failed_requests_the_chunk_again() {
        let (mut c, player) = broken_controller(Granularity::Chunked);
        let mut status = c.subscribe_status();
        c.begin().unwrap();

        let base = Instant::now();
        player.play();
        player.set_position(1.0);
        run_for(&mut c, base, 2);
        assert_eq!(errors(&mut status).len(), 1);

        assert_eq!(c.retry_failed(), 1);
        assert_eq!(c.retry_failed(), 0);
        run_for(&mut c, base + Duration::from_secs(2), 10);

        let again = errors(&mut status);
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].chunk, Some(0));
        assert_eq!(c.worker_diagnostics().jobs_submitted, 2);
        assert_eq!(c.stats().failures, 2);
    }

    #[test]
    fn whole_file_mode_indexes_across_chunks() {
        let samples = track(&[(4.0, 0.5), (3.0, 0.0), (5.0, 0.5)]);
        let cfg = ControllerConfig {
            chunk_duration: 5.0,
            preload_threshold: 2.0,
            granularity: Granularity::WholeFile,
            ..config(ResponseMode::SpeedRamp)
        };
        let (mut c, player) = controller(cfg, samples);
        c.begin().unwrap();

        let base = Instant::now();
        player.play();
        player.set_position(5.5);
        c.tick_at(base);

        assert_eq!(c.ledger().processed_count(), 3);
        assert_eq!(player.commands(), vec![PlayerCommand::SetPlaybackRate(4.0)]);

        player.set_position(9.5);
        c.tick_at(base + Duration::from_secs(2));
        c.tick_at(base + Duration::from_secs(4));
        assert_eq!(c.worker_diagnostics().jobs_submitted, 1);
    }

    #[test]
    fn paused_player_gets_no_commands() {
        let samples = track(&[(2.0, 0.5), (3.0, 0.0), (5.0, 0.5)]);
        let (mut c, player) = controller(config(ResponseMode::Seek), samples);
        c.begin().unwrap();

        player.set_position(3.0);
        assert!(!c.tick_at(Instant::now()));
        assert!(c.ledger().is_processed(0), "events are drained while paused");
        assert!(player.commands().is_empty());
    }

    #[test]
    fn disabling_restores_normal_rate() {
        let samples = track(&[(10.0, 0.5), (2.0, 0.0), (3.0, 0.5)]);
        let (mut c, player) = controller(config(ResponseMode::SpeedRamp), samples);
        c.begin().unwrap();

        let base = Instant::now();
        player.play();
        player.set_position(10.5);
        c.tick_at(base);
        c.set_enabled(false);
        player.set_position(11.0);
        assert!(!c.tick_at(base + Duration::from_millis(16)));

        assert_eq!(
            player.commands(),
            vec![
                PlayerCommand::SetPlaybackRate(4.0),
                PlayerCommand::SetPlaybackRate(1.0)
            ]
        );
    }

    #[test]
    fn stop_is_final() {
        let samples = track(&[(5.0, 0.5)]);
        let (mut c, player) = controller(config(ResponseMode::Seek), samples);
        let mut status = c.subscribe_status();
        c.begin().unwrap();
        c.stop();
        c.stop();

        assert_eq!(c.status(), ControllerStatus::Stopped);
        assert!(matches!(c.begin(), Err(SilviError::WorkerUnavailable)));

        player.play();
        assert!(!c.tick_at(Instant::now()));
        assert!(!c.ledger().is_processed(0), "queued results are discarded");

        let mut stopped = 0;
        while let Ok(event) = status.try_recv() {
            if event.status == ControllerStatus::Stopped {
                stopped += 1;
            }
        }
        assert_eq!(stopped, 1);
    }

    #[test]
    fn completion_can_be_applied_twice() {
        let (mut c, _player) = controller(config(ResponseMode::Seek), track(&[(5.0, 0.5)]));
        let intervals = [SilenceInterval::new(1.0, 2.0)];
        assert_eq!(c.apply_completion(0, &intervals), 1);
        assert_eq!(c.apply_completion(0, &intervals), 0);
        assert!(c.ledger().is_processed(0));
        assert_eq!(c.silence_map().all(), intervals.to_vec());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let bad = [
            ControllerConfig {
                chunk_duration: 0.0,
                ..ControllerConfig::default()
            },
            ControllerConfig {
                ramp_rate: f64::NAN,
                ..ControllerConfig::default()
            },
            ControllerConfig {
                detection: DetectionConfig {
                    sample_step: 0,
                    ..DetectionConfig::default()
                },
                ..ControllerConfig::default()
            },
        ];
        for cfg in bad {
            assert!(matches!(cfg.validate(), Err(SilviError::InvalidConfig(_))));
        }

        let wide_preload = ControllerConfig {
            preload_threshold: 400.0,
            ..ControllerConfig::default()
        };
        assert!(wide_preload.validate().is_ok());
    }
}
