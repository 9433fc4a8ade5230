//! Silence detection over a [`SampleBuffer`].
//!
//! The buffer is cut into consecutive windows of `sample_step` samples (the
//! last one may be shorter). Each window is classified by [`EnergyGate`]; runs
//! of quiet windows lasting at least `min_silence_duration` become
//! [`SilenceInterval`]s on the absolute media timeline.
//!
//! `detect` is a pure, finite computation: it never blocks and never retries,
//! so it can run on any thread.

pub mod energy;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::buffering::chunk::SampleBuffer;
use crate::error::{Result, SilviError};

pub use energy::{EnergyGate, WindowDecision};

/// Parameters for one detection run. Copied by value into every run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct DetectionConfig {
    /// Shortest quiet run (seconds) reported as silence. Default: 1.0.
    pub min_silence_duration: f64,
    /// RMS level below which a window is quiet. Default: 0.02.
    pub rms_threshold: f32,
    /// Samples per energy window. Default: 1024.
    pub sample_step: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_silence_duration: 1.0,
            rms_threshold: 0.02,
            sample_step: 1024,
        }
    }
}

impl DetectionConfig {
    /// Reject parameters no run could honour.
    pub fn validate(&self) -> Result<()> {
        if self.sample_step == 0 {
            return Err(SilviError::InvalidConfig(
                "sample_step must be a positive sample count".into(),
            ));
        }
        if self.rms_threshold.is_nan() || self.rms_threshold < 0.0 {
            return Err(SilviError::InvalidConfig(format!(
                "rms_threshold must be >= 0 (got {})",
                self.rms_threshold
            )));
        }
        if self.min_silence_duration.is_nan() || self.min_silence_duration <= 0.0 {
            return Err(SilviError::InvalidConfig(format!(
                "min_silence_duration must be > 0 s (got {})",
                self.min_silence_duration
            )));
        }
        Ok(())
    }
}

/// A silent stretch `[start, end)` in media seconds. Always `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SilenceInterval {
    pub start: f64,
    pub end: f64,
}

impl SilenceInterval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Half-open containment: `start <= time < end`.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end
    }
}

/// Run silence detection over `buffer`.
///
/// # Errors
/// `SilviError::InvalidConfig` for an invalid `config` or a zero sample rate.
/// No partial output is produced in that case.
pub fn detect(buffer: &SampleBuffer, config: &DetectionConfig) -> Result<Vec<SilenceInterval>> {
    config.validate()?;
    if buffer.sample_rate == 0 {
        return Err(SilviError::InvalidConfig("sample_rate must be positive".into()));
    }

    let gate = EnergyGate::new(config.rms_threshold);
    let mut intervals = Vec::new();
    let mut silence_start: Option<f64> = None;

    for (window_idx, window) in buffer.samples.chunks(config.sample_step).enumerate() {
        let current_time = buffer.time_at(window_idx * config.sample_step);

        match gate.classify(window) {
            WindowDecision::Quiet => {
                silence_start.get_or_insert(current_time);
            }
            WindowDecision::Loud => {
                if let Some(start) = silence_start.take() {
                    if current_time - start >= config.min_silence_duration {
                        intervals.push(SilenceInterval::new(start, current_time));
                    }
                }
            }
        }
    }

    // Input ended inside a quiet run.
    if let Some(start) = silence_start {
        let end = buffer.end_time();
        if end - start >= config.min_silence_duration {
            intervals.push(SilenceInterval::new(start, end));
        }
    }

    debug!(
        samples = buffer.samples.len(),
        offset = buffer.offset,
        intervals = intervals.len(),
        "silence detection finished"
    );
    Ok(intervals)
}
