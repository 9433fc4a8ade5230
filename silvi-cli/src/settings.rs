use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use silvi_core::{ControllerConfig, DetectionConfig, Granularity, ResponseMode};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionSettings {
    pub min_silence_duration: f64,
    pub rms_threshold: f32,
    pub sample_step: usize,
    pub chunk_duration: f64,
    pub preload_threshold: f64,
    pub preload_debounce_ms: u64,
    pub response: ResponseMode,
    pub granularity: Granularity,
    pub ramp_rate: f64,
    pub skip_notice_ms: u64,
    /// Audio channel analysed in multi-channel files.
    pub channel: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            min_silence_duration: 1.0,
            rms_threshold: 0.02,
            sample_step: 1024,
            chunk_duration: 300.0,
            preload_threshold: 60.0,
            preload_debounce_ms: 1_000,
            response: ResponseMode::SpeedRamp,
            granularity: Granularity::Chunked,
            ramp_rate: 4.0,
            skip_notice_ms: 1_000,
            channel: 0,
        }
    }
}

impl SessionSettings {
    /// Pull values read from a settings file into range. Command line flags
    /// are validated instead.
    pub fn normalize(&mut self) {
        let defaults = Self::default();
        self.min_silence_duration =
            finite_or(self.min_silence_duration, defaults.min_silence_duration).clamp(0.05, 60.0);
        self.rms_threshold = if self.rms_threshold.is_finite() {
            self.rms_threshold.clamp(0.0, 1.0)
        } else {
            defaults.rms_threshold
        };
        self.sample_step = self.sample_step.clamp(16, 65_536);
        self.chunk_duration =
            finite_or(self.chunk_duration, defaults.chunk_duration).clamp(5.0, 3_600.0);
        self.preload_threshold = finite_or(self.preload_threshold, defaults.preload_threshold)
            .clamp(0.0, self.chunk_duration);
        self.preload_debounce_ms = self.preload_debounce_ms.min(10_000);
        self.ramp_rate = finite_or(self.ramp_rate, defaults.ramp_rate).clamp(1.0, 16.0);
        self.skip_notice_ms = self.skip_notice_ms.min(10_000);
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            detection: DetectionConfig {
                min_silence_duration: self.min_silence_duration,
                rms_threshold: self.rms_threshold,
                sample_step: self.sample_step,
            },
            chunk_duration: self.chunk_duration,
            preload_threshold: self.preload_threshold,
            preload_debounce: Duration::from_millis(self.preload_debounce_ms),
            response: self.response,
            granularity: self.granularity,
            ramp_rate: self.ramp_rate,
            skip_notice: Duration::from_millis(self.skip_notice_ms),
        }
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Silvi")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".config")
            })
            .join("silvi")
            .join("settings.json")
    }
}

/// Missing or unreadable files fall back to defaults.
pub fn load_settings(path: &Path) -> SessionSettings {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str::<SessionSettings>(&raw).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "settings file is invalid; using defaults");
            SessionSettings::default()
        }),
        Err(_) => SessionSettings::default(),
    };
    settings.normalize();
    settings
}
