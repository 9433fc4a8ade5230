//! `silvi` command line host.
//!
//! Settings come from a JSON file (per-user default location, or
//! `--settings`); flags given on the command line override it.

mod commands;
mod settings;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use silvi_core::controller::ticker;
use silvi_core::{Granularity, ResponseMode};
use tracing::info;
use tracing_subscriber::EnvFilter;

use settings::{default_settings_path, load_settings, SessionSettings};

const DEFAULT_LOG_FILTER: &str = "silvi_core=info,silvi=info";

/// Silence detection and silence-skipping playback.
#[derive(Parser)]
#[command(name = "silvi", version)]
struct Cli {
    /// Settings file. Defaults to the per-user config location.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the silent intervals of a WAV file.
    Scan {
        input: PathBuf,

        #[command(flatten)]
        detection: DetectionArgs,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Play a WAV file on a virtual clock with silence skipping enabled.
    Simulate {
        input: PathBuf,

        #[command(flatten)]
        detection: DetectionArgs,

        /// How silence is skipped.
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Playback rate inside silence in speed-ramp mode.
        #[arg(long)]
        ramp_rate: Option<f64>,

        /// Virtual tick length in milliseconds (1-250).
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the effective settings as JSON.
    Settings,
}

#[derive(Args, Debug, Default)]
struct DetectionArgs {
    /// Shortest silence reported, in seconds.
    #[arg(long)]
    min_silence: Option<f64>,

    /// RMS level below which a window counts as silent.
    #[arg(long)]
    threshold: Option<f32>,

    /// Samples per energy window.
    #[arg(long)]
    step: Option<usize>,

    /// Analysis chunk length in seconds.
    #[arg(long)]
    chunk: Option<f64>,

    /// Analyse the whole file in one pass instead of chunk by chunk.
    #[arg(long)]
    whole_file: bool,

    /// Audio channel to analyse.
    #[arg(long)]
    channel: Option<usize>,
}

impl DetectionArgs {
    fn apply(&self, settings: &mut SessionSettings) {
        if let Some(v) = self.min_silence {
            settings.min_silence_duration = v;
        }
        if let Some(v) = self.threshold {
            settings.rms_threshold = v;
        }
        if let Some(v) = self.step {
            settings.sample_step = v;
        }
        if let Some(v) = self.chunk {
            settings.chunk_duration = v;
        }
        if self.whole_file {
            settings.granularity = Granularity::WholeFile;
        }
        if let Some(v) = self.channel {
            settings.channel = v;
        }
    }
}

/// Apply command line overrides on top of the loaded settings. Values given
/// as flags are checked, not clamped: an out-of-range flag is an error.
fn with_overrides(
    mut settings: SessionSettings,
    detection: &DetectionArgs,
    mode: Option<ModeArg>,
    ramp_rate: Option<f64>,
) -> Result<SessionSettings> {
    detection.apply(&mut settings);
    if let Some(mode) = mode {
        settings.response = mode.into();
    }
    if let Some(rate) = ramp_rate {
        settings.ramp_rate = rate;
    }
    settings
        .controller_config()
        .validate()
        .context("invalid command line option")?;
    settings.preload_threshold = settings.preload_threshold.min(settings.chunk_duration);
    Ok(settings)
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Seek,
    SpeedRamp,
}

impl From<ModeArg> for ResponseMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Seek => ResponseMode::Seek,
            ModeArg::SpeedRamp => ResponseMode::SpeedRamp,
        }
    }
}

fn main() -> Result<()> {
    // ── Tracing ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings_path = cli.settings.unwrap_or_else(default_settings_path);
    let settings = load_settings(&settings_path);
    info!(path = %settings_path.display(), "settings loaded");

    match cli.command {
        Command::Scan {
            input,
            detection,
            json,
        } => {
            let settings = with_overrides(settings, &detection, None, None)?;
            let report = commands::scan_file(&input, &settings)?;
            commands::print_scan(&report, json)?;
        }
        Command::Simulate {
            input,
            detection,
            mode,
            ramp_rate,
            tick_ms,
            json,
        } => {
            let settings = with_overrides(settings, &detection, mode, ramp_rate)?;
            let tick = tick_ms
                .map(|ms| Duration::from_millis(ms.clamp(1, 250)))
                .unwrap_or_else(ticker::tick_interval);
            let report = commands::simulate_file(&input, &settings, tick)?;
            commands::print_simulation(&report, json)?;
        }
        Command::Settings => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }
    Ok(())
}
