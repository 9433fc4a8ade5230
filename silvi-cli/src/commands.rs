//! `scan` and `simulate` command implementations.
//!
//! Both are generic over [`MediaDecoder`] so they can be exercised with
//! in-memory audio; `main` wires them to [`WavDecoder`].

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Serialize;
use silvi_core::buffering::chunk_start;
use silvi_core::controller::ControllerStats;
use silvi_core::worker::DiagnosticsSnapshot;
use silvi_core::{
    detect, ControllerStatus, Granularity, InlineExecutor, MediaDecoder, MediaSpan,
    PlaybackSkipController, Player, SilenceInterval, SimulatedPlayer, SkipEvent, SkipKind,
    StatusEvent, WavDecoder,
};
use tracing::{debug, info, warn};

use crate::settings::SessionSettings;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub duration: f64,
    pub granularity: Granularity,
    pub intervals: Vec<SilenceInterval>,
    pub total_silence: f64,
}

pub fn scan_file(path: &Path, settings: &SessionSettings) -> Result<ScanReport> {
    let mut decoder = WavDecoder::open_channel(path, settings.channel)
        .with_context(|| format!("opening {}", path.display()))?;
    scan(&mut decoder, settings).with_context(|| format!("scanning {}", path.display()))
}

/// Detect silence over the whole media, chunk by chunk unless whole-file
/// granularity is selected.
pub fn scan<D: MediaDecoder>(decoder: &mut D, settings: &SessionSettings) -> Result<ScanReport> {
    let config = settings.controller_config();
    config.validate()?;
    let duration = decoder.duration_secs();

    let intervals = match config.granularity {
        Granularity::WholeFile => {
            let buffer = decoder.decode(MediaSpan::whole())?;
            detect(&buffer, &config.detection)?
        }
        Granularity::Chunked => {
            let chunks = (duration / config.chunk_duration).ceil().max(1.0) as u64;
            let mut all = Vec::new();
            for index in 0..chunks {
                let span = MediaSpan::new(
                    chunk_start(index, config.chunk_duration),
                    chunk_start(index + 1, config.chunk_duration),
                );
                let buffer = decoder.decode(span)?;
                let found = detect(&buffer, &config.detection)?;
                debug!(chunk = index, intervals = found.len(), "chunk scanned");
                all.extend(found);
            }
            all
        }
    };

    let total_silence = intervals.iter().map(SilenceInterval::duration).sum();
    info!(
        duration,
        intervals = intervals.len(),
        total_silence,
        "scan complete"
    );
    Ok(ScanReport {
        duration,
        granularity: config.granularity,
        intervals,
        total_silence,
    })
}

pub fn print_scan(report: &ScanReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for interval in &report.intervals {
        println!(
            "{:>10.3}  {:>10.3}  ({:.3} s)",
            interval.start,
            interval.end,
            interval.duration()
        );
    }
    println!(
        "{} silent intervals, {:.1} s of {:.1} s ({:.1}%)",
        report.intervals.len(),
        report.total_silence,
        report.duration,
        percent(report.total_silence, report.duration)
    );
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub media_duration: f64,
    /// Wall-clock time the simulated playback took.
    pub playback_time: f64,
    pub time_saved: f64,
    pub skips: Vec<SkipEvent>,
    pub failures: Vec<StatusEvent>,
    pub chunks_processed: usize,
    pub controller: ControllerStats,
    pub worker: DiagnosticsSnapshot,
}

pub fn simulate_file(path: &Path, settings: &SessionSettings, tick: Duration) -> Result<SimulationReport> {
    let decoder = WavDecoder::open_channel(path, settings.channel)
        .with_context(|| format!("opening {}", path.display()))?;
    simulate(decoder, settings, tick).with_context(|| format!("simulating {}", path.display()))
}

/// Play the media from start to end on a virtual clock advanced by `tick`
/// per controller tick. Detection runs inline, so results are deterministic.
pub fn simulate<D: MediaDecoder>(
    decoder: D,
    settings: &SessionSettings,
    tick: Duration,
) -> Result<SimulationReport> {
    let duration = decoder.duration_secs();
    let player = SimulatedPlayer::new(duration);
    let mut controller = PlaybackSkipController::new(
        settings.controller_config(),
        player.clone(),
        Box::new(InlineExecutor::new(decoder)),
    )?;
    let mut skip_rx = controller.subscribe_skips();
    let mut status_rx = controller.subscribe_status();
    controller.begin()?;
    player.play();

    let dt = tick.as_secs_f64();
    // A clock that never reaches the end would otherwise spin forever.
    let max_ticks = ((duration / dt).ceil() as u64).saturating_mul(2) + 1_000;
    let base = Instant::now();
    let mut elapsed = Duration::ZERO;
    let mut ticks = 0u64;
    let mut skips = Vec::new();
    let mut failures = Vec::new();

    while !player.state().ended {
        if ticks >= max_ticks {
            warn!(ticks, "simulation stopped before the end of the media");
            break;
        }
        controller.tick_at(base + elapsed);
        if player.complete_seek() {
            controller.on_seek_completed();
        }
        player.advance(dt);
        elapsed += tick;
        ticks += 1;

        while let Ok(event) = skip_rx.try_recv() {
            skips.push(event);
        }
        while let Ok(event) = status_rx.try_recv() {
            if event.status == ControllerStatus::Error {
                warn!(chunk = ?event.chunk, detail = ?event.detail, "analysis failed");
                failures.push(event);
            } else {
                debug!(status = ?event.status, chunk = ?event.chunk, "status");
            }
        }
    }

    controller.stop();
    let playback_time = elapsed.as_secs_f64();
    Ok(SimulationReport {
        media_duration: duration,
        playback_time,
        time_saved: (duration - playback_time).max(0.0),
        skips,
        failures,
        chunks_processed: controller.ledger().processed_count(),
        controller: controller.stats(),
        worker: controller.worker_diagnostics(),
    })
}

pub fn print_simulation(report: &SimulationReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for skip in &report.skips {
        let verb = match skip.kind {
            SkipKind::Seek => "seek",
            SkipKind::Ramp => "ramp",
        };
        println!("#{:<4} {verb}  {:>10.3} -> {:>10.3}", skip.seq, skip.from, skip.to);
    }
    println!("media duration   {:>10.1} s", report.media_duration);
    println!("playback time    {:>10.1} s", report.playback_time);
    println!(
        "time saved       {:>10.1} s ({:.1}%)",
        report.time_saved,
        percent(report.time_saved, report.media_duration)
    );
    println!("skips            {:>10}", report.skips.len());
    println!("chunks analysed  {:>10}", report.chunks_processed);
    if !report.failures.is_empty() {
        println!("failed analyses  {:>10}", report.failures.len());
    }
    Ok(())
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}
