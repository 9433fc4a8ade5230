//! Fixed-interval driver for [`PlaybackSkipController::tick`].
//!
//! Hosts with their own frame loop call `tick()` directly; `run` is for hosts
//! that just want the controller polled on the current thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use super::PlaybackSkipController;
use crate::player::Player;

/// One display frame.
const DEFAULT_TICK_MS: u64 = 16;
const MIN_TICK_MS: u64 = 1;
const MAX_TICK_MS: u64 = 250;

/// Environment override for the tick interval, in milliseconds.
pub const TICK_INTERVAL_ENV: &str = "SILVI_TICK_INTERVAL_MS";

/// Tick interval, read once from `SILVI_TICK_INTERVAL_MS` (clamped to
/// 1..=250 ms), otherwise 16 ms.
pub fn tick_interval() -> Duration {
    static INTERVAL: OnceLock<Duration> = OnceLock::new();
    *INTERVAL.get_or_init(|| {
        let ms = std::env::var(TICK_INTERVAL_ENV)
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map(|ms| ms.clamp(MIN_TICK_MS, MAX_TICK_MS))
            .unwrap_or(DEFAULT_TICK_MS);
        debug!(tick_ms = ms, "tick interval resolved");
        Duration::from_millis(ms)
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerStats {
    pub ticks: u64,
    /// Ticks during which the player was playing and skipping was enabled.
    pub playing_ticks: u64,
}

/// Tick `controller` every `interval` until `running` is cleared or the
/// controller is stopped.
pub fn run<P: Player>(
    controller: &mut PlaybackSkipController<P>,
    interval: Duration,
    running: &AtomicBool,
) -> TickerStats {
    let mut stats = TickerStats::default();
    let mut next = Instant::now();
    info!(interval_ms = interval.as_millis() as u64, "ticker started");

    while running.load(Ordering::Relaxed) && !controller.is_stopped() {
        let now = Instant::now();
        if controller.tick_at(now) {
            stats.playing_ticks += 1;
        }
        stats.ticks += 1;

        next += interval;
        let now = Instant::now();
        if next > now {
            std::thread::sleep(next - now);
        } else {
            // Fell behind; don't try to catch up with a burst of ticks.
            next = now;
        }
    }

    info!(
        ticks = stats.ticks,
        playing_ticks = stats.playing_ticks,
        "ticker stopped"
    );
    stats
}
