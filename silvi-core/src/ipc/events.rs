//! Status and skip notifications.
//!
//! | Event | Subscribe with |
//! |-------|----------------|
//! | `StatusEvent` | `PlaybackSkipController::subscribe_status` |
//! | `SkipEvent` | `PlaybackSkipController::subscribe_skips` |

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Status events
// ---------------------------------------------------------------------------

/// Emitted whenever analysis progresses or fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub status: ControllerStatus,
    /// Chunk the event refers to, if any.
    pub chunk: Option<u64>,
    /// Optional human-readable detail (e.g. error message).
    pub detail: Option<String>,
}

/// Coarse state of the analysis side of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerStatus {
    /// Nothing requested yet.
    Idle,
    /// A detection run is queued or in progress.
    Processing,
    /// The latest run completed; playback can rely on its ranges.
    Ready,
    /// A detection run failed. Playback continues without its ranges.
    Error,
    /// The session was torn down.
    Stopped,
}

// ---------------------------------------------------------------------------
// Skip events
// ---------------------------------------------------------------------------

/// Fire-and-forget pulse emitted once per skip (seek or speed ramp).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    pub kind: SkipKind,
    /// Playback position when the skip started.
    pub from: f64,
    /// End of the silent interval being skipped.
    pub to: f64,
    /// How long a UI should show the notice before clearing it.
    pub clear_after_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipKind {
    /// Position jumped to the end of the interval.
    Seek,
    /// Playback rate raised until the interval ends.
    Ramp,
}
