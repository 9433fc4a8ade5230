//! Media player abstraction.
//!
//! The controller never owns playback: it reads a [`PlaybackState`] snapshot
//! each tick and writes commands back through the `Player` trait. Seek
//! completion is reported by the host calling
//! [`PlaybackSkipController::on_seek_completed`](crate::controller::PlaybackSkipController::on_seek_completed).

pub mod simulated;

/// Snapshot of the player read once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    /// Current position in media seconds.
    pub current_time: f64,
    pub paused: bool,
    pub ended: bool,
    /// Current playback-rate multiplier (1.0 = normal speed).
    pub playback_rate: f64,
}

impl PlaybackState {
    /// `true` while the media is advancing.
    pub fn is_playing(&self) -> bool {
        !self.paused && !self.ended
    }
}

/// Contract for player backends.
pub trait Player: Send + 'static {
    fn state(&self) -> PlaybackState;

    /// Jump to `time`. Completion is acknowledged asynchronously.
    fn seek(&mut self, time: f64);

    fn set_playback_rate(&mut self, rate: f64);

    /// Enable or disable the user-facing transport controls.
    fn set_controls_enabled(&mut self, enabled: bool);
}

/// A command issued to a player, as recorded by [`simulated::SimulatedPlayer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerCommand {
    Seek(f64),
    SetPlaybackRate(f64),
    SetControlsEnabled(bool),
}
