//! `SimulatedPlayer`: clock-driven stand-in for a real media element.
//!
//! The handle is cheap to clone: the controller owns one clone while the host
//! (a test, the `simulate` command) keeps another to drive the clock, complete
//! seeks and inspect the recorded commands.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::{PlaybackState, Player, PlayerCommand};

#[derive(Debug)]
struct SimulatedState {
    current_time: f64,
    duration: f64,
    paused: bool,
    ended: bool,
    playback_rate: f64,
    controls_enabled: bool,
    pending_seek: Option<f64>,
    commands: Vec<PlayerCommand>,
}

/// Thread-safe handle to a simulated player.
#[derive(Debug, Clone)]
pub struct SimulatedPlayer(Arc<Mutex<SimulatedState>>);

impl SimulatedPlayer {
    /// A paused player at position 0 for media of `duration` seconds.
    pub fn new(duration: f64) -> Self {
        Self(Arc::new(Mutex::new(SimulatedState {
            current_time: 0.0,
            duration,
            paused: true,
            ended: false,
            playback_rate: 1.0,
            controls_enabled: true,
            pending_seek: None,
            commands: Vec::new(),
        })))
    }

    pub fn play(&self) {
        let mut state = self.0.lock();
        if !state.ended {
            state.paused = false;
        }
    }

    pub fn pause(&self) {
        self.0.lock().paused = true;
    }

    /// Move the playhead directly, as a user scrubbing would.
    pub fn set_position(&self, time: f64) {
        let mut state = self.0.lock();
        state.current_time = time.clamp(0.0, state.duration);
        state.ended = state.current_time >= state.duration;
    }

    /// Advance the clock by `dt` wall seconds at the current rate. Has no
    /// effect while paused, ended or mid-seek.
    pub fn advance(&self, dt: f64) {
        let mut state = self.0.lock();
        if state.paused || state.ended || state.pending_seek.is_some() {
            return;
        }
        state.current_time = (state.current_time + dt * state.playback_rate).min(state.duration);
        if state.current_time >= state.duration {
            state.ended = true;
        }
    }

    /// Apply the pending seek. Returns `true` if there was one; the host
    /// should then call `on_seek_completed` on the controller.
    pub fn complete_seek(&self) -> bool {
        let mut state = self.0.lock();
        match state.pending_seek.take() {
            Some(target) => {
                state.current_time = target.clamp(0.0, state.duration);
                state.ended = state.current_time >= state.duration;
                true
            }
            None => false,
        }
    }

    pub fn has_pending_seek(&self) -> bool {
        self.0.lock().pending_seek.is_some()
    }

    pub fn controls_enabled(&self) -> bool {
        self.0.lock().controls_enabled
    }

    /// Every command received so far, oldest first.
    pub fn commands(&self) -> Vec<PlayerCommand> {
        self.0.lock().commands.clone()
    }

    /// Drain the recorded commands.
    pub fn take_commands(&self) -> Vec<PlayerCommand> {
        std::mem::take(&mut self.0.lock().commands)
    }
}

impl Player for SimulatedPlayer {
    fn state(&self) -> PlaybackState {
        let state = self.0.lock();
        PlaybackState {
            current_time: state.current_time,
            paused: state.paused,
            ended: state.ended,
            playback_rate: state.playback_rate,
        }
    }

    fn seek(&mut self, time: f64) {
        debug!(time, "SimulatedPlayer::seek");
        let mut state = self.0.lock();
        state.pending_seek = Some(time);
        state.commands.push(PlayerCommand::Seek(time));
    }

    fn set_playback_rate(&mut self, rate: f64) {
        let mut state = self.0.lock();
        state.playback_rate = rate;
        state.commands.push(PlayerCommand::SetPlaybackRate(rate));
    }

    fn set_controls_enabled(&mut self, enabled: bool) {
        let mut state = self.0.lock();
        state.controls_enabled = enabled;
        state.commands.push(PlayerCommand::SetControlsEnabled(enabled));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_respects_rate_and_duration() {
        let mut player = SimulatedPlayer::new(10.0);
        player.advance(1.0);
        assert_eq!(player.state().current_time, 0.0, "paused player must not move");

        player.play();
        player.set_playback_rate(4.0);
        player.advance(1.0);
        assert_eq!(player.state().current_time, 4.0);

        player.advance(10.0);
        let state = player.state();
        assert_eq!(state.current_time, 10.0);
        assert!(state.ended);
    }

    #[test]
    fn seek_applies_only_on_completion() {
        let mut player = SimulatedPlayer::new(10.0);
        player.play();
        player.seek(5.0);
        player.advance(1.0);
        assert_eq!(player.state().current_time, 0.0);
        assert!(player.has_pending_seek());

        assert!(player.complete_seek());
        assert_eq!(player.state().current_time, 5.0);
        assert!(!player.complete_seek());
        assert_eq!(player.commands(), vec![PlayerCommand::Seek(5.0)]);
    }

    #[test]
    fn clones_share_state() {
        let observer = SimulatedPlayer::new(10.0);
        let mut owned = observer.clone();
        owned.set_controls_enabled(false);
        assert!(!observer.controls_enabled());
        assert_eq!(observer.take_commands().len(), 1);
        assert!(observer.commands().is_empty());
    }
}
