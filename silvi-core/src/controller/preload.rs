//! Debounced preload scheduling.
//!
//! A single-slot timer: at most one chunk request is pending at any time, and
//! it fires on the first poll at or after its deadline.

use std::time::{Duration, Instant};

use crate::buffering::offset_in_chunk;

#[derive(Debug)]
pub struct PreloadTimer {
    debounce: Duration,
    slot: Option<(u64, Instant)>,
}

impl PreloadTimer {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            slot: None,
        }
    }

    /// Arm the timer for `chunk`. Returns `false` if a request is already
    /// pending; the pending one is kept.
    pub fn arm(&mut self, chunk: u64, now: Instant) -> bool {
        if self.slot.is_some() {
            return false;
        }
        self.slot = Some((chunk, now + self.debounce));
        true
    }

    /// Fire and clear the slot once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<u64> {
        match self.slot {
            Some((chunk, fire_at)) if now >= fire_at => {
                self.slot = None;
                Some(chunk)
            }
            _ => None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.slot.is_some()
    }

    pub fn armed_chunk(&self) -> Option<u64> {
        self.slot.map(|(chunk, _)| chunk)
    }

    pub fn cancel(&mut self) {
        self.slot = None;
    }
}

/// `true` once `time` is within `threshold` seconds of the end of its chunk.
pub fn in_preload_window(time: f64, chunk_duration: f64, threshold: f64) -> bool {
    offset_in_chunk(time, chunk_duration) >= chunk_duration - threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_after_debounce() {
        let base = Instant::now();
        let mut timer = PreloadTimer::new(Duration::from_secs(1));

        assert!(timer.arm(1, base));
        assert_eq!(timer.poll(base + Duration::from_millis(999)), None);
        assert_eq!(timer.poll(base + Duration::from_secs(1)), Some(1));
        assert_eq!(timer.poll(base + Duration::from_secs(5)), None);
        assert!(!timer.is_armed());
    }

    #[test]
    fn single_slot_keeps_first_request() {
        let base = Instant::now();
        let mut timer = PreloadTimer::new(Duration::from_secs(1));

        assert!(timer.arm(1, base));
        assert!(!timer.arm(2, base + Duration::from_millis(500)));
        assert_eq!(timer.armed_chunk(), Some(1));

        timer.cancel();
        assert!(timer.arm(2, base));
        assert_eq!(timer.armed_chunk(), Some(2));
    }

    #[test]
    fn preload_window_covers_chunk_tail() {
        assert!(!in_preload_window(239.9, 300.0, 60.0));
        assert!(in_preload_window(240.0, 300.0, 60.0));
        assert!(in_preload_window(299.0, 300.0, 60.0));
        assert!(!in_preload_window(300.0, 300.0, 60.0));
        assert!(in_preload_window(545.0, 300.0, 60.0));
    }
}
