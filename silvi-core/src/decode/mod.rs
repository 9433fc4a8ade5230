//! Media decode abstraction.
//!
//! The `MediaDecoder` trait decouples detection from any specific container or
//! codec. A decoder returns one channel of PCM for a span of the media
//! timeline, already placed on that timeline (`offset` = span start).
//!
//! `&mut self` on `decode` lets implementations keep open handles or caches.

pub mod memory;
pub mod wav;

pub use memory::MemoryDecoder;
pub use wav::WavDecoder;

use crate::buffering::chunk::SampleBuffer;
use crate::error::Result;

/// A range of the media timeline to decode, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaSpan {
    pub start: f64,
    /// `None` decodes to the end of the media.
    pub end: Option<f64>,
}

impl MediaSpan {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    /// The whole media, from 0 to its end.
    pub fn whole() -> Self {
        Self {
            start: 0.0,
            end: None,
        }
    }

    /// Sample-frame range `[first, last)` this span covers in a stream of
    /// `total_frames` frames at `sample_rate`.
    pub fn frame_range(&self, sample_rate: u32, total_frames: usize) -> (usize, usize) {
        let rate = sample_rate as f64;
        let first = ((self.start.max(0.0) * rate).floor() as usize).min(total_frames);
        let last = match self.end {
            Some(end) => ((end.max(0.0) * rate).floor() as usize).min(total_frames),
            None => total_frames,
        };
        (first, last.max(first))
    }

    /// End of the span clamped to the media duration. `None` for a whole-media
    /// span, whose end is wherever the samples stop.
    pub fn declared_end(&self, media_duration: f64) -> Option<f64> {
        self.end.map(|end| end.min(media_duration))
    }
}

/// Contract for decode backends.
pub trait MediaDecoder: Send + 'static {
    /// Decode one channel of `span`.
    ///
    /// The returned buffer's `offset` is `span.start` and its `declared_end`
    /// is `span.declared_end(self.duration_secs())`.
    ///
    /// # Errors
    /// Returns an error if the media cannot be read or decoded.
    fn decode(&mut self, span: MediaSpan) -> Result<SampleBuffer>;

    /// Total media duration in seconds.
    fn duration_secs(&self) -> f64;
}
