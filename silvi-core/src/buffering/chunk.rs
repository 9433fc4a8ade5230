//! Typed sample buffer handed from the decoder to the detector.

/// A contiguous block of single-channel PCM samples placed on the media timeline.
///
/// Produced by a [`MediaDecoder`](crate::decode::MediaDecoder), moved into a
/// detection run and dropped once detection completes.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    /// Mono f32 samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g. 44100, 48000).
    pub sample_rate: u32,
    /// Media time (seconds) of the first sample.
    pub offset: f64,
    /// Declared end of the span this buffer represents. A chunk's declared end
    /// may lie past the last sample's timestamp.
    pub declared_end: Option<f64>,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            offset: 0.0,
            declared_end: None,
        }
    }

    /// Place the buffer at `offset` seconds on the media timeline.
    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    /// Declare the end of the span this buffer covers.
    pub fn with_declared_end(mut self, end: f64) -> Self {
        self.declared_end = Some(end);
        self
    }

    /// Returns the duration of the samples in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Media time at which an open silence run is closed when input runs out.
    pub fn end_time(&self) -> f64 {
        self.declared_end
            .unwrap_or_else(|| self.offset + self.duration_secs())
    }

    /// Media time of the sample at `index`.
    pub fn time_at(&self, index: usize) -> f64 {
        self.offset + index as f64 / self.sample_rate as f64
    }

    /// Returns true if the buffer contains no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
