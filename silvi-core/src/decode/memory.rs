//! `MemoryDecoder`: decode backend over samples already held in memory.
//!
//! Used by tests and simulations, and by hosts that decode the soundtrack
//! themselves and only need span slicing.

use tracing::debug;

use crate::buffering::chunk::SampleBuffer;
use crate::decode::{MediaDecoder, MediaSpan};
use crate::error::{Result, SilviError};

/// Single-channel PCM held in memory.
#[derive(Debug, Clone)]
pub struct MemoryDecoder {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl MemoryDecoder {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }
}

impl MediaDecoder for MemoryDecoder {
    fn decode(&mut self, span: MediaSpan) -> Result<SampleBuffer> {
        if self.sample_rate == 0 {
            return Err(SilviError::Decode("sample rate is zero".into()));
        }

        let (first, last) = span.frame_range(self.sample_rate, self.samples.len());
        debug!(first, last, "MemoryDecoder::decode");

        let mut buffer = SampleBuffer::new(self.samples[first..last].to_vec(), self.sample_rate)
            .with_offset(span.start);
        if let Some(end) = span.declared_end(self.duration_secs()) {
            buffer = buffer.with_declared_end(end);
        }
        Ok(buffer)
    }

    fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}
