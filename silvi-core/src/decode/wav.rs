//! `WavDecoder` reads one channel of a PCM / float WAV file with `hound`.
//!
//! Each `decode` call reopens the file and seeks to the span's first frame, so
//! a multi-hour file is never decoded up front.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader, WavSpec};
use tracing::{debug, info};

use crate::buffering::chunk::SampleBuffer;
use crate::decode::{MediaDecoder, MediaSpan};
use crate::error::{Result, SilviError};

/// Single-channel view of a WAV file on disk.
#[derive(Debug, Clone)]
pub struct WavDecoder {
    path: PathBuf,
    spec: WavSpec,
    /// Frames per channel.
    total_frames: usize,
    /// Channel to analyse.
    channel: usize,
}

impl WavDecoder {
    /// Open `path` and analyse channel 0.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_channel(path, 0)
    }

    /// Open `path` and analyse `channel`.
    ///
    /// # Errors
    /// - `SilviError::Wav` if the header cannot be read.
    /// - `SilviError::InvalidConfig` if `channel` does not exist.
    pub fn open_channel(path: impl AsRef<Path>, channel: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = WavReader::open(&path)?;
        let spec = reader.spec();
        let total_frames = reader.duration() as usize;

        if channel >= usize::from(spec.channels.max(1)) {
            return Err(SilviError::InvalidConfig(format!(
                "channel {channel} out of range ({} channels)",
                spec.channels
            )));
        }

        info!(
            path = %path.display(),
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            total_frames,
            "opened wav media"
        );

        Ok(Self {
            path,
            spec,
            total_frames,
            channel,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MediaDecoder for WavDecoder {
    fn decode(&mut self, span: MediaSpan) -> Result<SampleBuffer> {
        let (first, last) = span.frame_range(self.spec.sample_rate, self.total_frames);
        let channels = usize::from(self.spec.channels.max(1));
        let count = (last - first) * channels;

        let mut reader = WavReader::open(&self.path)?;
        let seek_to = u32::try_from(first)
            .map_err(|_| SilviError::Decode(format!("frame {first} beyond wav addressing")))?;
        reader.seek(seek_to)?;

        let samples = match self.spec.sample_format {
            SampleFormat::Float => {
                read_channel::<f32, _>(&mut reader, count, channels, self.channel, |s| s)?
            }
            SampleFormat::Int => {
                let max = ((1_i64 << (self.spec.bits_per_sample.max(1) - 1)) - 1).max(1) as f32;
                read_channel::<i32, _>(&mut reader, count, channels, self.channel, |s| {
                    s as f32 / max
                })?
            }
        };

        debug!(first, last, decoded = samples.len(), "WavDecoder::decode");

        let mut buffer = SampleBuffer::new(samples, self.spec.sample_rate).with_offset(span.start);
        if let Some(end) = span.declared_end(self.duration_secs()) {
            buffer = buffer.with_declared_end(end);
        }
        Ok(buffer)
    }

    fn duration_secs(&self) -> f64 {
        if self.spec.sample_rate == 0 {
            return 0.0;
        }
        self.total_frames as f64 / self.spec.sample_rate as f64
    }
}

/// Read `count` interleaved samples and keep those belonging to `channel`.
fn read_channel<S, F>(
    reader: &mut WavReader<BufReader<File>>,
    count: usize,
    channels: usize,
    channel: usize,
    convert: F,
) -> Result<Vec<f32>>
where
    S: hound::Sample,
    F: Fn(S) -> f32,
{
    let mut out = Vec::with_capacity(count / channels + 1);
    for (i, sample) in reader.samples::<S>().take(count).enumerate() {
        let sample = sample?;
        if i % channels == channel {
            out.push(convert(sample));
        }
    }
    Ok(out)
}
