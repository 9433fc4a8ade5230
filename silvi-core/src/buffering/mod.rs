//! Sample buffers and media-timeline chunk arithmetic.
//!
//! The media timeline is split into fixed-duration chunks. Chunk `i` covers
//! `[i * chunk_duration, (i + 1) * chunk_duration)`.

pub mod chunk;

use std::ops::RangeInclusive;

/// Index of the chunk containing `time`. Negative or NaN times map to chunk 0.
pub fn chunk_index(time: f64, chunk_duration: f64) -> u64 {
    if time.is_nan() || time <= 0.0 || chunk_duration <= 0.0 {
        return 0;
    }
    (time / chunk_duration).floor() as u64
}

/// Media time at which chunk `index` starts.
pub fn chunk_start(index: u64, chunk_duration: f64) -> f64 {
    index as f64 * chunk_duration
}

/// Chunks touched by the half-open range `[start, end)`.
pub fn chunk_range(start: f64, end: f64, chunk_duration: f64) -> RangeInclusive<u64> {
    let first = chunk_index(start, chunk_duration);
    let mut last = chunk_index(end, chunk_duration);
    // An end exactly on a boundary does not touch the next chunk.
    if last > first && chunk_start(last, chunk_duration) >= end {
        last -= 1;
    }
    first..=last.max(first)
}

/// Position of `time` inside its chunk (`time mod chunk_duration`).
pub fn offset_in_chunk(time: f64, chunk_duration: f64) -> f64 {
    if chunk_duration <= 0.0 {
        return 0.0;
    }
    time.max(0.0) % chunk_duration
}
