//! Chunk-indexed store of detected silent intervals.
//!
//! Intervals are indexed under every chunk they touch, so a position lookup
//! only ever scans the list of the chunk containing that position. Lists stay
//! sorted by start and pairwise disjoint. The map only grows: merging is
//! idempotent and never removes or rewrites an entry.

use std::collections::BTreeMap;

use tracing::warn;

use crate::buffering::{chunk_index, chunk_range};
use crate::detect::SilenceInterval;

#[derive(Debug, Clone)]
pub struct SilenceMap {
    chunk_duration: f64,
    chunks: BTreeMap<u64, Vec<SilenceInterval>>,
}

impl SilenceMap {
    pub fn new(chunk_duration: f64) -> Self {
        Self {
            chunk_duration,
            chunks: BTreeMap::new(),
        }
    }

    /// Merge a completed run's intervals. Returns how many chunk entries were
    /// added; re-applying the same intervals adds nothing.
    pub fn merge(&mut self, intervals: &[SilenceInterval]) -> usize {
        let mut added = 0;
        for interval in intervals {
            if interval.start.is_nan() || interval.end.is_nan() || interval.start >= interval.end {
                warn!(?interval, "ignoring degenerate silence interval");
                continue;
            }
            for index in chunk_range(interval.start, interval.end, self.chunk_duration) {
                let list = self.chunks.entry(index).or_default();
                if insert_sorted(list, *interval) {
                    added += 1;
                }
            }
        }
        added
    }

    /// Interval of chunk `chunk` containing `time`, if any.
    pub fn find(&self, chunk: u64, time: f64) -> Option<SilenceInterval> {
        self.chunks
            .get(&chunk)?
            .iter()
            .find(|interval| interval.contains(time))
            .copied()
    }

    /// `true` if `time` lies in a known silent interval. Unknown chunks are
    /// never silent.
    pub fn is_silent(&self, time: f64) -> bool {
        self.find(chunk_index(time, self.chunk_duration), time)
            .is_some()
    }

    pub fn intervals(&self, chunk: u64) -> &[SilenceInterval] {
        self.chunks.get(&chunk).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every distinct interval, sorted by start.
    pub fn all(&self) -> Vec<SilenceInterval> {
        let mut out: Vec<SilenceInterval> = Vec::new();
        for interval in self.chunks.values().flatten() {
            if out.last() != Some(interval) {
                out.push(*interval);
            }
        }
        out
    }

    /// Sum of all distinct interval durations.
    pub fn total_silence(&self) -> f64 {
        self.all().iter().map(SilenceInterval::duration).sum()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Insert keeping `list` sorted and disjoint. Exact duplicates are skipped
/// silently; overlapping intervals are rejected.
fn insert_sorted(list: &mut Vec<SilenceInterval>, interval: SilenceInterval) -> bool {
    let pos = list.partition_point(|existing| existing.start < interval.start);

    if list.get(pos) == Some(&interval) {
        return false;
    }
    let overlaps_prev = pos > 0 && list[pos - 1].end > interval.start;
    let overlaps_next = list
        .get(pos)
        .is_some_and(|next| next.start < interval.end);
    if overlaps_prev || overlaps_next {
        warn!(?interval, "ignoring silence interval overlapping a known one");
        return false;
    }

    list.insert(pos, interval);
    true
}
