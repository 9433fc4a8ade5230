//! Per-chunk analysis bookkeeping.
//!
//! ```text
//! (none) ─► Requested ─► Processing ─► Completed
//!                 │            │
//!                 └────────────┴─► Failed ─► (none) on clear_failed
//! ```
//!
//! `Completed` is terminal. The completed chunks form the processed set.
//! `Failed` chunks are not scheduled again until cleared.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Requested,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Default, Clone)]
pub struct ChunkLedger {
    states: BTreeMap<u64, ChunkState>,
}

impl ChunkLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, chunk: u64) -> Option<ChunkState> {
        self.states.get(&chunk).copied()
    }

    pub fn is_processed(&self, chunk: u64) -> bool {
        self.state(chunk) == Some(ChunkState::Completed)
    }

    pub fn is_in_flight(&self, chunk: u64) -> bool {
        matches!(
            self.state(chunk),
            Some(ChunkState::Requested | ChunkState::Processing)
        )
    }

    /// Never requested, or failed last time.
    pub fn needs_analysis(&self, chunk: u64) -> bool {
        matches!(self.state(chunk), None | Some(ChunkState::Failed))
    }

    /// No request was ever made for this chunk.
    pub fn is_unrequested(&self, chunk: u64) -> bool {
        self.state(chunk).is_none()
    }

    pub fn mark_requested(&mut self, chunk: u64) {
        self.transition(chunk, ChunkState::Requested);
    }

    pub fn mark_processing(&mut self, chunk: u64) {
        self.transition(chunk, ChunkState::Processing);
    }

    pub fn mark_completed(&mut self, chunk: u64) {
        self.states.insert(chunk, ChunkState::Completed);
    }

    pub fn mark_failed(&mut self, chunk: u64) {
        self.transition(chunk, ChunkState::Failed);
    }

    /// Forget every failed chunk so the scheduler treats it as unrequested.
    /// Returns the cleared indices in ascending order.
    pub fn clear_failed(&mut self) -> Vec<u64> {
        let failed: Vec<u64> = self
            .states
            .iter()
            .filter(|(_, state)| **state == ChunkState::Failed)
            .map(|(chunk, _)| *chunk)
            .collect();
        for chunk in &failed {
            self.states.remove(chunk);
        }
        failed
    }

    /// Processed chunk indices in ascending order.
    pub fn processed(&self) -> impl Iterator<Item = u64> + '_ {
        self.states
            .iter()
            .filter(|(_, state)| **state == ChunkState::Completed)
            .map(|(chunk, _)| *chunk)
    }

    pub fn processed_count(&self) -> usize {
        self.processed().count()
    }

    fn transition(&mut self, chunk: u64, next: ChunkState) {
        if self.is_processed(chunk) {
            return;
        }
        self.states.insert(chunk, next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_walks_through_states() {
        let mut ledger = ChunkLedger::new();
        assert!(ledger.needs_analysis(1));

        ledger.mark_requested(1);
        assert!(ledger.is_in_flight(1));
        assert!(!ledger.needs_analysis(1));

        ledger.mark_processing(1);
        assert_eq!(ledger.state(1), Some(ChunkState::Processing));

        ledger.mark_completed(1);
        assert!(ledger.is_processed(1));
        assert!(!ledger.is_in_flight(1));
        assert_eq!(ledger.processed().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn completed_is_sticky() {
        let mut ledger = ChunkLedger::new();
        ledger.mark_completed(0);
        ledger.mark_failed(0);
        ledger.mark_processing(0);
        assert!(ledger.is_processed(0));
    }

    #[test]
    fn failed_chunk_can_be_requested_again() {
        let mut ledger = ChunkLedger::new();
        ledger.mark_requested(2);
        ledger.mark_failed(2);
        assert!(ledger.needs_analysis(2));
        assert!(!ledger.is_unrequested(2));
        assert!(!ledger.is_processed(2));

        ledger.mark_requested(2);
        assert!(ledger.is_in_flight(2));
        assert_eq!(ledger.processed_count(), 0);
    }

    #[test]
    fn clearing_failures_leaves_other_chunks_alone() {
        let mut ledger = ChunkLedger::new();
        ledger.mark_failed(0);
        ledger.mark_completed(1);
        ledger.mark_requested(2);
        ledger.mark_failed(3);

        assert_eq!(ledger.clear_failed(), vec![0, 3]);
        assert!(ledger.is_unrequested(0));
        assert!(ledger.is_unrequested(3));
        assert!(ledger.is_processed(1));
        assert!(ledger.is_in_flight(2));
        assert!(ledger.clear_failed().is_empty());
    }
}
