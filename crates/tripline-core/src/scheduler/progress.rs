//! Progress reporting for the pipeline (per-trip and per-chunk counts).
//!
//! Sent over an mpsc channel so the CLI can render it without the core
//! knowing about terminals.

use std::ops::AddAssign;

use super::coordinator::TripState;

/// Outcome counts for a chunk or a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkTally {
    /// Full route from the service.
    pub routed: usize,
    /// Service had no route; straight line emitted.
    pub unroutable: usize,
    /// Retries exhausted; straight line emitted.
    pub fallback: usize,
    /// Retries exhausted; nothing emitted.
    pub dropped: usize,
    /// Not dispatched (no pickup coordinate).
    pub skipped: usize,
}

impl ChunkTally {
    pub fn record(&mut self, state: TripState) {
        match state {
            TripState::Succeeded => self.routed += 1,
            TripState::Unroutable => self.unroutable += 1,
            TripState::Fallback => self.fallback += 1,
            TripState::Dropped => self.dropped += 1,
            TripState::Skipped => self.skipped += 1,
            TripState::Pending | TripState::Requesting => {}
        }
    }

    /// Trips that produced a feature.
    pub fn features(&self) -> usize {
        self.routed + self.unroutable + self.fallback
    }
}

impl AddAssign for ChunkTally {
    fn add_assign(&mut self, rhs: Self) {
        self.routed += rhs.routed;
        self.unroutable += rhs.unroutable;
        self.fallback += rhs.fallback;
        self.dropped += rhs.dropped;
        self.skipped += rhs.skipped;
    }
}

/// Snapshot events emitted while the pipeline runs. Chunk numbers are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A chunk is about to be dispatched.
    ChunkStarted {
        chunk: usize,
        total_chunks: usize,
        trips: usize,
    },
    /// One trip of the current chunk finished (any outcome).
    TripFinished {
        chunk: usize,
        total_chunks: usize,
        done: usize,
        trips: usize,
    },
    /// The chunk's features were appended and checkpointed.
    ChunkSaved {
        chunk: usize,
        total_chunks: usize,
        tally: ChunkTally,
        features_total: usize,
    },
}
