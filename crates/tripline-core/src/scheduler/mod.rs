//! Trip scheduling.
//!
//! The coordinator fans one chunk of trips out to the route client with a
//! bounded number of requests in flight; the chunk scheduler drives chunks
//! one after another and checkpoints between them.

mod chunks;
mod coordinator;
mod progress;

pub use chunks::{run_chunks, ChunkSettings, ChunkSummary};
pub use coordinator::{run_batch, BatchOutput, BatchProgress, TripState};
pub use progress::{ChunkTally, ProgressEvent};
