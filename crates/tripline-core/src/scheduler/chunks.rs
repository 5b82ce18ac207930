//! Sequential chunk driver with a checkpoint after every chunk.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::coordinator::{run_batch, BatchProgress};
use super::progress::{ChunkTally, ProgressEvent};
use crate::checkpoint::CheckpointStore;
use crate::feature::FeatureCollection;
use crate::router::{RouteBackend, RouteClient};
use crate::trip::Trip;

/// Chunking and pacing knobs.
#[derive(Debug, Clone, Copy)]
pub struct ChunkSettings {
    /// Trips per chunk; progress is checkpointed after each one.
    pub chunk_size: usize,
    /// Pause between chunks so the routing service never sees sustained peak load.
    pub chunk_delay: Duration,
    /// Requests in flight within a chunk.
    pub max_concurrent: usize,
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_delay: Duration::from_secs(2),
            max_concurrent: 10,
        }
    }
}

/// What a run of chunks did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkSummary {
    pub chunks: usize,
    pub checkpoint_writes: usize,
    pub tally: ChunkTally,
}

/// Process `trips` chunk by chunk, appending features to `accumulator`.
///
/// Chunk N+1 starts only after chunk N's features are in the checkpoint, so an
/// interruption loses at most the chunk in progress.
pub async fn run_chunks<B: RouteBackend>(
    client: &Arc<RouteClient<B>>,
    trips: &[Trip],
    accumulator: &mut FeatureCollection,
    store: &CheckpointStore,
    settings: &ChunkSettings,
    progress: Option<&mpsc::Sender<ProgressEvent>>,
) -> Result<ChunkSummary> {
    let chunk_size = settings.chunk_size.max(1);
    let total_chunks = trips.len().div_ceil(chunk_size);
    let mut summary = ChunkSummary::default();

    tracing::info!("processing {} trips in {} chunks", trips.len(), total_chunks);

    for (i, chunk) in trips.chunks(chunk_size).enumerate() {
        let chunk_no = i + 1;
        if let Some(tx) = progress {
            let _ = tx
                .send(ProgressEvent::ChunkStarted {
                    chunk: chunk_no,
                    total_chunks,
                    trips: chunk.len(),
                })
                .await;
        }

        let batch_progress = progress.map(|tx| BatchProgress {
            tx,
            chunk: chunk_no,
            total_chunks,
        });
        let output = run_batch(client, chunk, settings.max_concurrent, batch_progress)
            .await
            .with_context(|| format!("chunk {}/{}", chunk_no, total_chunks))?;

        accumulator.extend(output.features);
        store
            .save(accumulator)
            .with_context(|| format!("save checkpoint after chunk {}/{}", chunk_no, total_chunks))?;
        summary.chunks += 1;
        summary.checkpoint_writes += 1;
        summary.tally += output.tally;

        tracing::info!(
            "chunk {}/{} saved: {} routed, {} no route, {} fallback, {} dropped, {} skipped; {} features total",
            chunk_no,
            total_chunks,
            output.tally.routed,
            output.tally.unroutable,
            output.tally.fallback,
            output.tally.dropped,
            output.tally.skipped,
            accumulator.len()
        );
        if let Some(tx) = progress {
            let _ = tx
                .send(ProgressEvent::ChunkSaved {
                    chunk: chunk_no,
                    total_chunks,
                    tally: output.tally,
                    features_total: accumulator.len(),
                })
                .await;
        }

        if chunk_no < total_chunks && !settings.chunk_delay.is_zero() {
            tokio::time::sleep(settings.chunk_delay).await;
        }
    }

    Ok(summary)
}
