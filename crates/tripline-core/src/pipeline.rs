//! End-to-end run: restore progress, fetch what is missing, write the output.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::checkpoint::CheckpointStore;
use crate::router::{RouteBackend, RouteClient};
use crate::scheduler::{self, ChunkSettings, ChunkTally, ProgressEvent};
use crate::trip::{Trip, TripId};

/// Counts reported after a successful run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    /// Features restored from a checkpoint or previous output.
    pub resumed: usize,
    /// Trips excluded because their id was already done.
    pub already_done: usize,
    /// Trips excluded because an earlier row had the same id.
    pub duplicate_ids: usize,
    /// Trips handed to the chunk scheduler.
    pub scheduled: usize,
    pub chunks: usize,
    pub checkpoint_writes: usize,
    pub tally: ChunkTally,
    /// Features in the final output.
    pub total_features: usize,
}

/// Wires the route client, chunk scheduler and checkpoint store together.
pub struct Pipeline<B> {
    client: Arc<RouteClient<B>>,
    store: CheckpointStore,
    settings: ChunkSettings,
}

impl<B: RouteBackend> Pipeline<B> {
    pub fn new(client: RouteClient<B>, store: CheckpointStore, settings: ChunkSettings) -> Self {
        Self {
            client: Arc::new(client),
            store,
            settings,
        }
    }

    pub fn client(&self) -> &RouteClient<B> {
        &self.client
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Run the whole job. Trips already present in the checkpoint (or a
    /// previous output) are not fetched again; the checkpoint is removed once
    /// the output is written.
    pub async fn run(
        &self,
        trips: Vec<Trip>,
        progress: Option<mpsc::Sender<ProgressEvent>>,
    ) -> Result<PipelineSummary> {
        let (mut collection, done) = self.store.load().context("restore progress")?;
        let mut summary = PipelineSummary {
            resumed: collection.len(),
            ..PipelineSummary::default()
        };

        let pending = pending_trips(trips, &done, &mut summary);
        summary.scheduled = pending.len();
        if summary.resumed > 0 {
            tracing::info!(
                "loaded {} existing features, {} trips remaining",
                summary.resumed,
                pending.len()
            );
        }

        let chunks = scheduler::run_chunks(
            &self.client,
            &pending,
            &mut collection,
            &self.store,
            &self.settings,
            progress.as_ref(),
        )
        .await?;
        summary.chunks = chunks.chunks;
        summary.checkpoint_writes = chunks.checkpoint_writes;
        summary.tally = chunks.tally;

        self.store
            .finalize(&collection)
            .context("write final output")?;
        summary.total_features = collection.len();
        tracing::info!(
            "saved {} routes to {}",
            summary.total_features,
            self.store.output_path().display()
        );
        Ok(summary)
    }
}

/// Trips still to fetch: not yet done, first occurrence of each id.
fn pending_trips(
    trips: Vec<Trip>,
    done: &HashSet<TripId>,
    summary: &mut PipelineSummary,
) -> Vec<Trip> {
    let mut seen = HashSet::with_capacity(trips.len());
    let mut pending = Vec::with_capacity(trips.len());
    for trip in trips {
        if done.contains(&trip.id) {
            summary.already_done += 1;
        } else if !seen.insert(trip.id.clone()) {
            tracing::warn!("trip {}: duplicate id in input, keeping the first row", trip.id);
            summary.duplicate_ids += 1;
        } else {
            pending.push(trip);
        }
    }
    pending
}
