//! Bounded fan-out of one batch of trips to the route client.
//!
//! Every trip gets its own task, all spawned up front; a semaphore with
//! `max_concurrent` permits limits how many are actually talking to the
//! routing service. Excess tasks wait for a permit in FIFO order.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use super::progress::{ChunkTally, ProgressEvent};
use crate::feature::{Feature, RouteQuality};
use crate::router::{RouteBackend, RouteClient, RouteOutcome};
use crate::trip::Trip;

/// Lifecycle of one trip inside a batch. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripState {
    /// Queued for a permit.
    Pending,
    /// Holding a permit; request (and retries) in progress.
    Requesting,
    /// Full route received.
    Succeeded,
    /// Service answered without a usable route; straight line emitted.
    Unroutable,
    /// Retries exhausted; straight line emitted.
    Fallback,
    /// Retries exhausted; no feature.
    Dropped,
    /// Filtered before dispatch (no usable pickup coordinate).
    Skipped,
}

/// Features produced by a batch (input order) and the outcome counts.
#[derive(Debug, Default)]
pub struct BatchOutput {
    pub features: Vec<Feature>,
    pub tally: ChunkTally,
}

/// Where to report per-trip progress, and which chunk this batch is.
#[derive(Debug, Clone, Copy)]
pub struct BatchProgress<'a> {
    pub tx: &'a mpsc::Sender<ProgressEvent>,
    pub chunk: usize,
    pub total_chunks: usize,
}

/// Fetch routes for `trips` with at most `max_concurrent` requests in flight.
///
/// Trips without a usable pickup coordinate are skipped silently. Dropped
/// trips yield no feature; every other outcome yields exactly one.
pub async fn run_batch<B: RouteBackend>(
    client: &Arc<RouteClient<B>>,
    trips: &[Trip],
    max_concurrent: usize,
    progress: Option<BatchProgress<'_>>,
) -> Result<BatchOutput> {
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tally = ChunkTally::default();
    let mut join_set = JoinSet::new();

    for (index, trip) in trips.iter().enumerate() {
        let (Some(origin), Some(destination)) = (trip.origin(), trip.destination()) else {
            tracing::debug!("trip {}: no pickup coordinate, skipping", trip.id);
            tally.record(TripState::Skipped);
            continue;
        };
        let client = Arc::clone(client);
        let semaphore = Arc::clone(&semaphore);
        let trip = trip.clone();
        tracing::trace!("trip {}: {:?}", trip.id, TripState::Pending);
        join_set.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (index, TripState::Dropped, None);
            };
            tracing::trace!("trip {}: {:?}", trip.id, TripState::Requesting);

            let (state, feature) = match client.fetch(origin, destination).await {
                RouteOutcome::Routed(route) => (
                    TripState::Succeeded,
                    Some(Feature::from_route(&trip, route, RouteQuality::Full)),
                ),
                RouteOutcome::Unroutable(route) => (
                    TripState::Unroutable,
                    Some(Feature::from_route(&trip, route, RouteQuality::NoRoute)),
                ),
                RouteOutcome::Fallback(route) => (
                    TripState::Fallback,
                    Some(Feature::from_route(&trip, route, RouteQuality::Fallback)),
                ),
                RouteOutcome::Dropped => (TripState::Dropped, None),
            };
            (index, state, feature)
        });
    }

    let dispatched = join_set.len();
    let mut done = 0usize;
    let mut features = Vec::with_capacity(dispatched);
    while let Some(res) = join_set.join_next().await {
        let (index, state, feature) = res.map_err(|e| anyhow::anyhow!("trip task join: {}", e))?;
        tally.record(state);
        if let Some(feature) = feature {
            features.push((index, feature));
        }
        done += 1;
        if let Some(p) = progress {
            let _ = p
                .tx
                .send(ProgressEvent::TripFinished {
                    chunk: p.chunk,
                    total_chunks: p.total_chunks,
                    done,
                    trips: dispatched,
                })
                .await;
        }
    }

    features.sort_by_key(|(index, _)| *index);
    Ok(BatchOutput {
        features: features.into_iter().map(|(_, f)| f).collect(),
        tally,
    })
}
