//! `tripline precompute` – fetch routes for a trip table and write the output.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tripline_core::checkpoint::CheckpointStore;
use tripline_core::config::TriplineConfig;
use tripline_core::pipeline::{Pipeline, PipelineSummary};
use tripline_core::router::{ExhaustedPolicy, OsrmBackend, RouteClient};
use tripline_core::scheduler::ProgressEvent;
use tripline_core::trip_table;

/// Command-line overrides; `None` keeps the config value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrecomputeArgs {
    pub output: Option<PathBuf>,
    pub checkpoint: Option<PathBuf>,
    pub chunk_size: Option<usize>,
    pub concurrency: Option<usize>,
    pub chunk_delay: Option<f64>,
    pub router: Option<String>,
    pub profile: Option<String>,
    pub on_exhausted: Option<ExhaustedPolicy>,
    pub fresh: bool,
}

impl PrecomputeArgs {
    /// Config with the command-line values laid over it.
    pub fn apply(&self, mut cfg: TriplineConfig) -> TriplineConfig {
        if let Some(p) = &self.output {
            cfg.output_path = p.clone();
        }
        if let Some(p) = &self.checkpoint {
            cfg.checkpoint_path = p.clone();
        }
        if let Some(n) = self.chunk_size {
            cfg.chunk_size = n;
        }
        if let Some(n) = self.concurrency {
            cfg.max_concurrent_requests = n;
        }
        if let Some(secs) = self.chunk_delay {
            cfg.chunk_delay_secs = secs;
        }
        if let Some(url) = &self.router {
            cfg.router.base_url = url.clone();
        }
        if let Some(profile) = &self.profile {
            cfg.router.profile = profile.clone();
        }
        if let Some(policy) = self.on_exhausted {
            cfg.on_exhausted = policy;
        }
        cfg
    }
}

pub async fn run_precompute(cfg: TriplineConfig, trips_path: &Path, args: &PrecomputeArgs) -> Result<()> {
    let cfg = args.apply(cfg);
    let mut store = CheckpointStore::new(&cfg.checkpoint_path, &cfg.output_path).reuse_output(cfg.reuse_output);
    if args.fresh {
        store = store.ignore_existing();
    }
    store.ensure_distinct()?;
    let settings = cfg.chunk_settings()?;
    let policy = cfg.retry_policy()?;

    let (trips, report) = trip_table::read_trips(trips_path)?;
    println!(
        "Loaded {} trips from {} ({} rows skipped)",
        report.trips,
        trips_path.display(),
        report.skipped
    );

    let backend = OsrmBackend::new(
        &cfg.router.base_url,
        &cfg.router.profile,
        cfg.router.timeouts(),
        settings.max_concurrent,
    )?;
    let client = RouteClient::new(backend, policy, cfg.on_exhausted);
    tracing::info!(
        router = %cfg.router.base_url,
        profile = %cfg.router.profile,
        chunk_size = settings.chunk_size,
        max_concurrent = settings.max_concurrent,
        "starting precompute"
    );
    let pipeline = Pipeline::new(client, store, settings);

    let (progress_tx, progress_rx) = mpsc::channel::<ProgressEvent>(64);
    let printer = tokio::spawn(print_progress(progress_rx));
    let result = pipeline.run(trips, Some(progress_tx)).await;
    let _ = printer.await;

    let summary = result.with_context(|| format!("precompute {}", trips_path.display()))?;
    print_summary(&summary, pipeline.store().output_path());
    Ok(())
}

async fn print_progress(mut rx: mpsc::Receiver<ProgressEvent>) {
    const EVERY_N_TRIPS: usize = 10;
    while let Some(ev) = rx.recv().await {
        match ev {
            ProgressEvent::ChunkStarted {
                chunk,
                total_chunks,
                trips,
            } => {
                println!("Chunk {}/{}: {} trips", chunk, total_chunks, trips);
            }
            ProgressEvent::TripFinished {
                chunk,
                total_chunks,
                done,
                trips,
            } => {
                if done % EVERY_N_TRIPS == 0 || done == trips {
                    print!("\r  Chunk {}/{}, trip {}/{}  ", chunk, total_chunks, done, trips);
                    let _ = std::io::stdout().flush();
                }
            }
            ProgressEvent::ChunkSaved {
                tally, features_total, ..
            } => {
                println!();
                println!(
                    "  Saved progress: {} features ({} routed, {} no route, {} fallback, {} dropped, {} skipped)",
                    features_total, tally.routed, tally.unroutable, tally.fallback, tally.dropped, tally.skipped
                );
            }
        }
    }
}

fn print_summary(summary: &PipelineSummary, output: &Path) {
    if summary.resumed > 0 {
        println!(
            "Resumed {} features ({} trips already done)",
            summary.resumed, summary.already_done
        );
    }
    if summary.duplicate_ids > 0 {
        println!("Ignored {} rows with a repeated trip id", summary.duplicate_ids);
    }
    if summary.scheduled == 0 {
        println!("Nothing to fetch.");
    }
    println!(
        "Saved {} routes to {} ({} chunks this run)",
        summary.total_features,
        output.display(),
        summary.chunks
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_only_given_values() {
        let args = PrecomputeArgs {
            concurrency: Some(3),
            router: Some("http://localhost:5000/".into()),
            on_exhausted: Some(ExhaustedPolicy::Drop),
            ..PrecomputeArgs::default()
        };
        let cfg = args.apply(TriplineConfig::default());
        assert_eq!(cfg.max_concurrent_requests, 3);
        assert_eq!(cfg.router.base_url, "http://localhost:5000/");
        assert_eq!(cfg.on_exhausted, ExhaustedPolicy::Drop);
        assert_eq!(cfg.chunk_size, 1000);
        assert_eq!(cfg.router.profile, "driving");
        assert_eq!(cfg.output_path, PathBuf::from("precomputed_routes.json"));
    }

    #[tokio::test]
    async fn same_output_and_checkpoint_is_rejected() {
        let args = PrecomputeArgs {
            output: Some("x.json".into()),
            checkpoint: Some("x.json".into()),
            ..PrecomputeArgs::default()
        };
        let err = run_precompute(TriplineConfig::default(), Path::new("trips.csv"), &args)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("different files"));

        let dir = tempfile::tempdir().unwrap();
        let args = PrecomputeArgs {
            output: Some(dir.path().join("x.json")),
            checkpoint: Some(dir.path().join(".").join("x.json")),
            ..PrecomputeArgs::default()
        };
        let err = run_precompute(TriplineConfig::default(), Path::new("trips.csv"), &args)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("different files"));
    }

    #[tokio::test]
    async fn infinite_chunk_delay_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = PrecomputeArgs {
            output: Some(dir.path().join("out.json")),
            checkpoint: Some(dir.path().join("cp.json")),
            chunk_delay: Some(f64::INFINITY),
            ..PrecomputeArgs::default()
        };
        let err = run_precompute(TriplineConfig::default(), Path::new("trips.csv"), &args)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("chunk_delay_secs"));
    }
}
