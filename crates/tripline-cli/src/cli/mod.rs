//! CLI for tripline: precompute road-following routes for a trip table.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tripline_core::config;
use tripline_core::router::ExhaustedPolicy;

use commands::{run_config, run_precompute, run_status, PrecomputeArgs};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "tripline")]
#[command(about = "Precompute routed trip geometries as time-stamped GeoJSON", long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of ~/.config/tripline/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch routes for every trip in a CSV table and write the GeoJSON output.
    Precompute {
        /// Trip table (CSV with trip_ID, pickup/dropoff coordinates, start/end times).
        trips: PathBuf,
        /// Final output file (default from config).
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Checkpoint file (default from config).
        #[arg(long)]
        checkpoint: Option<PathBuf>,
        /// Trips per chunk; progress is saved after each chunk.
        #[arg(long, value_name = "N")]
        chunk_size: Option<usize>,
        /// Maximum in-flight requests to the routing service.
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,
        /// Pause between chunks in seconds.
        #[arg(long, value_name = "SECS")]
        chunk_delay: Option<f64>,
        /// Routing service root URL.
        #[arg(long, value_name = "URL")]
        router: Option<String>,
        /// Routing profile, e.g. driving.
        #[arg(long)]
        profile: Option<String>,
        /// What to emit for a trip whose retries ran out.
        #[arg(long, value_enum)]
        on_exhausted: Option<OnExhausted>,
        /// Ignore any existing checkpoint and output and start over.
        #[arg(long)]
        fresh: bool,
    },

    /// Show what the checkpoint and output files contain.
    Status {
        /// Checkpoint file (default from config).
        #[arg(long)]
        checkpoint: Option<PathBuf>,
        /// Output file (default from config).
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Print the config file location and the effective settings.
    Config,
}

/// `--on-exhausted` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnExhausted {
    Fallback,
    Drop,
}

impl From<OnExhausted> for ExhaustedPolicy {
    fn from(v: OnExhausted) -> Self {
        match v {
            OnExhausted::Fallback => ExhaustedPolicy::Fallback,
            OnExhausted::Drop => ExhaustedPolicy::Drop,
        }
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let (cfg, cfg_path) = match &cli.config {
            Some(path) => (config::load_from_path(path)?, path.clone()),
            None => (config::load_or_init()?, config::config_path()?),
        };
        tracing::debug!("loaded config from {}: {:?}", cfg_path.display(), cfg);

        match cli.command {
            CliCommand::Precompute {
                trips,
                output,
                checkpoint,
                chunk_size,
                concurrency,
                chunk_delay,
                router,
                profile,
                on_exhausted,
                fresh,
            } => {
                let args = PrecomputeArgs {
                    output,
                    checkpoint,
                    chunk_size,
                    concurrency,
                    chunk_delay,
                    router,
                    profile,
                    on_exhausted: on_exhausted.map(Into::into),
                    fresh,
                };
                run_precompute(cfg, &trips, &args).await?;
            }
            CliCommand::Status { checkpoint, output } => {
                let checkpoint = checkpoint.unwrap_or_else(|| cfg.checkpoint_path.clone());
                let output = output.unwrap_or_else(|| cfg.output_path.clone());
                run_status(&checkpoint, &output)?;
            }
            CliCommand::Config => run_config(&cfg, &cfg_path)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
