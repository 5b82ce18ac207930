use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::router::{ExhaustedPolicy, RequestTimeouts};
use crate::scheduler::ChunkSettings;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries per trip after the first request.
    pub max_retries: u32,
    /// Wait before the first retry in seconds (e.g. 0.5 = 500ms).
    pub initial_wait_secs: f64,
    /// Maximum backoff wait in seconds.
    pub max_wait_secs: u64,
    /// Fraction of each wait that is randomized (0 = no jitter).
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

fn default_jitter() -> f64 {
    0.25
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_wait_secs: 1.0,
            max_wait_secs: 120,
            jitter: default_jitter(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> Result<RetryPolicy> {
        Ok(RetryPolicy {
            max_retries: self.max_retries,
            initial_wait: secs_f64(self.initial_wait_secs, "retry.initial_wait_secs")?,
            max_wait: Duration::from_secs(self.max_wait_secs),
            jitter: self.jitter.clamp(0.0, 1.0),
        })
    }
}

/// Seconds from config as a `Duration`; negative means zero. Infinite, NaN
/// and out-of-range values are errors naming the field.
fn secs_f64(secs: f64, field: &str) -> Result<Duration> {
    let secs = if secs < 0.0 { 0.0 } else { secs };
    Duration::try_from_secs_f64(secs).with_context(|| format!("invalid {}: {}", field, secs))
}

/// Routing service endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Server root; requests go to `{base_url}route/v1/{profile}/...`.
    pub base_url: String,
    /// OSRM profile, e.g. "driving".
    pub profile: String,
    /// Total time allowed per request in seconds.
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base_url: "https://router.project-osrm.org/".to_string(),
            profile: "driving".to_string(),
            request_timeout_secs: 120,
            connect_timeout_secs: 15,
        }
    }
}

impl RouterConfig {
    pub fn timeouts(&self) -> RequestTimeouts {
        RequestTimeouts {
            connect: Duration::from_secs(self.connect_timeout_secs),
            total: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

/// Global configuration loaded from `~/.config/tripline/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriplineConfig {
    /// Maximum concurrent requests to the routing service.
    pub max_concurrent_requests: usize,
    /// Trips per chunk (progress is checkpointed after each chunk).
    pub chunk_size: usize,
    /// Pause between chunks in seconds.
    pub chunk_delay_secs: f64,
    /// What to do with a trip once retries are exhausted: "fallback" or "drop".
    #[serde(default)]
    pub on_exhausted: ExhaustedPolicy,
    /// Seed progress from an existing output file when there is no checkpoint.
    #[serde(default = "default_true")]
    pub reuse_output: bool,
    /// Final GeoJSON output.
    pub output_path: PathBuf,
    /// Partial progress, removed after a successful run.
    pub checkpoint_path: PathBuf,
    #[serde(default)]
    pub router: RouterConfig,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

fn default_true() -> bool {
    true
}

impl Default for TriplineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 10,
            chunk_size: 1000,
            chunk_delay_secs: 2.0,
            on_exhausted: ExhaustedPolicy::Fallback,
            reuse_output: true,
            output_path: PathBuf::from("precomputed_routes.json"),
            checkpoint_path: PathBuf::from("precomputed_routes_partial.json"),
            router: RouterConfig::default(),
            retry: None,
        }
    }
}

impl TriplineConfig {
    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        self.retry.clone().unwrap_or_default().policy()
    }

    /// Serialized form, as written by `load_or_init`.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn chunk_settings(&self) -> Result<ChunkSettings> {
        Ok(ChunkSettings {
            chunk_size: self.chunk_size.max(1),
            chunk_delay: secs_f64(self.chunk_delay_secs, "chunk_delay_secs")?,
            max_concurrent: self.max_concurrent_requests.max(1),
        })
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("tripline")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<TriplineConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = TriplineConfig::default();
        let toml = default_cfg.to_toml()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<TriplineConfig> {
    let data = fs::read_to_string(path).with_context(|| format!("read config: {}", path.display()))?;
    let cfg: TriplineConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}
