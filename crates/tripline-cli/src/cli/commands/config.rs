//! `tripline config` – show where settings come from and what they are.

use anyhow::Result;
use std::path::Path;
use tripline_core::config::TriplineConfig;

pub fn run_config(cfg: &TriplineConfig, path: &Path) -> Result<()> {
    println!("# {}", path.display());
    print!("{}", cfg.to_toml()?);
    Ok(())
}
