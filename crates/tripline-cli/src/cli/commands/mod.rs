//! CLI command handlers, one per file.

mod config;
mod precompute;
mod status;

pub use config::run_config;
pub use precompute::{run_precompute, PrecomputeArgs};
pub use status::run_status;
