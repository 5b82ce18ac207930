pub mod config;
pub mod logging;

pub mod checkpoint;
pub mod feature;
pub mod interpolate;
pub mod pipeline;
pub mod retry;
pub mod router;
pub mod scheduler;
pub mod trip;
pub mod trip_table;
