//! `tripline status` – summarize the checkpoint and output files.

use anyhow::Result;
use std::path::Path;
use tripline_core::checkpoint::read_collection;
use tripline_core::feature::{FeatureCollection, RouteQuality};

pub fn run_status(checkpoint: &Path, output: &Path) -> Result<()> {
    let partial = read_collection(checkpoint)?;
    let done = read_collection(output)?;

    println!("{:<12} {:>9} {:>9} {:>9} {:>9}  PATH", "FILE", "FEATURES", "FULL", "NO_ROUTE", "FALLBACK");
    print_row("checkpoint", checkpoint, partial.as_ref());
    print_row("output", output, done.as_ref());

    match (&partial, &done) {
        (Some(_), _) => println!("\nA run is in progress or was interrupted; rerun precompute to resume."),
        (None, Some(_)) => println!("\nComplete."),
        (None, None) => println!("\nNo progress yet."),
    }
    Ok(())
}

fn print_row(label: &str, path: &Path, fc: Option<&FeatureCollection>) {
    match fc {
        Some(fc) => println!(
            "{:<12} {:>9} {:>9} {:>9} {:>9}  {}",
            label,
            fc.len(),
            fc.count_quality(RouteQuality::Full),
            fc.count_quality(RouteQuality::NoRoute),
            fc.count_quality(RouteQuality::Fallback),
            path.display()
        ),
        None => println!("{:<12} {:>9} {:>9} {:>9} {:>9}  {}", label, "-", "-", "-", "-", path.display()),
    }
}
