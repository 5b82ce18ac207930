use tripline_core::logging;

mod cli;

use crate::cli::CliCommand;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Log to the state-dir file; fall back to stderr if it cannot be opened.
    if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("log file unavailable, logging to stderr: {:#}", err);
    }

    if let Err(err) = CliCommand::run_from_args().await {
        eprintln!("tripline error: {:#}", err);
        std::process::exit(1);
    }
}
