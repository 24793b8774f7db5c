use clap::Parser;
use downtraffic_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging as early as possible; never fail the run over it.
    if cli.log_stderr {
        logging::init_logging_stderr();
    } else if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("log file unavailable, logging to stderr: {:#}", err);
    }

    if let Err(err) = cli.run().await {
        eprintln!("downtraffic error: {:#}", err);
        std::process::exit(1);
    }
}
