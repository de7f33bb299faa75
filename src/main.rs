//! flurry: A standalone tool for converting delimited text datasets to Parquet.
//!
//! This tool reads a JSON job configuration from object storage (S3, GCS,
//! Azure, local filesystem), loads the CSV dataset it points at, and rewrites
//! the dataset as Parquet at the configured destination.

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use flurry::engine::EngineSession;
use flurry::job::{self, JobOutcome};

/// CSV to Parquet conversion tool.
#[derive(Parser, Debug)]
#[command(name = "flurry")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Storage locator of the JSON job configuration.
    #[arg(short, long)]
    config: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("flurry starting");

    let session = EngineSession::new();

    // Outermost boundary: errors are reported and swallowed, and the process
    // exits 0 on every path.
    match job::run(&session, &args.config).await {
        Ok(JobOutcome::Completed(stats)) => {
            info!("Job completed successfully!");
            info!("  Columns: {}", stats.columns.join(", "));
            info!("  Rows written: {}", stats.rows_written);
        }
        Ok(JobOutcome::IncompleteConfig) => {}
        Err(e) => {
            error!("Error in job execution: {}", snafu::Report::from_error(e));
        }
    }
}
