//! Job orchestration.
//!
//! Drives one batch conversion: load the configuration, read the source
//! dataset as header-aware CSV, materialize a bounded preview for console
//! feedback, then overwrite the destination with Parquet output. Inner stages
//! surface typed errors; the swallow-and-log policy lives in `main` only.

use snafu::prelude::*;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::config::JobConfig;
use crate::engine::EngineSession;
use crate::error::{ConfigSnafu, EngineSnafu, JobError, JobStorageSnafu};
use crate::storage::{BackendConfig, StorageProvider};

/// Number of rows materialized for the console preview.
pub const PREVIEW_ROWS: usize = 20;

/// Statistics about a completed conversion.
#[derive(Debug, Clone, Default)]
pub struct JobStats {
    /// Header-derived column names of the source dataset.
    pub columns: Vec<String>,
    /// Rows written to the destination, as reported by the engine.
    pub rows_written: u64,
    /// Objects removed from the destination before writing.
    pub objects_removed: usize,
}

/// Outcome of a job run that did not fail outright.
#[derive(Debug)]
pub enum JobOutcome {
    /// The conversion ran to completion.
    Completed(JobStats),
    /// Required configuration keys were absent; nothing was read or written.
    IncompleteConfig,
}

/// Run one conversion job against the given engine session.
pub async fn run(session: &EngineSession, config_locator: &str) -> Result<JobOutcome, JobError> {
    let config = JobConfig::load(config_locator, HashMap::new())
        .await
        .context(ConfigSnafu)?;

    let Some(job) = config.job_spec() else {
        warn!(
            "Configuration is missing required keys: {:?}",
            config.missing_keys()
        );
        println!("Error: Configuration file must contain 'data_source' and 'output_path'.");
        return Ok(JobOutcome::IncompleteConfig);
    };

    info!("Starting conversion job");
    info!("  Source: {}", job.data_source);
    info!("  Destination: {}", job.output_path);

    let source = BackendConfig::parse_url(&job.data_source, false).context(JobStorageSnafu)?;

    // Remote sources need their store registered with the session; plain
    // filesystem paths resolve through the engine's built-in store.
    if source.base_url().is_some() {
        let provider = StorageProvider::for_url_with_options(&job.data_source, HashMap::new())
            .await
            .context(JobStorageSnafu)?;
        session.register_storage(&provider).context(EngineSnafu)?;
    }

    let destination = StorageProvider::for_url_with_options(&job.output_path, HashMap::new())
        .await
        .context(JobStorageSnafu)?;
    session.register_storage(&destination).context(EngineSnafu)?;

    let df = session
        .read_csv(&source.table_url())
        .await
        .context(EngineSnafu)?;

    let columns: Vec<String> = df
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    info!("Data loaded successfully with {} columns", columns.len());

    let preview = session
        .preview(&df, PREVIEW_ROWS)
        .await
        .context(EngineSnafu)?;
    println!("{preview}");

    let objects_removed = destination.clear().await.context(JobStorageSnafu)?;
    if objects_removed > 0 {
        info!("Cleared {} existing objects from destination", objects_removed);
    }

    let output_url = dir_url(destination.config().table_url());
    let rows_written = session
        .write_parquet(df, &output_url)
        .await
        .context(EngineSnafu)?;

    info!("Job completed successfully ({} rows written)", rows_written);

    Ok(JobOutcome::Completed(JobStats {
        columns,
        rows_written,
        objects_removed,
    }))
}

/// The engine treats a trailing slash as a directory write target.
fn dir_url(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_url_appends_slash_once() {
        assert_eq!(dir_url("s3://bucket/out".to_string()), "s3://bucket/out/");
        assert_eq!(dir_url("s3://bucket/out/".to_string()), "s3://bucket/out/");
    }
}
