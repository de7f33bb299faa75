//! Query engine session.
//!
//! Wraps a DataFusion `SessionContext` behind an explicitly constructed,
//! explicitly scoped session object. The session owns store registrations for
//! the lifetime of a job and is dropped when the caller returns.

use datafusion::arrow::array::{Array, UInt64Array};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::arrow::util::pretty::pretty_format_batches;
use datafusion::dataframe::DataFrameWriteOptions;
use datafusion::prelude::{CsvReadOptions, DataFrame, SessionConfig, SessionContext};
use snafu::prelude::*;
use url::Url;

use crate::error::{ArrowSnafu, DataFusionSnafu, EngineError, RegisterUrlSnafu};
use crate::storage::StorageProvider;

/// An explicitly scoped execution context for one tool invocation.
pub struct EngineSession {
    ctx: SessionContext,
}

impl EngineSession {
    /// Create a new session with default engine configuration.
    pub fn new() -> Self {
        let config = SessionConfig::new();
        let ctx = SessionContext::new_with_config(config);
        Self { ctx }
    }

    /// The underlying DataFusion context.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Register a storage provider's object store with the session.
    ///
    /// Local providers are a no-op; the engine's built-in filesystem store
    /// already resolves plain paths.
    pub fn register_storage(&self, storage: &StorageProvider) -> Result<(), EngineError> {
        let Some(base) = storage.config().base_url() else {
            return Ok(());
        };

        let url = Url::parse(&base).context(RegisterUrlSnafu { url: base.clone() })?;
        self.ctx.register_object_store(&url, storage.object_store());
        Ok(())
    }

    /// Read a delimited text dataset with header interpretation enabled.
    pub async fn read_csv(&self, table_url: &str) -> Result<DataFrame, EngineError> {
        let options = CsvReadOptions::new().has_header(true);
        self.ctx
            .read_csv(table_url, options)
            .await
            .context(DataFusionSnafu)
    }

    /// Eagerly materialize up to `limit` rows and render them as a table.
    pub async fn preview(&self, df: &DataFrame, limit: usize) -> Result<String, EngineError> {
        let batches = df
            .clone()
            .limit(0, Some(limit))
            .context(DataFusionSnafu)?
            .collect()
            .await
            .context(DataFusionSnafu)?;

        let rendered = pretty_format_batches(&batches).context(ArrowSnafu)?;
        Ok(rendered.to_string())
    }

    /// Write the dataset as Parquet files under `table_url`.
    ///
    /// Returns the number of rows written as reported by the engine.
    pub async fn write_parquet(&self, df: DataFrame, table_url: &str) -> Result<u64, EngineError> {
        let batches = df
            .write_parquet(table_url, DataFrameWriteOptions::new(), None)
            .await
            .context(DataFusionSnafu)?;

        Ok(rows_written(&batches))
    }
}

impl Default for EngineSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Sum the `count` column of the engine's write-summary batches.
fn rows_written(batches: &[RecordBatch]) -> u64 {
    batches
        .iter()
        .filter_map(|batch| batch.column_by_name("count"))
        .filter_map(|column| column.as_any().downcast_ref::<UInt64Array>())
        .map(|counts| counts.iter().flatten().sum::<u64>())
        .sum()
}
