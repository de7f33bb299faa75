//! Job configuration loading.
//!
//! The configuration is a JSON document stored in object storage (or on the
//! local filesystem). Unknown fields are retained but ignored by the job.

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::collections::HashMap;

use crate::error::{ConfigError, FetchConfigSnafu, JsonParseSnafu};
use crate::storage::StorageProvider;

/// Configuration keys that must be present for a job to run.
pub const REQUIRED_KEYS: [&str; 2] = ["data_source", "output_path"];

/// Job configuration as found in the configuration document.
///
/// The required fields are optional here so that their absence surfaces as a
/// validation outcome rather than a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Delimited-text dataset location, read with header interpretation.
    #[serde(default)]
    pub data_source: Option<String>,

    /// Destination location for columnar output, fully overwritten.
    #[serde(default)]
    pub output_path: Option<String>,

    /// Any other keys present in the document. Ignored by the job.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// The validated subset of a job configuration.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub data_source: String,
    pub output_path: String,
}

impl JobConfig {
    /// Load a configuration document from a storage locator.
    ///
    /// The locator is classified before any network access; an unrecognized
    /// form fails with an invalid-URL error. Transport and parse errors
    /// propagate untranslated through the error chain.
    pub async fn load(
        locator: &str,
        options: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let storage = StorageProvider::for_object_url(locator, options)
            .await
            .context(FetchConfigSnafu)?;

        let bytes = storage.get_object().await.context(FetchConfigSnafu)?;
        Self::from_json(&bytes)
    }

    /// Parse a configuration document from raw JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        serde_json::from_slice(bytes).context(JsonParseSnafu)
    }

    /// Required keys absent from this configuration, in declaration order.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.data_source.is_none() {
            missing.push(REQUIRED_KEYS[0]);
        }
        if self.output_path.is_none() {
            missing.push(REQUIRED_KEYS[1]);
        }
        missing
    }

    /// The validated job spec, or `None` if a required key is missing.
    pub fn job_spec(&self) -> Option<JobSpec> {
        match (&self.data_source, &self.output_path) {
            (Some(data_source), Some(output_path)) => Some(JobSpec {
                data_source: data_source.clone(),
                output_path: output_path.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_json_parsing() {
        let json = r#"
{
    "data_source": "s3://bucket/input/data.csv",
    "output_path": "s3://bucket/output/table",
    "owner": "analytics",
    "schedule": {"cron": "0 4 * * *"}
}
"#;
        let config = JobConfig::from_json(json.as_bytes()).unwrap();

        assert_eq!(
            config.data_source.as_deref(),
            Some("s3://bucket/input/data.csv")
        );
        assert_eq!(
            config.output_path.as_deref(),
            Some("s3://bucket/output/table")
        );
        assert_eq!(config.extra.len(), 2);
        assert!(config.missing_keys().is_empty());

        let spec = config.job_spec().unwrap();
        assert_eq!(spec.data_source, "s3://bucket/input/data.csv");
        assert_eq!(spec.output_path, "s3://bucket/output/table");
    }

    #[test]
    fn test_missing_keys_reported_in_order() {
        let config = JobConfig::from_json(b"{}").unwrap();
        assert_eq!(config.missing_keys(), vec!["data_source", "output_path"]);
        assert!(config.job_spec().is_none());

        let config =
            JobConfig::from_json(br#"{"data_source": "s3://bucket/data.csv"}"#).unwrap();
        assert_eq!(config.missing_keys(), vec!["output_path"]);
        assert!(config.job_spec().is_none());
    }

    #[test]
    fn test_null_required_key_counts_as_missing() {
        let config = JobConfig::from_json(
            br#"{"data_source": null, "output_path": "/tmp/out"}"#,
        )
        .unwrap();
        assert_eq!(config.missing_keys(), vec!["data_source"]);
    }

    #[test]
    fn test_invalid_json_fails_with_parse_error() {
        let result = JobConfig::from_json(b"{not json");
        assert!(matches!(result, Err(ConfigError::JsonParse { .. })));
    }

    #[tokio::test]
    async fn test_load_rejects_unrecognized_locator() {
        use crate::error::StorageError;

        let result = JobConfig::load("config.json", HashMap::new()).await;
        assert!(matches!(
            result,
            Err(ConfigError::FetchConfig {
                source: StorageError::InvalidUrl { .. }
            })
        ));
    }
}
