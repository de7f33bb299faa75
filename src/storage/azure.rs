//! Azure Blob Storage backend implementation.

use object_store::azure::MicrosoftAzureBuilder;
use object_store::path::Path;
use object_store::{ObjectStore, RetryConfig};
use snafu::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AzureConfigSnafu, StorageError};

use super::{BackendConfig, StorageProvider};

/// Azure Blob Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureConfig {
    pub account: String,
    pub container: String,
    pub key: Option<Path>,
}

/// Create a standard retry configuration for cloud storage operations.
fn default_retry_config() -> RetryConfig {
    RetryConfig::default()
}

impl StorageProvider {
    pub(super) async fn construct_azure(config: AzureConfig) -> Result<Self, StorageError> {
        let builder = MicrosoftAzureBuilder::from_env()
            .with_account(&config.account)
            .with_container_name(&config.container)
            .with_retry(default_retry_config());

        let canonical_url = format!(
            "https://{}.blob.core.windows.net/{}",
            config.account, config.container
        );

        let object_store: Arc<dyn ObjectStore> =
            Arc::new(builder.build().context(AzureConfigSnafu)?);

        Ok(Self {
            config: BackendConfig::Azure(config),
            object_store,
            canonical_url,
            storage_options: HashMap::new(),
        })
    }
}
