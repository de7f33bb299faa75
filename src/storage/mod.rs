//! Multi-cloud storage abstraction.
//!
//! Provides a unified interface for working with S3, GCS, Azure Blob Storage,
//! and local filesystem. Locators are classified by URL shape; credentials and
//! region resolution follow the ambient environment chain of the underlying
//! `object_store` builders.

mod azure;
mod gcs;
mod local;
mod s3;

use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt, future::ready};
use object_store::ObjectStore;
use object_store::path::Path;
use regex::Regex;
use snafu::prelude::*;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::error::{InvalidUrlSnafu, NoObjectKeySnafu, ObjectStoreSnafu, StorageError};

// Re-export config types
pub use azure::AzureConfig;
pub use gcs::GcsConfig;
pub use local::LocalConfig;
pub use s3::S3Config;

/// Storage provider that abstracts over different cloud storage backends.
#[derive(Clone)]
pub struct StorageProvider {
    pub(crate) config: BackendConfig,
    pub(crate) object_store: Arc<dyn ObjectStore>,
    pub(crate) canonical_url: String,
    pub(crate) storage_options: HashMap<String, String>,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.canonical_url)
    }
}

// URL patterns for different storage backends
const S3_PATH: &str =
    r"^https://s3\.(?P<region>[\w\-]+)\.amazonaws\.com/(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+))?$";
const S3_VIRTUAL: &str =
    r"^https://(?P<bucket>[a-z0-9\-\.]+)\.s3\.(?P<region>[\w\-]+)\.amazonaws\.com(/(?P<key>.+))?$";
const S3_URL: &str = r"^[sS]3[aA]?://(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+))?$";
const S3_ENDPOINT_URL: &str = r"^[sS]3[aA]?::(?<protocol>https?)://(?P<endpoint>[^:/]+):(?<port>\d+)/(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+))?$";

const FILE_URI: &str = r"^file://(?P<path>.*)$";
const FILE_URL: &str = r"^file:(?P<path>.*)$";
const FILE_PATH: &str = r"^/(?P<path>.*)$";

const GCS_VIRTUAL: &str =
    r"^https://(?P<bucket>[a-z0-9\-_\.]+)\.storage\.googleapis\.com(/(?P<key>.+))?$";
const GCS_PATH: &str =
    r"^https://storage\.googleapis\.com/(?P<bucket>[a-z0-9\-_\.]+)(/(?P<key>.+))?$";
const GCS_URL: &str = r"^[gG][sS]://(?P<bucket>[a-z0-9\-\._]+)(/(?P<key>.+))?$";

const ABFS_URL: &str = r"^abfss?://(?P<container>[a-z0-9\-]+)@(?P<account>[a-z0-9]+)\.dfs\.core\.windows\.net(/(?P<key>.+))?$";
const AZURE_HTTPS: &str = r"^https://(?P<account>[a-z0-9]+)\.(blob|dfs)\.core\.windows\.net/(?P<container>[a-z0-9\-]+)(/(?P<key>.+))?$";

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum Backend {
    S3,
    Gcs,
    Azure,
    Local,
}

fn matchers() -> &'static HashMap<Backend, Vec<Regex>> {
    static MATCHERS: OnceLock<HashMap<Backend, Vec<Regex>>> = OnceLock::new();
    MATCHERS.get_or_init(|| {
        let mut m = HashMap::new();

        m.insert(
            Backend::S3,
            vec![
                Regex::new(S3_PATH).unwrap(),
                Regex::new(S3_VIRTUAL).unwrap(),
                Regex::new(S3_ENDPOINT_URL).unwrap(),
                Regex::new(S3_URL).unwrap(),
            ],
        );

        m.insert(
            Backend::Gcs,
            vec![
                Regex::new(GCS_PATH).unwrap(),
                Regex::new(GCS_VIRTUAL).unwrap(),
                Regex::new(GCS_URL).unwrap(),
            ],
        );

        m.insert(
            Backend::Azure,
            vec![
                Regex::new(ABFS_URL).unwrap(),
                Regex::new(AZURE_HTTPS).unwrap(),
            ],
        );

        m.insert(
            Backend::Local,
            vec![
                Regex::new(FILE_URI).unwrap(),
                Regex::new(FILE_URL).unwrap(),
                Regex::new(FILE_PATH).unwrap(),
            ],
        );

        m
    })
}

/// Backend configuration enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    S3(S3Config),
    Gcs(GcsConfig),
    Azure(AzureConfig),
    Local(LocalConfig),
}

impl BackendConfig {
    /// Parse a URL into a backend configuration.
    ///
    /// Classification happens entirely in memory; no network access is
    /// performed. Unrecognized locator forms fail with `InvalidUrl`.
    pub fn parse_url(url: &str, with_key: bool) -> Result<Self, StorageError> {
        for (k, v) in matchers() {
            if let Some(matches) = v.iter().filter_map(|r| r.captures(url)).next() {
                return match k {
                    Backend::S3 => Self::parse_s3(matches),
                    Backend::Gcs => Self::parse_gcs(matches),
                    Backend::Azure => Self::parse_azure(matches),
                    Backend::Local => Self::parse_local(matches, with_key),
                };
            }
        }

        InvalidUrlSnafu {
            url: url.to_string(),
        }
        .fail()
    }

    fn parse_s3(matches: regex::Captures) -> Result<Self, StorageError> {
        let bucket = matches
            .name("bucket")
            .expect("bucket should always be available")
            .as_str()
            .to_string();

        let region = std::env::var("AWS_DEFAULT_REGION")
            .ok()
            .or_else(|| matches.name("region").map(|m| m.as_str().to_string()));

        let endpoint = std::env::var("AWS_ENDPOINT").ok().or_else(|| {
            matches.name("endpoint").map(|endpoint| {
                let port = matches
                    .name("port")
                    .and_then(|p| p.as_str().parse::<u16>().ok())
                    .unwrap_or(443);
                let protocol = matches
                    .name("protocol")
                    .map(|p| p.as_str())
                    .unwrap_or("https");
                format!("{}://{}:{}", protocol, endpoint.as_str(), port)
            })
        });

        let key = matches.name("key").map(|m| m.as_str().into());

        Ok(BackendConfig::S3(S3Config {
            endpoint,
            region,
            bucket,
            key,
        }))
    }

    fn parse_gcs(matches: regex::Captures) -> Result<Self, StorageError> {
        let bucket = matches
            .name("bucket")
            .expect("bucket should always be available")
            .as_str()
            .to_string();

        let key = matches.name("key").map(|r| r.as_str().into());

        Ok(BackendConfig::Gcs(GcsConfig { bucket, key }))
    }

    fn parse_azure(matches: regex::Captures) -> Result<Self, StorageError> {
        let container = matches
            .name("container")
            .expect("container should always be available")
            .as_str()
            .to_string();

        let account = matches
            .name("account")
            .expect("account should always be available")
            .as_str()
            .to_string();

        let key = matches.name("key").map(|r| r.as_str().into());

        Ok(BackendConfig::Azure(AzureConfig {
            account,
            container,
            key,
        }))
    }

    fn parse_local(matches: regex::Captures, with_key: bool) -> Result<Self, StorageError> {
        let path = matches
            .name("path")
            .expect("path regex must contain a path group")
            .as_str();

        let mut path = if !path.starts_with('/') {
            std::path::PathBuf::from(format!("/{path}"))
        } else {
            std::path::PathBuf::from(path)
        };

        let key = if with_key {
            let key = path
                .file_name()
                .map(|k| k.to_str().unwrap().to_string().into());
            path.pop();
            key
        } else {
            None
        };

        Ok(BackendConfig::Local(LocalConfig {
            path: path.to_str().unwrap().to_string(),
            key,
        }))
    }

    pub(crate) fn key(&self) -> Option<&Path> {
        match self {
            BackendConfig::S3(s3) => s3.key.as_ref(),
            BackendConfig::Gcs(gcs) => gcs.key.as_ref(),
            BackendConfig::Azure(azure) => azure.key.as_ref(),
            BackendConfig::Local(local) => local.key.as_ref(),
        }
    }

    /// Base URL under which the backend's object store can be registered
    /// with a query engine. Local paths return `None`; the engine's built-in
    /// filesystem store handles those natively.
    pub fn base_url(&self) -> Option<String> {
        match self {
            BackendConfig::S3(s3) => Some(format!("s3://{}", s3.bucket)),
            BackendConfig::Gcs(gcs) => Some(format!("gs://{}", gcs.bucket)),
            BackendConfig::Azure(azure) => Some(format!("az://{}", azure.container)),
            BackendConfig::Local(_) => None,
        }
    }

    /// Full canonical table URL for this location, in the scheme the query
    /// engine resolves against registered stores.
    pub fn table_url(&self) -> String {
        fn join(base: String, key: Option<&Path>) -> String {
            match key {
                Some(key) => format!("{base}/{key}"),
                None => base,
            }
        }

        match self {
            BackendConfig::S3(s3) => join(format!("s3://{}", s3.bucket), s3.key.as_ref()),
            BackendConfig::Gcs(gcs) => join(format!("gs://{}", gcs.bucket), gcs.key.as_ref()),
            BackendConfig::Azure(azure) => {
                join(format!("az://{}", azure.container), azure.key.as_ref())
            }
            BackendConfig::Local(local) => join(local.path.clone(), local.key.as_ref()),
        }
    }
}

impl StorageProvider {
    /// Create a storage provider for the given URL with storage options.
    ///
    /// The URL is treated as a location prefix (a dataset directory or file
    /// path); use [`StorageProvider::for_object_url`] when the URL names a
    /// single object to fetch.
    pub async fn for_url_with_options(
        url: &str,
        options: HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        let config = BackendConfig::parse_url(url, false)?;
        Self::construct(config, options).await
    }

    /// Create a storage provider for a URL that names a single object.
    pub async fn for_object_url(
        url: &str,
        options: HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        let config = BackendConfig::parse_url(url, true)?;
        Self::construct(config, options).await
    }

    async fn construct(
        config: BackendConfig,
        options: HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        match config {
            BackendConfig::S3(config) => Self::construct_s3(config, options).await,
            BackendConfig::Gcs(config) => Self::construct_gcs(config).await,
            BackendConfig::Azure(config) => Self::construct_azure(config).await,
            BackendConfig::Local(config) => Self::construct_local(config).await,
        }
    }

    /// List files in the storage location.
    /// Returns paths relative to the configured key prefix.
    pub async fn list(
        &self,
        include_subdirectories: bool,
    ) -> Result<impl Stream<Item = Result<Path, object_store::Error>> + '_, StorageError> {
        let key_path: Option<Path> = self.config.key().map(|key| key.to_string().into());
        let key_part_count = key_path
            .as_ref()
            .map(|key| key.parts().count())
            .unwrap_or_default();

        let list = self
            .object_store
            .list(key_path.as_ref())
            .filter_map(move |meta| {
                let result = match meta {
                    Ok(metadata) => {
                        let path = metadata.location;
                        if !include_subdirectories && path.parts().count() != key_part_count + 1 {
                            None
                        } else {
                            // Strip the prefix from the path so callers get relative paths
                            // This matches the contract expected by get/delete which qualify paths
                            let relative_path: Path = path.parts().skip(key_part_count).collect();
                            Some(Ok(relative_path))
                        }
                    }
                    Err(err) => Some(Err(err)),
                };
                ready(result)
            });

        Ok(list)
    }

    /// Fetch the object this provider was constructed for.
    ///
    /// Fails with `NoObjectKey` before any network access when the locator
    /// named a bucket or directory root instead of an object.
    pub async fn get_object(&self) -> Result<Bytes, StorageError> {
        let key = match self.config.key() {
            Some(key) => key.clone(),
            None => {
                return NoObjectKeySnafu {
                    url: self.canonical_url.clone(),
                }
                .fail();
            }
        };

        let bytes = self
            .object_store
            .get(&key)
            .await
            .context(ObjectStoreSnafu)?
            .bytes()
            .await
            .context(ObjectStoreSnafu)?;
        Ok(bytes)
    }

    /// Delete every object under the configured prefix.
    ///
    /// Returns the number of objects removed. An empty or missing prefix is
    /// not an error.
    pub async fn clear(&self) -> Result<usize, StorageError> {
        let paths: Vec<Path> = match self.list(true).await?.try_collect().await {
            Ok(paths) => paths,
            Err(object_store::Error::NotFound { .. }) => return Ok(0),
            Err(err) => return Err(StorageError::ObjectStore { source: err }),
        };

        for path in &paths {
            self.object_store
                .delete(&self.qualify_path(path))
                .await
                .context(ObjectStoreSnafu)?;
        }

        Ok(paths.len())
    }

    /// Qualify a path with the configured key prefix.
    pub fn qualify_path<'a>(&self, path: &'a Path) -> Cow<'a, Path> {
        match self.config.key() {
            Some(prefix) => Cow::Owned(prefix.parts().chain(path.parts()).collect()),
            None => Cow::Borrowed(path),
        }
    }

    /// The raw object store backing this provider.
    pub fn object_store(&self) -> Arc<dyn ObjectStore> {
        self.object_store.clone()
    }

    /// Get storage options for external integrations.
    pub fn storage_options(&self) -> &HashMap<String, String> {
        &self.storage_options
    }

    /// Get the backend configuration.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_s3_url_parsing() {
        let config = BackendConfig::parse_url("s3://mybucket/path/to/data.csv", false).unwrap();
        match config {
            BackendConfig::S3(s3) => {
                assert_eq!(s3.bucket, "mybucket");
                assert_eq!(s3.key, Some(Path::from("path/to/data.csv")));
            }
            _ => panic!("Expected S3 config"),
        }
    }

    #[test]
    fn test_gcs_url_parsing() {
        let config = BackendConfig::parse_url("gs://mybucket/path/to/data", false).unwrap();
        match config {
            BackendConfig::Gcs(gcs) => {
                assert_eq!(gcs.bucket, "mybucket");
                assert_eq!(gcs.key, Some(Path::from("path/to/data")));
            }
            _ => panic!("Expected Gcs config"),
        }
    }

    #[test]
    fn test_azure_url_parsing() {
        let config = BackendConfig::parse_url(
            "abfss://mycontainer@mystorageaccount.dfs.core.windows.net/path/to/data",
            false,
        )
        .unwrap();
        match config {
            BackendConfig::Azure(azure) => {
                assert_eq!(azure.account, "mystorageaccount");
                assert_eq!(azure.container, "mycontainer");
                assert_eq!(azure.key, Some(Path::from("path/to/data")));
            }
            _ => panic!("Expected Azure config"),
        }
    }

    #[test]
    fn test_local_url_parsing() {
        let config = BackendConfig::parse_url("/local/path/to/data", false).unwrap();
        match config {
            BackendConfig::Local(local) => {
                assert_eq!(local.path, "/local/path/to/data");
                assert_eq!(local.key, None);
            }
            _ => panic!("Expected Local config"),
        }
    }

    #[test]
    fn test_local_object_url_splits_key() {
        let config = BackendConfig::parse_url("/local/path/config.json", true).unwrap();
        match config {
            BackendConfig::Local(local) => {
                assert_eq!(local.path, "/local/path");
                assert_eq!(local.key, Some(Path::from("config.json")));
            }
            _ => panic!("Expected Local config"),
        }
    }

    #[test]
    fn test_invalid_url() {
        let result = BackendConfig::parse_url("invalid://url", false);
        assert!(matches!(result, Err(StorageError::InvalidUrl { .. })));
    }

    #[test]
    fn test_relative_path_rejected() {
        let result = BackendConfig::parse_url("config.json", false);
        assert!(matches!(result, Err(StorageError::InvalidUrl { .. })));
    }

    #[test]
    fn test_base_url_per_backend() {
        let s3 = BackendConfig::parse_url("s3://bucket/data.csv", false).unwrap();
        assert_eq!(s3.base_url(), Some("s3://bucket".to_string()));

        let gcs = BackendConfig::parse_url("gs://bucket/data.csv", false).unwrap();
        assert_eq!(gcs.base_url(), Some("gs://bucket".to_string()));

        let local = BackendConfig::parse_url("/tmp/data.csv", false).unwrap();
        assert_eq!(local.base_url(), None);
    }

    #[test]
    fn test_table_url_normalizes_https_forms() {
        let config =
            BackendConfig::parse_url("https://s3.us-east-1.amazonaws.com/bucket/data.csv", false)
                .unwrap();
        assert_eq!(config.table_url(), "s3://bucket/data.csv");
    }

    #[tokio::test]
    async fn test_get_object_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("config.json");
        std::fs::write(&file, b"{\"data_source\": \"x\"}").unwrap();

        let storage =
            StorageProvider::for_object_url(file.to_str().unwrap(), HashMap::new())
                .await
                .unwrap();

        let bytes = storage.get_object().await.unwrap();
        assert_eq!(bytes.as_ref(), b"{\"data_source\": \"x\"}");
    }

    #[tokio::test]
    async fn test_get_object_requires_key() {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageProvider::for_url_with_options(
            temp_dir.path().to_str().unwrap(),
            HashMap::new(),
        )
        .await
        .unwrap();

        let result = storage.get_object().await;
        assert!(matches!(result, Err(StorageError::NoObjectKey { .. })));
    }

    #[tokio::test]
    async fn test_clear_removes_all_objects() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("out");
        std::fs::create_dir_all(base.join("nested")).unwrap();
        std::fs::write(base.join("a.parquet"), b"a").unwrap();
        std::fs::write(base.join("nested/b.parquet"), b"b").unwrap();

        let storage =
            StorageProvider::for_url_with_options(base.to_str().unwrap(), HashMap::new())
                .await
                .unwrap();

        let removed = storage.clear().await.unwrap();
        assert_eq!(removed, 2);

        let remaining = storage.clear().await.unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_list_returns_relative_paths() {
        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path();

        let nested = base_path.join("dataset/date=2024-01-01");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("part1.csv"), b"a,b\n1,2\n").unwrap();
        std::fs::write(nested.join("part2.csv"), b"a,b\n3,4\n").unwrap();

        let storage_url = format!("{}/dataset", base_path.display());
        let storage = StorageProvider::for_url_with_options(&storage_url, HashMap::new())
            .await
            .unwrap();

        let mut stream = storage.list(true).await.unwrap();
        let mut listed_paths = Vec::new();
        while let Some(result) = stream.next().await {
            listed_paths.push(result.unwrap().to_string());
        }
        listed_paths.sort();

        assert_eq!(listed_paths.len(), 2);
        assert_eq!(listed_paths[0], "date=2024-01-01/part1.csv");
        assert_eq!(listed_paths[1], "date=2024-01-01/part2.csv");
    }
}
