//! Error types for flurry using snafu.
//!
//! This module defines structured error types with context selectors for
//! all error conditions in the codebase.

use snafu::prelude::*;

// ============ Storage Errors ============

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Invalid storage URL format.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Locator points at a bucket or container root rather than an object.
    #[snafu(display("Storage URL has no object key: {url}"))]
    NoObjectKey { url: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed"))]
    ObjectStore { source: object_store::Error },

    /// IO error during storage operations.
    #[snafu(display("IO error"))]
    Io { source: std::io::Error },

    /// S3 configuration error.
    #[snafu(display("S3 configuration error"))]
    S3Config { source: object_store::Error },

    /// GCS configuration error.
    #[snafu(display("GCS configuration error"))]
    GcsConfig { source: object_store::Error },

    /// Azure configuration error.
    #[snafu(display("Azure configuration error"))]
    AzureConfig { source: object_store::Error },
}

// ============ Config Errors ============

/// Errors that can occur while loading the job configuration.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Failed to fetch the configuration object.
    #[snafu(display("Failed to fetch configuration"))]
    FetchConfig { source: StorageError },

    /// Failed to parse JSON configuration.
    #[snafu(display("Failed to parse JSON configuration"))]
    JsonParse { source: serde_json::Error },
}

// ============ Engine Errors ============

/// Errors that can occur inside the query engine session.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum EngineError {
    /// DataFusion operation failed.
    #[snafu(display("Query engine operation failed"))]
    DataFusion {
        source: datafusion::error::DataFusionError,
    },

    /// Arrow formatting failed.
    #[snafu(display("Arrow operation failed"))]
    Arrow {
        source: datafusion::arrow::error::ArrowError,
    },

    /// Storage base URL could not be parsed for registration.
    #[snafu(display("Failed to parse store registration URL: {url}"))]
    RegisterUrl {
        url: String,
        source: url::ParseError,
    },
}

// ============ Job Error (top-level) ============

/// Top-level job errors that aggregate all error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum JobError {
    /// Configuration error.
    #[snafu(display("Configuration error"))]
    Config { source: ConfigError },

    /// Storage error.
    #[snafu(display("Storage error"))]
    JobStorage { source: StorageError },

    /// Engine error.
    #[snafu(display("Engine error"))]
    Engine { source: EngineError },
}
