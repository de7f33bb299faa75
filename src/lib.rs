//! flurry: A library for converting delimited text datasets to Parquet.
//!
//! This library provides components for loading a JSON job configuration from
//! object storage, reading the referenced CSV dataset through an embedded
//! query engine, and rewriting it as Parquet at a destination location.
//!
//! # Example
//!
//! ```ignore
//! use flurry::{EngineSession, job, job::JobOutcome};
//!
//! #[tokio::main]
//! async fn main() {
//!     let session = EngineSession::new();
//!     match job::run(&session, "s3://bucket/jobs/config.json").await {
//!         Ok(JobOutcome::Completed(stats)) => {
//!             println!("Wrote {} rows", stats.rows_written);
//!         }
//!         Ok(JobOutcome::IncompleteConfig) => {}
//!         Err(e) => eprintln!("{e}"),
//!     }
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod job;
pub mod storage;

// Re-export main types
pub use config::JobConfig;
pub use engine::EngineSession;
pub use job::{JobOutcome, JobStats, run};
pub use storage::StorageProvider;
