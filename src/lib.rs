//! pcapingest - ingest pcap captures into Parquet tables.
//!
//! The decoding, classification and job machinery lives in
//! `pcapingest-core`. This crate adds the command-line front end and a
//! Parquet-on-disk [`store::ParquetStore`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pcapingest::store::ParquetStore;
//! use pcapingest_core::{IngestConfig, JobRegistry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(ParquetStore::new("out")?);
//!     let jobs = JobRegistry::new(store, IngestConfig::default());
//!     let job_id = jobs.start("capture-1", "capture.pcap", "capture.pcap");
//!     println!("{:?}", jobs.wait(&job_id).await);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod store;

pub use error::{Error, Result};
