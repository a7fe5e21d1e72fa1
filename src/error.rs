//! Error types for the pcapingest binary crate.

use thiserror::Error;

/// Main error type for pcapingest operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from the ingestion library
    #[error(transparent)]
    Core(#[from] pcapingest_core::Error),

    /// Parquet encoding or decoding failed
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Arrow error while reading batches back
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Capture id unusable as a directory name
    #[error("Invalid capture id: {0:?}")]
    InvalidCaptureId(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
