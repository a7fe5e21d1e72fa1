//! Error types for pcapingest-core.
//!
//! - [`enum@Error`] - Main error enum that wraps all error types
//! - [`FormatError`] - Unreadable, empty or unrecognized capture container
//! - [`DecodeError`] - A single frame could not be decoded
//! - [`ExtractionError`] - Protocol-specific record extraction failed
//! - [`EnrichmentError`] - The external inspection tool could not produce output
//! - [`StoreError`] - Columnar store writes failed
//!
//! Only [`FormatError`] and exhausted [`StoreError`]s are fatal to a job. The
//! others are recovered where they occur.

use thiserror::Error;

/// Main error type for pcapingest-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Capture container could not be read
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Frame decoding failed
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Protocol record extraction failed
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Enrichment tool failure
    #[error("Enrichment error: {0}")]
    Enrichment(#[from] EnrichmentError),

    /// Store write failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow batch construction error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors opening or iterating a capture container.
#[derive(Error, Debug)]
pub enum FormatError {
    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Zero-length capture
    #[error("Capture file is empty")]
    Empty,

    /// Container ended in the middle of a header or record
    #[error("Capture truncated: {reason}")]
    Truncated { reason: String },

    /// Magic number matches no supported container
    #[error("Unknown capture magic: 0x{magic:08x}")]
    UnknownMagic { magic: u32 },

    /// Neither the legacy nor the pcapng decoder accepted the header
    #[error("Invalid capture header: {reason}")]
    InvalidHeader { reason: String },
}

/// Errors decoding a single frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame had no bytes
    #[error("empty frame")]
    EmptyFrame,

    /// No parser accepts this link type
    #[error("unsupported link type {link_type}")]
    UnsupportedLinkType { link_type: u16 },

    /// The first layer failed to parse
    #[error("{layer}: {reason}")]
    Layer { layer: &'static str, reason: String },
}

/// Errors extracting a protocol-specific record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// DNS message malformed
    #[error("DNS: {reason}")]
    Dns { reason: String },
}

/// Errors running the external inspection tool.
#[derive(Error, Debug)]
pub enum EnrichmentError {
    /// Binary not found on PATH
    #[error("enrichment tool not found: {command}")]
    ToolMissing { command: String },

    /// Wall-clock limit reached
    #[error("enrichment tool timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Nonzero exit
    #[error("enrichment tool exited with {status}: {stderr}")]
    ExitStatus { status: String, stderr: String },

    /// Spawn or log read failure
    #[error("enrichment I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors writing to a columnar store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend rejected the write
    #[error("store backend: {0}")]
    Backend(String),

    /// All flush attempts failed
    #[error("flush of {table} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        table: &'static str,
        attempts: u32,
        last: String,
    },

    /// Batch does not match the table schema
    #[error("schema mismatch for {table}: {reason}")]
    Schema { table: String, reason: String },
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
