//! Convenient re-exports for common usage.
//!
//! ```rust,no_run
//! use pcapingest_core::prelude::*;
//!
//! let source = CaptureSource::open("capture.pcap").unwrap();
//! let decoder = FrameDecoder::new();
//! let classifier = ProtocolClassifier::new();
//! for frame in source.frames().unwrap() {
//!     let frame = frame.unwrap();
//!     if let Ok(decoded) = decoder.decode(&frame) {
//!         println!("{}", classifier.classify(&decoded));
//!     }
//! }
//! ```

// Reading and decoding
pub use crate::classify::ProtocolClassifier;
pub use crate::decode::{DecodedFrame, FrameDecoder};
pub use crate::extract::FieldExtractor;
pub use crate::io::{CaptureSource, RawFrame};

// Enrichment
pub use crate::enrich::{EnrichmentReconciler, EnrichmentRunner, LogKind};

// Storage
pub use crate::schema::{tables, IntoRow, TableSchema, Value};
pub use crate::store::{ColumnStore, MemoryStore};
pub use crate::writer::BatchWriter;

// Jobs
pub use crate::config::IngestConfig;
pub use crate::job::{JobRegistry, JobStatus, JobStatusView};

// Error types
pub use crate::error::{Error, Result};
