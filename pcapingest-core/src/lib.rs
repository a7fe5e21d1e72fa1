//! # pcapingest-core
//!
//! Capture ingestion library: reads pcap/pcapng captures, decodes each frame
//! into a layered protocol view, labels it, extracts packet and protocol
//! records, and writes them in batches to a columnar store keyed by
//! `capture_id`. Logs from an external session-analysis tool can be
//! reconciled into the same tables.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pcapingest_core::prelude::*;
//!
//! # async fn run() {
//! let store = Arc::new(MemoryStore::new());
//! let jobs = JobRegistry::new(store.clone(), IngestConfig::default());
//!
//! let job_id = jobs.start("capture-1", "capture.pcap", "capture.pcap");
//! let status = jobs.wait(&job_id).await;
//! println!("{status:?}, {} packets", store.row_count("packets", "capture-1"));
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                        pcapingest-core                              |
//! +---------------------------------------------------------------------+
//! |  io/        - CaptureSource, RawFrame (pcap, pcapng, gzip)          |
//! |  protocol/  - Protocol trait, layer parsers, registry               |
//! |  decode     - FrameDecoder -> DecodedFrame                          |
//! |  classify   - ProtocolClassifier (ordered rule list)                |
//! |  extract/   - FieldExtractor: packet, DNS and ARP records           |
//! |  enrich/    - EnrichmentRunner, EnrichmentReconciler                |
//! |  schema/    - TableSchema, FieldDescriptor, Value                   |
//! |  store/     - ColumnStore trait, Arrow batches, MemoryStore         |
//! |  writer     - BatchWriter (thresholds, retries)                     |
//! |  job        - JobRegistry, JobHandle, CancelToken                   |
//! |  pipeline   - run_ingest                                            |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Tables
//!
//! | Table | Source |
//! |-------|--------|
//! | `packets` | every frame |
//! | `dns_log` | DNS, mDNS, LLMNR, NBNS frames and enrichment |
//! | `arp_log` | ARP frames |
//! | `conn_log`, `http_log`, `ssl_log` | enrichment only |
//! | `capture_metadata` | one row per completed job |

pub mod classify;
pub mod config;
pub mod decode;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod io;
pub mod job;
pub mod pipeline;
pub mod prelude;
pub mod protocol;
pub mod schema;
pub mod store;
pub mod writer;

// Re-export commonly used types at crate root for convenience
pub use classify::{ProtocolClassifier, Rule, FALLBACK_LABEL};
pub use config::{BatchConfig, EnrichmentConfig, IngestConfig, RetryConfig};
pub use decode::{DecodedFrame, FrameDecoder, Layer, Transport};
pub use enrich::{EnrichedRecord, EnrichmentReconciler, EnrichmentRunner, LogKind, Reconciled};
pub use error::{
    DecodeError, EnrichmentError, Error, ExtractionError, FormatError, Result, StoreError,
};
pub use extract::{ArpRecord, DnsRecord, Extraction, FieldExtractor, PacketDescriptor};
pub use io::{CaptureSource, RawFrame};
pub use job::{CancelToken, JobHandle, JobId, JobRegistry, JobState, JobStatus, JobStatusView};
pub use pipeline::{run_ingest, IngestRequest};
pub use protocol::{default_registry, parse_packet, Protocol, ProtocolRegistry};
pub use schema::{DataKind, FieldDescriptor, IntoRow, Row, TableSchema, Value};
pub use store::{CaptureMetadata, ColumnStore, MemoryStore};
pub use writer::BatchWriter;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
