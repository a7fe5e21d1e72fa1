//! Columnar store interface.
//!
//! A [`ColumnStore`] receives whole record batches keyed by `capture_id`. A
//! batch is either fully visible to readers or not at all; implementations
//! must not expose half-written batches.

mod batch;
mod memory;

pub use batch::{build_batch, check_row, check_value};
pub use memory::MemoryStore;

use arrow::record_batch::RecordBatch;

use crate::error::StoreError;
use crate::schema::{tables, IntoRow, Row, TableSchema, Value};

/// Append-oriented columnar sink.
pub trait ColumnStore: Send + Sync {
    /// Append one batch for `capture_id` to `table`, atomically.
    fn append(&self, table: &TableSchema, capture_id: &str, batch: RecordBatch) -> Result<(), StoreError>;

    /// Remove every row written for `capture_id`, in all tables.
    fn delete_capture(&self, capture_id: &str) -> Result<(), StoreError>;
}

/// One row per completed ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureMetadata {
    pub capture_id: String,
    pub file_name: String,
    pub file_size: u64,
    /// Job start, microseconds since the epoch
    pub upload_time: i64,
    pub total_packets: u64,
    /// Seconds between first and last frame
    pub capture_duration: f64,
    pub notes: String,
}

impl IntoRow for CaptureMetadata {
    fn table(&self) -> TableSchema {
        tables::CAPTURE_METADATA
    }

    fn into_row(self) -> Row {
        vec![
            self.file_name.into(),
            self.file_size.into(),
            Value::Timestamp(self.upload_time),
            self.total_packets.into(),
            self.capture_duration.into(),
            self.notes.into(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_row() {
        let meta = CaptureMetadata {
            capture_id: "c1".into(),
            file_name: "a.pcap".into(),
            file_size: 100,
            upload_time: 5,
            total_packets: 2,
            capture_duration: 0.5,
            notes: String::new(),
        };
        let row = meta.into_row();
        check_row(&tables::CAPTURE_METADATA, &row).unwrap();
        assert_eq!(row[3], Value::UInt(2));
    }
}
