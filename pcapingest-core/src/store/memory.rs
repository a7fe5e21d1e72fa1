//! In-process store.

use std::collections::HashMap;

use arrow::record_batch::RecordBatch;
use parking_lot::RwLock;

use super::ColumnStore;
use crate::error::StoreError;
use crate::schema::TableSchema;

/// Batches held in memory, per table, tagged with their capture.
///
/// Appends take the write lock for the duration of a single push, so a
/// reader sees a batch entirely or not at all.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<&'static str, Vec<(String, RecordBatch)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches written to `table` for `capture_id`, in append order.
    pub fn batches(&self, table: &str, capture_id: &str) -> Vec<RecordBatch> {
        self.tables
            .read()
            .get(table)
            .map(|batches| {
                batches
                    .iter()
                    .filter(|(id, _)| id == capture_id)
                    .map(|(_, b)| b.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Rows in `table` for `capture_id`.
    pub fn row_count(&self, table: &str, capture_id: &str) -> usize {
        self.tables
            .read()
            .get(table)
            .map(|batches| {
                batches
                    .iter()
                    .filter(|(id, _)| id == capture_id)
                    .map(|(_, b)| b.num_rows())
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Rows in `table` across all captures.
    pub fn total_rows(&self, table: &str) -> usize {
        self.tables
            .read()
            .get(table)
            .map(|batches| batches.iter().map(|(_, b)| b.num_rows()).sum())
            .unwrap_or(0)
    }
}

impl ColumnStore for MemoryStore {
    fn append(&self, table: &TableSchema, capture_id: &str, batch: RecordBatch) -> Result<(), StoreError> {
        if batch.schema() != table.arrow_schema() {
            return Err(StoreError::Schema {
                table: table.name.to_string(),
                reason: "batch schema differs from table schema".to_string(),
            });
        }
        self.tables
            .write()
            .entry(table.name)
            .or_default()
            .push((capture_id.to_string(), batch));
        Ok(())
    }

    fn delete_capture(&self, capture_id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        for batches in tables.values_mut() {
            batches.retain(|(id, _)| id != capture_id);
        }
        Ok(())
    }
}
