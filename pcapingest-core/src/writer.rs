//! Buffered, retried writes into a [`ColumnStore`].
//!
//! Rows accumulate per table and are flushed as one record batch when the
//! table's threshold is reached or when the writer is finished. A failed
//! flush is retried with the same buffer, so a store that applied a batch
//! but reported failure will hold it twice.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{BatchConfig, RetryConfig};
use crate::error::StoreError;
use crate::schema::tables::ALL_TABLES;
use crate::schema::{IntoRow, Row, TableSchema};
use crate::store::{build_batch, check_row, ColumnStore};

struct TableBuffer {
    table: TableSchema,
    threshold: usize,
    rows: Vec<Row>,
    written: u64,
}

/// Per-capture batching writer.
pub struct BatchWriter {
    store: Arc<dyn ColumnStore>,
    capture_id: String,
    retry: RetryConfig,
    buffers: Vec<TableBuffer>,
    flushes: u64,
}

impl std::fmt::Debug for BatchWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchWriter")
            .field("capture_id", &self.capture_id)
            .field("flushes", &self.flushes)
            .finish_non_exhaustive()
    }
}

impl BatchWriter {
    pub fn new(
        store: Arc<dyn ColumnStore>,
        capture_id: impl Into<String>,
        batch: &BatchConfig,
        retry: RetryConfig,
    ) -> Self {
        let buffers = ALL_TABLES
            .iter()
            .map(|table| {
                let threshold = batch.threshold(table).max(1);
                TableBuffer {
                    table: *table,
                    threshold,
                    rows: Vec::with_capacity(threshold.min(8192)),
                    written: 0,
                }
            })
            .collect();

        Self {
            store,
            capture_id: capture_id.into(),
            retry,
            buffers,
            flushes: 0,
        }
    }

    pub fn capture_id(&self) -> &str {
        &self.capture_id
    }

    /// Buffer one record, flushing its table if the threshold is reached.
    pub fn append<R: IntoRow>(&mut self, record: R) -> Result<(), StoreError> {
        let table = record.table();
        let row = record.into_row();
        check_row(&table, &row)?;

        let index = self.buffer_index(&table)?;
        self.buffers[index].rows.push(row);
        if self.buffers[index].rows.len() >= self.buffers[index].threshold {
            self.flush_index(index)?;
        }
        Ok(())
    }

    /// Flush one table's buffer now.
    pub fn flush(&mut self, table: &TableSchema) -> Result<(), StoreError> {
        let index = self.buffer_index(table)?;
        self.flush_index(index)
    }

    /// Flush every buffer in table order.
    pub fn finish(&mut self) -> Result<(), StoreError> {
        for index in 0..self.buffers.len() {
            self.flush_index(index)?;
        }
        Ok(())
    }

    /// Rows durably handed to the store for `table`.
    pub fn rows_written(&self, table: &TableSchema) -> u64 {
        self.buffers
            .iter()
            .find(|b| b.table.name == table.name)
            .map_or(0, |b| b.written)
    }

    /// Rows still buffered for `table`.
    pub fn pending(&self, table: &TableSchema) -> usize {
        self.buffers
            .iter()
            .find(|b| b.table.name == table.name)
            .map_or(0, |b| b.rows.len())
    }

    /// Completed flushes.
    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    fn buffer_index(&self, table: &TableSchema) -> Result<usize, StoreError> {
        self.buffers
            .iter()
            .position(|b| b.table.name == table.name)
            .ok_or_else(|| StoreError::Schema {
                table: table.name.to_string(),
                reason: "unknown table".to_string(),
            })
    }

    fn flush_index(&mut self, index: usize) -> Result<(), StoreError> {
        let buffer = &self.buffers[index];
        if buffer.rows.is_empty() {
            return Ok(());
        }

        let table = buffer.table;
        let batch = build_batch(&table, &self.capture_id, &buffer.rows)?;
        let rows = buffer.rows.len();

        let mut attempt = 0u32;
        loop {
            match self.store.append(&table, &self.capture_id, batch.clone()) {
                Ok(()) => break,
                Err(e) if attempt < self.retry.max_retries => {
                    let delay = backoff(self.retry.retry_backoff_ms, attempt);
                    attempt += 1;
                    warn!(
                        table = table.name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Flush failed, retrying"
                    );
                    thread::sleep(delay);
                }
                Err(e) => {
                    return Err(StoreError::RetriesExhausted {
                        table: table.name,
                        attempts: attempt + 1,
                        last: e.to_string(),
                    })
                }
            }
        }

        let buffer = &mut self.buffers[index];
        buffer.rows.clear();
        buffer.written += rows as u64;
        self.flushes += 1;
        debug!(table = table.name, rows, capture_id = %self.capture_id, "Flushed batch");
        Ok(())
    }
}

/// Exponential delay before retry number `attempt + 1`.
fn backoff(base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(1u64 << attempt.min(16)))
}
