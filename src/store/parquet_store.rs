//! Parquet files on local disk.
//!
//! Layout, one directory per table and capture:
//!
//! ```text
//! <root>/<table>/capture_id=<id>/part-<seq>-<rand>.parquet
//! ```
//!
//! Each appended batch becomes one file. It is written under a dot-prefixed
//! temporary name and renamed into place, so readers listing `*.parquet`
//! never see a partial batch.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use pcapingest_core::schema::tables::ALL_TABLES;
use pcapingest_core::schema::TableSchema;
use pcapingest_core::store::ColumnStore;
use pcapingest_core::StoreError;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};

const PARQUET_EXT: &str = "parquet";

/// Column store writing Snappy-compressed Parquet.
#[derive(Debug)]
pub struct ParquetStore {
    root: PathBuf,
    sequence: AtomicU64,
}

impl ParquetStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    ///
    /// Part numbers continue after the highest one already on disk, so file
    /// names sort in write order across runs.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let next = highest_part(&root)?.map_or(0, |seq| seq + 1);
        debug!(root = %root.display(), next, "Opened parquet store");
        Ok(Self {
            root,
            sequence: AtomicU64::new(next),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding `table`'s files for `capture_id`.
    pub fn capture_dir(&self, table: &str, capture_id: &str) -> Result<PathBuf> {
        validate_capture_id(capture_id)?;
        Ok(self.root.join(table).join(format!("capture_id={capture_id}")))
    }

    /// Visible files for one table and capture, in write order.
    pub fn files(&self, table: &str, capture_id: &str) -> Result<Vec<PathBuf>> {
        let dir = self.capture_dir(table, capture_id)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            let visible = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with('.'));
            if visible && path.extension().is_some_and(|e| e == PARQUET_EXT) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Read back every batch for one table and capture.
    pub fn read(&self, table: &str, capture_id: &str) -> Result<Vec<RecordBatch>> {
        let mut batches = Vec::new();
        for path in self.files(table, capture_id)? {
            let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path)?)?.build()?;
            for batch in reader {
                batches.push(batch?);
            }
        }
        Ok(batches)
    }

    fn write_batch(&self, table: &TableSchema, capture_id: &str, batch: &RecordBatch) -> Result<PathBuf> {
        let dir = self.capture_dir(table.name, capture_id)?;
        fs::create_dir_all(&dir)?;

        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let name = format!("part-{seq:08}-{}.{PARQUET_EXT}", &Uuid::new_v4().simple().to_string()[..8]);
        let tmp = dir.join(format!(".{name}.tmp"));
        let path = dir.join(&name);

        // Configure Parquet writer with Snappy compression
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let written = (|| -> Result<()> {
            let file = File::create(&tmp)?;
            let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
            writer.write(batch)?;
            writer.close()?;
            Ok(())
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        fs::rename(&tmp, &path)?;
        Ok(path)
    }
}

impl ColumnStore for ParquetStore {
    fn append(&self, table: &TableSchema, capture_id: &str, batch: RecordBatch) -> std::result::Result<(), StoreError> {
        if batch.schema() != table.arrow_schema() {
            return Err(StoreError::Schema {
                table: table.name.to_string(),
                reason: "batch schema differs from table schema".to_string(),
            });
        }
        let path = self
            .write_batch(table, capture_id, &batch)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        debug!(table = table.name, rows = batch.num_rows(), path = %path.display(), "Wrote parquet file");
        Ok(())
    }

    fn delete_capture(&self, capture_id: &str) -> std::result::Result<(), StoreError> {
        for table in ALL_TABLES.iter() {
            let dir = self
                .capture_dir(table.name, capture_id)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            match fs::remove_dir_all(&dir) {
                Ok(()) => debug!(table = table.name, capture_id, "Removed capture directory"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::Backend(format!("{}: {e}", dir.display()))),
            }
        }
        Ok(())
    }
}

/// Highest part number under `<root>/<table>/<capture dir>/`.
fn highest_part(root: &Path) -> Result<Option<u64>> {
    let mut highest = None;
    for table in fs::read_dir(root)? {
        let table = table?.path();
        if !table.is_dir() {
            continue;
        }
        for capture in fs::read_dir(&table)? {
            let capture = capture?.path();
            if !capture.is_dir() {
                continue;
            }
            for file in fs::read_dir(&capture)? {
                let name = file?.file_name();
                if let Some(seq) = name.to_str().and_then(part_number) {
                    highest = highest.max(Some(seq));
                }
            }
        }
    }
    Ok(highest)
}

/// Sequence from a visible `part-<seq>-<rand>.parquet` name.
fn part_number(name: &str) -> Option<u64> {
    let rest = name.strip_prefix("part-")?;
    if !name.ends_with(PARQUET_EXT) {
        return None;
    }
    rest.split('-').next()?.parse().ok()
}

fn validate_capture_id(capture_id: &str) -> Result<()> {
    let ok = !capture_id.is_empty()
        && capture_id != "."
        && capture_id != ".."
        && !capture_id.contains(['/', '\\', '\0']);
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidCaptureId(capture_id.to_string()))
    }
}
