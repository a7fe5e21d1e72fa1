//! Reconciliation of enrichment-tool logs into store rows.
//!
//! The external tool writes one log per kind (`conn.log`, `dns.log`, ...),
//! either as JSON lines or as headered tab-separated text. Every record is
//! lifted to JSON values, flattened, then coerced column by column against
//! the target table, so both formats produce identical rows.
//!
//! ```rust
//! use pcapingest_core::enrich::{EnrichmentReconciler, LogKind};
//!
//! let reconciler = EnrichmentReconciler::new();
//! let out = reconciler.reconcile_str(LogKind::Conn, r#"{"ts":1.0,"uid":"C1","proto":"tcp"}"#);
//! assert_eq!(out.records.len(), 1);
//! assert_eq!(out.skipped, 0);
//! ```

mod ascii;
pub mod coerce;
mod json;
mod runner;

pub use ascii::{AsciiLine, AsciiLog};
pub use coerce::{reconcile_row, ColumnSpec};
pub use runner::{collect_logs, EnrichmentRunner, CAPTURE_PLACEHOLDER};

use std::path::{Path, PathBuf};

use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};

use crate::error::EnrichmentError;
use crate::extract::DnsRecord;
use crate::schema::{tables, IntoRow, Row, TableSchema};

/// Enrichment log kinds with a target table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    Conn,
    Dns,
    Http,
    Ssl,
}

impl LogKind {
    /// Kind from a log file stem such as `dns` or `ssl.2024-01-01`.
    pub fn from_stem(stem: &str) -> Option<Self> {
        let base = stem.split('.').next().unwrap_or(stem);
        match base.to_ascii_lowercase().as_str() {
            "conn" => Some(LogKind::Conn),
            "dns" => Some(LogKind::Dns),
            "http" => Some(LogKind::Http),
            "ssl" | "tls" => Some(LogKind::Ssl),
            _ => None,
        }
    }

    /// Kind from a log path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_stem()
            .and_then(|s| s.to_str())
            .and_then(Self::from_stem)
    }

    /// Target table.
    pub fn table(&self) -> TableSchema {
        match self {
            LogKind::Conn => tables::CONN_LOG,
            LogKind::Dns => tables::DNS_LOG,
            LogKind::Http => tables::HTTP_LOG,
            LogKind::Ssl => tables::SSL_LOG,
        }
    }
}

/// A full row in table column order.
pub type ReconciledRow = Row;

/// One reconciled enrichment record, tagged by target schema.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichedRecord {
    Conn(ReconciledRow),
    Dns(ReconciledRow),
    Http(ReconciledRow),
    Tls(ReconciledRow),
}

impl EnrichedRecord {
    fn new(kind: LogKind, row: ReconciledRow) -> Self {
        match kind {
            LogKind::Conn => EnrichedRecord::Conn(row),
            LogKind::Dns => EnrichedRecord::Dns(row),
            LogKind::Http => EnrichedRecord::Http(row),
            LogKind::Ssl => EnrichedRecord::Tls(row),
        }
    }

    pub fn kind(&self) -> LogKind {
        match self {
            EnrichedRecord::Conn(_) => LogKind::Conn,
            EnrichedRecord::Dns(_) => LogKind::Dns,
            EnrichedRecord::Http(_) => LogKind::Http,
            EnrichedRecord::Tls(_) => LogKind::Ssl,
        }
    }

    pub fn row(&self) -> &ReconciledRow {
        match self {
            EnrichedRecord::Conn(row)
            | EnrichedRecord::Dns(row)
            | EnrichedRecord::Http(row)
            | EnrichedRecord::Tls(row) => row,
        }
    }

    /// Typed view of a DNS record.
    pub fn as_dns_record(&self) -> Option<DnsRecord> {
        match self {
            EnrichedRecord::Dns(row) => DnsRecord::from_row(row),
            _ => None,
        }
    }
}

impl IntoRow for EnrichedRecord {
    fn table(&self) -> TableSchema {
        self.kind().table()
    }

    fn into_row(self) -> Row {
        match self {
            EnrichedRecord::Conn(row)
            | EnrichedRecord::Dns(row)
            | EnrichedRecord::Http(row)
            | EnrichedRecord::Tls(row) => row,
        }
    }
}

/// Records from one log stream plus the count of unreadable lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    pub records: Vec<EnrichedRecord>,
    pub skipped: usize,
}

/// Turns enrichment logs into typed records.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnrichmentReconciler;

impl EnrichmentReconciler {
    pub fn new() -> Self {
        Self
    }

    /// Reconcile one record of flattened fields.
    pub fn reconcile_record(&self, kind: LogKind, fields: &Map<String, JsonValue>) -> EnrichedRecord {
        EnrichedRecord::new(kind, reconcile_row(&kind.table(), fields))
    }

    /// Reconcile a whole log. The format is picked from the first
    /// non-blank line: `{` means JSON lines, anything else headered ASCII.
    pub fn reconcile_str(&self, kind: LogKind, text: &str) -> Reconciled {
        let is_json = text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .is_some_and(|l| l.starts_with('{'));

        let mut out = Reconciled::default();
        let mut ascii = AsciiLog::new();

        for (lineno, line) in text.lines().enumerate() {
            let parsed = if is_json {
                json::parse_line(line)
            } else {
                match ascii.parse_line(line) {
                    AsciiLine::Directive => Ok(None),
                    AsciiLine::Record(fields) => Ok(Some(coerce::flatten(fields))),
                    AsciiLine::Invalid(reason) => Err(reason),
                }
            };

            match parsed {
                Ok(Some(fields)) => out.records.push(self.reconcile_record(kind, &fields)),
                Ok(None) => {}
                Err(reason) => {
                    debug!(line = lineno + 1, %reason, "Skipping enrichment line");
                    out.skipped += 1;
                }
            }
        }

        if out.skipped > 0 {
            warn!(
                table = kind.table().name,
                skipped = out.skipped,
                "Unparseable enrichment lines skipped"
            );
        }
        out
    }

    /// Reconcile a log file. Files whose stem names no known kind yield
    /// `Ok(None)`.
    pub async fn reconcile_file(&self, path: &Path) -> Result<Option<Reconciled>, EnrichmentError> {
        let Some(kind) = LogKind::from_path(path) else {
            debug!(path = %path.display(), "Ignoring log with unknown kind");
            return Ok(None);
        };
        let text = tokio::fs::read_to_string(path).await?;
        Ok(Some(self.reconcile_str(kind, &text)))
    }

    /// Reconcile several log files, concatenating their records.
    pub async fn reconcile_files(&self, paths: &[PathBuf]) -> Result<Reconciled, EnrichmentError> {
        let mut all = Reconciled::default();
        for path in paths {
            if let Some(mut one) = self.reconcile_file(path).await? {
                all.records.append(&mut one.records);
                all.skipped += one.skipped;
            }
        }
        Ok(all)
    }
}
