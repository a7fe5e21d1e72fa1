//! Ingestion configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! { "batch": { "packets": 10000 }, "enrichment": { "enabled": true } }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{tables, TableSchema};

/// Top-level settings for one ingest job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub batch: BatchConfig,
    pub retry: RetryConfig,
    pub enrichment: EnrichmentConfig,
    /// Frames between progress updates
    pub progress_interval_frames: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch: BatchConfig::default(),
            retry: RetryConfig::default(),
            enrichment: EnrichmentConfig::default(),
            progress_interval_frames: 256,
        }
    }
}

impl IngestConfig {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: IngestConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let b = &self.batch;
        if b.packets == 0 || b.dns == 0 || b.arp == 0 || b.enrichment == 0 {
            return Err(Error::Config("batch thresholds must be at least 1".into()));
        }
        if self.progress_interval_frames == 0 {
            return Err(Error::Config("progress_interval_frames must be at least 1".into()));
        }
        if self.enrichment.enabled && self.enrichment.command.trim().is_empty() {
            return Err(Error::Config("enrichment command is empty".into()));
        }
        Ok(())
    }
}

/// Rows buffered per table before a flush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub packets: usize,
    pub dns: usize,
    pub arp: usize,
    /// conn, http and ssl tables
    pub enrichment: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            packets: 5000,
            dns: 1000,
            arp: 1000,
            enrichment: 1000,
        }
    }
}

impl BatchConfig {
    /// Same threshold for every table.
    pub fn uniform(rows: usize) -> Self {
        Self {
            packets: rows,
            dns: rows,
            arp: rows,
            enrichment: rows,
        }
    }

    /// Threshold for `table`.
    pub fn threshold(&self, table: &TableSchema) -> usize {
        match table.name {
            n if n == tables::PACKETS.name => self.packets,
            n if n == tables::DNS_LOG.name => self.dns,
            n if n == tables::ARP_LOG.name => self.arp,
            _ => self.enrichment,
        }
    }
}

/// Flush retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts after the first failure
    pub max_retries: u32,
    /// Delay before the first retry; doubles each time
    pub retry_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_backoff_ms: 100,
        }
    }
}

/// External inspection tool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    pub command: String,
    /// `{capture}` is replaced by the capture path
    pub args: Vec<String>,
    pub timeout_secs: u64,
    /// Read logs from here instead of running the tool
    pub log_dir: Option<PathBuf>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: "zeek".to_string(),
            args: vec![
                "-C".to_string(),
                "-r".to_string(),
                "{capture}".to_string(),
                "LogAscii::use_json=T".to_string(),
            ],
            timeout_secs: 300,
            log_dir: None,
        }
    }
}
