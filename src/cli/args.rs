//! Command-line argument definitions.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use pcapingest_core::config::IngestConfig;

/// Ingest pcap captures into a columnar store.
#[derive(Parser, Debug)]
#[command(name = "pcapingest")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a capture and write its rows
    Ingest(IngestArgs),
    /// Reconcile existing enrichment logs without decoding a capture
    Reconcile(ReconcileArgs),
}

#[derive(clap::Args, Debug)]
pub struct IngestArgs {
    /// Capture file (pcap or pcapng, optionally gzipped)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Store root directory
    #[arg(short = 'o', long = "output", value_name = "DIR", default_value = "pcapingest-out")]
    pub output: PathBuf,

    /// Capture id (random UUID if omitted)
    #[arg(long = "capture-id", value_name = "ID")]
    pub capture_id: Option<String>,

    /// Name recorded in capture metadata (file name if omitted)
    #[arg(long = "name", value_name = "NAME")]
    pub name: Option<String>,

    /// Rows per flush for every table
    #[arg(long = "batch-size", value_name = "N")]
    pub batch_size: Option<usize>,

    /// Run the enrichment tool alongside decoding
    #[arg(long = "enrich")]
    pub enrich: bool,

    /// Reconcile pre-produced enrichment logs from this directory
    #[arg(long = "enrich-log-dir", value_name = "DIR")]
    pub enrich_log_dir: Option<PathBuf>,

    /// JSON config file
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Show a progress bar
    #[arg(long = "progress")]
    pub progress: bool,
}

impl IngestArgs {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn ingest_config(&self) -> pcapingest_core::Result<IngestConfig> {
        let mut config = match &self.config {
            Some(path) => IngestConfig::load(path)?,
            None => IngestConfig::default(),
        };
        if let Some(n) = self.batch_size {
            config.batch = pcapingest_core::BatchConfig::uniform(n);
        }
        if self.enrich {
            config.enrichment.enabled = true;
        }
        if let Some(dir) = &self.enrich_log_dir {
            config.enrichment.enabled = true;
            config.enrichment.log_dir = Some(dir.clone());
        }
        config.validate()?;
        Ok(config)
    }

    pub fn capture_id(&self) -> String {
        self.capture_id.clone().unwrap_or_else(new_capture_id)
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| file_name(&self.file))
    }
}

#[derive(clap::Args, Debug)]
pub struct ReconcileArgs {
    /// Enrichment logs (conn.log, dns.log, http.log, ssl.log)
    #[arg(value_name = "LOG", required = true)]
    pub logs: Vec<PathBuf>,

    /// Capture id the records belong to (random UUID if omitted)
    #[arg(long = "capture-id", value_name = "ID")]
    pub capture_id: Option<String>,

    /// Store root directory
    #[arg(short = 'o', long = "output", value_name = "DIR", default_value = "pcapingest-out")]
    pub output: PathBuf,
}

impl ReconcileArgs {
    pub fn capture_id(&self) -> String {
        self.capture_id.clone().unwrap_or_else(new_capture_id)
    }
}

fn new_capture_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
