//! pcapingest CLI entry point.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pcapingest::cli::{Args, Command, IngestArgs, JobProgress, ReconcileArgs};
use pcapingest::store::ParquetStore;
use pcapingest_core::config::IngestConfig;
use pcapingest_core::enrich::EnrichmentReconciler;
use pcapingest_core::job::{JobRegistry, JobStatus};
use pcapingest_core::schema::tables::ALL_TABLES;
use pcapingest_core::writer::BatchWriter;

/// Status polling period while a job runs.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging
    let filter = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Ingest(args) => ingest(args).await,
        Command::Reconcile(args) => reconcile(args).await,
    }
}

async fn ingest(args: IngestArgs) -> Result<()> {
    let config = args.ingest_config().context("Invalid configuration")?;
    let store = ParquetStore::new(&args.output)
        .with_context(|| format!("Failed to open store: {}", args.output.display()))?;

    let jobs = JobRegistry::new(Arc::new(store), config);
    let capture_id = args.capture_id();
    let job_id = jobs.start(capture_id.clone(), args.file.clone(), args.display_name());

    let progress = args.progress.then(JobProgress::new);
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut cancel_sent = false;

    loop {
        tokio::select! {
            _ = &mut ctrl_c, if !cancel_sent => {
                cancel_sent = true;
                if jobs.request_cancel(&job_id) {
                    warn!(%job_id, "Interrupted, cancelling ingest");
                }
            }
            _ = ticker.tick() => {
                let status = jobs.get_status(&job_id).context("Job disappeared")?;
                if let Some(progress) = &progress {
                    progress.update(&status);
                }
                if status.status.is_terminal() {
                    break;
                }
            }
        }
    }

    // Let the worker finish its cleanup before reporting
    let status = jobs.wait(&job_id).await.context("Job disappeared")?;
    if let Some(progress) = &progress {
        progress.finish(&status);
    }

    match status.status {
        JobStatus::Completed => {
            eprintln!(
                "{} (capture {capture_id}, output {})",
                status.message.unwrap_or_default(),
                args.output.display()
            );
            Ok(())
        }
        JobStatus::Cancelled => bail!("Ingest of {} cancelled", args.file.display()),
        JobStatus::Failed => bail!(
            "Ingest of {} failed: {}",
            args.file.display(),
            status.error.unwrap_or_default()
        ),
        other => bail!("Job ended in unexpected state {other}"),
    }
}

async fn reconcile(args: ReconcileArgs) -> Result<()> {
    let store = ParquetStore::new(&args.output)
        .with_context(|| format!("Failed to open store: {}", args.output.display()))?;
    let capture_id = args.capture_id();

    let reconciled = EnrichmentReconciler::new()
        .reconcile_files(&args.logs)
        .await
        .context("Failed to read enrichment logs")?;
    let records = reconciled.records.len();
    info!(records, skipped = reconciled.skipped, %capture_id, "Logs reconciled");

    let config = IngestConfig::default();
    let mut writer = BatchWriter::new(Arc::new(store), capture_id.clone(), &config.batch, config.retry);
    let written = tokio::task::spawn_blocking(move || -> Result<u64> {
        for record in reconciled.records {
            writer.append(record)?;
        }
        writer.finish()?;
        Ok(ALL_TABLES.iter().map(|t| writer.rows_written(t)).sum())
    })
    .await
    .context("Writer task failed")??;

    eprintln!(
        "Reconciled {written} records ({} lines skipped) into capture {capture_id}",
        reconciled.skipped
    );
    Ok(())
}
