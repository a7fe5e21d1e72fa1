//! One ingest job, end to end.
//!
//! ```text
//! CaptureSource -> FrameDecoder -> ProtocolClassifier -> FieldExtractor -> BatchWriter
//!                                                                              ^
//! EnrichmentRunner (tokio task) -> EnrichmentReconciler -----------------------+
//! ```
//!
//! The decode pass is a single forward pass on a blocking thread. The
//! enrichment tool runs alongside it; its logs are reconciled after the pass
//! and go through the same writer. Job state is only touched through the
//! [`JobHandle`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::classify::ProtocolClassifier;
use crate::config::{EnrichmentConfig, IngestConfig};
use crate::decode::FrameDecoder;
use crate::enrich::{collect_logs, EnrichmentReconciler, EnrichmentRunner, Reconciled};
use crate::error::{EnrichmentError, Error, FormatError, Result};
use crate::extract::{Extraction, FieldExtractor};
use crate::io::CaptureSource;
use crate::job::{progress_percent, JobHandle, JobStatus};
use crate::schema::tables;
use crate::store::{CaptureMetadata, ColumnStore};
use crate::writer::BatchWriter;

/// What to ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRequest {
    pub capture_id: String,
    pub file_path: PathBuf,
    /// Name recorded in the capture metadata
    pub original_name: String,
}

/// Counters from the decode pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeSummary {
    pub packets: u64,
    pub dns_records: u64,
    pub arp_records: u64,
    pub undecodable: u64,
    pub file_size: u64,
    pub first_timestamp_us: Option<i64>,
    pub last_timestamp_us: Option<i64>,
    /// The container ended inside a frame record
    pub truncated: bool,
    pub cancelled: bool,
}

impl DecodeSummary {
    fn observe(&mut self, timestamp_us: i64) {
        self.first_timestamp_us.get_or_insert(timestamp_us);
        self.last_timestamp_us = Some(timestamp_us);
    }

    /// Seconds between the first and last frame.
    pub fn duration_secs(&self) -> f64 {
        match (self.first_timestamp_us, self.last_timestamp_us) {
            (Some(first), Some(last)) => (last - first) as f64 / 1_000_000.0,
            _ => 0.0,
        }
    }
}

enum Outcome {
    Completed(u64),
    Cancelled,
}

/// Worker body for one job. Drives `handle` to a terminal state.
pub async fn run_ingest(
    request: IngestRequest,
    handle: Arc<JobHandle>,
    store: Arc<dyn ColumnStore>,
    config: IngestConfig,
) {
    let job_id = handle.snapshot().job_id;
    if !handle.start() {
        info!(%job_id, "Job cancelled before start");
        return;
    }

    let span = info_span!("ingest", %job_id, capture_id = %request.capture_id);
    let outcome = ingest(&job_id, &request, &handle, store.clone(), &config)
        .instrument(span)
        .await;

    match outcome {
        Ok(Outcome::Completed(packets)) => {
            if handle.complete(packets) {
                info!(%job_id, packets, "Job completed");
            } else {
                // Cancelled after the last check; the rows must not survive
                delete_capture(store, &request.capture_id).await;
            }
        }
        Ok(Outcome::Cancelled) => {
            info!(%job_id, "Job cancelled, removing partial rows");
            delete_capture(store, &request.capture_id).await;
        }
        Err(e) => {
            if handle.fail(e.to_string()) {
                error!(%job_id, error = %e, "Job failed");
            } else if handle.status() == JobStatus::Cancelled {
                // Cancel landed while the failing write was in flight
                warn!(%job_id, error = %e, "Job cancelled during failure, removing partial rows");
                delete_capture(store, &request.capture_id).await;
            }
        }
    }
}

async fn ingest(
    job_id: &str,
    request: &IngestRequest,
    handle: &Arc<JobHandle>,
    store: Arc<dyn ColumnStore>,
    config: &IngestConfig,
) -> Result<Outcome> {
    let upload_time = Utc::now().timestamp_micros();
    let token = handle.cancel_token();
    let enrichment = Enrichment::start(job_id, &request.file_path, &config.enrichment);

    let writer = BatchWriter::new(
        store,
        request.capture_id.clone(),
        &config.batch,
        config.retry.clone(),
    );

    let pass = {
        let path = request.file_path.clone();
        let handle = handle.clone();
        let interval = config.progress_interval_frames;
        tokio::task::spawn_blocking(move || decode_pass(&path, writer, &handle, interval)).await
    };
    let (mut writer, summary) = match pass {
        Ok(Ok(done)) => done,
        Ok(Err(e)) => {
            enrichment.abort().await;
            return Err(e);
        }
        Err(e) => {
            enrichment.abort().await;
            return Err(Error::Io(std::io::Error::other(e)));
        }
    };

    if summary.cancelled || token.is_cancelled() {
        enrichment.abort().await;
        return Ok(Outcome::Cancelled);
    }
    info!(
        packets = summary.packets,
        dns = summary.dns_records,
        arp = summary.arp_records,
        undecodable = summary.undecodable,
        "Decode pass finished"
    );

    let (records, notes) = match enrichment.collect().await {
        None => (Vec::new(), String::new()),
        Some(Ok(reconciled)) => {
            let notes = enrichment_notes(&reconciled);
            info!(records = reconciled.records.len(), "Enrichment reconciled");
            (reconciled.records, notes)
        }
        Some(Err(e)) => {
            warn!(error = %e, "Enrichment skipped");
            (Vec::new(), format!("enrichment skipped: {e}"))
        }
    };

    let metadata = CaptureMetadata {
        capture_id: request.capture_id.clone(),
        file_name: request.original_name.clone(),
        file_size: summary.file_size,
        upload_time,
        total_packets: summary.packets,
        capture_duration: summary.duration_secs(),
        notes,
    };

    let finish = tokio::task::spawn_blocking(move || -> Result<Outcome> {
        for record in records {
            writer.append(record)?;
        }
        writer.finish()?;
        if token.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }
        let packets = metadata.total_packets;
        writer.append(metadata)?;
        writer.flush(&tables::CAPTURE_METADATA)?;
        Ok(Outcome::Completed(packets))
    })
    .await;

    match finish {
        Ok(outcome) => outcome,
        Err(e) => Err(Error::Io(std::io::Error::other(e))),
    }
}

/// Read every frame of the capture into `writer`.
///
/// Checks the cancel token before each frame. A record cut short at the
/// end of the container ends the pass; any other container error fails it.
pub fn decode_pass(
    path: &Path,
    mut writer: BatchWriter,
    handle: &JobHandle,
    progress_interval: u64,
) -> Result<(BatchWriter, DecodeSummary)> {
    let source = CaptureSource::open(path)?;
    info!(
        path = %path.display(),
        format = ?source.format(),
        compression = ?source.compression(),
        bytes = source.file_size(),
        "Capture opened"
    );

    let total = source.estimated_total_bytes();
    let decoder = FrameDecoder::new();
    let classifier = ProtocolClassifier::new();
    let extractor = FieldExtractor::new();
    let token = handle.cancel_token();
    let interval = progress_interval.max(1);

    let mut summary = DecodeSummary {
        file_size: source.file_size(),
        ..Default::default()
    };

    for item in source.frames()? {
        if token.is_cancelled() {
            summary.cancelled = true;
            break;
        }

        let raw = match item {
            Ok(raw) => raw,
            Err(FormatError::Truncated { reason }) => {
                warn!(%reason, frames = summary.packets, "Capture truncated, ending pass");
                summary.truncated = true;
                break;
            }
            Err(e) => return Err(e.into()),
        };

        let sequence = summary.packets + 1;
        match decoder.decode(&raw) {
            Ok(frame) => {
                let label = classifier.classify(&frame);
                let Extraction { packet, dns, arp } = extractor.extract(sequence, &raw, &frame, label);
                writer.append(packet)?;
                if let Some(dns) = dns {
                    writer.append(dns)?;
                    summary.dns_records += 1;
                }
                if let Some(arp) = arp {
                    writer.append(arp)?;
                    summary.arp_records += 1;
                }
            }
            Err(e) => {
                debug!(sequence, error = %e, "Frame not decodable");
                writer.append(extractor.undecodable(sequence, &raw, &e))?;
                summary.undecodable += 1;
            }
        }

        summary.packets = sequence;
        summary.observe(raw.timestamp_us);
        if sequence % interval == 0 {
            handle.set_progress(progress_percent(raw.bytes_consumed, total));
        }
    }

    if token.is_cancelled() {
        summary.cancelled = true;
    }
    Ok((writer, summary))
}

fn enrichment_notes(reconciled: &Reconciled) -> String {
    let mut notes = format!("enrichment: {} records", reconciled.records.len());
    if reconciled.skipped > 0 {
        notes.push_str(&format!(" ({} lines skipped)", reconciled.skipped));
    }
    notes
}

async fn delete_capture(store: Arc<dyn ColumnStore>, capture_id: &str) {
    let id = capture_id.to_string();
    match tokio::task::spawn_blocking(move || store.delete_capture(&id)).await {
        Ok(Ok(())) => debug!(capture_id, "Partial rows removed"),
        Ok(Err(e)) => warn!(capture_id, error = %e, "Failed to remove partial rows"),
        Err(e) => warn!(capture_id, error = %e, "Cleanup task failed"),
    }
}

/// Where enrichment logs come from for one job.
enum Enrichment {
    Disabled,
    /// Pre-produced logs
    LogDir(PathBuf),
    /// Tool running in a scratch directory
    Tool {
        task: JoinHandle<std::result::Result<Vec<PathBuf>, EnrichmentError>>,
        work_dir: PathBuf,
    },
}

impl Enrichment {
    fn start(job_id: &str, capture: &Path, config: &EnrichmentConfig) -> Self {
        if !config.enabled {
            return Enrichment::Disabled;
        }
        if let Some(dir) = &config.log_dir {
            return Enrichment::LogDir(dir.clone());
        }

        let work_dir = std::env::temp_dir().join(format!("pcapingest-{job_id}"));
        let runner = EnrichmentRunner::from_config(config);
        let capture = capture.to_path_buf();
        let dir = work_dir.clone();
        let task = tokio::spawn(async move {
            tokio::fs::create_dir_all(&dir).await?;
            // The tool runs inside the scratch directory
            let capture = tokio::fs::canonicalize(&capture).await.unwrap_or(capture);
            runner.run(&capture, &dir).await
        });
        Enrichment::Tool { task, work_dir }
    }

    async fn collect(self) -> Option<std::result::Result<Reconciled, EnrichmentError>> {
        let reconciler = EnrichmentReconciler::new();
        match self {
            Enrichment::Disabled => None,
            Enrichment::LogDir(dir) => {
                let result = match collect_logs(&dir).await {
                    Ok(logs) => reconciler.reconcile_files(&logs).await,
                    Err(e) => Err(e),
                };
                Some(result)
            }
            Enrichment::Tool { task, work_dir } => {
                let result = match task.await {
                    Ok(Ok(logs)) => reconciler.reconcile_files(&logs).await,
                    Ok(Err(e)) => Err(e),
                    Err(e) => Err(EnrichmentError::Io(std::io::Error::other(e))),
                };
                remove_scratch(&work_dir).await;
                Some(result)
            }
        }
    }

    async fn abort(self) {
        if let Enrichment::Tool { task, work_dir } = self {
            task.abort();
            let _ = task.await;
            remove_scratch(&work_dir).await;
        }
    }
}

async fn remove_scratch(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!(dir = %dir.display(), error = %e, "Failed to remove scratch directory");
        }
    }
}
