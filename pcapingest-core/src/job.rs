//! Job control plane.
//!
//! Every ingest runs as a job with a small state machine:
//!
//! ```text
//! queued -> running -> completed
//!                   -> failed
//!                   -> cancelled
//! queued -> cancelled
//! ```
//!
//! Terminal states never change. State lives behind a lock in a
//! [`JobHandle`] shared between the worker and status readers; readers get
//! snapshots, which may lag but never go backwards.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::IngestConfig;
use crate::pipeline::{run_ingest, IngestRequest};
use crate::store::ColumnStore;

/// Job identifier (UUID v4 text).
pub type JobId = String;

/// Highest progress reported before a job completes.
pub const MAX_RUNNING_PROGRESS: u8 = 99;

/// Lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Cancelled,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Cancelled | JobStatus::Completed | JobStatus::Failed
        )
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Queued, Running) | (Queued, Cancelled) | (Running, Completed | Failed | Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable job record.
#[derive(Debug, Clone, PartialEq)]
pub struct JobState {
    pub job_id: JobId,
    pub capture_id: String,
    pub status: JobStatus,
    /// 0..=100
    pub progress: u8,
    pub message: String,
    pub error: Option<String>,
}

/// Cooperative cancellation flag shared with the worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Serializable status snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatusView {
    pub job_id: JobId,
    pub capture_id: String,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Shared handle to one job's state and cancel token.
#[derive(Debug)]
pub struct JobHandle {
    state: RwLock<JobState>,
    cancel: CancelToken,
}

impl JobHandle {
    pub fn new(job_id: impl Into<JobId>, capture_id: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(JobState {
                job_id: job_id.into(),
                capture_id: capture_id.into(),
                status: JobStatus::Queued,
                progress: 0,
                message: "Queued".to_string(),
                error: None,
            }),
            cancel: CancelToken::new(),
        }
    }

    pub fn snapshot(&self) -> JobState {
        self.state.read().clone()
    }

    pub fn status(&self) -> JobStatus {
        self.state.read().status
    }

    pub fn view(&self) -> JobStatusView {
        let state = self.state.read();
        JobStatusView {
            job_id: state.job_id.clone(),
            capture_id: state.capture_id.clone(),
            status: state.status,
            progress: state.progress,
            message: (!state.message.is_empty()).then(|| state.message.clone()),
            error: state.error.clone(),
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Apply a validated transition. Illegal ones are logged and ignored.
    fn transition(&self, next: JobStatus, message: String, error: Option<String>) -> bool {
        let mut state = self.state.write();
        if !state.status.can_transition_to(next) {
            warn!(
                job_id = %state.job_id,
                from = %state.status,
                to = %next,
                "Ignoring illegal job transition"
            );
            return false;
        }
        state.status = next;
        state.message = message;
        if error.is_some() {
            state.error = error;
        }
        if next == JobStatus::Completed {
            state.progress = 100;
        }
        true
    }

    /// Worker pickup. Fails if the job was cancelled while queued.
    pub fn start(&self) -> bool {
        self.transition(JobStatus::Running, "Processing".to_string(), None)
    }

    pub fn complete(&self, total_packets: u64) -> bool {
        self.transition(
            JobStatus::Completed,
            format!("Completed: {total_packets} packets"),
            None,
        )
    }

    pub fn fail(&self, error: impl Into<String>) -> bool {
        let error = error.into();
        self.transition(JobStatus::Failed, error.clone(), Some(error))
    }

    /// Flip the cancel token and move to `cancelled`. Returns `false` for a
    /// job that already finished.
    pub fn cancel(&self) -> bool {
        if self.state.read().status.is_terminal() {
            return false;
        }
        self.cancel.cancel();
        self.transition(JobStatus::Cancelled, "Cancelled by user".to_string(), None)
    }

    /// Raise progress while running. Never decreases, never exceeds
    /// [`MAX_RUNNING_PROGRESS`].
    pub fn set_progress(&self, percent: u8) {
        let mut state = self.state.write();
        if state.status != JobStatus::Running {
            return;
        }
        let percent = percent.min(MAX_RUNNING_PROGRESS);
        if percent > state.progress {
            state.progress = percent;
        }
    }
}

/// Percentage of `consumed` over `total`.
pub fn progress_percent(consumed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    ((consumed.min(total) as u128 * 100) / total as u128) as u8
}

/// Process-wide map of jobs.
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Arc<JobHandle>>>,
    tasks: Mutex<HashMap<JobId, JoinHandle<()>>>,
    store: Arc<dyn ColumnStore>,
    config: IngestConfig,
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry")
            .field("jobs", &self.jobs.read().len())
            .finish_non_exhaustive()
    }
}

impl JobRegistry {
    pub fn new(store: Arc<dyn ColumnStore>, config: IngestConfig) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            tasks: Mutex::new(HashMap::new()),
            store,
            config,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Queue an ingest of `file_path` and spawn its worker on the current
    /// tokio runtime.
    pub fn start(
        &self,
        capture_id: impl Into<String>,
        file_path: impl Into<PathBuf>,
        original_name: impl Into<String>,
    ) -> JobId {
        let job_id = Uuid::new_v4().to_string();
        let capture_id = capture_id.into();
        let handle = Arc::new(JobHandle::new(job_id.clone(), capture_id.clone()));
        self.jobs.write().insert(job_id.clone(), handle.clone());

        let request = IngestRequest {
            capture_id,
            file_path: file_path.into(),
            original_name: original_name.into(),
        };
        info!(%job_id, capture_id = %request.capture_id, path = %request.file_path.display(), "Job queued");

        let task = tokio::spawn(run_ingest(
            request,
            handle,
            self.store.clone(),
            self.config.clone(),
        ));
        self.tasks.lock().insert(job_id.clone(), task);
        job_id
    }

    pub fn get_status(&self, job_id: &str) -> Option<JobStatusView> {
        self.jobs.read().get(job_id).map(|h| h.view())
    }

    pub fn handle(&self, job_id: &str) -> Option<Arc<JobHandle>> {
        self.jobs.read().get(job_id).cloned()
    }

    /// Request cancellation. `false` if the job is unknown or finished.
    pub fn request_cancel(&self, job_id: &str) -> bool {
        match self.handle(job_id) {
            Some(handle) => {
                let cancelled = handle.cancel();
                if cancelled {
                    info!(%job_id, "Cancellation requested");
                }
                cancelled
            }
            None => false,
        }
    }

    pub fn list(&self) -> Vec<JobStatusView> {
        let mut views: Vec<_> = self.jobs.read().values().map(|h| h.view()).collect();
        views.sort_by(|a, b| a.job_id.cmp(&b.job_id));
        views
    }

    /// Wait for a job's worker to exit and return its final status.
    pub async fn wait(&self, job_id: &str) -> Option<JobStatusView> {
        let task = self.tasks.lock().remove(job_id);
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(%job_id, error = %e, "Job worker panicked");
                if let Some(handle) = self.handle(job_id) {
                    handle.fail(format!("worker panicked: {e}"));
                }
            }
        }
        self.get_status(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_lifecycle() {
        let handle = JobHandle::new("j", "c");
        assert_eq!(handle.status(), JobStatus::Queued);
        assert!(handle.start());
        handle.set_progress(40);
        assert!(handle.complete(12));

        let view = handle.view();
        assert_eq!(view.status, JobStatus::Completed);
        assert_eq!(view.progress, 100);
        assert_eq!(view.message.as_deref(), Some("Completed: 12 packets"));
    }

    #[test]
    fn test_terminal_states_are_final() {
        let handle = JobHandle::new("j", "c");
        handle.start();
        handle.fail("disk full");
        assert!(!handle.complete(1));
        assert!(!handle.cancel());
        let state = handle.snapshot();
        assert_eq!(state.status, JobStatus::Failed);
        assert_eq!(state.error.as_deref(), Some("disk full"));
    }

    #[test]
    fn test_cancel_before_pickup() {
        let handle = JobHandle::new("j", "c");
        assert!(handle.cancel());
        assert!(handle.cancel_token().is_cancelled());
        assert!(!handle.start());
        assert_eq!(handle.status(), JobStatus::Cancelled);
        assert_eq!(handle.view().message.as_deref(), Some("Cancelled by user"));
    }

    #[test]
    fn test_progress_monotonic_and_clamped() {
        let handle = JobHandle::new("j", "c");
        handle.set_progress(10);
        assert_eq!(handle.snapshot().progress, 0, "not running yet");

        handle.start();
        handle.set_progress(50);
        handle.set_progress(20);
        assert_eq!(handle.snapshot().progress, 50);
        handle.set_progress(100);
        assert_eq!(handle.snapshot().progress, MAX_RUNNING_PROGRESS);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(50, 200), 25);
        assert_eq!(progress_percent(300, 200), 100);
    }

    #[test]
    fn test_status_view_json() {
        let handle = JobHandle::new("j", "c");
        let json = serde_json::to_value(handle.view()).unwrap();
        assert_eq!(json["status"], "queued");
        assert_eq!(json["message"], "Queued");
        assert!(json.get("error").is_none());
    }
}
