//! Progress-callback trait for job lifecycle events.
//!
//! Inject an [`Arc<dyn JobProgressCallback>`] via
//! [`crate::config::ClientConfigBuilder::progress_callback`] to observe each
//! job as it moves through upload, submission, polling and completion.
//!
//! # Why callbacks instead of a channel?
//!
//! Callers can forward events to a terminal spinner, a tracing span or a
//! broadcast channel without the library knowing how the host application
//! communicates. The trait is `Send + Sync` because one client may drive
//! many jobs from different tasks at once.
//!
//! # Example
//!
//! ```rust
//! use tools24_jobs::{ClientConfig, JobProgressCallback, JobStatus};
//! use std::sync::{Arc, atomic::{AtomicU32, Ordering}};
//!
//! struct PollCounter(AtomicU32);
//!
//! impl JobProgressCallback for PollCounter {
//!     fn on_poll(&self, _job_id: &str, _attempt: u32, _status: &JobStatus, _percent: Option<f32>) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ClientConfig::builder()
//!     .base_url("http://localhost:9000/api/v1")
//!     .progress_callback(Arc::new(PollCounter(AtomicU32::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::job::JobStatus;
use crate::tools::Tool;
use std::sync::Arc;

/// Called by the client as a job progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Job ids are passed as `&str` so implementations
/// need not depend on [`crate::job::JobId`].
pub trait JobProgressCallback: Send + Sync {
    /// Called before the multipart upload is sent.
    ///
    /// # Arguments
    /// * `tool`: target tool
    /// * `files`: number of files in the upload
    /// * `bytes`: total payload size
    fn on_upload_start(&self, tool: Tool, files: usize, bytes: u64) {
        let _ = (tool, files, bytes);
    }

    /// Called once the server has assigned a job id.
    fn on_job_created(&self, tool: Tool, job_id: &str) {
        let _ = (tool, job_id);
    }

    /// Called after the configure/transform call was accepted.
    fn on_submitted(&self, tool: Tool, job_id: &str) {
        let _ = (tool, job_id);
    }

    /// Called after every successful status fetch.
    ///
    /// # Arguments
    /// * `attempt`: 1-indexed poll attempt
    /// * `percent`: server-reported progress, if any
    fn on_poll(&self, job_id: &str, attempt: u32, status: &JobStatus, percent: Option<f32>) {
        let _ = (job_id, attempt, status, percent);
    }

    /// Called when a status fetch fails. Whether polling continues depends on
    /// the configured error budget.
    fn on_poll_error(&self, job_id: &str, attempt: u32, error: &str) {
        let _ = (job_id, attempt, error);
    }

    /// Called once the job completed and its download URL is known.
    fn on_job_complete(&self, tool: Tool, job_id: &str, download_url: &str) {
        let _ = (tool, job_id, download_url);
    }

    /// Called when the workflow ends without a result: rejected upload,
    /// failed job, expiry, timeout or cancellation.
    ///
    /// `job_id` is empty when the upload failed before the server assigned one.
    fn on_job_failed(&self, tool: Tool, job_id: &str, error: &str) {
        let _ = (tool, job_id, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl JobProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ClientConfig`].
pub type ProgressCallback = Arc<dyn JobProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        polls: AtomicU32,
        errors: AtomicU32,
        last_status: Mutex<Option<JobStatus>>,
        completed: Mutex<Option<String>>,
    }

    impl JobProgressCallback for TrackingCallback {
        fn on_poll(&self, _job_id: &str, _attempt: u32, status: &JobStatus, _percent: Option<f32>) {
            self.polls.fetch_add(1, Ordering::SeqCst);
            *self.last_status.lock().unwrap() = Some(status.clone());
        }

        fn on_poll_error(&self, _job_id: &str, _attempt: u32, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_job_complete(&self, _tool: Tool, _job_id: &str, download_url: &str) {
            *self.completed.lock().unwrap() = Some(download_url.to_string());
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_upload_start(Tool::OcrPdf, 1, 1024);
        cb.on_job_created(Tool::OcrPdf, "j");
        cb.on_submitted(Tool::OcrPdf, "j");
        cb.on_poll("j", 1, &JobStatus::Processing, Some(10.0));
        cb.on_poll_error("j", 2, "timeout");
        cb.on_job_complete(Tool::OcrPdf, "j", "http://x/download/txt");
        cb.on_job_failed(Tool::OcrPdf, "j", "boom");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_poll("j", 1, &JobStatus::Queued, None);
        tracker.on_poll_error("j", 2, "connection reset");
        tracker.on_poll("j", 3, &JobStatus::Completed, Some(100.0));
        tracker.on_job_complete(Tool::ImageResizer, "j", "http://x/dl");

        assert_eq!(tracker.polls.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(
            *tracker.last_status.lock().unwrap(),
            Some(JobStatus::Completed)
        );
        assert_eq!(tracker.completed.lock().unwrap().as_deref(), Some("http://x/dl"));
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_job_created(Tool::MergePdf, "m");
        cb.on_poll("m", 1, &JobStatus::Processing, Some(50.0));
    }
}
