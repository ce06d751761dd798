//! Error types for the tools24-jobs library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`JobError`]: **Fatal**: the workflow cannot proceed (upload rejected,
//!   server refused the parameters, the job failed or expired, polling gave
//!   up). Returned as `Err(JobError)` from every client and workflow call.
//!
//! * [`PollAttemptError`]: **Non-fatal**: a single status fetch failed while
//!   the poll loop still had error budget left. Reported through
//!   [`crate::progress::JobProgressCallback::on_poll_error`] and kept in the
//!   poll outcome so callers can see how bumpy the ride was.

use crate::tools::Tool;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the tools24-jobs library.
#[derive(Debug, Error)]
pub enum JobError {
    // ── Client-side validation ───────────────────────────────────────────
    /// Source file does not exist or could not be opened.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The tool does not accept this kind of file. Rejected before upload.
    #[error("Unsupported file type '{mime}' for {tool}: {filename}\nExpected {expected}.")]
    UnsupportedFile {
        tool: Tool,
        filename: String,
        mime: String,
        expected: &'static str,
    },

    /// The file exceeds the tool's soft size limit. Rejected before upload.
    #[error("File '{filename}' is {size} bytes; {tool} accepts at most {limit} bytes")]
    FileTooLarge {
        tool: Tool,
        filename: String,
        size: u64,
        limit: u64,
    },

    /// Tool parameters failed client-side validation.
    #[error("Invalid parameters for {tool}: {reason}")]
    InvalidParams { tool: Tool, reason: String },

    // ── Protocol errors ──────────────────────────────────────────────────
    /// Job creation returned a non-2xx response or never reached the server.
    #[error("Upload failed for {tool}: {detail}")]
    UploadFailed { tool: Tool, detail: String },

    /// The configure/transform call was rejected.
    #[error("Processing failed for {tool} job {job_id}: {detail}")]
    ProcessingFailed {
        tool: Tool,
        job_id: String,
        detail: String,
    },

    /// The status endpoint could not be reached or answered non-2xx.
    #[error("Failed to get job status for {tool} job {job_id}: {detail}")]
    StatusFailed {
        tool: Tool,
        job_id: String,
        detail: String,
    },

    /// An auxiliary GET (results, file list, preview) failed.
    #[error("Request to '{url}' failed: {detail}")]
    RequestFailed { url: String, detail: String },

    /// The server returned a body that does not match the expected schema.
    #[error("Unexpected response from {tool}: {detail}")]
    Decode { tool: Tool, detail: String },

    // ── Job outcome errors ───────────────────────────────────────────────
    /// Server reported `failed`; `message` is the server error verbatim.
    #[error("{tool} job {job_id} failed: {message}")]
    JobFailed {
        tool: Tool,
        job_id: String,
        message: String,
    },

    /// The job outlived its server-side TTL and is no longer retrievable.
    #[error("{tool} job {job_id} expired; upload the file again")]
    JobExpired { tool: Tool, job_id: String },

    /// Polling exhausted its attempt budget before a terminal status.
    #[error("Gave up waiting for job {job_id} after {attempts} status checks")]
    PollTimeout { job_id: String, attempts: u32 },

    /// Too many consecutive status fetches failed.
    #[error("Failed to check status of job {job_id} ({failures} consecutive errors): {last_error}")]
    PollFailed {
        job_id: String,
        failures: u32,
        last_error: String,
    },

    /// The caller cancelled the poll loop.
    #[error("Polling for job {job_id} was cancelled")]
    Cancelled { job_id: String },

    // ── Download errors ──────────────────────────────────────────────────
    /// The artifact could not be fetched.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Could not create or write the local output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl JobError {
    /// True for errors raised before anything was sent to the server.
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            JobError::FileNotFound { .. }
                | JobError::UnsupportedFile { .. }
                | JobError::FileTooLarge { .. }
                | JobError::InvalidParams { .. }
                | JobError::InvalidConfig(_)
        )
    }
}

/// A non-fatal failure of one status fetch inside the poll error budget.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[error("Status check {attempt} for job {job_id} failed: {detail}")]
pub struct PollAttemptError {
    pub job_id: String,
    /// 1-indexed poll attempt that failed.
    pub attempt: u32,
    pub detail: String,
}

/// Extract the human-readable message from an error response body.
///
/// FastAPI answers `{"detail": "..."}`; validation errors carry a list of
/// objects with a `msg` field instead. Falls back to `HTTP <status>`.
pub(crate) fn detail_from_body(status: u16, body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(v) => match v.get("detail") {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
            Some(serde_json::Value::Array(items)) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|i| i.get("msg").and_then(|m| m.as_str()))
                    .collect();
                if msgs.is_empty() {
                    format!("HTTP {status}")
                } else {
                    msgs.join("; ")
                }
            }
            _ => format!("HTTP {status}"),
        },
        Err(_) => format!("HTTP {status}"),
    }
}
