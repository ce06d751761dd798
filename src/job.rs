//! Job records as reported by the processing service.
//!
//! The backend is not uniform across tools: creation responses come in three
//! shapes, fresh jobs are called `pending`, `uploaded` or `queued`, and
//! completed jobs carry their result either under `result` / `output_info`
//! or flattened into the status object itself. Everything here decodes all
//! of those into one [`Job`] so the poll loop never has to care which tool
//! it is watching.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Opaque, server-assigned job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle state of a job.
///
/// `Completed`, `Failed` and `Expired` are terminal. Unrecognised strings are
/// preserved in `Unknown` and treated as still in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    /// Uploaded, waiting for a transform (`queued`, `pending`, `uploaded`).
    Queued,
    Processing,
    Completed,
    Failed,
    /// Server TTL elapsed; artifacts are gone.
    Expired,
    Unknown(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Expired)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Expired => "expired",
            Self::Unknown(s) => s,
        }
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "queued" | "pending" | "uploaded" => Self::Queued,
            "processing" | "running" => Self::Processing,
            "completed" | "complete" | "done" => Self::Completed,
            "failed" | "error" => Self::Failed,
            "expired" => Self::Expired,
            _ => Self::Unknown(s),
        }
    }
}

impl From<JobStatus> for String {
    fn from(s: JobStatus) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress counters. Units are pages for PDF tools and are absent for
/// single-image tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    #[serde(default)]
    pub percent: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
}

/// Source image metadata reported by the image tools on upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default, alias = "size_bytes")]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub has_transparency: Option<bool>,
}

/// Response to a successful upload.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedJob {
    pub job_id: JobId,
    pub filename: Option<String>,
    pub status: JobStatus,
    pub progress: JobProgress,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Present for image tools.
    pub image_info: Option<ImageInfo>,
    /// Server acknowledgement text, when the tool sends one.
    pub message: Option<String>,
}

impl CreatedJob {
    /// Page count reported at upload time (PDF tools).
    pub fn total_pages(&self) -> Option<u32> {
        self.progress.total_pages
    }
}

/// A status snapshot for one job, with the tool-specific result decoded as `R`.
#[derive(Debug, Clone, Serialize)]
pub struct Job<R = Value> {
    pub job_id: JobId,
    pub filename: Option<String>,
    pub status: JobStatus,
    pub progress: JobProgress,
    /// Server-supplied failure message.
    pub error: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Decoded tool result; only populated once `status == Completed`.
    pub result: Option<R>,
    /// Remaining fields the client does not model.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl<R> Job<R> {
    /// Whether the server TTL has elapsed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Expired || self.expires_at.is_some_and(|t| t <= now)
    }

    /// Status as the client should act on it: a job past `expires_at` is
    /// `Expired` even if the last snapshot said otherwise.
    pub fn effective_status(&self, now: DateTime<Utc>) -> JobStatus {
        if !self.status.is_terminal() && self.is_expired_at(now) {
            JobStatus::Expired
        } else {
            self.status.clone()
        }
    }

    /// The server error, or `fallback` when the job failed without one.
    pub fn error_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.error
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(fallback)
    }
}

// ── Wire decoding ────────────────────────────────────────────────────────

/// Superset of every status/creation body the backend produces.
#[derive(Debug, Deserialize)]
pub(crate) struct RawJob {
    #[serde(default)]
    job_id: Option<String>,
    #[serde(default, alias = "original_filename")]
    filename: Option<String>,
    #[serde(default)]
    status: Option<JobStatus>,
    #[serde(default)]
    progress: Option<JobProgress>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl RawJob {
    fn take_job_id(&mut self, fallback: Option<&str>) -> Result<JobId, serde_json::Error> {
        match self.job_id.take().or_else(|| fallback.map(str::to_string)) {
            Some(id) if !id.is_empty() => Ok(JobId(id)),
            _ => Err(serde::de::Error::missing_field("job_id")),
        }
    }

    /// Fold top-level `total_pages` into progress (split-pdf reports it there).
    fn normalised_progress(&mut self) -> JobProgress {
        let mut progress = self.progress.take().unwrap_or_default();
        if progress.total_pages.is_none() {
            progress.total_pages = self
                .extra
                .get("total_pages")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok());
        }
        progress
    }

    pub(crate) fn into_created(mut self) -> Result<CreatedJob, serde_json::Error> {
        let job_id = self.take_job_id(None)?;
        let progress = self.normalised_progress();
        let image_info = match self.extra.remove("image_info") {
            Some(Value::Null) | None => None,
            Some(v) => Some(serde_json::from_value(v)?),
        };
        Ok(CreatedJob {
            job_id,
            filename: self.filename,
            status: self.status.unwrap_or(JobStatus::Queued),
            progress,
            created_at: self.created_at,
            expires_at: self.expires_at,
            image_info,
            message: self.message,
        })
    }

    /// Decode into a typed job. `known_id` backs up responses that omit
    /// `job_id` (synchronous transforms occasionally do).
    pub(crate) fn into_job<R: DeserializeOwned>(
        mut self,
        known_id: Option<&str>,
    ) -> Result<Job<R>, serde_json::Error> {
        let job_id = self.take_job_id(known_id)?;
        let progress = self.normalised_progress();
        let status = self.status.take().unwrap_or(JobStatus::Queued);

        let result = if status == JobStatus::Completed {
            let source = take_non_null(&mut self.extra, "result")
                .or_else(|| take_non_null(&mut self.extra, "output_info"))
                .unwrap_or_else(|| Value::Object(self.extra.clone()));
            Some(serde_json::from_value(source)?)
        } else {
            None
        };

        Ok(Job {
            job_id,
            filename: self.filename,
            status,
            progress,
            error: self.error,
            created_at: self.created_at,
            expires_at: self.expires_at,
            result,
            extra: self.extra,
        })
    }
}

fn take_non_null(map: &mut Map<String, Value>, key: &str) -> Option<Value> {
    match map.remove(key) {
        Some(Value::Null) | None => None,
        Some(v) => Some(v),
    }
}

/// Accept RFC 3339 as well as the naive ISO-8601 the backend emits for
/// UTC timestamps (`2025-01-02T03:04:05.123456`).
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };
    parse_timestamp(&raw)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
