//! End-to-end job workflow: upload → configure → poll → download.
//!
//! [`run`] drives one tool through the whole protocol and returns the
//! finished job together with its download URL. [`run_to_file`] additionally
//! saves the artifact, and [`run_blocking`] wraps [`run`] for callers without
//! an async runtime. [`run_logo_watermark`] covers the one tool that needs an
//! extra upload between the two steps.

use crate::client::{JobClient, ToolClient};
use crate::error::{JobError, PollAttemptError};
use crate::job::{CreatedJob, Job, JobId, JobStatus};
use crate::poll::{poll_until, CancelToken};
use crate::tools::image::{ImageWatermark, TransformOutput, WatermarkKind, WatermarkParams};
use crate::tools::{NoUploadOptions, Tool, ToolKind};
use crate::upload::UploadSource;
use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Everything known about a job that finished successfully.
#[derive(Debug, Clone, Serialize)]
pub struct JobRun<R> {
    /// The upload response, including image info / page counts.
    pub created: CreatedJob,
    /// Final job record; `status` is always [`JobStatus::Completed`].
    pub job: Job<R>,
    /// Artifact URL for the tool's default download variant.
    pub download_url: String,
    /// Status fetches issued (0 for synchronous tools).
    pub polls: u32,
    /// Failed status fetches tolerated by the poll error budget.
    pub poll_errors: Vec<PollAttemptError>,
    /// Wall-clock time from upload start to completion.
    pub duration_ms: u64,
}

impl<R> JobRun<R> {
    pub fn job_id(&self) -> &JobId {
        &self.job.job_id
    }

    /// The decoded tool result, if the server returned one.
    pub fn output(&self) -> Option<&R> {
        self.job.result.as_ref()
    }
}

/// A job that finished waiting, with the poll history.
#[derive(Debug, Clone)]
pub struct Awaited<R> {
    pub job: Job<R>,
    pub polls: u32,
    pub poll_errors: Vec<PollAttemptError>,
}

/// Run one tool end to end.
///
/// # Arguments
/// * `client`: shared client
/// * `sources`: file(s) to upload; validated before any request
/// * `options`: multipart upload options (OCR language, PDF quality, ...)
/// * `params`: configure/transform parameters
/// * `cancel`: optional token that aborts the poll loop
///
/// # Errors
/// Client-side validation errors are returned before any request is made.
/// A job reported `failed` yields [`JobError::JobFailed`] with the server's
/// message, or the tool's default message when the server gave none.
pub async fn run<T: ToolKind>(
    client: &JobClient,
    sources: Vec<UploadSource>,
    options: &T::UploadOptions,
    params: &T::Params,
    cancel: Option<&CancelToken>,
) -> Result<JobRun<T::Output>, JobError> {
    let total_start = Instant::now();

    // ── Step 1: Upload ───────────────────────────────────────────────────
    let created = client
        .tool::<T>()
        .create_job(sources, options)
        .await
        .map_err(|e| report_failure(client, T::TOOL, None, e))?;
    complete::<T>(client, created, params, cancel, total_start).await
}

/// Watermark an image with a logo.
///
/// The logo is attached to the job between upload and transform, so it
/// cannot go through [`run`]. Any `logo_job_id` already in `params` is
/// replaced by the id the server assigns to `logo`.
pub async fn run_logo_watermark(
    client: &JobClient,
    image: UploadSource,
    logo: UploadSource,
    params: WatermarkParams,
) -> Result<JobRun<TransformOutput>, JobError> {
    let total_start = Instant::now();

    // ── Step 1: Upload image, then logo ──────────────────────────────────
    let tool = ImageWatermark::TOOL;
    let created = client
        .tool::<ImageWatermark>()
        .create_job(vec![image], &NoUploadOptions)
        .await
        .map_err(|e| report_failure(client, tool, None, e))?;
    let logo_id = client
        .upload_watermark_logo(&created.job_id, logo)
        .await
        .map_err(|e| report_failure(client, tool, Some(&created.job_id), e))?;
    let params = WatermarkParams {
        kind: WatermarkKind::Logo,
        logo_job_id: Some(logo_id),
        ..params
    };
    complete::<ImageWatermark>(client, created, &params, None, total_start).await
}

/// Everything after the upload: configure, wait, resolve the artifact.
async fn complete<T: ToolKind>(
    client: &JobClient,
    created: CreatedJob,
    params: &T::Params,
    cancel: Option<&CancelToken>,
    total_start: Instant,
) -> Result<JobRun<T::Output>, JobError> {
    let tools = client.tool::<T>();
    let job_id = created.job_id.clone();

    let Awaited {
        job,
        polls,
        poll_errors,
    } = drive(tools, &job_id, params, cancel)
        .await
        .map_err(|e| report_failure(client, T::TOOL, Some(&job_id), e))?;

    // ── Step 4: Resolve the artifact ─────────────────────────────────────
    let download_url = tools.download_url(&job_id, None)?;
    client.progress().on_job_complete(T::TOOL, job_id.as_str(), &download_url);

    let duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "{} job {} completed after {} polls in {}ms",
        T::TOOL,
        job_id,
        polls,
        duration_ms
    );

    Ok(JobRun {
        created,
        job,
        download_url,
        polls,
        poll_errors,
        duration_ms,
    })
}

/// Hand `e` to the progress callback's failure hook and return it.
fn report_failure(client: &JobClient, tool: Tool, job_id: Option<&JobId>, e: JobError) -> JobError {
    let id = job_id.map_or("", JobId::as_str);
    client.progress().on_job_failed(tool, id, &e.to_string());
    e
}

/// Steps 2 and 3: configure, then wait unless the tool answered synchronously.
async fn drive<T: ToolKind>(
    tools: ToolClient<'_, T>,
    job_id: &JobId,
    params: &T::Params,
    cancel: Option<&CancelToken>,
) -> Result<Awaited<T::Output>, JobError> {
    // ── Step 2: Configure / transform ────────────────────────────────────
    if let Some(job) = tools.submit(job_id, params).await? {
        debug!("{} returned its result synchronously", T::TOOL);
        return finish::<T>(job).map(|job| Awaited {
            job,
            polls: 0,
            poll_errors: Vec::new(),
        });
    }

    // ── Step 3: Poll ─────────────────────────────────────────────────────
    await_job(tools, job_id, cancel).await
}

/// Poll an existing job until it completes.
///
/// Useful to resume tracking a job created earlier (for example by another
/// process). Uses the client's [`crate::poll::PollPolicy`] and reports every
/// fetch through the configured progress callback.
pub async fn await_job<T: ToolKind>(
    tools: ToolClient<'_, T>,
    job_id: &JobId,
    cancel: Option<&CancelToken>,
) -> Result<Awaited<T::Output>, JobError> {
    let client = tools.client();
    let progress = client.progress();
    let id = job_id.as_str();

    let outcome = poll_until(
        id,
        &client.config().poll,
        cancel,
        move |attempt| async move {
            let fetched = tools.status(job_id).await;
            match &fetched {
                Ok(job) => progress.on_poll(id, attempt, &job.status, Some(job.progress.percent)),
                Err(e) => progress.on_poll_error(id, attempt, &e.to_string()),
            }
            fetched
        },
        |job: &Job<T::Output>| job.effective_status(Utc::now()).is_terminal(),
    )
    .await?;

    let job = finish::<T>(outcome.value)?;
    Ok(Awaited {
        job,
        polls: outcome.attempts,
        poll_errors: outcome.errors,
    })
}

/// Map a terminal snapshot to success or the matching error.
fn finish<T: ToolKind>(job: Job<T::Output>) -> Result<Job<T::Output>, JobError> {
    let tool = T::TOOL;
    match job.effective_status(Utc::now()) {
        JobStatus::Completed => Ok(job),
        JobStatus::Failed => Err(JobError::JobFailed {
            tool,
            job_id: job.job_id.to_string(),
            message: job.error_or(tool.spec().failure_message).to_string(),
        }),
        JobStatus::Expired => Err(JobError::JobExpired {
            tool,
            job_id: job.job_id.to_string(),
        }),
        other => Err(JobError::ProcessingFailed {
            tool,
            job_id: job.job_id.to_string(),
            detail: format!("job ended in unexpected state '{other}'"),
        }),
    }
}

/// Run a tool and save its default artifact to `output_path`.
///
/// The file is written to a temporary sibling and renamed into place, so a
/// failed download never leaves a partial file behind.
pub async fn run_to_file<T: ToolKind>(
    client: &JobClient,
    sources: Vec<UploadSource>,
    options: &T::UploadOptions,
    params: &T::Params,
    output_path: impl AsRef<Path>,
    cancel: Option<&CancelToken>,
) -> Result<(JobRun<T::Output>, u64), JobError> {
    let run = run::<T>(client, sources, options, params, cancel).await?;
    let written = client
        .download_to_file(&run.download_url, output_path.as_ref())
        .await?;
    Ok((run, written))
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_blocking<T: ToolKind>(
    client: &JobClient,
    sources: Vec<UploadSource>,
    options: &T::UploadOptions,
    params: &T::Params,
) -> Result<JobRun<T::Output>, JobError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| JobError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run::<T>(client, sources, options, params, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobProgress;
    use crate::tools::image::ImageRotate;
    use crate::tools::pdf::OcrPdf;
    use chrono::Duration;
    use serde_json::Map;

    fn job<R>(status: JobStatus, error: Option<&str>) -> Job<R> {
        Job {
            job_id: JobId::new("j1"),
            filename: Some("scan.pdf".into()),
            status,
            progress: JobProgress::default(),
            error: error.map(str::to_string),
            created_at: None,
            expires_at: None,
            result: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn completed_job_passes_through() {
        let done = finish::<OcrPdf>(job(JobStatus::Completed, None)).unwrap();
        assert_eq!(done.status, JobStatus::Completed);
    }

    #[test]
    fn failed_job_carries_server_message() {
        let err = finish::<OcrPdf>(job(JobStatus::Failed, Some("Tesseract crashed")))
            .unwrap_err();
        match err {
            JobError::JobFailed { message, .. } => assert_eq!(message, "Tesseract crashed"),
            other => panic!("expected JobFailed, got {other:?}"),
        }
    }

    #[test]
    fn failed_job_without_message_uses_tool_default() {
        let err = finish::<ImageRotate>(job(JobStatus::Failed, Some("  "))).unwrap_err();
        match err {
            JobError::JobFailed { message, .. } => {
                assert_eq!(message, ImageRotate::TOOL.spec().failure_message)
            }
            other => panic!("expected JobFailed, got {other:?}"),
        }
    }

    #[test]
    fn stale_job_is_expired() {
        let mut j = job(JobStatus::Processing, None);
        j.expires_at = Some(Utc::now() - Duration::minutes(5));
        let err = finish::<OcrPdf>(j).unwrap_err();
        assert!(matches!(err, JobError::JobExpired { .. }));
    }

    #[test]
    fn non_terminal_synchronous_answer_is_an_error() {
        let err = finish::<ImageRotate>(job(JobStatus::Queued, None)).unwrap_err();
        assert!(err.to_string().contains("queued"), "{err}");
    }
}
