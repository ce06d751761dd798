//! HTTP layer: one typed call per protocol step.
//!
//! [`JobClient`] owns the connection pool and configuration. [`ToolClient`]
//! is a zero-cost view of it bound to one [`ToolKind`], exposing the four
//! protocol steps with that tool's types:
//!
//! | Step | Method | HTTP |
//! |------|--------|------|
//! | upload | [`ToolClient::create_job`] | `POST {tool}/jobs` or `{tool}/upload` (multipart) |
//! | configure | [`ToolClient::submit`] | `POST {tool}/jobs/{id}/{action}` (JSON) |
//! | poll | [`ToolClient::status`] | `GET {tool}/jobs/{id}[/status]` |
//! | download | [`ToolClient::download_url`] | none, pure URL construction |
//!
//! Nothing here retries. Composition (poll loop, failure mapping) lives in
//! [`crate::workflow`].

use crate::config::{parse_base_url, ClientConfig};
use crate::error::{detail_from_body, JobError};
use crate::job::{CreatedJob, Job, JobId, RawJob};
use crate::poll::CancelToken;
use crate::progress::{JobProgressCallback, NoopProgressCallback};
use crate::tools::image::{FilterPreview, LogoUpload};
use crate::tools::pdf::{MergeFile, MergeFileList, PdfImagesResults};
use crate::tools::{Tool, ToolKind, ToolParams, ToolSpec, UploadFields};
use crate::upload::{validate_upload, UploadSource};
use base64::Engine;
use futures::StreamExt;
use reqwest::multipart::Form;
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use std::io::Write;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Client for the processing backend. Cheap to clone.
#[derive(Clone, Debug)]
pub struct JobClient {
    http: reqwest::Client,
    base: Url,
    config: Arc<ClientConfig>,
}

impl JobClient {
    pub fn new(config: ClientConfig) -> Result<Self, JobError> {
        let base = parse_base_url(&config.base_url)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| JobError::InvalidConfig(format!("HTTP client: {e}")))?;
        debug!("JobClient ready for {}", base);
        Ok(Self {
            http,
            base,
            config: Arc::new(config),
        })
    }

    /// Client with default settings and the base URL from the environment.
    pub fn from_env() -> Result<Self, JobError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Typed view for one tool.
    pub fn tool<T: ToolKind>(&self) -> ToolClient<'_, T> {
        ToolClient {
            client: self,
            _tool: PhantomData,
        }
    }

    pub(crate) fn progress(&self) -> &dyn JobProgressCallback {
        self.config
            .progress_callback
            .as_deref()
            .unwrap_or(&NoopProgressCallback)
    }

    /// Absolute URL for path segments below the base. Segments are
    /// percent-encoded, so job ids can never escape their path slot.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<R: DeserializeOwned>(&self, url: Url) -> Result<R, JobError> {
        let request_failed = |detail: String| JobError::RequestFailed {
            url: url.to_string(),
            detail,
        };
        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| request_failed(describe_send_error(&e)))?;
        let resp = ok_or_detail(resp).await.map_err(request_failed)?;
        resp.json::<R>()
            .await
            .map_err(|e| request_failed(format!("invalid response body: {e}")))
    }

    // ── Auxiliary endpoints ──────────────────────────────────────────────

    /// Per-page images produced by a finished pdf-to-images job.
    pub async fn pdf_to_images_results(&self, job_id: &JobId) -> Result<PdfImagesResults, JobError> {
        let spec = Tool::PdfToImages.spec();
        self.get_json(self.endpoint(&spec.job_path(job_id.as_str(), &["results"])))
            .await
    }

    /// URL of one generated pdf-to-images asset.
    pub fn asset_url(&self, job_id: &JobId, filename: &str) -> String {
        let spec = Tool::PdfToImages.spec();
        self.endpoint(&spec.job_path(job_id.as_str(), &["assets", filename]))
            .to_string()
    }

    /// URL of the organize-pdf page thumbnail (`thumb_0001.png`, ...).
    pub fn organize_thumbnail_url(&self, job_id: &JobId, page: u32) -> String {
        let spec = Tool::OrganizePdf.spec();
        let filename = format!("thumb_{page:04}.png");
        self.endpoint(&spec.job_path(job_id.as_str(), &["thumbnails", &filename]))
            .to_string()
    }

    /// URL of a split-pdf page thumbnail.
    pub fn split_thumbnail_url(&self, job_id: &JobId, page: u32) -> String {
        let spec = Tool::SplitPdf.spec();
        let page = page.to_string();
        self.endpoint(&spec.job_path(job_id.as_str(), &["pages", &page, "thumbnail"]))
            .to_string()
    }

    /// Files in a merge job, in upload order.
    pub async fn merge_files(&self, job_id: &JobId) -> Result<Vec<MergeFile>, JobError> {
        let spec = Tool::MergePdf.spec();
        let list: MergeFileList = self
            .get_json(self.endpoint(&spec.job_path(job_id.as_str(), &["files"])))
            .await?;
        Ok(list.files)
    }

    /// Rendered preview of the current filter settings.
    pub async fn filter_preview(&self, job_id: &JobId) -> Result<FilterPreview, JobError> {
        let spec = Tool::ImageFilters.spec();
        let url = self.endpoint(&spec.job_path(job_id.as_str(), &["preview"]));
        let body: serde_json::Value = self.get_json(url).await?;
        let data_url = body
            .get("preview")
            .and_then(|v| v.as_str())
            .ok_or_else(|| JobError::Decode {
                tool: Tool::ImageFilters,
                detail: "preview response has no 'preview' field".into(),
            })?;
        let (mime, bytes) = decode_data_url(data_url).map_err(|detail| JobError::Decode {
            tool: Tool::ImageFilters,
            detail,
        })?;
        Ok(FilterPreview {
            mime,
            bytes,
            format: body
                .get("format")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        })
    }

    /// Attach a logo to a watermark job; returns the id to put in
    /// [`WatermarkParams::logo`](crate::tools::image::WatermarkParams::logo).
    pub async fn upload_watermark_logo(
        &self,
        job_id: &JobId,
        logo: UploadSource,
    ) -> Result<String, JobError> {
        let tool = Tool::ImageWatermark;
        let spec = tool.spec();
        validate_upload(spec, std::slice::from_ref(&logo), self.config.enforce_size_limits)?;
        let url = self.endpoint(&spec.job_path(job_id.as_str(), &["upload-logo"]));
        let form = Form::new().part("file", logo.into_part()?);
        let upload_failed = |detail| JobError::UploadFailed { tool, detail };

        let resp = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| upload_failed(describe_send_error(&e)))?;
        let resp = ok_or_detail(resp).await.map_err(upload_failed)?;
        let body: LogoUpload = resp.json().await.map_err(|e| JobError::Decode {
            tool,
            detail: e.to_string(),
        })?;
        debug!("Uploaded watermark logo {} for job {}", body.logo_id, job_id);
        Ok(body.logo_id)
    }

    /// Stream `url` into `path`, replacing it atomically. Returns bytes written.
    pub async fn download_to_file(&self, url: &str, path: &Path) -> Result<u64, JobError> {
        let download_failed = |reason: String| JobError::DownloadFailed {
            url: url.to_string(),
            reason,
        };
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| download_failed(describe_send_error(&e)))?;
        let resp = ok_or_detail(resp).await.map_err(download_failed)?;

        let write_failed = |source| JobError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(write_failed)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_failed)?;

        let mut written: u64 = 0;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| download_failed(e.to_string()))?;
            tmp.write_all(&chunk).map_err(write_failed)?;
            written += chunk.len() as u64;
        }
        tmp.flush().map_err(write_failed)?;
        tmp.persist(path).map_err(|e| write_failed(e.error))?;

        info!("Downloaded {} bytes to {}", written, path.display());
        Ok(written)
    }
}

/// Typed access to one tool's endpoints. Obtain via [`JobClient::tool`].
pub struct ToolClient<'a, T: ToolKind> {
    client: &'a JobClient,
    _tool: PhantomData<T>,
}

impl<T: ToolKind> Clone for ToolClient<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ToolKind> Copy for ToolClient<'_, T> {}

impl<'a, T: ToolKind> ToolClient<'a, T> {
    pub fn tool(&self) -> Tool {
        T::TOOL
    }

    pub fn spec(&self) -> &'static ToolSpec {
        T::TOOL.spec()
    }

    pub fn client(&self) -> &'a JobClient {
        self.client
    }

    /// Upload the source file(s) and create a job.
    ///
    /// Files are validated locally first; a rejected file never reaches the
    /// network and no job id is produced.
    pub async fn create_job(
        &self,
        sources: Vec<UploadSource>,
        options: &T::UploadOptions,
    ) -> Result<CreatedJob, JobError> {
        let tool = T::TOOL;
        let spec = self.spec();
        validate_upload(spec, &sources, self.client.config.enforce_size_limits)?;

        let total: u64 = sources.iter().map(UploadSource::len).sum();
        self.client.progress().on_upload_start(tool, sources.len(), total);

        let mut form = Form::new();
        for (name, value) in options.form_fields() {
            form = form.text(name, value);
        }
        for source in sources {
            form = form.part(spec.upload_field, source.into_part()?);
        }

        let url = self.client.endpoint(&spec.create_path());
        debug!("POST {}", url);
        let upload_failed = |detail| JobError::UploadFailed { tool, detail };
        let resp = self
            .client
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| upload_failed(describe_send_error(&e)))?;
        let resp = ok_or_detail(resp).await.map_err(upload_failed)?;

        let created = decode_raw(tool, resp)
            .await?
            .into_created()
            .map_err(|e| JobError::Decode {
                tool,
                detail: e.to_string(),
            })?;

        info!(
            "Created {} job {} ({} bytes uploaded)",
            tool, created.job_id, total
        );
        self.client
            .progress()
            .on_job_created(tool, created.job_id.as_str());
        Ok(created)
    }

    /// Send the tool parameters and trigger processing.
    ///
    /// Returns `Some(job)` for synchronous tools (rotate, watermark) whose
    /// response already holds the finished result, `None` for polled tools.
    /// The request uses [`ClientConfig::process_timeout_secs`]; a polled tool
    /// that exceeds it also returns `None` so the caller falls back to
    /// polling.
    /// Tools without an action step (pdf-to-images) return `None` without a
    /// request.
    pub async fn submit(
        &self,
        job_id: &JobId,
        params: &T::Params,
    ) -> Result<Option<Job<T::Output>>, JobError> {
        let tool = T::TOOL;
        let spec = self.spec();
        params
            .validate()
            .map_err(|reason| JobError::InvalidParams { tool, reason })?;

        let Some(path) = spec.action_path(job_id.as_str()) else {
            debug!("{} has no configure step; job {} starts on upload", tool, job_id);
            return Ok(None);
        };
        let url = self.client.endpoint(&path);
        debug!("POST {}", url);

        let mut request = self
            .client
            .http
            .post(url)
            .timeout(Duration::from_secs(self.client.config.process_timeout_secs));
        if <T::Params as ToolParams>::HAS_BODY {
            request = request.json(params);
        }
        let processing_failed = |detail| JobError::ProcessingFailed {
            tool,
            job_id: job_id.to_string(),
            detail,
        };
        let resp = match request.send().await {
            Ok(resp) => resp,
            // The server may still be working on it; its status will tell.
            Err(e) if e.is_timeout() && !spec.is_synchronous() => {
                warn!(
                    "{} job {}: no answer to {} within {}s, polling for the outcome",
                    tool,
                    job_id,
                    spec.action.unwrap_or("submit"),
                    self.client.config.process_timeout_secs
                );
                self.client.progress().on_submitted(tool, job_id.as_str());
                return Ok(None);
            }
            Err(e) => return Err(processing_failed(describe_send_error(&e))),
        };
        let resp = ok_or_detail(resp).await.map_err(processing_failed)?;
        self.client.progress().on_submitted(tool, job_id.as_str());

        if !spec.is_synchronous() {
            info!("Submitted {} job {}", tool, job_id);
            return Ok(None);
        }
        let job = decode_raw(tool, resp)
            .await?
            .into_job(Some(job_id.as_str()))
            .map_err(|e| JobError::Decode {
                tool,
                detail: e.to_string(),
            })?;
        info!("{} job {} finished synchronously: {}", tool, job_id, job.status);
        Ok(Some(job))
    }

    /// Fetch the current job record.
    pub async fn status(&self, job_id: &JobId) -> Result<Job<T::Output>, JobError> {
        let tool = T::TOOL;
        let status_failed = |detail| JobError::StatusFailed {
            tool,
            job_id: job_id.to_string(),
            detail,
        };
        let path = self
            .spec()
            .status_path(job_id.as_str())
            .ok_or_else(|| status_failed(format!("{tool} has no status endpoint")))?;
        let url = self.client.endpoint(&path);

        let resp = self
            .client
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| status_failed(describe_send_error(&e)))?;
        let resp = ok_or_detail(resp).await.map_err(status_failed)?;
        let job = decode_raw(tool, resp)
            .await?
            .into_job(Some(job_id.as_str()))
            .map_err(|e| JobError::Decode {
                tool,
                detail: e.to_string(),
            })?;
        debug!("{} job {}: {}", tool, job_id, job.status);
        Ok(job)
    }

    /// Deterministic artifact URL. No network access.
    ///
    /// `variant` picks e.g. the OCR `txt` or `json` output.
    pub fn download_url(&self, job_id: &JobId, variant: Option<&str>) -> Result<String, JobError> {
        let tool = T::TOOL;
        let path = self
            .spec()
            .download_path(job_id.as_str(), variant)
            .map_err(|reason| JobError::InvalidParams { tool, reason })?;
        Ok(self.client.endpoint(&path).to_string())
    }

    /// Download the finished artifact to `path`.
    pub async fn download_to_file(
        &self,
        job_id: &JobId,
        variant: Option<&str>,
        path: &Path,
    ) -> Result<u64, JobError> {
        let url = self.download_url(job_id, variant)?;
        self.client.download_to_file(&url, path).await
    }

    /// Stop tracking a job.
    ///
    /// The backend has no cancel endpoint: this fires `token` so any poll
    /// loop watching the job returns [`JobError::Cancelled`], and leaves the
    /// server-side job to expire at its `expires_at`.
    pub fn cancel_job(&self, job_id: &JobId, token: Option<&CancelToken>) {
        if let Some(token) = token {
            token.cancel();
        }
        warn!(
            "Abandoned {} job {}; the server will discard it when it expires",
            T::TOOL,
            job_id
        );
    }
}

// ── Response helpers ─────────────────────────────────────────────────────

/// Pass 2xx responses through; turn anything else into its error detail.
async fn ok_or_detail(resp: Response) -> Result<Response, String> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(detail_from_body(status.as_u16(), &body))
}

async fn decode_raw(tool: Tool, resp: Response) -> Result<RawJob, JobError> {
    let text = resp.text().await.map_err(|e| JobError::Decode {
        tool,
        detail: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| JobError::Decode {
        tool,
        detail: format!("{e} in {}", truncate(&text, 200)),
    })
}

fn describe_send_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("could not connect: {e}")
    } else {
        e.to_string()
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// Split `data:<mime>;base64,<payload>` into its MIME type and bytes.
pub(crate) fn decode_data_url(data_url: &str) -> Result<(String, Vec<u8>), String> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| "preview is not a data URL".to_string())?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| "data URL has no payload".to_string())?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| "data URL is not base64-encoded".to_string())?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("invalid base64 payload: {e}"))?;
    let mime = if mime.is_empty() { "application/octet-stream" } else { mime };
    Ok((mime.to_string(), bytes))
}
