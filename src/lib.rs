//! # tools24-jobs
//!
//! Typed client for the Tools24Now file-processing backend.
//!
//! ## Why this crate?
//!
//! Every processing tool on the backend (image converter, compressor,
//! resizer, OCR, merge, split, ...) speaks the same asynchronous job
//! protocol with a slightly different payload. This crate implements that
//! protocol once, generically, and binds each tool to its own request and
//! response types so a wrong parameter struct is a compile error rather than
//! a 422 from the server.
//!
//! ## Job lifecycle
//!
//! ```text
//! file(s)
//!  │
//!  ├─ 1. Upload     multipart POST, client-side MIME/size checks → job id
//!  ├─ 2. Configure  JSON parameters bound to the job (or a sync transform)
//!  ├─ 3. Poll       status until completed / failed / expired
//!  └─ 4. Download   deterministic artifact URL, optional streamed save
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tools24_jobs::tools::image::{ImageResizer, ResizeParams, ResizePreset};
//! use tools24_jobs::tools::NoUploadOptions;
//! use tools24_jobs::{run, JobClient, UploadSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Base URL from TOOLS24_API_URL / NEXT_PUBLIC_API_URL
//!     let client = JobClient::from_env()?;
//!     let photo = UploadSource::from_path("photo.jpg").await?;
//!     let params = ResizeParams::preset(ResizePreset::Medium);
//!
//!     let done = run::<ImageResizer>(&client, vec![photo], &NoUploadOptions, &params, None).await?;
//!     println!("{} finished after {} polls: {}", done.job_id(), done.polls, done.download_url);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `tools24` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! tools24-jobs = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod job;
pub mod poll;
pub mod progress;
pub mod stream;
pub mod tools;
pub mod upload;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{JobClient, ToolClient};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{JobError, PollAttemptError};
pub use job::{CreatedJob, ImageInfo, Job, JobId, JobProgress, JobStatus};
pub use poll::{poll_until, CancelToken, PollOutcome, PollPolicy};
pub use progress::{JobProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{watch_job, JobStream};
pub use tools::{Tool, ToolKind, ToolSpec};
pub use upload::UploadSource;
pub use workflow::{
    await_job, run, run_blocking, run_logo_watermark, run_to_file, Awaited, JobRun,
};

pub use recent_tools;
