//! Streaming job status.
//!
//! [`watch_job`] yields every status snapshot of one job as it is fetched,
//! ending after the first terminal snapshot (inclusive) or the first failed
//! fetch. It is the push-style counterpart of [`crate::poll::poll_until`]
//! for callers that render progress themselves instead of using a
//! [`crate::progress::JobProgressCallback`].
//!
//! # Example
//! ```rust,no_run
//! use tools24_jobs::{watch_job, JobClient, JobId};
//! use tools24_jobs::tools::pdf::OcrPdf;
//! use futures::StreamExt;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = JobClient::from_env()?;
//! let mut snapshots = watch_job::<OcrPdf>(client, JobId::new("5f0c"), Duration::from_secs(1));
//! while let Some(snapshot) = snapshots.next().await {
//!     let job = snapshot?;
//!     println!("{}: {:.0}%", job.status, job.progress.percent);
//! }
//! # Ok(())
//! # }
//! ```

use crate::client::JobClient;
use crate::error::JobError;
use crate::job::{Job, JobId};
use crate::tools::ToolKind;
use chrono::Utc;
use futures::stream;
use std::pin::Pin;
use std::time::Duration;
use tokio_stream::Stream;

/// A stream of status snapshots for one job.
pub type JobStream<R> = Pin<Box<dyn Stream<Item = Result<Job<R>, JobError>> + Send>>;

/// Poll `job_id` every `interval` and yield each snapshot.
///
/// The first fetch is immediate. A snapshot whose `expires_at` has passed
/// counts as terminal even if the server still reports it as active.
pub fn watch_job<T>(client: JobClient, job_id: JobId, interval: Duration) -> JobStream<T::Output>
where
    T: ToolKind,
    T::Output: 'static,
{
    let s = stream::unfold(Some(0u32), move |state| {
        let client = client.clone();
        let job_id = job_id.clone();
        async move {
            let fetched = state?;
            if fetched > 0 {
                tokio::time::sleep(interval).await;
            }
            match client.tool::<T>().status(&job_id).await {
                Ok(job) => {
                    let next = if job.effective_status(Utc::now()).is_terminal() {
                        None
                    } else {
                        Some(fetched + 1)
                    };
                    Some((Ok(job), next))
                }
                Err(e) => Some((Err(e), None)),
            }
        }
    });
    Box::pin(s)
}
