//! Generic status polling.
//!
//! [`poll_until`] is the single poll loop behind every tool: it calls a
//! status-fetch closure on a fixed interval until a terminal predicate holds,
//! the attempt budget runs out, too many consecutive fetches fail, or the
//! caller cancels.
//!
//! ## Termination
//!
//! The loop returns as soon as a fetched value satisfies `is_terminal`; no
//! further fetch is issued for that job. Cancellation is observed both while
//! sleeping and while a fetch is in flight (the in-flight request is dropped).

use crate::error::{JobError, PollAttemptError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Timing and failure budget for one poll loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Delay between status fetches in milliseconds. Default: 1000.
    pub interval_ms: u64,

    /// Give up after this many fetches without a terminal status.
    /// Default: `None` (poll until the job ends or expires).
    pub max_attempts: Option<u32>,

    /// Consecutive failed fetches tolerated before the loop fails. Default: 1.
    ///
    /// `1` means the first failed status request ends polling. Raise it to
    /// ride out transient network errors; any successful fetch resets the
    /// count.
    pub max_consecutive_errors: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_attempts: None,
            max_consecutive_errors: 1,
        }
    }
}

impl PollPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn with_interval_ms(mut self, ms: u64) -> Self {
        self.interval_ms = ms;
        self
    }

    pub fn with_max_attempts(mut self, n: Option<u32>) -> Self {
        self.max_attempts = n.map(|n| n.max(1));
        self
    }

    pub fn with_max_consecutive_errors(mut self, n: u32) -> Self {
        self.max_consecutive_errors = n.max(1);
        self
    }
}

/// Cooperative cancellation signal shared between a poll loop and its owner.
///
/// Cloning yields a handle to the same signal. Once cancelled it stays
/// cancelled.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|c| *c).await;
    }
}

/// A terminal value plus the history of how it was reached.
#[derive(Debug, Clone)]
pub struct PollOutcome<T> {
    pub value: T,
    /// Number of fetches issued, including failed ones.
    pub attempts: u32,
    /// Failed fetches that stayed within the error budget.
    pub errors: Vec<PollAttemptError>,
}

/// Poll `fetch` until `is_terminal` accepts its value.
///
/// `fetch` receives the 1-indexed attempt number. The first fetch happens
/// immediately; later ones wait `policy.interval()` after the previous one
/// finished.
///
/// # Errors
/// * [`JobError::Cancelled`] if `cancel` fires before a terminal value.
/// * [`JobError::PollTimeout`] once `policy.max_attempts` fetches produced
///   no terminal value.
/// * [`JobError::PollFailed`] after `policy.max_consecutive_errors`
///   consecutive failed fetches.
pub async fn poll_until<T, F, Fut, P>(
    job_id: &str,
    policy: &PollPolicy,
    cancel: Option<&CancelToken>,
    mut fetch: F,
    is_terminal: P,
) -> Result<PollOutcome<T>, JobError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, JobError>>,
    P: Fn(&T) -> bool,
{
    let budget = policy.max_consecutive_errors.max(1);
    let mut attempts: u32 = 0;
    let mut consecutive: u32 = 0;
    let mut errors = Vec::new();

    loop {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(cancelled(job_id, attempts));
        }

        attempts += 1;
        let result = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Err(cancelled(job_id, attempts - 1)),
                r = fetch(attempts) => r,
            },
            None => fetch(attempts).await,
        };

        match result {
            Ok(value) => {
                consecutive = 0;
                if is_terminal(&value) {
                    debug!("Job {} reached a terminal state after {} polls", job_id, attempts);
                    return Ok(PollOutcome {
                        value,
                        attempts,
                        errors,
                    });
                }
            }
            Err(e) => {
                consecutive += 1;
                let attempt_error = PollAttemptError {
                    job_id: job_id.to_string(),
                    attempt: attempts,
                    detail: e.to_string(),
                };
                warn!("{}", attempt_error);
                errors.push(attempt_error);
                if consecutive >= budget {
                    return Err(JobError::PollFailed {
                        job_id: job_id.to_string(),
                        failures: consecutive,
                        last_error: e.to_string(),
                    });
                }
            }
        }

        if policy.max_attempts.is_some_and(|max| attempts >= max) {
            return Err(JobError::PollTimeout {
                job_id: job_id.to_string(),
                attempts,
            });
        }

        match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Err(cancelled(job_id, attempts)),
                _ = tokio::time::sleep(policy.interval()) => {}
            },
            None => tokio::time::sleep(policy.interval()).await,
        }
    }
}

fn cancelled(job_id: &str, attempts: u32) -> JobError {
    debug!("Polling for job {} cancelled after {} fetches", job_id, attempts);
    JobError::Cancelled {
        job_id: job_id.to_string(),
    }
}
