//! Client configuration.
//!
//! Everything a [`crate::client::JobClient`] needs beyond the HTTP connection
//! pool lives in [`ClientConfig`], built through [`ClientConfigBuilder`].
//! The config is immutable once built and cheap to clone, so one instance can
//! back any number of concurrent jobs.
//!
//! # Base URL resolution
//! 1. [`ClientConfigBuilder::base_url`] if set
//! 2. `TOOLS24_API_URL`
//! 3. `NEXT_PUBLIC_API_URL` (the variable the web frontend reads)
//! 4. `http://localhost:9000/api/v1`

use crate::error::JobError;
use crate::poll::PollPolicy;
use crate::progress::ProgressCallback;
use reqwest::Url;
use std::fmt;

/// Primary environment variable for the API base URL.
pub const ENV_API_URL: &str = "TOOLS24_API_URL";
/// Fallback shared with the web frontend.
pub const ENV_PUBLIC_API_URL: &str = "NEXT_PUBLIC_API_URL";
/// Used when neither variable is set.
pub const DEFAULT_API_URL: &str = "http://localhost:9000/api/v1";

/// Base URL from the environment, or [`DEFAULT_API_URL`]. Empty values are ignored.
pub fn base_url_from_env() -> String {
    [ENV_API_URL, ENV_PUBLIC_API_URL]
        .iter()
        .filter_map(|k| std::env::var(k).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

/// Configuration for a [`crate::client::JobClient`].
///
/// # Example
/// ```rust
/// use tools24_jobs::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("https://api.example.com/api/v1")
///     .poll_interval_ms(1500)
///     .max_poll_attempts(Some(120))
///     .build()
///     .unwrap();
/// assert_eq!(config.base_url, "https://api.example.com/api/v1/");
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// API root; every tool route is resolved relative to it.
    /// Always ends with `/` after [`ClientConfigBuilder::build`]. Default: see module docs.
    pub base_url: String,

    /// Per-request timeout in seconds, applied to every HTTP call including
    /// uploads and downloads. Default: 60.
    ///
    /// The configure/process call uses
    /// [`process_timeout_secs`](Self::process_timeout_secs) instead.
    pub request_timeout_secs: u64,

    /// Timeout for the configure/process call. Default: 600.
    ///
    /// Several PDF tools (OCR, deskew, merge, compress, organize) do their
    /// work inside this request and only answer once it is done. If it still
    /// times out on a polled tool, the job is tracked by polling instead.
    pub process_timeout_secs: u64,

    /// TCP connect timeout in seconds. Default: 10.
    pub connect_timeout_secs: u64,

    /// Status polling behaviour. Default: [`PollPolicy::default()`].
    pub poll: PollPolicy,

    /// Reject uploads over the tool's size limit before sending. Default: true.
    ///
    /// The limits (10 MB images, 50 MB PDFs) mirror the web frontend; turn
    /// this off when talking to a backend deployed with larger limits.
    pub enforce_size_limits: bool,

    /// `User-Agent` header. Default: `tools24-jobs/<version>`.
    pub user_agent: String,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: format!("{DEFAULT_API_URL}/"),
            request_timeout_secs: 60,
            process_timeout_secs: 600,
            connect_timeout_secs: 10,
            poll: PollPolicy::default(),
            enforce_size_limits: true,
            user_agent: concat!("tools24-jobs/", env!("CARGO_PKG_VERSION")).to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("process_timeout_secs", &self.process_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("poll", &self.poll)
            .field("enforce_size_limits", &self.enforce_size_limits)
            .field("user_agent", &self.user_agent)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn JobProgressCallback>"),
            )
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder. The base URL starts unset and is resolved from
    /// the environment at [`build`](ClientConfigBuilder::build) time.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
            base_url: None,
        }
    }

    /// Defaults with the base URL taken from the environment.
    pub fn from_env() -> Result<Self, JobError> {
        Self::builder().build()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
    base_url: Option<String>,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn process_timeout_secs(mut self, secs: u64) -> Self {
        self.config.process_timeout_secs = secs;
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    pub fn poll_policy(mut self, policy: PollPolicy) -> Self {
        self.config.poll = policy;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll.interval_ms = ms;
        self
    }

    /// `None` polls until the job ends. `Some(0)` is treated as 1.
    pub fn max_poll_attempts(mut self, n: Option<u32>) -> Self {
        self.config.poll.max_attempts = n.map(|n| n.max(1));
        self
    }

    pub fn max_consecutive_poll_errors(mut self, n: u32) -> Self {
        self.config.poll.max_consecutive_errors = n.max(1);
        self
    }

    pub fn enforce_size_limits(mut self, v: bool) -> Self {
        self.config.enforce_size_limits = v;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<ClientConfig, JobError> {
        let raw = self.base_url.take().unwrap_or_else(base_url_from_env);
        self.config.base_url = parse_base_url(&raw)?.to_string();

        let c = &self.config;
        if c.request_timeout_secs == 0 {
            return Err(JobError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        if c.process_timeout_secs == 0 {
            return Err(JobError::InvalidConfig(
                "Process timeout must be ≥ 1 second".into(),
            ));
        }
        if c.poll.interval_ms == 0 {
            return Err(JobError::InvalidConfig(
                "Poll interval must be ≥ 1 ms".into(),
            ));
        }
        if c.poll.max_consecutive_errors == 0 {
            return Err(JobError::InvalidConfig(
                "Poll error budget must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Parse and normalise an API root so that relative joins keep its path.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, JobError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash)
        .map_err(|e| JobError::InvalidConfig(format!("Invalid API base URL '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(JobError::InvalidConfig(format!(
            "API base URL must use http or https, got '{}'",
            url.scheme()
        )));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(JobError::InvalidConfig(format!(
            "API base URL '{raw}' has no host"
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_local_backend() {
        let c = ClientConfig::default();
        assert_eq!(c.base_url, "http://localhost:9000/api/v1/");
        assert_eq!(c.request_timeout_secs, 60);
        assert!(c.process_timeout_secs > c.request_timeout_secs);
        assert_eq!(c.poll.interval_ms, 1000);
        assert!(c.poll.max_attempts.is_none());
        assert_eq!(c.poll.max_consecutive_errors, 1);
        assert!(c.enforce_size_limits);
        assert!(c.user_agent.starts_with("tools24-jobs/"));
    }

    #[test]
    fn explicit_base_url_is_normalised() {
        let c = ClientConfig::builder()
            .base_url("https://tools.example.com/api/v1")
            .build()
            .unwrap();
        assert_eq!(c.base_url, "https://tools.example.com/api/v1/");

        let c = ClientConfig::builder()
            .base_url("  http://127.0.0.1:8080/  ")
            .build()
            .unwrap();
        assert_eq!(c.base_url, "http://127.0.0.1:8080/");
    }

    #[test]
    fn rejects_bad_base_urls() {
        for bad in ["not a url", "ftp://example.com/api", "mailto:someone@example.com"] {
            let err = ClientConfig::builder().base_url(bad).build().unwrap_err();
            assert!(matches!(err, JobError::InvalidConfig(_)), "{bad}: {err:?}");
        }
    }

    #[test]
    fn rejects_zero_timeouts() {
        let err = ClientConfig::builder()
            .base_url(DEFAULT_API_URL)
            .request_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("timeout"));

        let err = ClientConfig::builder()
            .base_url(DEFAULT_API_URL)
            .process_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Process timeout"));

        let err = ClientConfig::builder()
            .base_url(DEFAULT_API_URL)
            .poll_interval_ms(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("interval"));
    }

    #[test]
    fn poll_setters_clamp() {
        let c = ClientConfig::builder()
            .base_url(DEFAULT_API_URL)
            .max_poll_attempts(Some(0))
            .max_consecutive_poll_errors(0)
            .build()
            .unwrap();
        assert_eq!(c.poll.max_attempts, Some(1));
        assert_eq!(c.poll.max_consecutive_errors, 1);
    }

    #[test]
    fn debug_hides_callback() {
        let c = ClientConfig::builder()
            .base_url(DEFAULT_API_URL)
            .progress_callback(std::sync::Arc::new(crate::progress::NoopProgressCallback))
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("<dyn JobProgressCallback>"));
    }
}
