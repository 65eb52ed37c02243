use std::{fmt, sync::Arc, time::Duration};

use bon::Builder;
use reqwest::Url;
use tracing::debug;

use crate::{error::ClientError, http::Transport, paths::DEFAULT_BASE_URL};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_millis(1000);

/// Attempt budget and linear backoff for transport failures. The wait after
/// the n-th failed attempt is `n * backoff_unit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, max_attempts: u32) -> LinearBackoff {
        LinearBackoff {
            unit: self.backoff_unit,
            attempt: 1,
            max_attempts: max_attempts.max(1),
        }
    }
}

/// Yields `unit, 2*unit, 3*unit, ...`, one delay per retry, so a budget of
/// `max_attempts` yields `max_attempts - 1` delays.
#[derive(Clone, Debug)]
pub struct LinearBackoff {
    unit: Duration,
    attempt: u32,
    max_attempts: u32,
}

impl Iterator for LinearBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        let delay = self.unit.saturating_mul(self.attempt);
        self.attempt += 1;
        Some(delay)
    }
}

/// Settings read from the environment by [`NewsClient::load_from_env`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: Url,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    pub const BASE_URL_VAR: &'static str = "NEWS_API_URL";
    pub const TIMEOUT_VAR: &'static str = "NEWS_API_TIMEOUT_MS";
    pub const MAX_ATTEMPTS_VAR: &'static str = "NEWS_API_MAX_ATTEMPTS";
    pub const BACKOFF_VAR: &'static str = "NEWS_API_BACKOFF_MS";

    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Missing keys take their defaults; present but unparsable keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(Self::BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| ClientError::config(Self::BASE_URL_VAR, e.to_string()))?;

        let timeout = parse_var(&lookup, Self::TIMEOUT_VAR)?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(ClientError::config(Self::TIMEOUT_VAR, "must be positive"));
        }

        let max_attempts = parse_var(&lookup, Self::MAX_ATTEMPTS_VAR)?
            .map(u32::try_from)
            .transpose()
            .map_err(|e| ClientError::config(Self::MAX_ATTEMPTS_VAR, e.to_string()))?
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if max_attempts == 0 {
            return Err(ClientError::config(Self::MAX_ATTEMPTS_VAR, "must be at least 1"));
        }

        let backoff_unit = parse_var(&lookup, Self::BACKOFF_VAR)?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_BACKOFF_UNIT);

        Ok(Self {
            base_url,
            timeout,
            retry: RetryPolicy {
                max_attempts,
                backoff_unit,
            },
        })
    }
}

fn parse_var<F>(lookup: &F, key: &'static str) -> Result<Option<u64>, ClientError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|e| ClientError::config(key, format!("'{raw}': {e}")))
        })
        .transpose()
}

fn default_transport() -> Arc<dyn Transport> {
    Arc::new(reqwest::Client::new())
}

/// Client for the upstream news API. Cheap to clone; holds no per-call state,
/// so clones and concurrent calls never observe each other.
#[derive(Clone, Builder)]
pub struct NewsClient {
    pub(crate) base_url: Url,
    #[builder(default = DEFAULT_TIMEOUT)]
    pub(crate) timeout: Duration,
    #[builder(default)]
    pub(crate) retry: RetryPolicy,
    #[builder(default = default_transport())]
    pub(crate) transport: Arc<dyn Transport>,
}

impl fmt::Debug for NewsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewsClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl NewsClient {
    /// Client with default timeout and retry policy.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::from_config(ClientConfig {
            base_url: Url::parse(base_url)?,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        })
    }

    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder().build()?;

        Ok(Self::builder()
            .base_url(config.base_url)
            .timeout(config.timeout)
            .retry(config.retry)
            .transport(Arc::new(http_client))
            .build())
    }

    pub fn load_from_env() -> Result<Self, ClientError> {
        let config = ClientConfig::from_env()?;
        debug!(
            base_url = %config.base_url,
            timeout_ms = config.timeout.as_millis() as u64,
            max_attempts = config.retry.max_attempts,
            "Loaded news client configuration"
        );
        Self::from_config(config)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }
}
