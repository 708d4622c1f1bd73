use std::fmt;
use std::time::Duration;

use crate::error::{LookupError, Result};

/// Default completion endpoint base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.perplexity.ai";

/// Default model for lookups.
pub const DEFAULT_MODEL: &str = "sonar-pro";

/// Per-attempt HTTP timeout for interactive callers.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Overall per-call budget, retries included.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 60;

/// Maximum attempts per call, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Backoff unit; the delay before retry `n` is `n × base`.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;

/// Configuration for the lookup pipeline.
#[derive(Clone)]
pub struct LookupConfig {
    pub api_key: String,
    pub api_base_url: String,
    pub model: String,
    pub request_timeout: Duration,
    pub call_timeout: Duration,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
}

// Hand-written so the API key never ends up in logs.
impl fmt::Debug for LookupConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .field("call_timeout", &self.call_timeout)
            .field("max_attempts", &self.max_attempts)
            .field("retry_base_delay", &self.retry_base_delay)
            .finish()
    }
}

impl LookupConfig {
    /// Load configuration from environment variables.
    ///
    /// A missing `PERPLEXITY_API_KEY` is not an error here; it surfaces as
    /// [`LookupError::Configuration`] when a lookup is attempted.
    pub fn from_env() -> Self {
        let api_key = std::env::var("PERPLEXITY_API_KEY").unwrap_or_default();

        let api_base_url = std::env::var("PERPLEXITY_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.into());

        let model = std::env::var("CARPECARB_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());

        let request_timeout_secs = env_parse("CARPECARB_REQUEST_TIMEOUT_SECS")
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let call_timeout_secs =
            env_parse("CARPECARB_CALL_TIMEOUT_SECS").unwrap_or(DEFAULT_CALL_TIMEOUT_SECS);

        let max_attempts = env_parse("CARPECARB_MAX_ATTEMPTS")
            .filter(|&n: &u32| n > 0)
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);

        let retry_base_delay_ms =
            env_parse("CARPECARB_RETRY_BASE_DELAY_MS").unwrap_or(DEFAULT_RETRY_BASE_DELAY_MS);

        Self {
            api_key,
            api_base_url,
            model,
            request_timeout: Duration::from_secs(request_timeout_secs),
            call_timeout: Duration::from_secs(call_timeout_secs),
            max_attempts,
            retry_base_delay: Duration::from_millis(retry_base_delay_ms),
        }
    }

    /// Create a config builder for testing.
    pub fn builder(api_key: impl Into<String>) -> LookupConfigBuilder {
        LookupConfigBuilder {
            api_key: api_key.into(),
            api_base_url: DEFAULT_API_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
        }
    }

    /// The bearer token, or a configuration error if none is set.
    pub fn require_api_key(&self) -> Result<&str> {
        let key = self.api_key.trim();
        if key.is_empty() {
            return Err(LookupError::Configuration(
                "PERPLEXITY_API_KEY not set".into(),
            ));
        }
        Ok(key)
    }

    /// Full URL of the chat-completion endpoint.
    pub fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.api_base_url.trim_end_matches('/')
        )
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Builder for constructing `LookupConfig` in tests.
pub struct LookupConfigBuilder {
    api_key: String,
    api_base_url: String,
    model: String,
    request_timeout: Duration,
    call_timeout: Duration,
    max_attempts: u32,
    retry_base_delay: Duration,
}

impl LookupConfigBuilder {
    pub fn api_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.api_base_url = api_base_url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn retry_base_delay(mut self, retry_base_delay: Duration) -> Self {
        self.retry_base_delay = retry_base_delay;
        self
    }

    pub fn build(self) -> LookupConfig {
        LookupConfig {
            api_key: self.api_key,
            api_base_url: self.api_base_url,
            model: self.model,
            request_timeout: self.request_timeout,
            call_timeout: self.call_timeout,
            max_attempts: self.max_attempts,
            retry_base_delay: self.retry_base_delay,
        }
    }
}
