use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::LookupConfig;
use crate::error::{LookupError, Result};
use crate::prompt::PromptMessages;

/// Role of a message in the conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A single message on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Everything the upstream needs besides the model and credential.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: PromptMessages,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Successful (2xx) response body, untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReply {
    pub body: String,
}

impl RawReply {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    /// Wrap model content in a chat-completion envelope.
    pub fn from_content(content: &str, citations: &[&str]) -> Self {
        let body = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }],
            "citations": citations,
        });
        Self::new(body.to_string())
    }
}

/// Trait for completion clients, enabling mocking in tests.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one request, retrying transient failures per the client's policy.
    async fn complete(&self, request: &CompletionRequest) -> Result<RawReply>;
}

/// Bounded linear backoff: the delay before retry `n` is `n × base_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &LookupConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.retry_base_delay,
        }
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Every inter-attempt delay, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts).map(|a| self.delay_after(a)).collect()
    }
}

/// How a response status is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Unauthorized,
    RateLimited,
    /// 5xx: retried until the attempt budget runs out.
    Transient,
    /// Any other non-2xx: never retried.
    Fatal,
}

pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        401 => StatusClass::Unauthorized,
        429 => StatusClass::RateLimited,
        500.. => StatusClass::Transient,
        _ => StatusClass::Fatal,
    }
}

/// Perplexity chat-completion client.
///
/// NOTE: Do NOT derive `Debug` on this struct, the config holds the API key.
pub struct PerplexityClient {
    http: reqwest::Client,
    config: LookupConfig,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// What a single attempt ended in.
enum Attempt {
    Finished(Result<RawReply>),
    ServerError(u16),
}

impl PerplexityClient {
    pub fn new(config: &LookupConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("carpecarb/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(LookupError::Client)?;

        Ok(Self {
            http,
            config: config.clone(),
            retry: RetryPolicy::from_config(config),
        })
    }

    async fn attempt(
        &self,
        url: &str,
        api_key: &str,
        body: &ChatCompletionBody<'_>,
    ) -> std::result::Result<Attempt, reqwest::Error> {
        let resp = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status().as_u16();

        let outcome = match classify_status(status) {
            StatusClass::Success => Attempt::Finished(Ok(RawReply::new(resp.text().await?))),
            StatusClass::Unauthorized => {
                let message = error_message(resp).await;
                Attempt::Finished(Err(LookupError::Auth(message)))
            }
            StatusClass::RateLimited => {
                let retry_after_secs = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok());
                warn!(status, ?retry_after_secs, "upstream rate limited");
                Attempt::Finished(Err(LookupError::RateLimited { retry_after_secs }))
            }
            StatusClass::Transient => {
                let body_text = resp.text().await.unwrap_or_default();
                warn!(status, body = %body_text, "upstream server error");
                Attempt::ServerError(status)
            }
            StatusClass::Fatal => {
                let message = error_message(resp).await;
                Attempt::Finished(Err(LookupError::Status { status, message }))
            }
        };

        Ok(outcome)
    }
}

/// Pull `error.message` out of an error body, falling back to the raw text.
async fn error_message(resp: reqwest::Response) -> String {
    let body_text = resp.text().await.unwrap_or_default();
    serde_json::from_str::<ApiErrorResponse>(&body_text)
        .ok()
        .and_then(|r| r.error)
        .map(|e| e.message)
        .unwrap_or(body_text)
}

#[async_trait]
impl CompletionClient for PerplexityClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<RawReply> {
        let api_key = self.config.require_api_key()?;
        let url = self.config.completions_url();

        // Built once; every attempt sends the identical body.
        let body = ChatCompletionBody {
            model: &self.config.model,
            messages: request.messages.to_chat_messages(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let max_attempts = self.retry.max_attempts;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            debug!(attempt, max_attempts, "sending completion request");

            let reason = match self.attempt(&url, api_key, &body).await {
                Ok(Attempt::Finished(result)) => return result,
                Ok(Attempt::ServerError(status)) => {
                    if attempt >= max_attempts {
                        return Err(LookupError::Server {
                            status,
                            attempts: attempt,
                        });
                    }
                    format!("server error (status {status})")
                }
                Err(e) if e.is_builder() => return Err(LookupError::Client(e)),
                Err(e) => {
                    if attempt >= max_attempts {
                        return Err(LookupError::Network {
                            attempts: attempt,
                            source: e,
                        });
                    }
                    e.to_string()
                }
            };

            let delay = self.retry.delay_after(attempt);
            warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                reason = %reason,
                "transient upstream failure, will retry"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Test utilities for the completion client.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Mock completion client. Returns pre-configured replies in order and
    /// records every request it receives.
    pub struct MockCompletionClient {
        replies: Mutex<Vec<Result<RawReply>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockCompletionClient {
        pub fn new(replies: Vec<Result<RawReply>>) -> Self {
            // Reverse so we can pop from the end
            let mut replies = replies;
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// A client whose single reply carries `content` as the model output.
        pub fn with_content(content: &str) -> Self {
            Self::new(vec![Ok(RawReply::from_content(content, &[]))])
        }

        /// Number of `complete` calls seen so far.
        pub fn calls(&self) -> usize {
            self.requests.lock().map(|r| r.len()).unwrap_or_default()
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().map(|r| r.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl CompletionClient for MockCompletionClient {
        async fn complete(&self, request: &CompletionRequest) -> Result<RawReply> {
            self.requests
                .lock()
                .map_err(|e| LookupError::Parse(format!("mock lock poisoned: {e}")))?
                .push(request.clone());
            let mut replies = self
                .replies
                .lock()
                .map_err(|e| LookupError::Parse(format!("mock lock poisoned: {e}")))?;
            replies
                .pop()
                .unwrap_or_else(|| Err(LookupError::Parse("mock has no replies left".into())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_wire_roles() {
        let messages = [
            ChatMessage {
                role: Role::System,
                content: "sys".into(),
            },
            ChatMessage {
                role: Role::User,
                content: "apple".into(),
            },
        ];
        let json = serde_json::to_value(messages).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!([
                {"role": "system", "content": "sys"},
                {"role": "user", "content": "apple"}
            ])
        );
        assert!(serde_json::from_str::<ChatMessage>(r#"{"role":"assistant","content":"x"}"#).is_err());
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(200), StatusClass::Success);
        assert_eq!(classify_status(401), StatusClass::Unauthorized);
        assert_eq!(classify_status(429), StatusClass::RateLimited);
        assert_eq!(classify_status(500), StatusClass::Transient);
        assert_eq!(classify_status(503), StatusClass::Transient);
        assert_eq!(classify_status(400), StatusClass::Fatal);
        assert_eq!(classify_status(403), StatusClass::Fatal);
        assert_eq!(classify_status(404), StatusClass::Fatal);
    }

    #[test]
    fn test_backoff_is_linear_and_non_decreasing() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        };
        let schedule = policy.schedule();
        assert_eq!(schedule, vec![Duration::from_secs(1), Duration::from_secs(2)]);
        assert!(schedule.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_single_attempt_policy_never_waits() {
        let policy = RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::from_secs(1),
        };
        assert!(policy.schedule().is_empty());
    }

    #[test]
    fn test_create_client() {
        let config = LookupConfig::builder("key").build();
        assert!(PerplexityClient::new(&config).is_ok());
    }

    #[test]
    fn test_raw_reply_from_content() {
        let reply = RawReply::from_content("[]", &["https://fdc.nal.usda.gov"]);
        let value: serde_json::Value = serde_json::from_str(&reply.body).expect("json");
        assert_eq!(value["choices"][0]["message"]["content"], "[]");
        assert_eq!(value["citations"][0], "https://fdc.nal.usda.gov");
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        // Unroutable base URL: reaching the network would surface a different error.
        let config = LookupConfig::builder("")
            .api_base_url("http://127.0.0.1:9")
            .build();
        let client = PerplexityClient::new(&config).expect("client");
        let request = CompletionRequest {
            messages: PromptMessages {
                system: "s".into(),
                user: "apple".into(),
            },
            max_tokens: 10,
            temperature: 0.0,
        };
        let err = client.complete(&request).await.expect_err("should fail");
        assert!(matches!(err, LookupError::Configuration(_)));
    }
}
