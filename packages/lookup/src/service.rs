use std::time::Duration;

use tracing::{debug, info, warn};

use crate::client::{CompletionClient, PerplexityClient};
use crate::config::LookupConfig;
use crate::error::{LookupError, Result};
use crate::extract;
use crate::prompt;
use crate::sanitize::SanitizedInput;
use crate::store::FoodReporter;
use crate::types::{LookupResult, Mode};

/// Main lookup orchestrator.
///
/// Sanitises the input, builds the prompt, sends it through the client's
/// retry loop and extracts a validated result. Holds no per-call state, so
/// one service can serve concurrent callers.
pub struct LookupService<C: CompletionClient> {
    client: C,
    call_timeout: Duration,
}

impl LookupService<PerplexityClient> {
    /// Service backed by the Perplexity API.
    pub fn from_config(config: &LookupConfig) -> Result<Self> {
        let client = PerplexityClient::new(config)?;
        Ok(Self::new(client, config.call_timeout))
    }
}

impl<C: CompletionClient> LookupService<C> {
    pub fn new(client: C, call_timeout: Duration) -> Self {
        Self {
            client,
            call_timeout,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Look up the carbs in `raw`.
    ///
    /// Invalid input fails before any request is made. The overall call,
    /// retries included, is bounded by the configured call timeout.
    pub async fn lookup(&self, raw: &str, mode: Mode) -> Result<LookupResult> {
        let input = SanitizedInput::new(raw)?;
        let request = prompt::build_request(&input, mode);

        info!(%mode, input_chars = input.as_str().chars().count(), "looking up carbs");
        debug!(%mode, input = %input, "sanitised input");

        let reply = tokio::time::timeout(self.call_timeout, self.client.complete(&request))
            .await
            .map_err(|_| {
                warn!(%mode, timeout_secs = self.call_timeout.as_secs(), "lookup timed out");
                LookupError::Timeout(self.call_timeout)
            })??;

        let result = extract::extract(&reply, mode).inspect_err(|e| {
            warn!(%mode, error = %e, "could not extract result from reply");
        })?;

        info!(
            %mode,
            item_count = result.items().len(),
            citation_count = result.citations().len(),
            "lookup succeeded"
        );
        Ok(result)
    }

    /// Look up `raw` and report every accepted item, in order.
    ///
    /// Nothing is reported unless the whole lookup succeeded.
    ///
    /// `reporter` is called synchronously on the current task. A blocking
    /// reporter such as [`JsonFileStore`](crate::store::JsonFileStore)
    /// holds the worker thread for the duration of each write. Callers on a
    /// shared runtime should use [`lookup`](Self::lookup) and record the
    /// items from `tokio::task::spawn_blocking` instead.
    pub async fn lookup_and_report(
        &self,
        raw: &str,
        mode: Mode,
        reporter: &dyn FoodReporter,
    ) -> Result<LookupResult> {
        let result = self.lookup(raw, mode).await?;
        for item in result.items() {
            reporter.report(item, result.citations())?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::MockCompletionClient;
    use crate::client::RawReply;
    use crate::error::ErrorKind;
    use crate::store::StoreError;
    use crate::types::FoodItem;
    use std::sync::Mutex;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[derive(Default)]
    struct RecordingReporter {
        reported: Mutex<Vec<(String, f64)>>,
    }

    impl FoodReporter for RecordingReporter {
        fn report(&self, item: &FoodItem, _citations: &[String]) -> std::result::Result<(), StoreError> {
            self.reported
                .lock()
                .map_err(|_| StoreError::Poisoned)?
                .push((item.name.clone(), item.carbs));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_invalid_input_makes_no_calls() {
        let service = LookupService::new(MockCompletionClient::with_content("[]"), TIMEOUT);

        for raw in ["", " ", "a", &"x".repeat(101)] {
            let err = service.lookup(raw, Mode::Multi).await.expect_err("rejected");
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
        assert_eq!(service.client().calls(), 0);
    }

    #[tokio::test]
    async fn test_lookup_sends_sanitised_prompt() {
        let service = LookupService::new(
            MockCompletionClient::with_content(r#"[{"name":"Big Mac","carbs":45}]"#),
            TIMEOUT,
        );

        let result = service.lookup("  Big\tMac\n", Mode::Multi).await.expect("lookup");
        assert_eq!(result.items()[0].name, "Big Mac");

        let requests = service.client().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages.user, "Big Mac");
        assert_eq!(requests[0].max_tokens, prompt::MULTI_MAX_TOKENS);
    }

    #[tokio::test]
    async fn test_single_mode_returns_single_result() {
        let service = LookupService::new(
            MockCompletionClient::with_content(r#"{"name":"Apple","carbs":25,"details":"USDA"}"#),
            TIMEOUT,
        );
        let result = service.lookup("apple", Mode::Single).await.expect("lookup");
        assert_eq!(result.mode(), Mode::Single);
        assert_eq!(result.items()[0].carbs, 25.0);
    }

    #[tokio::test]
    async fn test_client_errors_pass_through_typed() {
        let client = MockCompletionClient::new(vec![Err(LookupError::RateLimited {
            retry_after_secs: None,
        })]);
        let service = LookupService::new(client, TIMEOUT);
        let err = service.lookup("apple", Mode::Multi).await.expect_err("rate limited");
        assert_eq!(err.kind(), ErrorKind::RateLimit);
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_parse_error() {
        let service = LookupService::new(
            MockCompletionClient::with_content("I could not find that food."),
            TIMEOUT,
        );
        let err = service.lookup("zzzz", Mode::Multi).await.expect_err("parse");
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    struct StalledClient;

    #[async_trait::async_trait]
    impl CompletionClient for StalledClient {
        async fn complete(
            &self,
            _request: &crate::client::CompletionRequest,
        ) -> Result<RawReply> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok(RawReply::from_content("[]", &[]))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_timeout_bounds_latency() {
        let service = LookupService::new(StalledClient, Duration::from_secs(60));
        let err = service.lookup("apple", Mode::Multi).await.expect_err("timed out");
        assert!(matches!(err, LookupError::Timeout(_)));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_report_once_per_item_in_order() {
        let service = LookupService::new(
            MockCompletionClient::with_content(
                r#"[{"name":"Big Mac","carbs":45},{"name":"Medium Fries","carbs":44}]"#,
            ),
            TIMEOUT,
        );
        let reporter = RecordingReporter::default();

        service
            .lookup_and_report("a Big Mac and a medium fries", Mode::Multi, &reporter)
            .await
            .expect("lookup");

        let reported = reporter.reported.lock().expect("lock").clone();
        assert_eq!(
            reported,
            vec![("Big Mac".to_string(), 45.0), ("Medium Fries".to_string(), 44.0)]
        );
    }

    #[tokio::test]
    async fn test_failed_lookup_reports_nothing() {
        let service = LookupService::new(
            MockCompletionClient::new(vec![Ok(RawReply::new("garbage"))]),
            TIMEOUT,
        );
        let reporter = RecordingReporter::default();
        assert!(service
            .lookup_and_report("apple", Mode::Multi, &reporter)
            .await
            .is_err());
        assert!(reporter.reported.lock().expect("lock").is_empty());
    }
}
