//! External translation provider: one batched call per dispatch cycle.
//!
//! The contract every implementation must honor: the response has the same
//! length and order as the request batch. The dispatcher refuses to zip a
//! response that breaks cardinality rather than risk mis-pairing entries.

use crate::config::Config;
use crate::error::{CacheError, CacheResult};
use crate::language::LanguageTag;
use crate::retry::{with_retry_if, RetryConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A batched machine-translation backend.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Translate a batch of source strings into `target`.
    ///
    /// Guarantees required of implementations:
    /// - output order matches input order
    /// - output length equals input length
    async fn translate_batch(
        &self,
        texts: &[String],
        target: &LanguageTag,
    ) -> CacheResult<Vec<String>>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a [String],
    source: &'a str,
    target: &'a str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslationList,
}

#[derive(Debug, Deserialize)]
struct TranslationList {
    translations: Vec<TranslatedItem>,
}

#[derive(Debug, Deserialize)]
struct TranslatedItem {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// HTTP provider against a Translate-v2-shaped endpoint.
///
/// Sends the whole batch as one request. Transient failures (429, 5xx,
/// network) retry with backoff; other client errors fail the cycle
/// immediately - the affected strings simply re-enter the pending set on the
/// next rendering pass.
pub struct HttpTranslationProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    source_language: LanguageTag,
    max_batch: usize,
    retry: RetryConfig,
}

impl HttpTranslationProvider {
    pub fn new(
        api_url: String,
        api_key: String,
        source_language: LanguageTag,
        timeout: Duration,
        max_batch: usize,
    ) -> CacheResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url,
            api_key,
            source_language,
            max_batch,
            retry: RetryConfig::api_call(),
        })
    }

    /// Build from configuration. Returns `None` when the provider is not
    /// configured - a legitimate operating mode, not an error: the cache
    /// then runs degraded and lookups fall back to the source string.
    pub fn from_config(config: &Config) -> CacheResult<Option<Self>> {
        let (Some(api_url), Some(api_key)) =
            (config.translate_api_url.clone(), config.translate_api_key.clone())
        else {
            return Ok(None);
        };

        let source_language = LanguageTag::new(config.source_language.clone())?;
        Ok(Some(Self::new(
            api_url,
            api_key,
            source_language,
            Duration::from_secs(config.translate_timeout_secs),
            config.translate_max_batch,
        )?))
    }

    #[cfg(test)]
    fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn request_batch(
        &self,
        request: &TranslateRequest<'_>,
    ) -> CacheResult<Vec<String>> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(CacheError::Provider(format!(
                "translation API error ({}): {}",
                status, body
            )));
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .map_err(|e| CacheError::Provider(format!("malformed translation response: {}", e)))?;

        Ok(parsed
            .data
            .translations
            .into_iter()
            .map(|item| item.translated_text)
            .collect())
    }
}

#[async_trait]
impl TranslationProvider for HttpTranslationProvider {
    async fn translate_batch(
        &self,
        texts: &[String],
        target: &LanguageTag,
    ) -> CacheResult<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.len() > self.max_batch {
            return Err(CacheError::BatchTooLarge {
                len: texts.len(),
                max: self.max_batch,
            });
        }

        let request = TranslateRequest {
            q: texts,
            source: self.source_language.as_str(),
            target: target.as_str(),
            format: "text",
        };

        let translated = with_retry_if(
            &self.retry,
            &format!("Batch translation to {}", target),
            || async { self.request_batch(&request).await },
            is_retryable_error,
        )
        .await?;

        if translated.len() != texts.len() {
            return Err(CacheError::BatchMismatch {
                want: texts.len(),
                got: translated.len(),
            });
        }
        Ok(translated)
    }

    fn name(&self) -> &str {
        "http-translate"
    }
}

/// Retry 429 (rate limit), 5xx and network errors; other client errors and
/// contract violations fail immediately.
fn is_retryable_error(error: &CacheError) -> bool {
    match error {
        CacheError::Provider(message) => {
            // Error format: "translation API error (400 Bad Request): ..."
            if message.contains("translation API error") {
                if let Some(start) = message.find('(') {
                    if let Some(end) = message[start..].find(')') {
                        let status_str = &message[start + 1..start + end];
                        let status_num = status_str.split_whitespace().next().unwrap_or("");
                        if let Ok(status) = status_num.parse::<u16>() {
                            return status == 429 || status >= 500;
                        }
                    }
                }
            }
            // Network errors, timeouts, malformed bodies: might be transient.
            true
        }
        _ => false,
    }
}

/// Deterministic provider modes for exercising the dispatch pipeline
/// without network access.
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Append the target tag: "Hello" → "Hello_es"
    Suffix,
    /// Predefined source → translation mappings; unmapped strings get the
    /// suffix treatment.
    Mappings(HashMap<String, String>),
    /// Fail every call with the given message.
    Error(String),
    /// Break the batch contract: drop the last item from the response.
    ShortResponse,
    /// Return empty strings for every input.
    EmptyStrings,
}

/// Test double recording every batch it receives.
#[derive(Debug)]
pub struct MockProvider {
    mode: MockMode,
    delay: Duration,
    calls: AtomicUsize,
    batches: Mutex<Vec<Vec<String>>>,
}

impl MockProvider {
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Simulate provider latency; lets tests overlap a settle with an
    /// in-flight flush.
    pub fn with_delay(mode: MockMode, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(mode)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every batch received, in call order.
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranslationProvider for MockProvider {
    async fn translate_batch(
        &self,
        texts: &[String],
        target: &LanguageTag,
    ) -> CacheResult<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().unwrap().push(texts.to_vec());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.mode {
            MockMode::Suffix => Ok(texts
                .iter()
                .map(|text| format!("{}_{}", text, target))
                .collect()),
            MockMode::Mappings(map) => Ok(texts
                .iter()
                .map(|text| {
                    map.get(text)
                        .cloned()
                        .unwrap_or_else(|| format!("{}_{}", text, target))
                })
                .collect()),
            MockMode::Error(message) => Err(CacheError::Provider(message.clone())),
            MockMode::ShortResponse => Ok(texts
                .iter()
                .take(texts.len().saturating_sub(1))
                .map(|text| format!("{}_{}", text, target))
                .collect()),
            MockMode::EmptyStrings => Ok(vec![String::new(); texts.len()]),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn lang(tag: &str) -> LanguageTag {
        LanguageTag::new(tag).expect("valid tag")
    }

    fn batch(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig::new(3, Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(5))
    }

    fn test_provider(api_url: &str) -> HttpTranslationProvider {
        HttpTranslationProvider::new(
            format!("{}/v2/translate", api_url),
            "test-key".to_string(),
            lang("en"),
            Duration::from_secs(5),
            128,
        )
        .expect("should build")
        .with_retry_config(fast_retry())
    }

    fn translate_response(texts: &[&str]) -> serde_json::Value {
        serde_json::json!({
            "data": {
                "translations": texts
                    .iter()
                    .map(|t| serde_json::json!({ "translatedText": t }))
                    .collect::<Vec<_>>()
            }
        })
    }

    // ==================== HTTP Provider Tests ====================

    #[tokio::test]
    async fn test_translates_batch_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(translate_response(&["Hola", "Adiós"])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let result = provider
            .translate_batch(&batch(&["Hello", "Goodbye"]), &lang("es"))
            .await
            .expect("should translate");

        assert_eq!(result, vec!["Hola", "Adiós"]);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_network() {
        // An unreachable URL proves no request is made.
        let provider = HttpTranslationProvider::new(
            "http://invalid-url-should-not-be-called.test".to_string(),
            "test-key".to_string(),
            lang("en"),
            Duration::from_secs(1),
            128,
        )
        .expect("should build");

        let result = provider
            .translate_batch(&[], &lang("es"))
            .await
            .expect("should succeed");
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected() {
        let provider = HttpTranslationProvider::new(
            "http://invalid-url-should-not-be-called.test".to_string(),
            "test-key".to_string(),
            lang("en"),
            Duration::from_secs(1),
            2,
        )
        .expect("should build");

        let result = provider
            .translate_batch(&batch(&["a", "b", "c"]), &lang("es"))
            .await;
        assert!(matches!(
            result,
            Err(CacheError::BatchTooLarge { len: 3, max: 2 })
        ));
    }

    #[tokio::test]
    async fn test_cardinality_mismatch_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(translate_response(&["Hola"])),
            )
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let result = provider
            .translate_batch(&batch(&["Hello", "Goodbye"]), &lang("es"))
            .await;

        assert!(matches!(
            result,
            Err(CacheError::BatchMismatch { want: 2, got: 1 })
        ));
    }

    #[tokio::test]
    async fn test_retries_on_500_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(translate_response(&["Hola"])),
            )
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let result = provider
            .translate_batch(&batch(&["Hello"]), &lang("es"))
            .await
            .expect("should succeed after retries");
        assert_eq!(result, vec!["Hola"]);
    }

    #[tokio::test]
    async fn test_no_retry_on_400() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Bad Request"))
            .expect(1)
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let result = provider
            .translate_batch(&batch(&["Hello"]), &lang("es"))
            .await;

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("400"));
    }

    #[tokio::test]
    async fn test_retries_on_429() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Rate limited"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(translate_response(&["Hola"])),
            )
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let result = provider
            .translate_batch(&batch(&["Hello"]), &lang("es"))
            .await;
        assert!(result.is_ok(), "429 should be retried: {:?}", result);
    }

    #[tokio::test]
    async fn test_malformed_body_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let result = provider
            .translate_batch(&batch(&["Hello"]), &lang("es"))
            .await;

        assert!(matches!(result, Err(CacheError::Provider(_))));
    }

    // ==================== is_retryable_error Tests ====================

    #[test]
    fn test_retryable_statuses() {
        let retryable = |status: &str| {
            is_retryable_error(&CacheError::Provider(format!(
                "translation API error ({}): body",
                status
            )))
        };
        assert!(retryable("500 Internal Server Error"));
        assert!(retryable("503 Service Unavailable"));
        assert!(retryable("429 Too Many Requests"));
        assert!(!retryable("400 Bad Request"));
        assert!(!retryable("401 Unauthorized"));
        assert!(!retryable("403 Forbidden"));
    }

    #[test]
    fn test_network_errors_are_retryable() {
        let error = CacheError::Provider("connection refused".to_string());
        assert!(is_retryable_error(&error));
    }

    #[test]
    fn test_contract_violations_are_not_retryable() {
        assert!(!is_retryable_error(&CacheError::BatchMismatch {
            want: 2,
            got: 1
        }));
        assert!(!is_retryable_error(&CacheError::BatchTooLarge {
            len: 200,
            max: 128
        }));
    }

    // ==================== Mock Provider Tests ====================

    #[tokio::test]
    async fn test_mock_suffix_mode() {
        let mock = MockProvider::new(MockMode::Suffix);
        let result = mock
            .translate_batch(&batch(&["Hello"]), &lang("es"))
            .await
            .expect("should translate");
        assert_eq!(result, vec!["Hello_es"]);
        assert_eq!(mock.calls(), 1);
        assert_eq!(mock.batches(), vec![vec!["Hello"]]);
    }

    #[tokio::test]
    async fn test_mock_mappings_mode() {
        let mut map = HashMap::new();
        map.insert("Hello".to_string(), "Hola".to_string());
        let mock = MockProvider::new(MockMode::Mappings(map));

        let result = mock
            .translate_batch(&batch(&["Hello", "Other"]), &lang("es"))
            .await
            .expect("should translate");
        assert_eq!(result, vec!["Hola", "Other_es"]);
    }

    #[tokio::test]
    async fn test_mock_short_response_breaks_cardinality() {
        let mock = MockProvider::new(MockMode::ShortResponse);
        let result = mock
            .translate_batch(&batch(&["a", "b"]), &lang("es"))
            .await
            .expect("mock returns a response");
        assert_eq!(result.len(), 1);
    }
}
