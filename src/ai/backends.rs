use crate::error::AnalysisError;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default public endpoint of the Gemini REST API
pub const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Trait for text-completion backends that turn a prompt into an analysis
pub trait AnalysisBackend: Send + Sync {
    /// Model identifier reported alongside the analysis
    fn model(&self) -> &str;

    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, AnalysisError>> + Send + 'a>>;
}

/// Gemini backend using the `generateContent` REST call
///
/// The API key is read from the environment once at construction and never
/// logged.
pub struct GeminiBackend {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

/// Request format for `generateContent`
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Response format from `generateContent`
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default = "unknown_error")]
    message: String,
}

fn unknown_error() -> String {
    "Unknown error".to_string()
}

impl GeminiBackend {
    /// Create a backend with an explicit key
    pub fn new(endpoint: String, model: String, api_key: String, timeout: Duration) -> Result<Self, AnalysisError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            model,
            api_key,
        })
    }

    /// Create a backend whose key comes from the environment variable `api_key_env`
    pub fn from_env(
        endpoint: Option<String>,
        model: String,
        api_key_env: &str,
        timeout: Duration,
    ) -> Result<Self, AnalysisError> {
        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AnalysisError::MissingCredentials(format!("{} is not set", api_key_env)))?;
        Self::new(
            endpoint.unwrap_or_else(|| GEMINI_ENDPOINT.to_string()),
            model,
            api_key,
            timeout,
        )
    }

    /// `generateContent` URL without the key
    fn api_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    /// Extract the analysis text from a response body
    fn parse_response(body: &str) -> Result<String, AnalysisError> {
        let response: GenerateResponse = serde_json::from_str(body)
            .map_err(|e| AnalysisError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = response.error {
            return Err(AnalysisError::BackendError(error.message));
        }

        response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| AnalysisError::InvalidResponse("No analysis returned".to_string()))
    }
}

impl AnalysisBackend for GeminiBackend {
    fn model(&self) -> &str {
        &self.model
    }

    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, AnalysisError>> + Send + 'a>> {
        Box::pin(async move {
            let request = GenerateRequest {
                contents: vec![Content {
                    parts: vec![Part { text: prompt }],
                }],
            };

            debug!("Requesting analysis from {} ({} prompt chars)", self.model, prompt.len());
            let url = format!("{}?key={}", self.api_url(), self.api_key);
            let response = self
                .client
                .post(url.as_str())
                .json(&request)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        AnalysisError::Timeout
                    } else {
                        AnalysisError::HttpError(e.without_url())
                    }
                })?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| AnalysisError::HttpError(e.without_url()))?;

            // Error bodies carry a structured message; prefer it over the status
            match Self::parse_response(&body) {
                Err(AnalysisError::InvalidResponse(_)) if !status.is_success() => Err(
                    AnalysisError::BackendError(format!("API returned error {}", status)),
                ),
                other => other,
            }
        })
    }
}

/// Mock backend for testing
///
/// Returns canned responses in rotation. `Err` entries become
/// `AnalysisError::BackendError`.
pub struct MockBackend {
    model: String,
    responses: Vec<Result<String, String>>,
    current_index: Arc<Mutex<usize>>,
    delay: Option<Duration>,
    call_count: Arc<Mutex<usize>>,
    last_prompt: Arc<Mutex<Option<String>>>,
}

impl MockBackend {
    /// Create a new mock backend with multiple responses
    ///
    /// After the last response, the backend cycles back to the first one.
    pub fn with_responses(responses: Vec<Result<String, String>>) -> Self {
        Self {
            model: "mock".to_string(),
            responses,
            current_index: Arc::new(Mutex::new(0)),
            delay: None,
            call_count: Arc::new(Mutex::new(0)),
            last_prompt: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a mock backend that always answers with a fixed analysis
    pub fn success() -> Self {
        Self::with_responses(vec![Ok("Mock analysis: no action required".to_string())])
    }

    /// Create a mock backend that always fails
    pub fn error(error_message: &str) -> Self {
        Self::with_responses(vec![Err(error_message.to_string())])
    }

    /// Report a different model name
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Add a delay to all responses
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get the number of times complete() has been called
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Get the prompt from the most recent call
    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

impl AnalysisBackend for MockBackend {
    fn model(&self) -> &str {
        &self.model
    }

    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, AnalysisError>> + Send + 'a>> {
        Box::pin(async move {
            *self.call_count.lock().unwrap() += 1;
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if self.responses.is_empty() {
                return Err(AnalysisError::InvalidResponse("No canned responses".to_string()));
            }

            let response_index = {
                let mut index = self.current_index.lock().unwrap();
                let current = *index % self.responses.len();
                *index += 1;
                current
            };

            self.responses[response_index]
                .clone()
                .map_err(AnalysisError::BackendError)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_first_candidate_text() {
        let body = r#"{"candidates": [
            {"content": {"parts": [{"text": "Root cause: OOM"}, {"text": "ignored"}]}},
            {"content": {"parts": [{"text": "second candidate"}]}}
        ]}"#;
        assert_eq!(GeminiBackend::parse_response(body).unwrap(), "Root cause: OOM");
    }

    #[test]
    fn test_parse_api_error() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid"}}"#;
        match GeminiBackend::parse_response(body) {
            Err(AnalysisError::BackendError(message)) => assert_eq!(message, "API key not valid"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_without_candidates() {
        assert!(matches!(
            GeminiBackend::parse_response("{}"),
            Err(AnalysisError::InvalidResponse(_))
        ));
        assert!(matches!(
            GeminiBackend::parse_response("not json"),
            Err(AnalysisError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: "hello" }],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
    }

    #[test]
    fn test_api_url() {
        let backend = GeminiBackend::new(
            "https://example.test/v1beta/".to_string(),
            "gemini-2.5-flash".to_string(),
            "secret".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            backend.api_url(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert!(!backend.api_url().contains("secret"));
    }

    #[test]
    fn test_from_env_requires_key() {
        let result = GeminiBackend::from_env(
            None,
            "gemini-2.5-flash".to_string(),
            "LENS_TEST_KEY_THAT_IS_NEVER_SET",
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(AnalysisError::MissingCredentials(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_error() {
        let backend = GeminiBackend::new(
            "http://127.0.0.1:9".to_string(),
            "gemini-2.5-flash".to_string(),
            "secret".to_string(),
            Duration::from_secs(2),
        )
        .unwrap();
        assert!(backend.complete("prompt").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_rotates_and_records() {
        let backend = MockBackend::with_responses(vec![Ok("first".to_string()), Err("boom".to_string())]);

        assert_eq!(backend.complete("p1").await.unwrap(), "first");
        assert!(matches!(
            backend.complete("p2").await,
            Err(AnalysisError::BackendError(ref m)) if m == "boom"
        ));
        assert_eq!(backend.complete("p3").await.unwrap(), "first");
        assert_eq!(backend.call_count(), 3);
        assert_eq!(backend.last_prompt().as_deref(), Some("p3"));
    }

    #[tokio::test]
    async fn test_mock_delay() {
        let backend = MockBackend::success().with_delay(Duration::from_millis(50));
        let started = std::time::Instant::now();
        backend.complete("p").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
