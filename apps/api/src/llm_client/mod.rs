/// LLM Client: the single point of entry for calls to the Gemini generation API.
///
/// ARCHITECTURAL RULE: No other module may call the generation service directly.
/// Handlers depend on the `GenerationBackend` trait; `GeminiClient` is the
/// production implementation wired in `main`.
///
/// One request per prompt: no retry, no streaming. Callers decide whether a
/// failed analysis is worth repeating.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response envelope: {0}")]
    Envelope(String),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Anything that turns a prompt into raw model text.
///
/// Carried in `AppState` as `Arc<dyn GenerationBackend>` so tests can swap in
/// a canned backend without touching the network.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u32>,
    pub candidates_token_count: Option<u32>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// Client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    url: String,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        endpoint: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            url: endpoint.replace("{model}", model),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        Self::new(
            config.gemini_api_key.clone(),
            &config.gemini_endpoint,
            &config.gemini_model,
            config.llm_timeout,
        )
    }

    #[cfg(test)]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Makes a single call to the generation API, returning the full response envelope.
    pub async fn call(&self, prompt: &str) -> Result<GenerateContentResponse, LlmError> {
        let request_body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!("Generation API returned {}: {}", status, message);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let envelope: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Envelope(e.to_string()))?;

        if let Some(usage) = &envelope.usage_metadata {
            debug!(
                "LLM call succeeded: prompt_tokens={:?}, candidate_tokens={:?}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        Ok(envelope)
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let envelope = self.call(prompt).await?;

        if let Some(reason) = envelope.candidates.first().and_then(|c| c.finish_reason.as_deref()) {
            debug!("Generation finished: reason={reason}");
        }

        envelope.text().ok_or(LlmError::EmptyContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    /// Serves `router` on an ephemeral local port and returns its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client_for(base: &str) -> GeminiClient {
        GeminiClient::new(
            "test-key".to_string(),
            &format!("{base}/models/{{model}}"),
            "gemini-test",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_template_substitutes_model() {
        let client = GeminiClient::new(
            "k".to_string(),
            "https://example.test/v1beta/models/{model}:generateContent",
            "gemini-2.0-flash",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            client.url(),
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_envelope_text_joins_first_candidate_parts() {
        let envelope: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}, "finishReason": "STOP"},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }))
        .unwrap();
        assert_eq!(envelope.text().as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_envelope_without_candidates_has_no_text() {
        let envelope: GenerateContentResponse =
            serde_json::from_value(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap();
        assert!(envelope.text().is_none());
    }

    #[tokio::test]
    async fn test_generate_returns_candidate_text_and_sends_key_header() {
        let router = Router::new().route(
            "/models/gemini-test",
            post(|headers: axum::http::HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers.get("x-goog-api-key").unwrap(), "test-key");
                let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap().to_string();
                Json(json!({
                    "candidates": [{"content": {"parts": [{"text": format!("echo: {prompt}")}]}}],
                    "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 4}
                }))
            }),
        );
        let base = serve(router).await;

        let text = client_for(&base).generate("hello").await.unwrap();
        assert_eq!(text, "echo: hello");
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let router = Router::new().route(
            "/models/gemini-test",
            post(|| async {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({"error": {"code": 503, "message": "model overloaded"}})),
                )
            }),
        );
        let base = serve(router).await;

        let err = client_for(&base).generate("hello").await.unwrap_err();
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "model overloaded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_candidates_is_empty_content() {
        let router = Router::new().route(
            "/models/gemini-test",
            post(|| async { Json(json!({"candidates": []})) }),
        );
        let base = serve(router).await;

        let err = client_for(&base).generate("hello").await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }

    #[tokio::test]
    async fn test_non_json_body_is_envelope_error() {
        let router = Router::new().route("/models/gemini-test", post(|| async { "<html>oops</html>" }));
        let base = serve(router).await;

        let err = client_for(&base).generate("hello").await.unwrap_err();
        assert!(matches!(err, LlmError::Envelope(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        // Bind then drop to get a port nobody is listening on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client_for(&format!("http://{addr}"))
            .generate("hello")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Http(_)));
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out_as_http_error() {
        let router = Router::new().route(
            "/models/gemini-test",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({"candidates": [{"content": {"parts": [{"text": "late"}]}}]}))
            }),
        );
        let base = serve(router).await;
        let client = GeminiClient::new(
            "test-key".to_string(),
            &format!("{base}/models/{{model}}"),
            "gemini-test",
            Duration::from_millis(100),
        )
        .unwrap();

        match client.generate("hello").await.unwrap_err() {
            LlmError::Http(e) => assert!(e.is_timeout(), "expected timeout, got {e}"),
            other => panic!("expected Http timeout, got {other:?}"),
        }
    }
}
