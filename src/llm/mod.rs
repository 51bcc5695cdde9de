//! Language-model access through an OpenAI-compatible chat completions API.
//!
//! Summaries are streamed to the caller chunk by chunk; tag extraction uses a single buffered
//! completion. Both share the same HTTP client and model.

mod stream;

use async_stream::try_stream;
use async_trait::async_trait;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::pin::Pin;
use thiserror::Error;

use stream::{SseLines, StreamEvent, parse_event};

/// Errors surfaced while talking to the language model.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Provider could not be reached.
    #[error("Language model unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate text: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Incremental text produced by a streaming completion.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// A system instruction plus the user prompt.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Instruction describing how the model should behave.
    pub system: String,
    /// Content the model should act on.
    pub prompt: String,
}

/// Interface implemented by language-model providers.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate the full response before returning.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;

    /// Start a completion whose text is yielded as it is generated.
    async fn stream(&self, request: CompletionRequest) -> Result<TextStream, LlmError>;
}

/// Chat completions client for OpenRouter and other OpenAI-compatible providers.
pub struct OpenRouterClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    /// Build a client targeting `base_url` (for example `https://openrouter.ai/api/v1`).
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self, LlmError> {
        let http = Client::builder()
            .user_agent("linkshelf/llm")
            .build()
            .map_err(|error| LlmError::ProviderUnavailable(error.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let payload = json!({
            "model": self.model,
            "stream": stream,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt },
            ],
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                LlmError::ProviderUnavailable(format!(
                    "failed to reach {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(LlmError::ProviderUnavailable(format!(
                "endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::GenerationFailed(format!(
                "provider returned {status}: {body}"
            )));
        }

        Ok(response)
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LanguageModel for OpenRouterClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let response = self.send(&request, false).await?;
        let body: CompletionResponse = response.json().await.map_err(|error| {
            LlmError::InvalidResponse(format!("failed to decode completion: {error}"))
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| LlmError::InvalidResponse("completion contained no message".into()))
    }

    async fn stream(&self, request: CompletionRequest) -> Result<TextStream, LlmError> {
        let response = self.send(&request, true).await?;
        let mut bytes = Box::pin(response.bytes_stream());
        tracing::debug!(model = %self.model, "Streaming completion started");

        let text = try_stream! {
            let mut lines = SseLines::default();
            let mut done = false;
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|error| {
                    LlmError::ProviderUnavailable(format!("stream interrupted: {error}"))
                })?;
                for payload in lines.push(&chunk) {
                    match parse_event(&payload)? {
                        StreamEvent::Text(text) => {
                            yield text;
                        }
                        StreamEvent::Done => {
                            done = true;
                            break;
                        }
                        StreamEvent::Empty => {}
                    }
                }
                if done {
                    break;
                }
            }
            if !done {
                if let Some(payload) = lines.finish() {
                    if let StreamEvent::Text(text) = parse_event(&payload)? {
                        yield text;
                    }
                }
            }
        };

        Ok(Box::pin(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn client_for(server: &MockServer) -> OpenRouterClient {
        OpenRouterClient::new(&server.base_url(), "or-test", "test/model").expect("client")
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "Be brief".into(),
            prompt: "Summarize this".into(),
        }
    }

    #[tokio::test]
    async fn complete_returns_trimmed_message() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer or-test")
                    .body_contains("\"stream\":false");
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "role": "assistant", "content": "  tech, rust \n" } }]
                }));
            })
            .await;

        let text = client_for(&server).complete(request()).await.expect("text");
        mock.assert_async().await;
        assert_eq!(text, "tech, rust");
    }

    #[tokio::test]
    async fn complete_reports_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(429).body("slow down");
            })
            .await;

        let error = client_for(&server)
            .complete(request())
            .await
            .expect_err("error");
        assert!(matches!(error, LlmError::GenerationFailed(message) if message.contains("429")));
    }

    #[tokio::test]
    async fn stream_yields_each_delta_in_order() {
        let server = MockServer::start_async().await;
        let body = concat!(
            ": OPENROUTER PROCESSING\n\n",
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"First \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"second.\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .body_contains("\"stream\":true");
                then.status(200)
                    .header("content-type", "text/event-stream")
                    .body(body);
            })
            .await;

        let stream = client_for(&server).stream(request()).await.expect("stream");
        let chunks: Vec<String> = stream
            .map(|chunk| chunk.expect("chunk"))
            .collect()
            .await;
        assert_eq!(chunks, vec!["First ".to_string(), "second.".to_string()]);
    }

    #[tokio::test]
    async fn stream_rejects_error_status_before_streaming() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(404);
            })
            .await;

        let result = client_for(&server).stream(request()).await;
        assert!(matches!(result, Err(LlmError::ProviderUnavailable(_))));
    }
}
