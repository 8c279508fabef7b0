//! Language Model Integration
//!
//! `ChatModel` is the seam between the inference proxy and a provider.
//! `OpenAiChat` talks to any OpenAI-compatible chat-completions endpoint and
//! asks for a single structured `replacement` field.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::prompts::Prompt;
use crate::config::Settings;
use crate::error::{DraftError, DraftResult};

/// Name of the structured output schema and its single field
const REPLACEMENT_SCHEMA: &str = "replacement";

/// A provider able to answer a system + user prompt pair
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Return the replacement text for the selection
    async fn invoke(&self, settings: &Settings, prompt: &Prompt) -> DraftResult<String>;

    /// Get the provider name
    fn name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Replacement {
    replacement: String,
}

/// OpenAI-compatible chat-completions client
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: reqwest::Client,
    timeout: Duration,
    structured: bool,
}

impl Default for OpenAiChat {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAiChat {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(60),
            structured: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use plain message content instead of a JSON schema response.
    /// For providers without structured output support.
    pub fn unstructured(mut self) -> Self {
        self.structured = false;
        self
    }

    fn response_format() -> serde_json::Value {
        serde_json::json!({
            "type": "json_schema",
            "json_schema": {
                "name": REPLACEMENT_SCHEMA,
                "strict": true,
                "schema": {
                    "type": "object",
                    "properties": {
                        "replacement": {
                            "type": "string",
                            "description": "The rewritten selected text"
                        }
                    },
                    "required": ["replacement"],
                    "additionalProperties": false
                }
            }
        })
    }

    fn endpoint(settings: &Settings) -> String {
        format!(
            "{}/chat/completions",
            settings.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn invoke(&self, settings: &Settings, prompt: &Prompt) -> DraftResult<String> {
        let system = if self.structured {
            prompt.structured_system()
        } else {
            prompt.system.clone()
        };
        let request = ChatRequest {
            model: &settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            response_format: self.structured.then(Self::response_format),
        };

        debug!(
            "🧠 Calling {} with model {}",
            Self::endpoint(settings),
            settings.model
        );

        let response = self
            .client
            .post(Self::endpoint(settings))
            .bearer_auth(&settings.api_key)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| DraftError::Provider(format!("Network error: {e}")))?;

        let status = response.status();
        let body_text = response.text().await?;

        if !status.is_success() {
            warn!("❌ Model API error ({})", status);
            let detail = serde_json::from_str::<ErrorBody>(&body_text)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| body_text.trim().to_string());
            return Err(DraftError::Provider(format!(
                "Model API error ({}): {}",
                status.as_u16(),
                detail
            )));
        }

        let chat: ChatResponse = serde_json::from_str(&body_text).map_err(|e| {
            warn!("❌ Failed to deserialize model response: {}", e);
            DraftError::Provider("Model returned a malformed response".to_string())
        })?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if self.structured {
            parse_replacement(&content)
        } else {
            Ok(content)
        }
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Pull the `replacement` field out of a structured reply.
///
/// Some compatible servers wrap the JSON in prose or code fences, so the
/// outermost object is located first.
pub fn parse_replacement(content: &str) -> DraftResult<String> {
    let json_start = content.find('{');
    let json_end = content.rfind('}');

    if let (Some(start), Some(end)) = (json_start, json_end) {
        if start < end {
            if let Ok(parsed) = serde_json::from_str::<Replacement>(&content[start..=end]) {
                return Ok(parsed.replacement);
            }
        }
    }

    debug!("No replacement object in model response ({} bytes)", content.len());
    Err(DraftError::Provider(
        "Model returned a malformed response".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prompts::STRUCTURED_OUTPUT_INSTRUCTION;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(base_url: &str) -> Settings {
        Settings {
            api_key: "sk-test".to_string(),
            base_url: format!("{base_url}/v1/"),
            model: "gpt-test".to_string(),
            ..Settings::default()
        }
    }

    fn prompt() -> Prompt {
        Prompt {
            system: "sys".to_string(),
            user: "usr".to_string(),
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        })
    }

    #[test]
    fn test_parse_replacement() {
        assert_eq!(
            parse_replacement(r#"{"replacement":"Earth"}"#).expect("plain"),
            "Earth"
        );
        assert_eq!(
            parse_replacement("```json\n{\"replacement\": \"a {b}\"}\n```").expect("fenced"),
            "a {b}"
        );
        assert!(parse_replacement("Earth").is_err());
        assert!(parse_replacement(r#"{"text":"Earth"}"#).is_err());
    }

    #[tokio::test]
    async fn test_structured_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-test",
                "response_format": {"type": "json_schema"}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion(r#"{"replacement":"Earth"}"#)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let result = OpenAiChat::new()
            .invoke(&settings(&server.uri()), &prompt())
            .await
            .expect("replacement");
        assert_eq!(result, "Earth");
    }

    #[tokio::test]
    async fn test_unstructured_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("  Earth \n")))
            .mount(&server)
            .await;

        let result = OpenAiChat::new()
            .unstructured()
            .invoke(&settings(&server.uri()), &prompt())
            .await
            .expect("content");
        assert_eq!(result, "  Earth \n");
    }

    #[tokio::test]
    async fn test_provider_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "Rate limit reached", "type": "rate_limit"}
            })))
            .mount(&server)
            .await;

        let err = OpenAiChat::new()
            .invoke(&settings(&server.uri()), &prompt())
            .await
            .expect_err("rate limited");
        let msg = err.user_message();
        assert!(msg.contains("429"), "{msg}");
        assert!(msg.contains("Rate limit reached"), "{msg}");
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = OpenAiChat::new()
            .invoke(&settings(&server.uri()), &prompt())
            .await
            .expect_err("malformed");
        assert!(matches!(err, DraftError::Provider(_)));
    }

    async fn system_message_sent(model: OpenAiChat, reply: &str) -> String {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(reply)))
            .mount(&server)
            .await;

        model
            .invoke(&settings(&server.uri()), &prompt())
            .await
            .expect("reply");

        let requests = server.received_requests().await.expect("recording enabled");
        let body: serde_json::Value =
            serde_json::from_slice(&requests[0].body).expect("json body");
        body["messages"][0]["content"]
            .as_str()
            .expect("system content")
            .to_string()
    }

    #[tokio::test]
    async fn test_structured_mode_appends_output_instruction() {
        let system = system_message_sent(OpenAiChat::new(), r#"{"replacement":"Earth"}"#).await;
        assert!(system.starts_with("sys"));
        assert!(system.ends_with(STRUCTURED_OUTPUT_INSTRUCTION));

        let system = system_message_sent(OpenAiChat::new().unstructured(), "Earth").await;
        assert_eq!(system, "sys");
    }
}
