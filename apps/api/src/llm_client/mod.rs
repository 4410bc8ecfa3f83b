/// LLM Client: HTTP plumbing for every model call in the service.
///
/// Two transports:
/// - `HostedClient`: OpenAI-style chat completions (openai, groq) or the Anthropic
///   Messages API, authenticated with an injected key.
/// - `OllamaClient`: a local Ollama server's `/api/generate` in JSON mode.
///
/// Both retry 429 and 5xx replies with exponential backoff and strip markdown fences
/// before JSON parsing. Nothing here reads the environment; credentials, endpoints and
/// timeouts come from the caller.
use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no API key configured for {0}")]
    MissingCredential(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Hosted providers and the wire dialect each one speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostedProvider {
    OpenAi,
    Anthropic,
    Groq,
}

impl HostedProvider {
    pub fn tag(self) -> &'static str {
        match self {
            HostedProvider::OpenAi => "openai",
            HostedProvider::Anthropic => "anthropic",
            HostedProvider::Groq => "groq",
        }
    }

    pub fn default_endpoint(self) -> &'static str {
        match self {
            HostedProvider::OpenAi => "https://api.openai.com/v1/chat/completions",
            HostedProvider::Anthropic => "https://api.anthropic.com/v1/messages",
            HostedProvider::Groq => "https://api.groq.com/openai/v1/chat/completions",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            HostedProvider::OpenAi => "gpt-4o-mini",
            HostedProvider::Anthropic => "claude-3-5-sonnet-20240620",
            HostedProvider::Groq => "llama-3.1-8b-instant",
        }
    }

    fn speaks_messages_api(self) -> bool {
        matches!(self, HostedProvider::Anthropic)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    format: &'static str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Error body shared by OpenAI-compatible APIs and Anthropic.
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Hosted client
// ────────────────────────────────────────────────────────────────────────────

/// Client for one hosted provider.
#[derive(Clone)]
pub struct HostedClient {
    client: Client,
    provider: HostedProvider,
    api_key: String,
    endpoint: String,
    model: String,
}

impl HostedClient {
    pub fn new(
        provider: HostedProvider,
        api_key: String,
        endpoint: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            provider,
            api_key,
            endpoint,
            model,
        })
    }

    pub fn provider(&self) -> HostedProvider {
        self.provider
    }

    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Sends one prompt and returns the model's text reply.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        if !self.has_credential() {
            return Err(LlmError::MissingCredential(self.provider.tag()));
        }

        if self.provider.speaks_messages_api() {
            let body = AnthropicRequest {
                model: &self.model,
                max_tokens: MAX_TOKENS,
                system,
                messages: vec![ChatMessage {
                    role: "user",
                    content: prompt,
                }],
            };
            let headers = [
                ("x-api-key", self.api_key.clone()),
                ("anthropic-version", ANTHROPIC_VERSION.to_string()),
            ];
            let raw = post_with_retry(&self.client, &self.endpoint, &headers, &body).await?;
            let response: AnthropicResponse = serde_json::from_str(&raw)?;
            if let Some(usage) = &response.usage {
                debug!(
                    "LLM call succeeded: provider=anthropic, input_tokens={}, output_tokens={}",
                    usage.input_tokens, usage.output_tokens
                );
            }
            response
                .content
                .into_iter()
                .find(|b| b.block_type == "text")
                .and_then(|b| b.text)
                .ok_or(LlmError::EmptyContent)
        } else {
            let body = ChatCompletionRequest {
                model: &self.model,
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: system,
                    },
                    ChatMessage {
                        role: "user",
                        content: prompt,
                    },
                ],
                response_format: ResponseFormat {
                    format_type: "json_object",
                },
                temperature: 0.0,
            };
            let headers = [("authorization", format!("Bearer {}", self.api_key))];
            let raw = post_with_retry(&self.client, &self.endpoint, &headers, &body).await?;
            let response: ChatCompletionResponse = serde_json::from_str(&raw)?;
            if let Some(usage) = &response.usage {
                debug!(
                    "LLM call succeeded: provider={}, prompt_tokens={}, completion_tokens={}",
                    self.provider.tag(),
                    usage.prompt_tokens,
                    usage.completion_tokens
                );
            }
            response
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .filter(|c| !c.trim().is_empty())
                .ok_or(LlmError::EmptyContent)
        }
    }

    /// Calls the model and deserializes the reply as JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let text = self.call(prompt, system).await?;
        parse_json_reply(&text)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Local client
// ────────────────────────────────────────────────────────────────────────────

/// Client for a local Ollama server.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Same server and HTTP client, different model.
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            model: model.to_string(),
        }
    }

    /// Sends one prompt in JSON mode and returns the raw `response` string.
    pub async fn generate(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            format: "json",
            stream: false,
        };
        let url = format!("{}/api/generate", self.base_url);
        let raw = post_with_retry(&self.client, &url, &[], &body).await?;
        let response: GenerateResponse = serde_json::from_str(&raw)?;
        if response.response.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(response.response)
    }
}

/// Parses a model reply as JSON after stripping markdown code fences.
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    serde_json::from_str(strip_json_fences(text)).map_err(LlmError::Parse)
}

/// POSTs `body` as JSON and returns the success body.
/// Retries on 429 (rate limit), 5xx and transport errors with exponential backoff.
async fn post_with_retry<B: Serialize>(
    client: &Client,
    url: &str,
    headers: &[(&str, String)],
    body: &B,
) -> Result<String, LlmError> {
    let mut last_error: Option<LlmError> = None;

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s
            let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
            warn!(
                "LLM call attempt {} failed, retrying after {}ms...",
                attempt,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        let mut request = client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                last_error = Some(LlmError::Http(e));
                continue;
            }
        };

        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API returned {}", status);
            last_error = Some(LlmError::Api {
                status: status.as_u16(),
                message: error_message(body),
            });
            continue;
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error_message(body),
            });
        }

        return Ok(response.text().await?);
    }

    Err(last_error.unwrap_or(LlmError::RateLimited {
        retries: MAX_RETRIES,
    }))
}

fn error_message(body: String) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(stripped) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };
    let stripped = stripped.trim_start();
    stripped
        .strip_suffix("```")
        .map(str::trim)
        .unwrap_or(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "  {\"key\": \"value\"}\n";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_parse_json_reply_rejects_prose() {
        let parsed: Result<serde_json::Value, _> = parse_json_reply("Sure! Here is the JSON.");
        assert!(matches!(parsed, Err(LlmError::Parse(_))));
    }

    #[test]
    fn test_error_message_unwraps_envelope() {
        let body = r#"{"error": {"message": "invalid x-api-key", "type": "authentication_error"}}"#;
        assert_eq!(error_message(body.to_string()), "invalid x-api-key");
        assert_eq!(error_message("Bad Gateway".to_string()), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_missing_credential_short_circuits() {
        let client = HostedClient::new(
            HostedProvider::OpenAi,
            "  ".to_string(),
            "http://127.0.0.1:9/never-called".to_string(),
            "gpt-4o-mini".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(!client.has_credential());
        let result = client.call("prompt", "system").await;
        assert!(matches!(result, Err(LlmError::MissingCredential("openai"))));
    }

    #[test]
    fn test_provider_defaults() {
        assert_eq!(HostedProvider::Groq.tag(), "groq");
        assert!(HostedProvider::Anthropic.speaks_messages_api());
        assert!(!HostedProvider::Groq.speaks_messages_api());
        assert!(HostedProvider::OpenAi
            .default_endpoint()
            .ends_with("/chat/completions"));
    }

    #[test]
    fn test_ollama_base_url_trailing_slash() {
        let client = OllamaClient::new(
            "http://localhost:11434/".to_string(),
            "llama3".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.model(), "llama3");
        assert_eq!(client.with_model("mistral").model(), "mistral");
    }
}
