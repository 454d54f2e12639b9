//! Completion provider client.
//!
//! Two request shapes are supported behind [`CompletionStrategy`]: the legacy
//! single-prompt endpoint and the chat-messages endpoint. Both render the same
//! [`CompletionPrompt`] and yield the same [`AssistantMessage`].

use async_trait::async_trait;
use openai_api_rs::v1::chat_completion::{ChatCompletionMessage, Content, MessageRole};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use url::Url;

use crate::core::config::{AppConfig, CompletionShape, GenerationParams};
use crate::core::models::{AssistantMessage, CompletionPrompt};
use crate::errors::SummarizeError;
use crate::prompt::{SYSTEM_INSTRUCTION, estimate_tokens};

/// Anything able to turn a prompt into a generated message.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// # Errors
    ///
    /// Returns `UpstreamFailure` on transport errors, non-2xx statuses or an
    /// unreadable response envelope.
    async fn complete(&self, prompt: &CompletionPrompt) -> Result<AssistantMessage, SummarizeError>;
}

/// Renders a prompt into a provider request and reads the provider's reply.
pub trait CompletionStrategy: Send + Sync {
    /// Path relative to the provider base URL.
    fn path(&self) -> &'static str;

    fn render(&self, model: &str, prompt: &CompletionPrompt, params: &GenerationParams) -> Value;

    /// # Errors
    ///
    /// Returns `UpstreamFailure` when the envelope lacks the generated text.
    fn extract(&self, response: &Value) -> Result<AssistantMessage, SummarizeError>;
}

#[must_use]
pub fn strategy_for(shape: CompletionShape) -> Box<dyn CompletionStrategy> {
    match shape {
        CompletionShape::Legacy => Box::new(LegacyCompletion),
        CompletionShape::Chat => Box::new(ChatMessages),
    }
}

/// `POST /completions` with a single `prompt`.
pub struct LegacyCompletion;

impl CompletionStrategy for LegacyCompletion {
    fn path(&self) -> &'static str {
        "completions"
    }

    fn render(&self, model: &str, prompt: &CompletionPrompt, params: &GenerationParams) -> Value {
        json!({
            "model": model,
            "prompt": prompt.text,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
            "top_p": params.top_p,
            "frequency_penalty": params.frequency_penalty,
            "presence_penalty": params.presence_penalty,
        })
    }

    fn extract(&self, response: &Value) -> Result<AssistantMessage, SummarizeError> {
        response
            .pointer("/choices/0/text")
            .or_else(|| response.get("text"))
            .and_then(Value::as_str)
            .map(|text| AssistantMessage::assistant(text.trim()))
            .ok_or_else(|| SummarizeError::UpstreamFailure("No text in response".to_string()))
    }
}

/// `POST /chat/completions` with a `system` and a `user` message.
pub struct ChatMessages;

impl ChatMessages {
    #[must_use]
    pub fn messages(prompt: &CompletionPrompt) -> Vec<ChatCompletionMessage> {
        vec![
            ChatCompletionMessage {
                role: MessageRole::system,
                content: Content::Text(SYSTEM_INSTRUCTION.to_string()),
                name: None,
                tool_calls: None,
                tool_call_id: None,
            },
            ChatCompletionMessage {
                role: MessageRole::user,
                content: Content::Text(prompt.text.clone()),
                name: None,
                tool_calls: None,
                tool_call_id: None,
            },
        ]
    }
}

impl CompletionStrategy for ChatMessages {
    fn path(&self) -> &'static str {
        "chat/completions"
    }

    fn render(&self, model: &str, prompt: &CompletionPrompt, params: &GenerationParams) -> Value {
        let messages: Vec<Value> = Self::messages(prompt)
            .iter()
            .filter_map(|msg| {
                let role = match msg.role {
                    MessageRole::system => "system",
                    MessageRole::user => "user",
                    MessageRole::assistant => "assistant",
                    MessageRole::function => "function",
                    MessageRole::tool => "tool",
                };
                match &msg.content {
                    Content::Text(text) => Some(json!({ "role": role, "content": text })),
                    Content::ImageUrl(_) => None,
                }
            })
            .collect();

        json!({
            "model": model,
            "messages": messages,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
            "top_p": params.top_p,
            "frequency_penalty": params.frequency_penalty,
            "presence_penalty": params.presence_penalty,
        })
    }

    fn extract(&self, response: &Value) -> Result<AssistantMessage, SummarizeError> {
        let message = response
            .pointer("/choices/0/message")
            .ok_or_else(|| SummarizeError::UpstreamFailure("No message in response".to_string()))?;
        serde_json::from_value(message.clone()).map_err(|e| {
            SummarizeError::UpstreamFailure(format!("Failed to parse provider message: {e}"))
        })
    }
}

/// Reqwest-backed client for an OpenAI-compatible provider.
pub struct LlmClient {
    http: Client,
    api_key: String,
    org_id: Option<String>,
    model_name: String,
    base_url: Url,
    params: GenerationParams,
    strategy: Box<dyn CompletionStrategy>,
    timeout_ms: u64,
}

impl LlmClient {
    /// # Errors
    ///
    /// Returns `Config` if the HTTP client cannot be constructed.
    pub fn new(config: &AppConfig, api_key: String) -> Result<Self, SummarizeError> {
        let http = Client::builder()
            .timeout(config.completion_timeout)
            .build()
            .map_err(|e| SummarizeError::Config(format!("http client: {e}")))?;

        Ok(Self {
            http,
            api_key,
            org_id: config.openai_org_id.clone(),
            model_name: config.openai_model.clone(),
            base_url: config.openai_base_url.clone(),
            params: config.generation.clone(),
            strategy: strategy_for(config.completion_shape),
            timeout_ms: u64::try_from(config.completion_timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }

    fn endpoint(&self) -> Result<Url, SummarizeError> {
        self.base_url
            .join(self.strategy.path())
            .map_err(|e| SummarizeError::Config(format!("completion endpoint: {e}")))
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    async fn complete(&self, prompt: &CompletionPrompt) -> Result<AssistantMessage, SummarizeError> {
        #[cfg(feature = "debug-logs")]
        debug!("Using completion prompt:\n{}", prompt.text);

        info!(
            model = %self.model_name,
            estimated_tokens = estimate_tokens(&prompt.text),
            "Requesting completion"
        );

        let body = self.strategy.render(&self.model_name, prompt, &self.params);

        let mut request = self
            .http
            .post(self.endpoint()?)
            .bearer_auth(&self.api_key)
            .json(&body);
        if let Some(org) = &self.org_id {
            request = request.header("OpenAI-Organization", org);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SummarizeError::UpstreamTimeout(self.timeout_ms)
            } else {
                SummarizeError::UpstreamFailure(format!(
                    "Completion request failed: {}",
                    e.without_url()
                ))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(status = status.as_u16(), "Completion provider returned an error status");
            return Err(SummarizeError::UpstreamFailure(format!(
                "status {}: {}",
                status.as_u16(),
                provider_error_message(&error_text)
            )));
        }

        let response_json: Value = response.json().await.map_err(|e| {
            SummarizeError::UpstreamFailure(format!("Failed to parse provider response: {e}"))
        })?;
        debug!("Completion envelope received");

        self.strategy.extract(&response_json)
    }
}

/// Pulls `error.message` out of an OpenAI-style error body, falling back to the raw text.
#[must_use]
pub fn provider_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(ToString::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
