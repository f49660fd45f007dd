use crate::config::{parsed, request_timeout, required, var};
use crate::error::{ProviderError, RagError, Result};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Configuration for the chat completion API
#[derive(Clone)]
pub struct ChatConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl std::fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ChatConfig {
    pub fn from_vars<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = required(lookup, "OPENAI_API_KEY")?;
        let temperature: f32 = parsed(lookup, "CHAT_TEMPERATURE", 0.1)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(RagError::Configuration(format!(
                "CHAT_TEMPERATURE must be between 0 and 2, got {}",
                temperature
            )));
        }

        Ok(ChatConfig {
            api_key,
            base_url: var(lookup, "OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: var(lookup, "CHAT_MODEL").unwrap_or_else(|| "gpt-4".to_string()),
            temperature,
            max_tokens: parsed(lookup, "CHAT_MAX_TOKENS", 1024)?,
            timeout: request_timeout(lookup)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A chat message for the language model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A language model reachable through a chat completion call
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the messages in order and return the text of the single completion
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        temperature: f32,
    ) -> Result<String, ProviderError>;
}

/// Client for an OpenAI-compatible chat completions API
#[derive(Clone)]
pub struct OpenAiChatClient {
    config: ChatConfig,
    client: reqwest::Client,
}

impl OpenAiChatClient {
    /// Create a new chat client
    pub fn new(config: ChatConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(OpenAiChatClient { config, client })
    }

    /// Get the client configuration
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }
}

#[async_trait]
impl ChatModel for OpenAiChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        temperature: f32,
    ) -> Result<String, ProviderError> {
        let request = CompletionRequest {
            model,
            messages,
            temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        debug!("Chat completion request to {} with model {}", url, model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Api { status, body });
        }

        let response_data: CompletionResponse = response.json().await?;

        // Extract the generated text from the response
        response_data
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::Parse("No response generated".to_string()))
    }
}

/// The model's reply to one question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
}

/// Sends the system instruction and the assembled prompt to the model
pub struct AnswerGenerator {
    model: Arc<dyn ChatModel>,
    model_name: String,
    temperature: f32,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn ChatModel>, config: &ChatConfig) -> Self {
        AnswerGenerator {
            model,
            model_name: config.model.clone(),
            temperature: config.temperature,
        }
    }

    /// One completion, no retries; errors are left to the caller
    pub async fn generate(&self, system_instruction: &str, prompt: &str) -> Result<Answer> {
        let messages = [
            ChatMessage::system(system_instruction),
            ChatMessage::user(prompt),
        ];

        let started = Instant::now();
        let text = self
            .model
            .complete(&messages, &self.model_name, self.temperature)
            .await
            .map_err(RagError::Generation)?;
        debug!("Completion took {:?}", started.elapsed());

        let text = text.trim();
        if text.is_empty() {
            return Err(RagError::Generation(ProviderError::Parse(
                "empty completion".to_string(),
            )));
        }

        Ok(Answer {
            text: text.to_string(),
        })
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize, Debug)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<String>,
}
