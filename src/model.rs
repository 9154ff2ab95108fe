use anyhow::Result;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::providers::{self, ProviderConfig, Wire};

pub const NO_RESPONSE_PLACEHOLDER: &str = "No response was returned.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling and connection parameters sent with every completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionParams {
    pub max_tokens: u32,
    pub temperature: f32,
    /// Endpoint override; only the local provider sets one.
    pub api_base: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub provider: &'static ProviderConfig,
    pub model: &'a str,
    pub credential: Option<&'a str>,
    pub messages: &'a [Message],
    pub params: &'a CompletionParams,
}

impl CompletionRequest<'_> {
    pub fn api_base(&self) -> &str {
        self.params
            .api_base
            .as_deref()
            .unwrap_or(self.provider.api_base)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResult {
    pub text: String,
    /// Reported spend in USD; zero when the provider does not say.
    pub cost: f64,
    pub raw: Value,
}

impl CompletionResult {
    pub fn from_parts(text: Option<String>, cost: Option<f64>, raw: Value) -> Self {
        let text = text
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| NO_RESPONSE_PLACEHOLDER.to_string());
        Self {
            text,
            cost: cost.filter(|cost| cost.is_finite()).unwrap_or(0.0),
            raw,
        }
    }
}

pub async fn chat(client: &Client, request: &CompletionRequest<'_>) -> Result<CompletionResult> {
    debug!(
        provider = request.provider.name,
        model = %request.model,
        message_count = request.messages.len(),
        "dispatching model chat request"
    );

    match request.provider.wire {
        Wire::OpenAiCompatible => providers::openai::chat(client, request).await,
        Wire::Anthropic => providers::anthropic::chat(client, request).await,
        Wire::Ollama => providers::ollama::chat(client, request).await,
    }
}
