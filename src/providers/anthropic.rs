use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{CompletionRequest, CompletionResult, Message, MessageRole};
use crate::providers::http_errors::{model_api_request_error, non_success_error};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

fn messages_url(base_url: &str) -> String {
    format!("{}/messages", base_url.trim_end_matches('/'))
}

/// Anthropic takes system instructions out-of-band, so system messages are
/// joined into the top-level field and dropped from the turn list.
fn split_system(messages: &[Message]) -> (Option<String>, Vec<ChatMessage<'_>>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|msg| msg.role == MessageRole::System)
        .map(|msg| msg.content.as_str())
        .collect();
    let turns = messages
        .iter()
        .filter(|msg| msg.role != MessageRole::System)
        .map(|msg| ChatMessage {
            role: msg.role.as_str(),
            content: &msg.content,
        })
        .collect();
    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, turns)
}

fn parse_response(raw: Value) -> CompletionResult {
    let parsed: MessagesResponse = serde_json::from_value(raw.clone()).unwrap_or_default();
    let text: String = parsed
        .content
        .into_iter()
        .filter_map(|block| block.text)
        .collect();
    CompletionResult::from_parts(Some(text), None, raw)
}

pub async fn chat(client: &Client, request: &CompletionRequest<'_>) -> Result<CompletionResult> {
    let provider = request.provider.name;
    let api_url = messages_url(request.api_base());
    let (system, messages) = split_system(request.messages);
    let body = MessagesRequest {
        model: request.model,
        max_tokens: request.params.max_tokens,
        temperature: request.params.temperature,
        system,
        messages,
    };
    debug!(
        api_url = %api_url,
        model = %request.model,
        message_count = request.messages.len(),
        "sending anthropic messages request"
    );

    let response = client
        .post(&api_url)
        .header("x-api-key", request.credential.unwrap_or_default())
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&body)
        .send()
        .await
        .map_err(|err| {
            warn!(
                api_url = %api_url,
                model = %request.model,
                error = %err,
                "anthropic request failed"
            );
            model_api_request_error(err, &api_url, provider)
        })?;

    if !response.status().is_success() {
        return Err(non_success_error(response, provider).await);
    }

    let raw: Value = response
        .json()
        .await
        .context("Failed to parse anthropic messages response")?;
    Ok(parse_response(raw))
}
