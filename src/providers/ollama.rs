use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{CompletionRequest, CompletionResult, Message};
use crate::providers::http_errors::{model_api_request_error, non_success_error};

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<ChatMessage<'a>>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
struct OllamaChatResponse {
    message: Option<ChatMessageResponse>,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

fn chat_url(base_url: &str) -> String {
    format!("{}/api/chat", base_url.trim_end_matches('/'))
}

fn to_ollama_messages(messages: &[Message]) -> Vec<ChatMessage<'_>> {
    messages
        .iter()
        .map(|msg| ChatMessage {
            role: msg.role.as_str(),
            content: &msg.content,
        })
        .collect()
}

fn parse_response(raw: Value) -> CompletionResult {
    let parsed: OllamaChatResponse = serde_json::from_value(raw.clone()).unwrap_or_default();
    let text = parsed.message.and_then(|message| message.content);
    CompletionResult::from_parts(text, None, raw)
}

pub async fn chat(client: &Client, request: &CompletionRequest<'_>) -> Result<CompletionResult> {
    let api_url = chat_url(request.api_base());
    let body = OllamaChatRequest {
        model: request.model,
        stream: false,
        messages: to_ollama_messages(request.messages),
        options: OllamaOptions {
            num_predict: request.params.max_tokens,
            temperature: request.params.temperature,
        },
    };
    debug!(
        api_url = %api_url,
        model = %request.model,
        message_count = request.messages.len(),
        "sending ollama chat request"
    );

    let response = client
        .post(&api_url)
        .json(&body)
        .send()
        .await
        .map_err(|err| {
            warn!(
                api_url = %api_url,
                model = %request.model,
                error = %err,
                "ollama request failed"
            );
            model_api_request_error(err, &api_url, request.provider.name)
        })?;

    if !response.status().is_success() {
        return Err(non_success_error(response, request.provider.name).await);
    }

    let raw: Value = response
        .json()
        .await
        .context("Failed to parse ollama chat response")?;
    let result = parse_response(raw);
    debug!(
        model = %request.model,
        response_len = result.text.len(),
        "received ollama chat response"
    );
    Ok(result)
}
