use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{CompletionRequest, CompletionResult, Message};
use crate::providers::http_errors::{model_api_request_error, non_success_error};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    cost: Option<f64>,
}

fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

fn to_wire_messages(messages: &[Message]) -> Vec<ChatMessage<'_>> {
    messages
        .iter()
        .map(|msg| ChatMessage {
            role: msg.role.as_str(),
            content: &msg.content,
        })
        .collect()
}

fn parse_response(raw: Value) -> CompletionResult {
    let parsed: ChatCompletionResponse = serde_json::from_value(raw.clone()).unwrap_or_default();
    let text = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content);
    let cost = parsed.usage.and_then(|usage| usage.cost);
    CompletionResult::from_parts(text, cost, raw)
}

pub async fn chat(client: &Client, request: &CompletionRequest<'_>) -> Result<CompletionResult> {
    let provider = request.provider.name;
    let api_url = completions_url(request.api_base());
    let body = ChatCompletionRequest {
        model: request.model,
        messages: to_wire_messages(request.messages),
        max_tokens: request.params.max_tokens,
        temperature: request.params.temperature,
    };
    debug!(
        provider,
        api_url = %api_url,
        model = %request.model,
        message_count = request.messages.len(),
        "sending chat completion request"
    );

    let mut builder = client.post(&api_url).json(&body);
    if let Some(key) = request.credential.filter(|key| !key.is_empty()) {
        builder = builder.bearer_auth(key);
    }

    let response = builder.send().await.map_err(|err| {
        warn!(
            provider,
            api_url = %api_url,
            model = %request.model,
            error = %err,
            "chat completion request failed"
        );
        model_api_request_error(err, &api_url, provider)
    })?;

    if !response.status().is_success() {
        return Err(non_success_error(response, provider).await);
    }

    let raw: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {provider} chat completion response"))?;
    let result = parse_response(raw);
    debug!(
        provider,
        response_len = result.text.len(),
        cost = result.cost,
        "received chat completion response"
    );
    Ok(result)
}
