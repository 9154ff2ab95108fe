use anyhow::{Result, anyhow};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::providers::http_errors::{model_api_request_error, non_success_error};

pub const SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
}

pub async fn synthesize(
    client: &Client,
    model: &str,
    voice: &str,
    text: &str,
    credential: &str,
) -> Result<Vec<u8>> {
    debug!(model, voice, text_len = text.len(), "requesting speech synthesis");

    let response = client
        .post(SPEECH_URL)
        .bearer_auth(credential)
        .json(&SpeechRequest {
            model,
            voice,
            input: text,
        })
        .send()
        .await
        .map_err(|err| {
            warn!(error = %err, "speech request failed");
            model_api_request_error(err, SPEECH_URL, "speech")
        })?;

    if !response.status().is_success() {
        return Err(non_success_error(response, "speech").await);
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|err| anyhow!("Failed to read synthesized audio: {err}"))?;
    debug!(audio_len = bytes.len(), "received synthesized audio");
    Ok(bytes.to_vec())
}
