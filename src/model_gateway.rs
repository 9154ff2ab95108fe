use anyhow::Result;
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;

use crate::model::{self, CompletionRequest, CompletionResult};
use crate::providers::speech;

pub type CompletionFuture<'a> = Pin<Box<dyn Future<Output = Result<CompletionResult>> + 'a>>;
pub type SpeechFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>>> + 'a>>;

/// Sends the whole conversation to a model and returns its answer.
pub trait CompletionClient {
    fn complete<'a>(&'a self, request: CompletionRequest<'a>) -> CompletionFuture<'a>;
}

/// Turns text into encoded audio bytes.
pub trait SpeechSynthesizer {
    fn synthesize<'a>(&'a self, text: &'a str, credential: &'a str) -> SpeechFuture<'a>;
}

pub struct HttpGateway {
    client: Client,
    speech_model: String,
    speech_voice: String,
}

impl HttpGateway {
    pub fn new(client: Client, speech_model: impl Into<String>, speech_voice: impl Into<String>) -> Self {
        Self {
            client,
            speech_model: speech_model.into(),
            speech_voice: speech_voice.into(),
        }
    }
}

impl CompletionClient for HttpGateway {
    fn complete<'a>(&'a self, request: CompletionRequest<'a>) -> CompletionFuture<'a> {
        Box::pin(async move { model::chat(&self.client, &request).await })
    }
}

impl SpeechSynthesizer for HttpGateway {
    fn synthesize<'a>(&'a self, text: &'a str, credential: &'a str) -> SpeechFuture<'a> {
        Box::pin(async move {
            speech::synthesize(
                &self.client,
                &self.speech_model,
                &self.speech_voice,
                text,
                credential,
            )
            .await
        })
    }
}
