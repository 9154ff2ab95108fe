//! Command-line flags.

use std::path::PathBuf;

use clap::Parser;

use crate::providers::ProviderId;

pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Ask a large language model a question from the terminal.
#[derive(Parser, Debug, Clone)]
#[command(name = "aiask")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Prompt text; multiple words are joined with spaces
    #[arg(value_name = "PROMPT")]
    pub prompt: Vec<String>,

    /// Use OpenAI
    #[arg(long)]
    pub openai: bool,

    /// Use Anthropic
    #[arg(long)]
    pub anthropic: bool,

    /// Use Google Gemini
    #[arg(long)]
    pub gemini: bool,

    /// Use OpenRouter
    #[arg(long)]
    pub openrouter: bool,

    /// Use SambaNova
    #[arg(long)]
    pub sambanova: bool,

    /// Use Mistral
    #[arg(long)]
    pub mistral: bool,

    /// Use a local Ollama server (interactive mode)
    #[arg(long)]
    pub ollama: bool,

    /// Override the provider's default model
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Convert the text part of the answer to speech
    #[arg(long)]
    pub audio: bool,

    /// Play the generated audio (implies --audio)
    #[arg(long)]
    pub play: bool,

    /// Text or PDF file used as context (Ollama only)
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Maximum tokens in the response
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,

    /// Sampling temperature between 0.0 and 1.0
    #[arg(long, value_name = "T", default_value_t = DEFAULT_TEMPERATURE, value_parser = parse_temperature)]
    pub temperature: f32,

    /// Offer to save code blocks from the answer to a file
    #[arg(long)]
    pub save_code: bool,

    /// Directory that saved code is written relative to
    #[arg(long = "wd", value_name = "PATH", default_value = ".")]
    pub working_directory: PathBuf,
}

impl Cli {
    /// Prompt words joined with single spaces; `None` when nothing was given.
    pub fn prompt_text(&self) -> Option<String> {
        let joined = self.prompt.join(" ");
        let trimmed = joined.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    pub fn provider_flag(&self, id: ProviderId) -> bool {
        match id {
            ProviderId::OpenAi => self.openai,
            ProviderId::Anthropic => self.anthropic,
            ProviderId::Gemini => self.gemini,
            ProviderId::OpenRouter => self.openrouter,
            ProviderId::SambaNova => self.sambanova,
            ProviderId::Mistral => self.mistral,
            ProviderId::Ollama => self.ollama,
        }
    }
}

fn parse_temperature(raw: &str) -> Result<f32, String> {
    let value: f32 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("temperature must be between 0.0 and 1.0, got {value}"))
    }
}
