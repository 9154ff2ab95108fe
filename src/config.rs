use std::env;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::providers::{self, ProviderConfig, ProviderId};
use crate::resolver::{self, Resolution};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. When providing code examples, \
     always use markdown code block syntax with language specification.";
const DEFAULT_SPEECH_MODEL: &str = "tts-1";
const DEFAULT_SPEECH_VOICE: &str = "alloy";
const DEFAULT_AUDIO_FILE_NAME: &str = "aiask_response.mp3";
const SPEECH_CREDENTIAL_ENV_VAR: &str = "OPENAI_API_KEY";

/// Settings read from the environment (and `.env`), independent of flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub system_prompt: String,
    pub speech_credential: Option<String>,
    pub speech_model: String,
    pub speech_voice: String,
    /// Explicit audio destination; `None` means next to the executable.
    pub audio_file: Option<PathBuf>,
    pub audio_player: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_env_with(|key| env::var(key).ok())
    }

    pub(crate) fn from_env_with(get_var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            system_prompt: parse_non_empty(get_var("SYSTEM_PROMPT").as_deref())
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            speech_credential: parse_non_empty(get_var(SPEECH_CREDENTIAL_ENV_VAR).as_deref()),
            speech_model: parse_non_empty(get_var("SPEECH_MODEL").as_deref())
                .unwrap_or_else(|| DEFAULT_SPEECH_MODEL.to_string()),
            speech_voice: parse_non_empty(get_var("SPEECH_VOICE").as_deref())
                .unwrap_or_else(|| DEFAULT_SPEECH_VOICE.to_string()),
            audio_file: parse_non_empty(get_var("AUDIO_FILE").as_deref()).map(PathBuf::from),
            audio_player: parse_non_empty(get_var("AUDIO_PLAYER").as_deref()),
        }
    }

    pub fn audio_destination(&self) -> PathBuf {
        if let Some(path) = &self.audio_file {
            return path.clone();
        }
        env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_AUDIO_FILE_NAME)
    }
}

/// Everything one run needs, fixed at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSettings {
    pub provider: &'static ProviderConfig,
    pub selected_model: String,
    pub credential: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub working_directory: PathBuf,
    pub save_code: bool,
    pub audio: bool,
    pub play_audio: bool,
    pub context_file: Option<PathBuf>,
}

impl RuntimeSettings {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        Self::from_cli_with(cli, |key| env::var(key).ok())
    }

    pub(crate) fn from_cli_with(
        cli: &Cli,
        get_var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if !cli.working_directory.is_dir() {
            return Err(ConfigError::MissingWorkingDirectory(
                cli.working_directory.clone(),
            ));
        }

        let Resolution {
            provider,
            model,
            credential,
        } = resolver::resolve(|id| cli.provider_flag(id), cli.model.as_deref(), get_var)?;

        Ok(Self {
            provider,
            selected_model: model,
            credential,
            max_tokens: cli.max_tokens,
            temperature: cli.temperature.clamp(0.0, 1.0),
            working_directory: cli.working_directory.clone(),
            save_code: cli.save_code,
            audio: cli.audio || cli.play,
            play_audio: cli.play,
            context_file: cli.file.clone(),
        })
    }

    /// Interactive follow-up prompts are only offered for the local provider.
    pub fn interactive(&self) -> bool {
        self.provider.id == ProviderId::Ollama
    }

    /// Connection override passed with each request.
    pub fn api_base(&self) -> Option<String> {
        self.interactive()
            .then(|| providers::OLLAMA_BASE_URL.to_string())
    }
}

fn parse_non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
