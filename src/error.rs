use std::path::PathBuf;

use thiserror::Error;

/// Fatal setup problems. Every variant is reported before any network
/// activity and maps to exit code 1.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No prompt supplied. Usage: aiask [PROVIDER FLAGS] <prompt>...")]
    NoPrompt,

    #[error("Working directory '{}' does not exist or is not a directory.", .0.display())]
    MissingWorkingDirectory(PathBuf),

    #[error(
        "No API credentials found. Set one of OPENAI_API_KEY, ANTHROPIC_API_KEY, \
         GEMINI_API_KEY, OPENROUTER_API_KEY, SAMBANOVA_API_KEY or MISTRAL_API_KEY, \
         or pass --ollama for the local model."
    )]
    NoCredentialFound,

    #[error("Failed to read context file '{}': {reason}", path.display())]
    ContextFile { path: PathBuf, reason: String },
}

impl ConfigError {
    pub const fn exit_code(&self) -> u8 {
        1
    }
}
