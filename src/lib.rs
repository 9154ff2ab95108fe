pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod handlers;
pub mod logging;
pub mod model;
pub mod model_gateway;
pub mod providers;
pub mod resolver;
pub mod session;
pub mod spinner;

use anyhow::{Context, Result};
use reqwest::Client;
use std::io;
use tracing::{info, warn};

use cli::Cli;
use config::{Config, RuntimeSettings};
use error::ConfigError;
use handlers::context;
use model::Message;
use model_gateway::HttpGateway;
use session::Session;

/// Loads the optional context document. Only the local provider gets it.
fn load_context(settings: &RuntimeSettings) -> Result<Option<Message>, ConfigError> {
    let Some(path) = &settings.context_file else {
        return Ok(None);
    };
    if !settings.interactive() {
        warn!(
            path = %path.display(),
            provider = settings.provider.name,
            "context files are only used with the local provider; ignoring"
        );
        eprintln!(
            "Warning: --file is only supported with --ollama; ignoring '{}'.",
            path.display()
        );
        return Ok(None);
    }
    context::load_context_message(path).map(Some)
}

pub async fn run(cli: Cli) -> Result<()> {
    let prompt = cli.prompt_text().ok_or(ConfigError::NoPrompt)?;

    let cfg = Config::from_env();
    info!(
        speech_model = %cfg.speech_model,
        speech_voice = %cfg.speech_voice,
        "loaded runtime configuration"
    );

    let settings = RuntimeSettings::from_cli(&cli)?;
    info!(
        provider = settings.provider.name,
        model = %settings.selected_model,
        interactive = settings.interactive(),
        "resolved provider"
    );
    let context = load_context(&settings)?;

    let client = Client::builder()
        .build()
        .context("Failed to initialize HTTP client")?;
    let gateway = HttpGateway::new(client, cfg.speech_model.clone(), cfg.speech_voice.clone());

    let mut session = Session::new(&gateway, &gateway, &cfg, &settings, context);
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout().lock();
    session.run(&prompt, &mut input, &mut output).await
}
