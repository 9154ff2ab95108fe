use clap::Parser;
use std::process::ExitCode;

use aiask::cli::Cli;
use aiask::error::ConfigError;
use aiask::logging;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = logging::init();

    let cli = Cli::parse();
    match aiask::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let code = err
                .downcast_ref::<ConfigError>()
                .map(ConfigError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}
