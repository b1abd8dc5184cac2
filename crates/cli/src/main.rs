//! CampusKart CLI - campus marketplace from the terminal

mod commands;
mod config;
mod logging;

use anyhow::Result;
use campuskart_core::{FileTokenStore, Session};
use campuskart_http::CampusClient;
use clap::{Parser, ValueEnum};
use commands::Commands;
use config::CliConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, debug, error, warn};

#[derive(Parser)]
#[command(name = "campuskart")]
#[command(about = "Client for the CampusKart campus marketplace")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Also append logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Configuration file (defaults to config.toml in the user config directory)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// API base URL, overriding the configuration
    #[arg(long, global = true, env = "CAMPUSKART_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging(cli.log_level.into(), cli.log_file.as_deref(), cli.log_json)?;

    let client = match build_client(&cli).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to initialize client: {e:#}");
            std::process::exit(1);
        }
    };

    match cli.command.execute(&client).await {
        Ok(()) => {
            debug!("Command completed successfully");
        }
        Err(e) => {
            error!("Command failed: {e:#}");
            std::process::exit(1);
        }
    }

    Ok(())
}

async fn build_client(cli: &Cli) -> Result<CampusClient> {
    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
    }
    debug!(
        base_url = %config.api.base_url,
        token_file = %config.session.token_file.display(),
        "Configuration loaded"
    );

    let store = Arc::new(FileTokenStore::new(config.session.token_file.clone()));
    let session = Session::load(store).await?.with_expiry_listener(Arc::new(|| {
        warn!("Session expired; run `campuskart login` to sign in again");
    }));

    let timeout = config.api.timeout();
    let mut builder = CampusClient::builder()
        .base_url(config.api.base_url)
        .session(Arc::new(session));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    Ok(builder.build()?)
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_client_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        let token_file = dir.path().join("session.json");
        std::fs::write(
            &config_path,
            format!(
                "[api]\nbase_url = \"https://file.example.com/api\"\ntimeout_secs = 5\n\n[session]\ntoken_file = {:?}\n",
                token_file.display().to_string()
            ),
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "campuskart",
            "--log-level",
            "debug",
            "--config",
            config_path.to_str().unwrap(),
            "--base-url",
            "https://flag.example.com/api",
            "status",
        ])
        .unwrap();

        assert_eq!(Level::from(cli.log_level), Level::DEBUG);
        let client = build_client(&cli).await.unwrap();
        assert_eq!(client.base_url(), "https://flag.example.com/api");
        assert!(!client.is_authenticated().await);
        assert!(matches!(cli.command, Commands::Status));
    }
}
