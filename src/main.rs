//! Chat Relay
//!
//! Entry point for the terminal chat client.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod repl;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use chat_relay::backend::HttpBackend;
use chat_relay::config::{AppConfig, Cli};
use chat_relay::session::{ChatSession, SessionOptions};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env (if present) before clap reads env-backed flags
    let _ = dotenv();

    let cli = Cli::parse();

    // Initialize tracing (M-LOG-STRUCTURED); stdout belongs to the transcript
    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = AppConfig::from_cli(&cli)?;
    let backend = HttpBackend::new(&config.endpoint)?;

    info!(
        name: "chat.config.loaded",
        endpoint = %backend.url(),
        environment = %config.app.environment,
        version = %config.app.version,
        attachments_enabled = config.chat.attachments_enabled,
        "Configuration loaded"
    );

    let session = ChatSession::new(
        Arc::new(backend),
        SessionOptions {
            attachments_enabled: config.chat.attachments_enabled,
        },
    );

    match cli.prompt {
        Some(prompt) => repl::run_once(&session, &prompt, &cli.files).await,
        None => repl::run(&session, &config.app).await,
    }
}
