//! Command-line flags and layered configuration.
//!
//! Precedence, lowest first: built-in defaults, `./chat-relay.yaml` (if
//! present), the file named by `--config`, `CHAT_`-prefixed environment
//! variables (e.g. `CHAT_ENDPOINT__BASE_URL`), then CLI flags and their
//! dedicated env vars (`API_BASE_URL`, `API_PATH`, ...).

use std::path::PathBuf;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

/// Backend used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str =
    "https://fastapi-dev.calmdesert-eab0db8f.eastus.azurecontainerapps.io";

/// Chat route used when nothing else is configured.
pub const DEFAULT_PATH: &str = "/chat";

/// Optional config file picked up from the working directory.
const LOCAL_CONFIG_FILE: &str = "chat-relay";

#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Base URL of the chat backend
    #[arg(long, env = "API_BASE_URL")]
    pub base_url: Option<String>,

    /// Route appended to the base URL
    #[arg(long, env = "API_PATH")]
    pub path: Option<String>,

    /// Environment name shown in the banner
    #[arg(long, env = "APP_ENV")]
    pub environment: Option<String>,

    /// Version string shown in the banner
    #[arg(long, env = "APP_VERSION")]
    pub app_version: Option<String>,

    /// Allow staging file attachments
    #[arg(long, env = "ATTACHMENTS_ENABLED")]
    pub attachments_enabled: Option<bool>,

    /// Send a single prompt and exit instead of starting the console
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// File to attach to the one-shot prompt (repeatable)
    #[arg(short, long = "file")]
    pub files: Vec<PathBuf>,

    /// Log at info level instead of warn
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub endpoint: EndpointConfig,
    pub app: AppInfo,
    pub chat: ChatConfig,
}

/// Where prompts are sent.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub base_url: String,
    pub path: String,
}

/// Display-only values.
#[derive(Debug, Deserialize, Clone)]
pub struct AppInfo {
    pub environment: String,
    pub version: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    pub attachments_enabled: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            path: DEFAULT_PATH.to_string(),
        }
    }
}

impl EndpointConfig {
    pub fn new(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: path.into(),
        }
    }

    /// The request target: base and path joined by exactly one slash.
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }
}

impl AppConfig {
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Self::from_cli(&cli)
    }

    pub fn from_cli(cli: &Cli) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder()
            .set_default("endpoint.base_url", DEFAULT_BASE_URL)?
            .set_default("endpoint.path", DEFAULT_PATH)?
            .set_default("app.environment", "development")?
            .set_default("app.version", env!("CARGO_PKG_VERSION"))?
            .set_default("chat.attachments_enabled", true)?;

        builder = builder.add_source(File::with_name(LOCAL_CONFIG_FILE).required(false));
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("CHAT")
                .prefix_separator("_")
                .separator("__"),
        );

        // Flags win over everything; clap has already folded in their env vars.
        if let Some(base_url) = &cli.base_url {
            builder = builder.set_override("endpoint.base_url", base_url.as_str())?;
        }
        if let Some(path) = &cli.path {
            builder = builder.set_override("endpoint.path", path.as_str())?;
        }
        if let Some(environment) = &cli.environment {
            builder = builder.set_override("app.environment", environment.as_str())?;
        }
        if let Some(version) = &cli.app_version {
            builder = builder.set_override("app.version", version.as_str())?;
        }
        if let Some(enabled) = cli.attachments_enabled {
            builder = builder.set_override("chat.attachments_enabled", enabled)?;
        }

        builder.build()?.try_deserialize()
    }
}
