use std::path::Path;
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::chat::{QueryMode, SessionOptions};

/// Config file picked up from the working directory when none is given.
const DEFAULT_CONFIG_FILE: &str = "copilot.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Retrieval endpoint that streams answers
    #[arg(long, env = "RETRIEVAL_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Base URL of the chat history API
    #[arg(long, env = "HISTORY_BASE_URL")]
    pub history_url: Option<String>,

    /// Initial query mode (structured or unstructured)
    #[arg(long, env = "QUERY_MODE")]
    pub mode: Option<QueryMode>,

    /// Give up on a turn after this many seconds without data
    #[arg(long, env = "CHUNK_TIMEOUT_SECS")]
    pub chunk_timeout_secs: Option<u64>,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON")]
    pub log_json: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub retrieval: RetrievalConfig,
    pub history: HistoryConfig,
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    pub endpoint: String,
    #[serde(default)]
    pub chunk_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    pub default_mode: QueryMode,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub filter: String,
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        // 1. Defaults
        let mut builder = Config::builder()
            .set_default("retrieval.endpoint", "http://localhost:8000/retrieval")?
            .set_default("history.base_url", "http://localhost:8000/api")?
            .set_default("chat.default_mode", QueryMode::default().as_str())?
            .set_default("logging.filter", "info")?
            .set_default("logging.json", false)?;

        // 2. Config file: explicit path must exist, the cwd fallback is optional
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path).required(true));
        } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
            builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false));
        }

        // 3. Environment, e.g. COPILOT_RETRIEVAL__ENDPOINT
        builder = builder.add_source(
            Environment::with_prefix("COPILOT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. CLI flags (and their plain env vars via clap) win
        if let Some(endpoint) = cli.endpoint {
            builder = builder.set_override("retrieval.endpoint", endpoint)?;
        }
        if let Some(url) = cli.history_url {
            builder = builder.set_override("history.base_url", url)?;
        }
        if let Some(mode) = cli.mode {
            builder = builder.set_override("chat.default_mode", mode.as_str())?;
        }
        if let Some(secs) = cli.chunk_timeout_secs {
            builder = builder.set_override("retrieval.chunk_timeout_secs", secs)?;
        }
        if let Some(json) = cli.log_json {
            builder = builder.set_override("logging.json", json)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }

    /// Engine settings derived from this configuration.
    #[must_use]
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            mode: self.chat.default_mode,
            chunk_timeout: self
                .retrieval
                .chunk_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }
}
