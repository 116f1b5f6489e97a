//! Data Copilot terminal client
//!
//! Entry point: loads configuration, wires the retrieval transport and the
//! history client into a chat session, and runs the interactive loop.

use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use mimalloc::MiMalloc;
use tracing::info;

use data_copilot::chat::{ChatSession, HttpRetrievalClient};
use data_copilot::config::AppConfig;
use data_copilot::history::HistoryClient;
use data_copilot::repl::Repl;
use data_copilot::telemetry;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    let config = AppConfig::load().context("Configuration error")?;
    telemetry::init(&config.logging);

    let http = reqwest::Client::new();
    let transport = HttpRetrievalClient::with_client(&config.retrieval.endpoint, http.clone())
        .context("Invalid retrieval endpoint")?;
    let history = HistoryClient::with_client(&config.history.base_url, http)
        .context("Invalid history base URL")?;

    info!(
        endpoint = %transport.endpoint(),
        history = %history.base_url(),
        mode = %config.chat.default_mode,
        "Starting data copilot"
    );

    let session = ChatSession::with_options(Arc::new(transport), config.session_options());
    Repl::new(session, history).run().await?;
    Ok(())
}
