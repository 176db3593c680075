//! `bizcanvas serve` — start the HTTP gateway.

use anyhow::Context;
use std::path::Path;
use tracing::info;

use bizcanvas_config::AppConfig;

pub async fn run(config_path: Option<&Path>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = AppConfig::load(config_path).context("Failed to load configuration")?;

    if let Some(port) = port {
        config.gateway.port = port;
    }

    if !config.has_api_key() {
        info!("No GROQ_API_KEY set — chat endpoints will return errors until one is provided");
    }

    info!(
        model = %config.model,
        summary_model = %config.summary_model,
        port = config.gateway.port,
        "Starting BizCanvas gateway"
    );

    bizcanvas_gateway::start(config)
        .await
        .map_err(|e| anyhow::anyhow!("Gateway failed: {e}"))
}
