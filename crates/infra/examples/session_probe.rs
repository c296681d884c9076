//! Example: Probing a backend through the session-aware client
//!
//! Loads configuration (environment first, then a config file), checks the
//! backend's health, and issues one GET through the full pipeline. If the
//! session has expired the client refreshes it and replays the call.
//!
//! # Usage
//!
//! ```bash
//! export ENCORE_API_BASE_URL=http://localhost:8000
//! cargo run -p encore-infra --example session_probe -- /api/liked-songs?limit=20
//! ```

use std::sync::Arc;

use anyhow::Context;
use encore_common::init_tracing;
use encore_infra::api::{ApiClient, BroadcastNavigator, RequestDescriptor};
use encore_infra::config;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::load().context("failed to load configuration")?;
    init_tracing(&config.logging.level, config.logging.json)?;

    let probe_path = std::env::args().nth(1).unwrap_or_else(|| "/api/auth/me".to_string());

    let navigator = Arc::new(BroadcastNavigator::default());
    let mut navigation = navigator.subscribe();

    let client = ApiClient::builder()
        .config(config)
        .navigator(navigator.clone())
        .build()
        .context("failed to build API client")?;

    match client.health_check().await {
        Ok(true) => info!(base_url = %client.config().api.base_url, "backend healthy"),
        Ok(false) => warn!(base_url = %client.config().api.base_url, "backend unhealthy"),
        Err(e) => warn!(error = %e, "health check failed"),
    }

    let response = client.send(RequestDescriptor::get(probe_path.as_str())).await?;
    info!(
        path = %probe_path,
        status = response.status().as_u16(),
        bytes = response.body().len(),
        "probe finished"
    );

    if let Ok(event) = navigation.try_recv() {
        warn!(from = %event.from, to = %event.to, "session lost; user would be sent to sign in");
    }

    Ok(())
}
