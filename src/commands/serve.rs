//! Relay server command handler.

use crate::config::Config;
use crate::error::{KondateError, Result};
use crate::relay::{self, AppState, InMemorySessionStore};
use crate::vendor::{DifyClient, VendorClient};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Run the relay server until interrupted
///
/// # Arguments
///
/// * `config` - Global configuration
/// * `addr_override` - Optional listen address from the CLI
pub async fn run_serve(config: Config, addr_override: Option<String>) -> Result<()> {
    let addr = addr_override.unwrap_or_else(|| config.server.addr.clone());
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| KondateError::Config(format!("Invalid listen address: {}", e)))?;

    let vendor = Arc::new(DifyClient::new(&config.vendor)?);
    if !vendor.is_configured() {
        warn!("No vendor API key configured; chat requests will fail until DIFY_API_KEY is set");
    }

    let state = AppState::new(vendor, Arc::new(InMemorySessionStore::new()));
    let app = relay::router(state);

    info!(%addr, api_url = %config.vendor.api_url, "Relay listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
