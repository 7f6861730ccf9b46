//! workspace-relay server entry point.
//!
//! Starts the Axum server with the WebSocket relay endpoint.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use workspace_relay::api;
use workspace_relay::app_state::AppState;
use workspace_relay::config::RelayConfig;
use workspace_relay::domain::SessionRegistry;
use workspace_relay::persistence::{MemoryStore, PostgresStore, Store};
use workspace_relay::ws::router::ActionRouter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = RelayConfig::from_env().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    tracing::info!(addr = %config.listen_addr, "starting workspace-relay");

    // Pick the store backend
    let store: Arc<dyn Store> = if config.persistence_enabled {
        let store = PostgresStore::connect(&config).await?;
        store.migrate().await?;
        Arc::new(store)
    } else {
        tracing::warn!("persistence disabled, running on the in-memory store");
        Arc::new(MemoryStore::new())
    };

    // Build the relay core
    let registry = Arc::new(SessionRegistry::new());
    let router = Arc::new(ActionRouter::new(store, Arc::clone(&registry)));

    let app_state = AppState {
        router,
        registry,
        session_queue_capacity: config.session_queue_capacity,
    };

    let app = api::build_router(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
