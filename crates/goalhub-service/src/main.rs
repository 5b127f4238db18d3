//! Goalhub Service - HTTP API for turf bookings and M-Pesa payments
//!
//! This is the main entry point for the goalhub service.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use goalhub_service::{create_router, AppState, ServiceConfig};
use goalhub_store::{MemoryStore, PgStore, Store};

/// Connections in the PostgreSQL pool.
const DB_MAX_CONNECTIONS: u32 = 10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,goalhub=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Goalhub Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env()?;
    config.validate()?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        environment = %config.environment,
        mpesa_env = %config.mpesa.environment.as_str(),
        mpesa_configured = %config.mpesa.has_credentials(),
        callback_url = %config.callback_url(),
        auth_configured = %config.auth.is_configured(),
        database_configured = %config.database_url.is_some(),
        payment_reuse = ?config.payment_reuse,
        "Service configuration loaded"
    );

    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(url) => {
            tracing::info!("Connecting to PostgreSQL");
            Arc::new(PgStore::connect(url, DB_MAX_CONNECTIONS).await?)
        }
        None => {
            tracing::warn!("DATABASE_URL not set - using in-memory store, data will not persist");
            Arc::new(MemoryStore::new())
        }
    };

    // Build app state
    let state = AppState::new(store, config.clone())?;

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
