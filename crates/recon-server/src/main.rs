use std::sync::Arc;

use reconcile_core::{InMemoryStore, ReconConfig};
use reconcile_server::{routes, AppState};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let config = ReconConfig::load()?;
    tracing::info!(?config, "loaded reconciliation configuration");

    // Ingestion lives outside the core; the store starts empty and is
    // populated by whatever external collaborator owns ingestion in a
    // real deployment.
    let store = Arc::new(InMemoryStore::default());
    let state = AppState::new(store, config);

    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));
    let app = routes::router(state).layer(middleware);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(bind_addr, "reconciliation server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
