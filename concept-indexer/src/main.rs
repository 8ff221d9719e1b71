//! Concept indexer entry point.
//!
//! Wires the connection supplier, the indexing engine, and the HTTP surface
//! together and serves until shutdown.

use std::collections::HashSet;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use concept_indexer::config::AppConfig;
use concept_indexer::connection::{self, ConnectionConfig};
use concept_indexer::engine::IndexEngine;
use concept_indexer::health::HealthService;
use concept_indexer::resources::{api_router, AppState};
use dotenv::dotenv;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("concept_indexer=info,concept_indexer_repository=info")
    });

    let json_output = env::var("LOG_JSON").map(|value| value == "true").unwrap_or(false);
    if json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    info!(
        service_version = env!("CARGO_PKG_VERSION"),
        index = %config.index_name,
        concept_types = ?config.allowed_concept_types,
        "starting concept indexer"
    );

    // fatal when AWS credentials cannot be resolved on the first attempt
    let stores = connection::supply_stores(ConnectionConfig {
        endpoint: config.endpoint.clone(),
        region: config.region.clone(),
    })
    .await?;

    let engine = IndexEngine::new(&config.index_name, config.bulk.clone()).start(stores);
    let health = Arc::new(HealthService::new(
        Arc::clone(&engine),
        config.app_system_code.clone(),
    ));

    let state = AppState {
        engine: Arc::clone(&engine),
        health,
        allowed_concept_types: Arc::new(
            config.allowed_concept_types.iter().cloned().collect::<HashSet<_>>(),
        ),
        public_api_host: config.public_api_host.clone(),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, api_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(err) = engine.close_bulk().await {
        warn!(error = %err, "could not close the bulk processor cleanly");
    }
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("could not install the shutdown signal handler");
    }
}
