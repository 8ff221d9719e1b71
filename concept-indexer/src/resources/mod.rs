//! HTTP resources.
//!
//! The write API over the engine: single and bulk concept writes, metrics
//! patches, reads, deletes, the all-ids stream, and the health endpoints.

pub mod handlers;

use std::collections::HashSet;
use std::sync::Arc;

use axum::routing::{get, put};
use axum::Router;

use crate::engine::IndexEngine;
use crate::health::HealthService;

/// Shared state for the request handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<IndexEngine>,
    pub health: Arc<HealthService>,
    /// Concept types the index has mappings for; everything else is
    /// rejected before touching the engine.
    pub allowed_concept_types: Arc<HashSet<String>>,
    /// Scheme and host used when building thing and API URLs.
    pub public_api_host: String,
}

/// Build the service router.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/bulk/{concept_type}/{uuid}", put(handlers::write_bulk))
        .route("/{concept_type}/{uuid}/metrics", put(handlers::write_metrics))
        .route(
            "/{concept_type}/{uuid}",
            put(handlers::write_concept)
                .get(handlers::read_concept)
                .delete(handlers::delete_concept),
        )
        .route("/__ids", get(handlers::stream_ids))
        .route("/__health", get(handlers::health_check))
        .route("/__health-details", get(handlers::health_details))
        .route("/__gtg", get(handlers::good_to_go))
        .with_state(state)
}
