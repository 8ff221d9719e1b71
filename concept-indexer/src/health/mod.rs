//! Health probe.
//!
//! Read-only view over the engine for the health endpoints: the service is
//! good to go when the cluster reports green or yellow. Not part of the
//! write path.

use std::sync::Arc;

use concept_indexer_repository::ClusterHealth;
use serde::Serialize;

use crate::engine::IndexEngine;
use crate::errors::EngineError;

const CLUSTER_HEALTH_CHECK_ID: &str = "check-search-cluster-health";
const CONNECTIVITY_CHECK_ID: &str = "check-connectivity-to-search-cluster";

/// One health check outcome.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub id: String,
    pub name: String,
    pub ok: bool,
    pub severity: u8,
    #[serde(rename = "checkOutput")]
    pub output: String,
}

/// Aggregated health report served on `/__health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub name: String,
    #[serde(rename = "systemCode")]
    pub system_code: String,
    pub ok: bool,
    pub checks: Vec<CheckResult>,
}

/// Health facade over the engine.
pub struct HealthService {
    engine: Arc<IndexEngine>,
    system_code: String,
}

impl HealthService {
    pub fn new(engine: Arc<IndexEngine>, system_code: impl Into<String>) -> Self {
        Self {
            engine,
            system_code: system_code.into(),
        }
    }

    /// Raw cluster health, for `/__health-details`.
    pub async fn details(&self) -> Result<ClusterHealth, EngineError> {
        self.engine.cluster_health().await
    }

    /// Whether writes to the index are blocked, with the concrete index
    /// name the setting was read from.
    pub async fn index_read_only(&self) -> Result<(bool, String), EngineError> {
        self.engine.is_index_read_only().await
    }

    /// Good-to-go gate: `Err` carries the reason the service should be
    /// taken out of rotation.
    pub async fn good_to_go(&self) -> Result<(), String> {
        match self.engine.cluster_health().await {
            Ok(health) if health.is_healthy() => Ok(()),
            Ok(health) => Err(format!(
                "gtg failed for {CLUSTER_HEALTH_CHECK_ID}, reason: cluster health is {}",
                health.status
            )),
            Err(err) => Err(format!(
                "gtg failed for {CONNECTIVITY_CHECK_ID}, reason: {err}"
            )),
        }
    }

    /// Full check report; always served with 200, the per-check `ok` flags
    /// carry the state.
    pub async fn report(&self) -> HealthReport {
        let health = self.engine.cluster_health().await;

        let connectivity = CheckResult {
            id: CONNECTIVITY_CHECK_ID.to_string(),
            name: "Search cluster connectivity".to_string(),
            ok: health.is_ok(),
            severity: 1,
            output: match &health {
                Ok(_) => "Successfully connected to the cluster".to_string(),
                Err(err) => err.to_string(),
            },
        };

        let cluster = CheckResult {
            id: CLUSTER_HEALTH_CHECK_ID.to_string(),
            name: "Search cluster health".to_string(),
            ok: matches!(&health, Ok(health) if health.is_healthy()),
            severity: 1,
            output: match &health {
                Ok(health) => format!("Cluster is {}", health.status),
                Err(err) => err.to_string(),
            },
        };

        let ok = connectivity.ok && cluster.ok;
        HealthReport {
            name: "Concept Indexer".to_string(),
            system_code: self.system_code.clone(),
            ok,
            checks: vec![connectivity, cluster],
        }
    }
}
