//! Connection supplier.
//!
//! Delivers connected document stores on a channel: a connection attempt
//! that succeeds (the cluster answers a ping) emits a value; a failed
//! attempt is retried every minute without bound. For signed regions the
//! AWS credential chain is resolved once, before the retry loop starts, and
//! a failure there is fatal to startup.

use std::sync::Arc;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use concept_indexer_repository::{
    new_document_store, AccessConfig, DocumentStore, StoreError, LOCAL_REGION,
};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{error, info};

const RETRY_INTERVAL: Duration = Duration::from_secs(60);

/// Where and how to reach the search cluster.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub endpoint: String,
    pub region: String,
}

/// Start the supplier and return the channel clients are delivered on.
///
/// The background task stops after the first successful connection; forcing
/// a reconnect means starting a new supplier against the same engine.
pub async fn supply_stores(
    config: ConnectionConfig,
) -> Result<mpsc::Receiver<Arc<dyn DocumentStore>>, StoreError> {
    let credentials = if config.region == LOCAL_REGION {
        None
    } else {
        Some(resolve_credentials().await?)
    };

    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        loop {
            match connect(&config, credentials.clone()).await {
                Ok(store) => {
                    info!(endpoint = %config.endpoint, "connected to search cluster");
                    let _ = tx.send(store).await;
                    return;
                }
                Err(err) => {
                    error!(endpoint = %config.endpoint, error = %err, "could not connect to search cluster");
                    sleep(RETRY_INTERVAL).await;
                }
            }
        }
    });

    Ok(rx)
}

async fn connect(
    config: &ConnectionConfig,
    credentials: Option<SharedCredentialsProvider>,
) -> Result<Arc<dyn DocumentStore>, StoreError> {
    let access = AccessConfig {
        endpoint: config.endpoint.clone(),
        credentials,
    };
    let store = new_document_store(&config.region, access)?;
    store.ping().await?;
    Ok(Arc::new(store))
}

async fn resolve_credentials() -> Result<SharedCredentialsProvider, StoreError> {
    let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let provider = sdk_config
        .credentials_provider()
        .ok_or_else(|| StoreError::config("no AWS credentials provider configured"))?;

    provider
        .provide_credentials()
        .await
        .map_err(|err| StoreError::config(format!("failed to obtain AWS credentials: {err}")))?;
    info!("obtained AWS credentials");

    Ok(provider)
}
