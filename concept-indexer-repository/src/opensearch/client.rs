//! Transport-client factory.
//!
//! `region == "local"` yields an unsigned HTTP client; any other region
//! yields a client signing requests with AWS SigV4 for service `es`. The
//! transport uses a single-node connection pool, so no sniffing takes place.

use opensearch::auth::Credentials;
use opensearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use opensearch::OpenSearch;
use tracing::info;
use url::Url;

use crate::config::{signing_region, AccessConfig, LOCAL_REGION};
use crate::errors::StoreError;
use crate::opensearch::store::OpenSearchStore;

/// Service name used when signing requests against AWS-hosted clusters.
const SIGNING_SERVICE: &str = "es";

/// Build a document store for the given region and access configuration.
pub fn new_document_store(
    region: &str,
    config: AccessConfig,
) -> Result<OpenSearchStore, StoreError> {
    let endpoint =
        Url::parse(&config.endpoint).map_err(|err| StoreError::config(err.to_string()))?;

    let pool = SingleNodeConnectionPool::new(endpoint);
    let mut builder = TransportBuilder::new(pool).disable_proxy();

    if region == LOCAL_REGION {
        info!(endpoint = %config.endpoint, "connecting with default transport");
    } else {
        let provider = config.credentials.ok_or_else(|| {
            StoreError::config("AWS credentials are required for signed transports")
        })?;
        info!(endpoint = %config.endpoint, region = %region, "connecting with SigV4 signing transport");
        builder = builder
            .auth(Credentials::AwsSigV4(provider, signing_region(region)))
            .service_name(SIGNING_SERVICE);
    }

    let transport = builder
        .build()
        .map_err(|err| StoreError::config(err.to_string()))?;

    Ok(OpenSearchStore::new(OpenSearch::new(transport)))
}
