//! Access configuration for the transport-client factory.

use aws_credential_types::provider::SharedCredentialsProvider;
use aws_types::region::Region;

/// Region value selecting the unsigned local transport.
pub const LOCAL_REGION: &str = "local";

/// Connection parameters for the search cluster.
///
/// For any region other than [`LOCAL_REGION`] the factory signs requests
/// with AWS SigV4 and `credentials` must be supplied.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Cluster endpoint, e.g. `http://localhost:9200`.
    pub endpoint: String,
    /// AWS credentials for signed transports; `None` for local clusters.
    pub credentials: Option<SharedCredentialsProvider>,
}

impl AccessConfig {
    /// Configuration for an unsigned local cluster.
    pub fn local(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            credentials: None,
        }
    }

    /// Configuration for a SigV4-signed cluster.
    pub fn signed(endpoint: impl Into<String>, credentials: SharedCredentialsProvider) -> Self {
        Self {
            endpoint: endpoint.into(),
            credentials: Some(credentials),
        }
    }
}

/// Build the signing region for a configured region name.
pub fn signing_region(region: &str) -> Region {
    Region::new(region.to_string())
}
