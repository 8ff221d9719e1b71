//! Environment-driven configuration.

use std::env;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::engine::BulkConfig;

const DEFAULT_APP_SYSTEM_CODE: &str = "concept-indexer";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_ENDPOINT: &str = "http://localhost:9200";
const DEFAULT_REGION: &str = "local";
const DEFAULT_INDEX_NAME: &str = "concepts";
const DEFAULT_BULK_WORKERS: usize = 2;
const DEFAULT_BULK_REQUESTS: usize = 1000;
const DEFAULT_BULK_BYTES: usize = 2 << 20;
const DEFAULT_BULK_FLUSH_SECS: u64 = 10;

/// Concept types the index has mappings for.
const DEFAULT_CONCEPT_TYPES: &str = "genres,topics,sections,subjects,locations,brands,\
organisations,people,alphaville-series,memberships,fta-brands,fta-genres,fta-topics";

/// Configuration failures detected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is required")]
    Missing { name: &'static str },

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Runtime configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_system_code: String,
    pub port: u16,
    pub endpoint: String,
    pub region: String,
    pub index_name: String,
    /// Scheme and host used when building thing and API URLs.
    pub public_api_host: String,
    pub allowed_concept_types: Vec<String>,
    pub bulk: BulkConfig,
}

impl AppConfig {
    /// Read the configuration from the environment.
    ///
    /// `PUBLIC_API_HOST` is required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let public_api_host =
            env::var("PUBLIC_API_HOST").map_err(|_| ConfigError::Missing {
                name: "PUBLIC_API_HOST",
            })?;
        Url::parse(&public_api_host).map_err(|err| ConfigError::Invalid {
            name: "PUBLIC_API_HOST",
            reason: err.to_string(),
        })?;

        Ok(Self {
            app_system_code: var_or("APP_SYSTEM_CODE", DEFAULT_APP_SYSTEM_CODE),
            port: parsed_var("PORT", DEFAULT_PORT),
            endpoint: var_or("SEARCH_CLUSTER_ENDPOINT", DEFAULT_ENDPOINT),
            region: var_or("SEARCH_CLUSTER_REGION", DEFAULT_REGION),
            index_name: var_or("SEARCH_INDEX", DEFAULT_INDEX_NAME),
            public_api_host,
            allowed_concept_types: parse_concept_types(&var_or(
                "ALLOWED_CONCEPT_TYPES",
                DEFAULT_CONCEPT_TYPES,
            )),
            bulk: BulkConfig {
                workers: parsed_var("BULK_WORKERS", DEFAULT_BULK_WORKERS),
                max_requests: parsed_var("BULK_REQUESTS", DEFAULT_BULK_REQUESTS),
                max_bytes: parsed_var("BULK_SIZE_BYTES", DEFAULT_BULK_BYTES),
                flush_interval: Duration::from_secs(parsed_var(
                    "BULK_FLUSH_INTERVAL_SECS",
                    DEFAULT_BULK_FLUSH_SECS,
                )),
            },
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// Split a comma-separated concept type list, dropping empty entries.
pub fn parse_concept_types(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concept_type_list_is_split_and_trimmed() {
        let types = parse_concept_types("brands, people,,memberships ");
        assert_eq!(
            types,
            vec![
                "brands".to_string(),
                "people".to_string(),
                "memberships".to_string()
            ]
        );
    }

    #[test]
    fn default_concept_types_include_the_write_path_types() {
        let types = parse_concept_types(DEFAULT_CONCEPT_TYPES);
        assert!(types.contains(&"memberships".to_string()));
        assert!(types.contains(&"people".to_string()));
        assert!(types.contains(&"organisations".to_string()));
        assert_eq!(types.len(), 13);
    }
}
