//! # Concept Indexer Repository
//!
//! This crate provides the document store adapter used by the indexing
//! engine: a thin verb surface over the search cluster, a transport-client
//! factory covering unsigned local clusters and SigV4-signed AWS clusters,
//! and the error taxonomy those operations translate transport failures into.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;

pub use config::{AccessConfig, LOCAL_REGION};
pub use errors::StoreError;
pub use interfaces::DocumentStore;
pub use opensearch::{new_document_store, OpenSearchStore};
pub use types::{
    BulkOperation, BulkSummary, ClusterHealth, DeleteOutcome, GetResult, IndexedResponse,
    ScrollPage, ScrollRequest, SearchHit,
};
