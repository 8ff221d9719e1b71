//! Document store trait definition.
//!
//! This is the seam between the indexing engine and the concrete search
//! cluster client: the engine is written against this trait, and tests
//! inject mock implementations.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::StoreError;
use crate::types::{
    BulkOperation, BulkSummary, ClusterHealth, DeleteOutcome, GetResult, IndexedResponse,
    ScrollPage, ScrollRequest, SearchHit,
};

/// Thin verb surface over the search cluster.
///
/// Implementations translate transport failures into [`StoreError`] and
/// upstream not-found replies into in-band results; they perform no retries
/// of their own.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document by id. A missing document yields
    /// `GetResult { found: false, .. }`, not an error.
    async fn get_document(&self, index: &str, id: &str) -> Result<GetResult, StoreError>;

    /// Write one document, replacing any existing document under `id`.
    async fn index_document(
        &self,
        index: &str,
        id: &str,
        body: Value,
    ) -> Result<IndexedResponse, StoreError>;

    /// Delete one document by id. A missing document yields
    /// [`DeleteOutcome::NotFound`], not an error.
    async fn delete_document(&self, index: &str, id: &str) -> Result<DeleteOutcome, StoreError>;

    /// Fetch the documents matching a set of ids.
    async fn search_ids(&self, index: &str, ids: &[String]) -> Result<Vec<SearchHit>, StoreError>;

    /// Open a scroll and return its first page.
    async fn scroll_start(&self, request: &ScrollRequest) -> Result<ScrollPage, StoreError>;

    /// Continue a scroll; a page with no hits signals the end of the scroll.
    async fn scroll_next(&self, scroll_id: &str) -> Result<ScrollPage, StoreError>;

    /// Issue a compound bulk request.
    async fn bulk(
        &self,
        index: &str,
        operations: &[BulkOperation],
    ) -> Result<BulkSummary, StoreError>;

    /// Read the cluster health status.
    async fn cluster_health(&self) -> Result<ClusterHealth, StoreError>;

    /// Read the settings of an index, keyed by concrete index name.
    async fn index_settings(&self, index: &str) -> Result<Value, StoreError>;

    /// Verify the cluster is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
