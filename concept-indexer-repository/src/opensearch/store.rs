//! OpenSearch implementation of the document store.
//!
//! Every verb translates transport failures into [`StoreError`] carrying the
//! upstream status when one was received. Upstream 404s on reads and deletes
//! are translated into in-band results.

use async_trait::async_trait;
use opensearch::cluster::ClusterHealthParts;
use opensearch::http::request::JsonBody;
use opensearch::http::response::Response;
use opensearch::http::StatusCode;
use opensearch::indices::IndicesGetSettingsParts;
use opensearch::{BulkParts, DeleteParts, GetParts, IndexParts, OpenSearch, ScrollParts, SearchParts};
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::StoreError;
use crate::interfaces::DocumentStore;
use crate::types::{
    BulkOperation, BulkSummary, ClusterHealth, DeleteOutcome, GetResult, IndexedResponse,
    ScrollPage, ScrollRequest, SearchHit,
};

/// Keep-alive window for scroll cursors.
const SCROLL_KEEP_ALIVE: &str = "5m";

/// Document store backed by an OpenSearch-compatible cluster.
pub struct OpenSearchStore {
    client: OpenSearch,
}

impl OpenSearchStore {
    pub fn new(client: OpenSearch) -> Self {
        Self { client }
    }

    /// Turn a non-success response into a transport error, draining the body
    /// for the message.
    async fn failure(response: Response) -> StoreError {
        let status = response.status_code().as_u16();
        let message = response.text().await.unwrap_or_default();
        StoreError::transport(status, message)
    }

    async fn body(response: Response) -> Result<Value, StoreError> {
        response
            .json::<Value>()
            .await
            .map_err(|err| StoreError::response(err.to_string()))
    }

    fn parse_get_result(id: &str, body: &Value) -> GetResult {
        GetResult {
            found: body["found"].as_bool().unwrap_or(false),
            id: body["_id"].as_str().unwrap_or(id).to_string(),
            source: body.get("_source").cloned(),
        }
    }

    fn parse_index_response(id: &str, body: &Value) -> IndexedResponse {
        IndexedResponse {
            id: body["_id"].as_str().unwrap_or(id).to_string(),
            version: body["_version"].as_i64().unwrap_or_default(),
            result: body["result"].as_str().unwrap_or_default().to_string(),
        }
    }

    fn parse_search_hits(body: &Value) -> Vec<SearchHit> {
        body["hits"]["hits"]
            .as_array()
            .map(|hits| {
                hits.iter()
                    .map(|hit| SearchHit {
                        id: hit["_id"].as_str().unwrap_or_default().to_string(),
                        source: hit.get("_source").cloned().unwrap_or(Value::Null),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn parse_scroll_page(body: &Value) -> Result<ScrollPage, StoreError> {
        let scroll_id = body["_scroll_id"]
            .as_str()
            .ok_or_else(|| StoreError::response("scroll response carried no _scroll_id"))?
            .to_string();

        Ok(ScrollPage {
            scroll_id,
            hits: Self::parse_search_hits(body),
        })
    }

    fn parse_bulk_summary(body: &Value) -> BulkSummary {
        BulkSummary {
            took: body["took"].as_i64().unwrap_or_default(),
            errors: body["errors"].as_bool().unwrap_or(false),
            items: body["items"].as_array().map(Vec::len).unwrap_or_default(),
        }
    }

    /// Expand operations into the action/payload line pairs of the bulk wire
    /// format.
    fn bulk_request_lines(operations: &[BulkOperation]) -> Vec<Value> {
        let mut lines = Vec::with_capacity(operations.len() * 2);
        for operation in operations {
            match operation {
                BulkOperation::Index { id, document } => {
                    lines.push(json!({"index": {"_id": id}}));
                    lines.push(document.clone());
                }
                BulkOperation::Update { id, patch } => {
                    lines.push(json!({"update": {"_id": id}}));
                    lines.push(json!({"doc": patch}));
                }
            }
        }
        lines
    }
}

#[async_trait]
impl DocumentStore for OpenSearchStore {
    async fn get_document(&self, index: &str, id: &str) -> Result<GetResult, StoreError> {
        let response = self
            .client
            .get(GetParts::IndexId(index, id))
            .send()
            .await
            .map_err(StoreError::from)?;

        if response.status_code() == StatusCode::NOT_FOUND {
            return Ok(GetResult::not_found(id));
        }
        if !response.status_code().is_success() {
            return Err(Self::failure(response).await);
        }

        let body = Self::body(response).await?;
        Ok(Self::parse_get_result(id, &body))
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        body: Value,
    ) -> Result<IndexedResponse, StoreError> {
        let response = self
            .client
            .index(IndexParts::IndexId(index, id))
            .body(body)
            .send()
            .await
            .map_err(StoreError::from)?;

        if !response.status_code().is_success() {
            return Err(Self::failure(response).await);
        }

        let body = Self::body(response).await?;
        debug!(id = %id, "indexed document");
        Ok(Self::parse_index_response(id, &body))
    }

    async fn delete_document(&self, index: &str, id: &str) -> Result<DeleteOutcome, StoreError> {
        let response = self
            .client
            .delete(DeleteParts::IndexId(index, id))
            .send()
            .await
            .map_err(StoreError::from)?;

        if response.status_code() == StatusCode::NOT_FOUND {
            return Ok(DeleteOutcome::NotFound);
        }
        if !response.status_code().is_success() {
            return Err(Self::failure(response).await);
        }

        debug!(id = %id, "deleted document");
        Ok(DeleteOutcome::Deleted)
    }

    async fn search_ids(&self, index: &str, ids: &[String]) -> Result<Vec<SearchHit>, StoreError> {
        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(json!({
                "query": {"ids": {"values": ids}},
                "size": ids.len(),
            }))
            .send()
            .await
            .map_err(StoreError::from)?;

        if !response.status_code().is_success() {
            return Err(Self::failure(response).await);
        }

        let body = Self::body(response).await?;
        Ok(Self::parse_search_hits(&body))
    }

    async fn scroll_start(&self, request: &ScrollRequest) -> Result<ScrollPage, StoreError> {
        let response = self
            .client
            .search(SearchParts::Index(&[request.index.as_str()]))
            .scroll(SCROLL_KEEP_ALIVE)
            .body(json!({
                "query": request.query,
                "sort": ["_doc"],
                "size": request.size,
                "_source": request.fetch_source,
            }))
            .send()
            .await
            .map_err(StoreError::from)?;

        if !response.status_code().is_success() {
            return Err(Self::failure(response).await);
        }

        let body = Self::body(response).await?;
        Self::parse_scroll_page(&body)
    }

    async fn scroll_next(&self, scroll_id: &str) -> Result<ScrollPage, StoreError> {
        let response = self
            .client
            .scroll(ScrollParts::None)
            .body(json!({
                "scroll": SCROLL_KEEP_ALIVE,
                "scroll_id": scroll_id,
            }))
            .send()
            .await
            .map_err(StoreError::from)?;

        if !response.status_code().is_success() {
            return Err(Self::failure(response).await);
        }

        let body = Self::body(response).await?;
        Self::parse_scroll_page(&body)
    }

    async fn bulk(
        &self,
        index: &str,
        operations: &[BulkOperation],
    ) -> Result<BulkSummary, StoreError> {
        let lines: Vec<JsonBody<Value>> = Self::bulk_request_lines(operations)
            .into_iter()
            .map(JsonBody::new)
            .collect();

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(lines)
            .send()
            .await
            .map_err(StoreError::from)?;

        if !response.status_code().is_success() {
            return Err(Self::failure(response).await);
        }

        let body = Self::body(response).await?;
        Ok(Self::parse_bulk_summary(&body))
    }

    async fn cluster_health(&self) -> Result<ClusterHealth, StoreError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(StoreError::from)?;

        if !response.status_code().is_success() {
            return Err(Self::failure(response).await);
        }

        let body = Self::body(response).await?;
        serde_json::from_value(body).map_err(|err| StoreError::response(err.to_string()))
    }

    async fn index_settings(&self, index: &str) -> Result<Value, StoreError> {
        let response = self
            .client
            .indices()
            .get_settings(IndicesGetSettingsParts::Index(&[index]))
            .send()
            .await
            .map_err(StoreError::from)?;

        if !response.status_code().is_success() {
            return Err(Self::failure(response).await);
        }

        Self::body(response).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let response = self.client.ping().send().await.map_err(StoreError::from)?;

        if !response.status_code().is_success() {
            return Err(Self::failure(response).await);
        }
        Ok(())
    }
}
