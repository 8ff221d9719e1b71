//! Request and response types for document store operations.

use serde_json::Value;

/// Result of a single-document read.
///
/// A missing document is reported in-band (`found == false`), never as an
/// error.
#[derive(Debug, Clone, PartialEq)]
pub struct GetResult {
    pub found: bool,
    pub id: String,
    /// The document source, when found and fetched.
    pub source: Option<Value>,
}

impl GetResult {
    /// A read that located no document.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self {
            found: false,
            id: id.into(),
            source: None,
        }
    }
}

/// Version metadata returned by a successful index operation.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedResponse {
    pub id: String,
    pub version: i64,
    /// Upstream result verb, e.g. `created` or `updated`.
    pub result: String,
}

/// Outcome of a delete operation; a missing document is in-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// One hit from a search or scroll page.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    /// Hit source; `Value::Null` when `_source` was not fetched.
    pub source: Value,
}

/// Parameters opening a scroll over an index.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollRequest {
    pub index: String,
    pub query: Value,
    pub size: i64,
    /// Whether to fetch `_source` for each hit.
    pub fetch_source: bool,
}

/// One page of a scroll; an empty `hits` list signals the end of the scroll.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollPage {
    pub scroll_id: String,
    pub hits: Vec<SearchHit>,
}

/// A queueable bulk operation.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    /// Full document replacement.
    Index { id: String, document: Value },
    /// Partial-document update.
    Update { id: String, patch: Value },
}

impl BulkOperation {
    /// The target document id.
    pub fn id(&self) -> &str {
        match self {
            Self::Index { id, .. } | Self::Update { id, .. } => id,
        }
    }

    /// Approximate serialized size, used by the bulk processor's byte
    /// threshold.
    pub fn byte_len(&self) -> usize {
        let payload = match self {
            Self::Index { document, .. } => document,
            Self::Update { patch, .. } => patch,
        };
        serde_json::to_string(payload).map(|body| body.len()).unwrap_or(0)
    }
}

/// Summary of a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkSummary {
    pub took: i64,
    /// True when at least one item in the batch failed.
    pub errors: bool,
    pub items: usize,
}

/// Cluster health as reported by the search cluster.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClusterHealth {
    pub status: String,
    #[serde(rename = "cluster_name", default)]
    pub cluster_name: String,
}

impl ClusterHealth {
    /// Whether the cluster is in a state the write path considers healthy.
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.as_str(), "green" | "yellow")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn not_found_result_has_no_source() {
        let result = GetResult::not_found("4ebbd9c4-3bb7-4d18-a14c-4c45aac5d966");
        assert!(!result.found);
        assert!(result.source.is_none());
    }

    #[test]
    fn bulk_operation_byte_len_tracks_payload_size() {
        let op = BulkOperation::Index {
            id: "id".to_string(),
            document: json!({"prefLabel": "Apple"}),
        };
        assert_eq!(op.byte_len(), r#"{"prefLabel":"Apple"}"#.len());
    }

    #[test]
    fn cluster_health_accepts_yellow() {
        assert!(ClusterHealth {
            status: "yellow".to_string(),
            cluster_name: String::new()
        }
        .is_healthy());
        assert!(!ClusterHealth {
            status: "red".to_string(),
            cluster_name: String::new()
        }
        .is_healthy());
    }
}
