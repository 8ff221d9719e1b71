//! Integration tests for the indexing engine.
//!
//! These drive the real engine and bulk processor against a stateful mock
//! document store, covering the write semantics (membership rerouting,
//! author detection, metrics preservation), concordance cleanup, the all-ids
//! stream, and the client lifecycle.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use concept_indexer::engine::{
    BulkConfig, IndexEngine, COLUMNIST_ROLE_UUID, FT_ORGANISATION_UUID, JOURNALIST_ROLE_UUID,
};
use concept_indexer::errors::EngineError;
use concept_indexer::health::HealthService;
use concept_indexer_repository::{
    BulkOperation, BulkSummary, ClusterHealth, DeleteOutcome, DocumentStore, GetResult,
    IndexedResponse, ScrollPage, ScrollRequest, SearchHit, StoreError,
};
use concept_indexer_shared::{
    AggregateConceptModel, Concept, ConceptDocument, IndexDocument, MembershipDocument,
    SourceConcept,
};
use serde_json::{json, Value};

const INDEX_NAME: &str = "concepts";
const PERSON_UUID: &str = "d52dcaa7-3d13-4b63-a9bd-a0d2d4b71f24";
const BRAND_UUID: &str = "8ff78ddc-7081-47c9-9d9b-d66b4323f12b";

/// Stateful in-memory document store.
#[derive(Default)]
struct MockStore {
    documents: Mutex<HashMap<String, Value>>,
    indexed: Mutex<Vec<(String, Value)>>,
    deleted: Mutex<Vec<String>>,
    bulk_batches: Mutex<Vec<Vec<BulkOperation>>>,
    searched_ids: Mutex<Vec<Vec<String>>>,
    scroll_requests: Mutex<Vec<ScrollRequest>>,
    scroll_pages: Mutex<VecDeque<ScrollPage>>,
    settings: Mutex<Value>,
    health_status: Mutex<String>,
    fail_get: Mutex<bool>,
    fail_index: Mutex<bool>,
}

impl MockStore {
    fn with_document(self, id: &str, source: Value) -> Self {
        self.documents.lock().unwrap().insert(id.to_string(), source);
        self
    }

    fn with_scroll_pages(self, pages: Vec<ScrollPage>) -> Self {
        *self.scroll_pages.lock().unwrap() = pages.into();
        self
    }

    fn indexed(&self) -> Vec<(String, Value)> {
        self.indexed.lock().unwrap().clone()
    }

    fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    fn bulk_operations(&self) -> Vec<BulkOperation> {
        self.bulk_batches.lock().unwrap().iter().flatten().cloned().collect()
    }

    fn next_scroll_page(&self) -> ScrollPage {
        self.scroll_pages.lock().unwrap().pop_front().unwrap_or(ScrollPage {
            scroll_id: "cursor-end".to_string(),
            hits: Vec::new(),
        })
    }
}

#[async_trait]
impl DocumentStore for MockStore {
    async fn get_document(&self, _index: &str, id: &str) -> Result<GetResult, StoreError> {
        if *self.fail_get.lock().unwrap() {
            return Err(StoreError::transport(500, "read refused"));
        }
        match self.documents.lock().unwrap().get(id) {
            Some(source) => Ok(GetResult {
                found: true,
                id: id.to_string(),
                source: Some(source.clone()),
            }),
            None => Ok(GetResult::not_found(id)),
        }
    }

    async fn index_document(
        &self,
        _index: &str,
        id: &str,
        body: Value,
    ) -> Result<IndexedResponse, StoreError> {
        if *self.fail_index.lock().unwrap() {
            return Err(StoreError::transport(503, "write refused"));
        }
        self.indexed.lock().unwrap().push((id.to_string(), body.clone()));
        self.documents.lock().unwrap().insert(id.to_string(), body);
        Ok(IndexedResponse {
            id: id.to_string(),
            version: 1,
            result: "created".to_string(),
        })
    }

    async fn delete_document(&self, _index: &str, id: &str) -> Result<DeleteOutcome, StoreError> {
        self.deleted.lock().unwrap().push(id.to_string());
        match self.documents.lock().unwrap().remove(id) {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Ok(DeleteOutcome::NotFound),
        }
    }

    async fn search_ids(&self, _index: &str, ids: &[String]) -> Result<Vec<SearchHit>, StoreError> {
        self.searched_ids.lock().unwrap().push(ids.to_vec());
        let documents = self.documents.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| {
                documents.get(id).map(|source| SearchHit {
                    id: id.clone(),
                    source: source.clone(),
                })
            })
            .collect())
    }

    async fn scroll_start(&self, request: &ScrollRequest) -> Result<ScrollPage, StoreError> {
        self.scroll_requests.lock().unwrap().push(request.clone());
        Ok(self.next_scroll_page())
    }

    async fn scroll_next(&self, _scroll_id: &str) -> Result<ScrollPage, StoreError> {
        Ok(self.next_scroll_page())
    }

    async fn bulk(
        &self,
        _index: &str,
        operations: &[BulkOperation],
    ) -> Result<BulkSummary, StoreError> {
        self.bulk_batches.lock().unwrap().push(operations.to_vec());
        Ok(BulkSummary {
            took: 1,
            errors: false,
            items: operations.len(),
        })
    }

    async fn cluster_health(&self) -> Result<ClusterHealth, StoreError> {
        Ok(ClusterHealth {
            status: self.health_status.lock().unwrap().clone(),
            cluster_name: "search-cluster".to_string(),
        })
    }

    async fn index_settings(&self, _index: &str) -> Result<Value, StoreError> {
        Ok(self.settings.lock().unwrap().clone())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Bulk configuration that flushes every operation immediately.
fn eager_bulk() -> BulkConfig {
    BulkConfig {
        workers: 1,
        max_requests: 1,
        max_bytes: usize::MAX,
        flush_interval: Duration::from_secs(600),
    }
}

async fn engine_with(store: Arc<MockStore>) -> Arc<IndexEngine> {
    let engine = Arc::new(IndexEngine::new(INDEX_NAME, eager_bulk()));
    engine.set_client(store).await;
    engine
}

fn ft_membership(person_id: &str, organisation_id: &str, roles: Vec<&str>) -> IndexDocument {
    IndexDocument::Membership(MembershipDocument {
        id: "cd7e4345-f11f-41f3-a0f0-2cf5c43e0115".to_string(),
        person_id: person_id.to_string(),
        organisation_id: organisation_id.to_string(),
        memberships: roles.into_iter().map(str::to_string).collect(),
    })
}

fn brand_document(uuid: &str) -> IndexDocument {
    IndexDocument::Concept(ConceptDocument {
        id: format!("http://api.ft.com/things/{uuid}"),
        concept_type: Some("brands".to_string()),
        api_url: format!("http://api.ft.com/brands/{uuid}"),
        pref_label: "A brand".to_string(),
        last_modified: "2024-06-01T10:00:00Z".to_string(),
        publish_reference: "tid_test".to_string(),
        ..Default::default()
    })
}

#[tokio::test]
async fn operations_fail_while_no_client_is_set() {
    let engine = Arc::new(IndexEngine::new(INDEX_NAME, eager_bulk()));

    let write = engine
        .write("brands", BRAND_UUID, brand_document(BRAND_UUID))
        .await;
    assert!(matches!(write, Err(EngineError::Unavailable)));
    assert!(matches!(
        engine.read(BRAND_UUID).await,
        Err(EngineError::Unavailable)
    ));
    assert!(matches!(
        engine.delete("brands", BRAND_UUID).await,
        Err(EngineError::Unavailable)
    ));
    assert!(matches!(
        engine.close_bulk().await,
        Err(EngineError::Unavailable)
    ));
}

#[tokio::test]
async fn membership_outside_the_ft_organisation_is_dropped() {
    let store = Arc::new(MockStore::default());
    let engine = engine_with(Arc::clone(&store)).await;

    let membership = ft_membership(
        PERSON_UUID,
        "fa2bf4bc-1b21-4c7c-ac0f-e1f56d0bd123",
        vec![COLUMNIST_ROLE_UUID],
    );
    let outcome = engine
        .write("memberships", "cd7e4345-f11f-41f3-a0f0-2cf5c43e0115", membership)
        .await
        .unwrap();

    assert!(!outcome.updated);
    assert!(outcome.response.is_none());
    assert!(store.indexed().is_empty());
    assert!(store.bulk_operations().is_empty());
}

#[tokio::test]
async fn membership_without_an_author_role_is_dropped() {
    let store = Arc::new(MockStore::default());
    let engine = engine_with(Arc::clone(&store)).await;

    let membership = ft_membership(
        PERSON_UUID,
        FT_ORGANISATION_UUID,
        vec!["c9731a75-9b4f-4eed-a4c0-9c58b1a1612f"],
    );
    let outcome = engine
        .write("memberships", "cd7e4345-f11f-41f3-a0f0-2cf5c43e0115", membership)
        .await
        .unwrap();

    assert!(!outcome.updated);
    assert!(store.indexed().is_empty());
}

#[tokio::test]
async fn author_membership_writes_a_person_document_when_none_exists() {
    let store = Arc::new(MockStore::default());
    let engine = engine_with(Arc::clone(&store)).await;

    let membership = ft_membership(PERSON_UUID, FT_ORGANISATION_UUID, vec![COLUMNIST_ROLE_UUID]);
    let outcome = engine
        .write("memberships", "cd7e4345-f11f-41f3-a0f0-2cf5c43e0115", membership)
        .await
        .unwrap();

    assert!(outcome.updated);
    assert!(outcome.response.is_some());

    let indexed = store.indexed();
    assert_eq!(indexed.len(), 1);
    let (id, body) = &indexed[0];
    assert_eq!(id, PERSON_UUID);
    assert_eq!(body["id"], json!(PERSON_UUID));
    assert_eq!(body["type"], json!("people"));
    assert_eq!(body["isFTAuthor"], json!("true"));
    assert!(body["lastModified"].as_str().is_some());
}

#[tokio::test]
async fn author_membership_patches_an_existing_person_document() {
    let store = Arc::new(MockStore::default().with_document(
        PERSON_UUID,
        json!({
            "id": PERSON_UUID,
            "type": "people",
            "isFTAuthor": "false",
            "metrics": {"annotationsCount": 150, "prevWeekAnnotationsCount": 15},
        }),
    ));
    let engine = engine_with(Arc::clone(&store)).await;

    let membership = ft_membership(PERSON_UUID, FT_ORGANISATION_UUID, vec![JOURNALIST_ROLE_UUID]);
    let outcome = engine
        .write("memberships", "cd7e4345-f11f-41f3-a0f0-2cf5c43e0115", membership)
        .await
        .unwrap();

    assert!(outcome.updated);
    assert!(outcome.response.is_none());
    assert!(store.indexed().is_empty());

    engine.close_bulk().await.unwrap();
    let operations = store.bulk_operations();
    assert_eq!(operations.len(), 1);
    match &operations[0] {
        BulkOperation::Update { id, patch } => {
            assert_eq!(id, PERSON_UUID);
            assert_eq!(patch["isFTAuthor"], json!("true"));
            assert_eq!(patch["metrics"]["annotationsCount"], json!(150));
        }
        other => panic!("expected an update operation, got {other:?}"),
    }
}

#[tokio::test]
async fn write_restores_prior_metrics_through_the_bulk_processor() {
    let store = Arc::new(MockStore::default().with_document(
        BRAND_UUID,
        json!({
            "id": format!("http://api.ft.com/things/{BRAND_UUID}"),
            "type": "brands",
            "metrics": {"annotationsCount": 796, "prevWeekAnnotationsCount": 79},
        }),
    ));
    let engine = engine_with(Arc::clone(&store)).await;

    let outcome = engine
        .write("brands", BRAND_UUID, brand_document(BRAND_UUID))
        .await
        .unwrap();
    assert!(outcome.updated);

    // the full write is synchronous and destroys the metrics sub-document
    let indexed = store.indexed();
    assert_eq!(indexed.len(), 1);
    assert!(indexed[0].1.get("metrics").is_none());

    // the enqueued partial update restores them verbatim
    engine.close_bulk().await.unwrap();
    let operations = store.bulk_operations();
    assert_eq!(operations.len(), 1);
    match &operations[0] {
        BulkOperation::Update { id, patch } => {
            assert_eq!(id, BRAND_UUID);
            assert_eq!(
                patch["metrics"],
                json!({"annotationsCount": 796, "prevWeekAnnotationsCount": 79})
            );
        }
        other => panic!("expected an update operation, got {other:?}"),
    }
}

#[tokio::test]
async fn write_without_a_prior_document_enqueues_no_patch() {
    let store = Arc::new(MockStore::default());
    let engine = engine_with(Arc::clone(&store)).await;

    let outcome = engine
        .write("brands", BRAND_UUID, brand_document(BRAND_UUID))
        .await
        .unwrap();
    assert!(outcome.updated);

    engine.close_bulk().await.unwrap();
    assert!(store.bulk_operations().is_empty());
}

#[tokio::test]
async fn read_failure_before_write_is_swallowed() {
    let store = Arc::new(MockStore::default());
    *store.fail_get.lock().unwrap() = true;
    let engine = engine_with(Arc::clone(&store)).await;

    let outcome = engine
        .write("brands", BRAND_UUID, brand_document(BRAND_UUID))
        .await
        .unwrap();

    assert!(outcome.updated);
    assert_eq!(store.indexed().len(), 1);
}

#[tokio::test]
async fn failed_write_propagates_the_status_but_still_restores_metrics() {
    let store = Arc::new(MockStore::default().with_document(
        BRAND_UUID,
        json!({"metrics": {"annotationsCount": 5, "prevWeekAnnotationsCount": 1}}),
    ));
    *store.fail_index.lock().unwrap() = true;
    let engine = engine_with(Arc::clone(&store)).await;

    let err = engine
        .write("brands", BRAND_UUID, brand_document(BRAND_UUID))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));

    engine.close_bulk().await.unwrap();
    assert_eq!(store.bulk_operations().len(), 1);
}

#[tokio::test]
async fn cleanup_deletes_documents_of_swallowed_identifiers() {
    let preferred = "56388858-38d6-4dfc-a001-506394259b51";
    let swallowed = "4ebbd9c4-3bb7-4d18-a14c-4c45aac5d966";

    let store = Arc::new(
        MockStore::default().with_document(swallowed, json!({"type": "brands"})),
    );
    let engine = engine_with(Arc::clone(&store)).await;

    let concept = Concept::Aggregate(AggregateConceptModel {
        pref_uuid: preferred.to_string(),
        direct_type: "Brand".to_string(),
        pref_label: "Smartlogics Brands PrefLabel".to_string(),
        source_representations: vec![
            SourceConcept {
                uuid: swallowed.to_string(),
                authority: "TME".to_string(),
            },
            SourceConcept {
                uuid: preferred.to_string(),
                authority: "Smartlogic".to_string(),
            },
        ],
        ..Default::default()
    });

    engine
        .write("brands", preferred, brand_document(preferred))
        .await
        .unwrap();
    engine.cleanup(&concept).await;

    assert_eq!(
        store.searched_ids.lock().unwrap().clone(),
        vec![vec![swallowed.to_string()]]
    );
    assert_eq!(store.deleted(), vec![swallowed.to_string()]);

    // the swallowed document is gone, the preferred document remains
    assert!(!engine.read(swallowed).await.unwrap().found);
    let preferred_doc = engine.read(preferred).await.unwrap();
    assert!(preferred_doc.found);
    assert_eq!(
        preferred_doc.source.unwrap()["id"],
        json!(format!("http://api.ft.com/things/{preferred}"))
    );

    // re-running over an already-clean swallowed set deletes nothing more
    engine.cleanup(&concept).await;
    assert_eq!(store.deleted(), vec![swallowed.to_string()]);
}

#[tokio::test]
async fn cleanup_is_a_no_op_for_simple_concepts() {
    let store = Arc::new(MockStore::default());
    let engine = engine_with(Arc::clone(&store)).await;

    let concept = Concept::from_json(
        br#"{"uuid":"2384fa7a-d514-3d6a-a0ea-3a711f66d0d8","type":"Brand","prefLabel":"A brand"}"#,
    )
    .unwrap();
    engine.cleanup(&concept).await;

    assert!(store.searched_ids.lock().unwrap().is_empty());
    assert!(store.deleted().is_empty());
}

#[tokio::test]
async fn delete_is_reported_in_band_for_missing_documents() {
    let store = Arc::new(MockStore::default().with_document(BRAND_UUID, json!({"type": "brands"})));
    let engine = engine_with(Arc::clone(&store)).await;

    assert_eq!(
        engine.delete("brands", BRAND_UUID).await.unwrap(),
        DeleteOutcome::Deleted
    );
    assert!(!engine.read(BRAND_UUID).await.unwrap().found);
    assert_eq!(
        engine.delete("brands", BRAND_UUID).await.unwrap(),
        DeleteOutcome::NotFound
    );
}

#[tokio::test]
async fn scroll_emits_every_id_exactly_once_and_closes() {
    let page = |cursor: &str, range: std::ops::Range<usize>| ScrollPage {
        scroll_id: cursor.to_string(),
        hits: range
            .map(|n| SearchHit {
                id: format!("00000000-0000-0000-0000-{n:012}"),
                source: json!({"type": "brands"}),
            })
            .collect(),
    };

    let store = Arc::new(MockStore::default().with_scroll_pages(vec![
        page("cursor-1", 0..1000),
        page("cursor-2", 1000..2000),
        page("cursor-3", 2000..2500),
    ]));
    let engine = engine_with(Arc::clone(&store)).await;

    let mut ids = Arc::clone(&engine).stream_all_ids(true, true);
    let mut seen = HashSet::new();
    let mut count = 0usize;
    while let Some(pair) = ids.recv().await {
        assert_eq!(pair.concept_type.as_deref(), Some("brands"));
        assert!(seen.insert(pair.id), "duplicate id emitted");
        count += 1;
    }
    assert_eq!(count, 2500);

    // excluding FT-pink authorities scans the alias with the terms filter
    let requests = store.scroll_requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].index, "all-concepts");
    assert_eq!(requests[0].size, 1000);
    assert!(requests[0].fetch_source);
    assert_eq!(
        requests[0].query["bool"]["must_not"]["terms"]["authorities"],
        json!(["TME", "Smartlogic"])
    );
}

#[tokio::test]
async fn scroll_over_the_configured_index_omits_types_when_not_requested() {
    let store = Arc::new(MockStore::default().with_scroll_pages(vec![ScrollPage {
        scroll_id: "cursor-1".to_string(),
        hits: vec![SearchHit {
            id: BRAND_UUID.to_string(),
            source: Value::Null,
        }],
    }]));
    let engine = engine_with(Arc::clone(&store)).await;

    let mut ids = Arc::clone(&engine).stream_all_ids(false, false);
    let first = ids.recv().await.unwrap();
    assert_eq!(first.id, BRAND_UUID);
    assert!(first.concept_type.is_none());
    assert!(ids.recv().await.is_none());

    let requests = store.scroll_requests.lock().unwrap().clone();
    assert_eq!(requests[0].index, INDEX_NAME);
    assert!(!requests[0].fetch_source);
    assert_eq!(requests[0].query, json!({"match_all": {}}));
}

#[tokio::test]
async fn stream_closes_immediately_without_a_client() {
    let engine = Arc::new(IndexEngine::new(INDEX_NAME, eager_bulk()));
    let mut ids = Arc::clone(&engine).stream_all_ids(false, false);
    assert!(ids.recv().await.is_none());
}

#[tokio::test]
async fn client_replacement_rebuilds_the_bulk_processor() {
    let first = Arc::new(MockStore::default());
    let second = Arc::new(MockStore::default());
    let engine = engine_with(Arc::clone(&first)).await;

    engine
        .patch_metrics(
            BRAND_UUID,
            concept_indexer_shared::DocumentPatch::Concept(Default::default()),
        )
        .await;
    engine.set_client(Arc::clone(&second) as Arc<dyn DocumentStore>).await;

    // the first processor was closed on replacement and drained its queue
    assert_eq!(first.bulk_operations().len(), 1);
    assert!(second.bulk_operations().is_empty());

    engine
        .patch_metrics(
            BRAND_UUID,
            concept_indexer_shared::DocumentPatch::Concept(Default::default()),
        )
        .await;
    engine.close_bulk().await.unwrap();
    assert_eq!(second.bulk_operations().len(), 1);
}

#[tokio::test]
async fn health_facade_reads_cluster_state_and_write_blocks() {
    let store = Arc::new(MockStore::default());
    *store.health_status.lock().unwrap() = "green".to_string();
    *store.settings.lock().unwrap() = json!({
        "concepts-1.2.0": {"settings": {"index": {"blocks": {"write": "true"}}}}
    });
    let engine = engine_with(Arc::clone(&store)).await;
    let health = HealthService::new(Arc::clone(&engine), "concept-indexer");

    assert!(health.good_to_go().await.is_ok());
    assert_eq!(
        health.index_read_only().await.unwrap(),
        (true, "concepts-1.2.0".to_string())
    );

    let report = health.report().await;
    assert!(report.ok);
    assert_eq!(report.checks.len(), 2);

    *store.health_status.lock().unwrap() = "red".to_string();
    let reason = health.good_to_go().await.unwrap_err();
    assert!(reason.contains("cluster health is red"));
    assert!(!health.report().await.ok);
}
