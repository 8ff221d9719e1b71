//! The indexing engine.
//!
//! Stateful orchestrator over the document store: it owns the current
//! cluster client and its bulk processor behind a readers-writer lock, fans
//! write/read/delete/patch/scroll operations over them, and enforces the
//! type-specific write semantics — membership writes are rerouted to the
//! member's person document, FT authorship is derived from the reserved
//! organisation and role identifiers, and server-maintained fields (metrics,
//! the author flag) are captured before a full overwrite and restored with a
//! partial update afterwards.

mod bulk;

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use concept_indexer_repository::{
    ClusterHealth, DeleteOutcome, DocumentStore, GetResult, IndexedResponse, ScrollRequest,
    StoreError,
};
use concept_indexer_shared::{
    Concept, ConceptDocument, ConceptPatch, DocumentPatch, IdTypePair, IndexDocument,
    PersonDocument, PersonPatch, CONCEPT_TYPE_MEMBERSHIPS, CONCEPT_TYPE_PEOPLE,
};
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};

pub use bulk::{BulkConfig, BulkProcessor};

use crate::errors::EngineError;

/// The FT organisation; only memberships within it can confer authorship.
pub const FT_ORGANISATION_UUID: &str = "7bcfe07b-0fb1-49ce-a5fa-e51d5c01c3e0";

/// Membership role conferring authorship: columnist.
pub const COLUMNIST_ROLE_UUID: &str = "7ef75a6a-b6bf-4eb7-a1da-03e0acabef1b";

/// Membership role conferring authorship: journalist.
pub const JOURNALIST_ROLE_UUID: &str = "33ee38a4-c677-4952-a141-2ae14da3aedd";

/// Alias scanned instead of the configured index when FT-pink authorities
/// are excluded. Callers depend on the alias semantics.
const ALL_CONCEPTS_ALIAS: &str = "all-concepts";

const SCROLL_PAGE_SIZE: i64 = 1000;
const STREAM_BUFFER: usize = 256;

/// Source of wall-clock time, replaceable in tests.
type Clock = fn() -> DateTime<Utc>;

/// Result of a write operation.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    /// Whether the write mutated the index (directly or via an enqueued
    /// partial update).
    pub updated: bool,
    /// Version metadata of the synchronous index call, when one was made.
    pub response: Option<IndexedResponse>,
}

impl WriteOutcome {
    fn dropped() -> Self {
        Self {
            updated: false,
            response: None,
        }
    }
}

#[derive(Default)]
struct EngineState {
    store: Option<Arc<dyn DocumentStore>>,
    bulk: Option<BulkProcessor>,
}

/// Stateful indexing engine over a lazily-delivered cluster client.
///
/// All data operations hold a shared read lock on the client for the
/// duration of the network call; client replacement takes the write lock,
/// closes the previous bulk processor (which may block on draining), and
/// installs the new client with a fresh one. Operations issued before any
/// client arrives fail with [`EngineError::Unavailable`].
pub struct IndexEngine {
    state: RwLock<EngineState>,
    index_name: String,
    bulk_config: BulkConfig,
    clock: Clock,
}

impl IndexEngine {
    pub fn new(index_name: impl Into<String>, bulk_config: BulkConfig) -> Self {
        Self {
            state: RwLock::new(EngineState::default()),
            index_name: index_name.into(),
            bulk_config,
            clock: Utc::now,
        }
    }

    /// Replace the wall-clock source.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Wrap the engine and consume clients from the connection supplier as
    /// they arrive.
    pub fn start(self, mut stores: mpsc::Receiver<Arc<dyn DocumentStore>>) -> Arc<Self> {
        let engine = Arc::new(self);
        let listener = Arc::clone(&engine);
        tokio::spawn(async move {
            while let Some(store) = stores.recv().await {
                listener.set_client(store).await;
            }
        });
        engine
    }

    /// Install a new cluster client, closing the previous bulk processor
    /// before opening one against the new client.
    pub async fn set_client(&self, store: Arc<dyn DocumentStore>) {
        let mut state = self.state.write().await;

        if let Some(previous) = state.bulk.take() {
            previous.close().await;
        }

        state.bulk = Some(BulkProcessor::new(
            Arc::clone(&store),
            self.index_name.clone(),
            self.bulk_config.clone(),
        ));
        state.store = Some(store);
        info!(index = %self.index_name, "search cluster client installed");
    }

    /// Write one document.
    ///
    /// Memberships are gated on the FT organisation and the author roles,
    /// then rerouted to the member's person document: an existing person is
    /// patched with `isFTAuthor = "true"`, a missing one gets a minimal
    /// person document written in its place. For every other concept type
    /// the document is written as-is, and any server-maintained fields read
    /// from the prior document are restored with a partial update enqueued
    /// after the synchronous write.
    pub async fn write(
        &self,
        concept_type: &str,
        uuid: &str,
        document: IndexDocument,
    ) -> Result<WriteOutcome, EngineError> {
        let state = self.state.read().await;
        let store = state.store.as_deref().ok_or(EngineError::Unavailable)?;

        let mut target = uuid.to_string();
        if concept_type == CONCEPT_TYPE_MEMBERSHIPS {
            let membership = match &document {
                IndexDocument::Membership(membership) => membership,
                _ => {
                    warn!(concept_type, uuid, "membership write carried a non-membership document; dropping");
                    return Ok(WriteOutcome::dropped());
                }
            };
            if membership.organisation_id != FT_ORGANISATION_UUID
                || membership.memberships.is_empty()
                || !has_author_role(&membership.memberships)
            {
                return Ok(WriteOutcome::dropped());
            }
            target = membership.person_id.clone();
        }

        // The metrics sub-document is maintained by an out-of-band pipeline;
        // capture it (and the author flag) before the overwrite destroys it.
        // A concurrent metrics update between this read and the patch below
        // is lost; the window is accepted.
        let prior = match store.get_document(&self.index_name, &target).await {
            Ok(prior) => Some(prior),
            Err(err) => {
                error!(uuid = %target, error = %err, "could not retrieve current document before write");
                None
            }
        };
        let patch = prior
            .as_ref()
            .and_then(|prior| derive_patch(concept_type, prior));

        if concept_type == CONCEPT_TYPE_MEMBERSHIPS {
            if let Some(prior) = &prior {
                if !prior.found {
                    let person = synthetic_author(&target, (self.clock)());
                    debug!(uuid = %target, "writing a minimal author person document");
                    let body = to_json(&IndexDocument::Person(person))?;
                    let response = self.index_into(store, &target, body).await?;
                    return Ok(WriteOutcome {
                        updated: true,
                        response: Some(response),
                    });
                }
            }

            let updated = patch.is_some();
            if let Some(patch) = &patch {
                enqueue_patch(&state, &target, patch);
            }
            return Ok(WriteOutcome {
                updated,
                response: None,
            });
        }

        let body = to_json(&document)?;
        match self.index_into(store, &target, body).await {
            Ok(response) => {
                if let Some(patch) = &patch {
                    enqueue_patch(&state, &target, patch);
                }
                Ok(WriteOutcome {
                    updated: true,
                    response: Some(response),
                })
            }
            Err(err) => {
                // the prior document may still exist; restore its fields
                if let Some(patch) = &patch {
                    enqueue_patch(&state, &target, patch);
                }
                Err(err)
            }
        }
    }

    async fn index_into(
        &self,
        store: &dyn DocumentStore,
        id: &str,
        body: Value,
    ) -> Result<IndexedResponse, EngineError> {
        store
            .index_document(&self.index_name, id, body)
            .await
            .map_err(|err| {
                error!(uuid = %id, status = ?err.status(), error = %err, "failed write to search cluster");
                EngineError::from(err)
            })
    }

    /// Read one document; a missing document is reported in-band.
    pub async fn read(&self, uuid: &str) -> Result<GetResult, EngineError> {
        let state = self.state.read().await;
        let store = state.store.as_deref().ok_or(EngineError::Unavailable)?;
        Ok(store.get_document(&self.index_name, uuid).await?)
    }

    /// Delete one document; a missing document is reported in-band.
    pub async fn delete(
        &self,
        concept_type: &str,
        uuid: &str,
    ) -> Result<DeleteOutcome, EngineError> {
        let state = self.state.read().await;
        let store = state.store.as_deref().ok_or(EngineError::Unavailable)?;

        store
            .delete_document(&self.index_name, uuid)
            .await
            .map_err(|err| {
                error!(concept_type, uuid, status = ?err.status(), error = %err, "failed delete from search cluster");
                EngineError::from(err)
            })
    }

    /// Delete the documents of source identifiers swallowed by an aggregate
    /// concept. Errors are logged and never fail the caller's write;
    /// re-running over an already-clean swallowed set is a no-op.
    pub async fn cleanup(&self, concept: &Concept) {
        let preferred = concept.preferred_uuid();
        let swallowed = concept.concorded_uuids();
        if swallowed.is_empty() {
            return;
        }

        let state = self.state.read().await;
        let Some(store) = state.store.as_deref() else {
            error!(pref_uuid = %preferred, "cannot clean up concorded documents without a client");
            return;
        };

        let hits = match store.search_ids(&self.index_name, &swallowed).await {
            Ok(hits) => hits,
            Err(err) => {
                error!(pref_uuid = %preferred, error = %err, "could not find concorded concepts in the index");
                return;
            }
        };

        for hit in hits {
            let concept_type = hit
                .source
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            info!(pref_uuid = %preferred, concorded_uuid = %hit.id, concept_type = %concept_type, "cleaning up concorded document");
            if let Err(err) = store.delete_document(&self.index_name, &hit.id).await {
                error!(pref_uuid = %preferred, concorded_uuid = %hit.id, concept_type = %concept_type, error = %err, "failed to delete concorded document");
            }
        }
    }

    /// Queue a partial update; accept-and-forget.
    pub async fn patch_metrics(&self, uuid: &str, patch: DocumentPatch) {
        let state = self.state.read().await;
        enqueue_patch(&state, uuid, &patch);
    }

    /// Queue a full document replacement; accept-and-forget.
    pub async fn bulk_write(&self, uuid: &str, document: IndexDocument) {
        let state = self.state.read().await;
        match (&state.bulk, serde_json::to_value(&document)) {
            (Some(bulk), Ok(body)) => bulk.index(uuid, body),
            (None, _) => warn!(uuid, "no bulk processor available; dropping write"),
            (_, Err(err)) => error!(uuid, error = %err, "could not serialize document for bulk write"),
        }
    }

    /// Enumerate every indexed identifier through a scroll.
    ///
    /// With `exclude_ft_pink` the scroll runs over the `all-concepts` alias
    /// with FT-pink authorities filtered out; otherwise it runs over the
    /// configured index. The channel closes on end of scroll, on transport
    /// errors (logged), or when the consumer goes away.
    pub fn stream_all_ids(
        self: Arc<Self>,
        include_types: bool,
        exclude_ft_pink: bool,
    ) -> mpsc::Receiver<IdTypePair> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let engine = self;

        tokio::spawn(async move {
            let state = engine.state.read().await;
            let Some(store) = state.store.as_deref() else {
                error!("cannot stream ids without a client");
                return;
            };

            let request = if exclude_ft_pink {
                ScrollRequest {
                    index: ALL_CONCEPTS_ALIAS.to_string(),
                    query: serde_json::json!({
                        "bool": {"must_not": {"terms": {"authorities": ["TME", "Smartlogic"]}}}
                    }),
                    size: SCROLL_PAGE_SIZE,
                    fetch_source: include_types,
                }
            } else {
                ScrollRequest {
                    index: engine.index_name.clone(),
                    query: serde_json::json!({"match_all": {}}),
                    size: SCROLL_PAGE_SIZE,
                    fetch_source: include_types,
                }
            };

            let mut page = match store.scroll_start(&request).await {
                Ok(page) => page,
                Err(err) => {
                    error!(error = %err, "error while opening the id scroll");
                    return;
                }
            };

            loop {
                if page.hits.is_empty() {
                    return;
                }
                for hit in &page.hits {
                    let concept_type = if include_types {
                        hit.source
                            .get("type")
                            .and_then(Value::as_str)
                            .map(str::to_string)
                    } else {
                        None
                    };
                    let item = IdTypePair {
                        id: hit.id.clone(),
                        concept_type,
                    };
                    if tx.send(item).await.is_err() {
                        debug!(reason = %EngineError::Cancelled, "stopping the id scroll");
                        return;
                    }
                }
                page = match store.scroll_next(&page.scroll_id).await {
                    Ok(page) => page,
                    Err(err) => {
                        error!(error = %err, "error while fetching ids");
                        return;
                    }
                };
            }
        });

        rx
    }

    /// Flush and close the current bulk processor. It is reopened when the
    /// next client arrives.
    pub async fn close_bulk(&self) -> Result<(), EngineError> {
        let state = self.state.read().await;
        let bulk = state.bulk.as_ref().ok_or(EngineError::Unavailable)?;
        bulk.close().await;
        Ok(())
    }

    /// Read the cluster health status.
    pub async fn cluster_health(&self) -> Result<ClusterHealth, EngineError> {
        let state = self.state.read().await;
        let store = state.store.as_deref().ok_or(EngineError::Unavailable)?;
        Ok(store.cluster_health().await?)
    }

    /// Whether writes to the configured index are blocked, together with the
    /// concrete index name the settings were read from.
    pub async fn is_index_read_only(&self) -> Result<(bool, String), EngineError> {
        let state = self.state.read().await;
        let store = state.store.as_deref().ok_or(EngineError::Unavailable)?;

        let settings = store.index_settings(&self.index_name).await?;
        Ok(read_only_from_settings(&settings)?)
    }
}

/// Whether any role in the list confers FT authorship.
fn has_author_role(memberships: &[String]) -> bool {
    memberships
        .iter()
        .any(|role| role == COLUMNIST_ROLE_UUID || role == JOURNALIST_ROLE_UUID)
}

/// Build the patch restoring server-maintained fields from the prior
/// document. Memberships force the author flag to `"true"`; an undecodable
/// prior document yields no patch.
fn derive_patch(concept_type: &str, prior: &GetResult) -> Option<DocumentPatch> {
    if !prior.found {
        return None;
    }
    let source = prior.source.clone()?;

    match concept_type {
        CONCEPT_TYPE_PEOPLE | CONCEPT_TYPE_MEMBERSHIPS => {
            match serde_json::from_value::<PersonDocument>(source) {
                Ok(person) => {
                    let is_ft_author = if concept_type == CONCEPT_TYPE_MEMBERSHIPS {
                        "true".to_string()
                    } else {
                        person.is_ft_author
                    };
                    Some(DocumentPatch::Person(PersonPatch {
                        metrics: person.concept.metrics,
                        is_ft_author,
                    }))
                }
                Err(err) => {
                    error!(uuid = %prior.id, error = %err, "failed to read prior person document");
                    None
                }
            }
        }
        _ => match serde_json::from_value::<ConceptDocument>(source) {
            Ok(document) => Some(DocumentPatch::Concept(ConceptPatch {
                metrics: document.metrics,
            })),
            Err(err) => {
                error!(uuid = %prior.id, error = %err, "failed to read prior concept document");
                None
            }
        },
    }
}

fn enqueue_patch(state: &EngineState, uuid: &str, patch: &DocumentPatch) {
    match (&state.bulk, serde_json::to_value(patch)) {
        (Some(bulk), Ok(body)) => {
            debug!(uuid, "queueing partial update restoring server-maintained fields");
            bulk.update(uuid, body);
        }
        (None, _) => warn!(uuid, "no bulk processor available; dropping partial update"),
        (_, Err(err)) => error!(uuid, error = %err, "could not serialize partial update"),
    }
}

/// The minimal person document written when an author membership arrives
/// before the person concept itself.
fn synthetic_author(uuid: &str, now: DateTime<Utc>) -> PersonDocument {
    PersonDocument {
        concept: ConceptDocument {
            id: uuid.to_string(),
            concept_type: Some(CONCEPT_TYPE_PEOPLE.to_string()),
            last_modified: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            ..Default::default()
        },
        is_ft_author: "true".to_string(),
    }
}

fn to_json(document: &IndexDocument) -> Result<Value, EngineError> {
    serde_json::to_value(document)
        .map_err(|err| EngineError::Store(StoreError::response(err.to_string())))
}

/// Read the write-block flag from an index settings map keyed by concrete
/// index name.
fn read_only_from_settings(settings: &Value) -> Result<(bool, String), StoreError> {
    let entries = settings
        .as_object()
        .ok_or_else(|| StoreError::response("index settings response is not an object"))?;
    let (index_name, body) = entries
        .iter()
        .next()
        .ok_or_else(|| StoreError::response("no index settings found"))?;

    let read_only = match body
        .pointer("/settings/index/blocks/write")
        .and_then(Value::as_str)
    {
        Some(flag) => flag.parse::<bool>().map_err(|err| {
            StoreError::response(format!("unparseable blocks.write setting: {err}"))
        })?,
        None => false,
    };

    Ok((read_only, index_name.clone()))
}
