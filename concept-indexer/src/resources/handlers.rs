//! Request handlers.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use concept_indexer_repository::DeleteOutcome;
use concept_indexer_shared::{Concept, ConceptPatch, DocumentPatch, IndexDocument, PersonDocument};
use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::converter::{convert_concept, ConvertError};
use crate::errors::EngineError;
use crate::resources::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

const MSG_UNSUPPORTED_TYPE: &str = "Unsupported or invalid concept type";
const MSG_BAD_BODY: &str = "Request body is not in the expected concept model format";
const MSG_PATH_MISMATCH: &str = "Provided path UUID does not match request body";
const MSG_INVALID_MODEL: &str = "Invalid or incomplete concept model";

fn message(status: StatusCode, body: &str) -> Response {
    (status, Json(json!({"message": body}))).into_response()
}

/// The publish reference stamped into written documents; taken from the
/// request id header, generated when absent.
fn publish_reference(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("tid_{}", Uuid::new_v4().simple()))
}

fn truthy(value: Option<&String>) -> bool {
    value.is_some_and(|value| value.eq_ignore_ascii_case("true"))
}

/// Decode and convert a request body, or produce the error response.
fn parse_payload(
    state: &AppState,
    concept_type: &str,
    uuid: &str,
    publish_ref: &str,
    body: &[u8],
) -> Result<(Concept, IndexDocument), Response> {
    if !state.allowed_concept_types.contains(concept_type) {
        return Err(message(StatusCode::NOT_FOUND, MSG_UNSUPPORTED_TYPE));
    }

    let concept = Concept::from_json(body).map_err(|err| {
        info!(concept_type, uuid, error = %err, "failed to unmarshal body into a concept");
        message(StatusCode::BAD_REQUEST, MSG_BAD_BODY)
    })?;

    if concept.preferred_uuid() != uuid {
        return Err(message(StatusCode::BAD_REQUEST, MSG_PATH_MISMATCH));
    }

    let document = convert_concept(&concept, concept_type, publish_ref, &state.public_api_host)
        .map_err(|err| match err {
            ConvertError::Ambiguous(_) => message(StatusCode::BAD_REQUEST, &err.to_string()),
            ConvertError::InvalidModel(_) => {
                info!(concept_type, uuid, error = %err, "rejected concept model");
                message(StatusCode::BAD_REQUEST, MSG_INVALID_MODEL)
            }
        })?;

    Ok((concept, document))
}

/// `PUT /{concept_type}/{uuid}` — write one concept, then clean up the
/// documents of any source identifiers it swallowed.
pub async fn write_concept(
    State(state): State<AppState>,
    Path((concept_type, uuid)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let publish_ref = publish_reference(&headers);
    let (concept, document) = match parse_payload(&state, &concept_type, &uuid, &publish_ref, &body)
    {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    match state
        .engine
        .write(&concept_type, concept.preferred_uuid(), document)
        .await
    {
        Ok(outcome) if !outcome.updated => message(StatusCode::NOT_MODIFIED, "Concept dropped"),
        Ok(_) => {
            state.engine.cleanup(&concept).await;
            message(StatusCode::OK, "Concept written successfully")
        }
        Err(EngineError::Unavailable) => {
            message(StatusCode::SERVICE_UNAVAILABLE, "Search cluster unavailable")
        }
        Err(err) => {
            warn!(concept_type, uuid, error = %err, "failed to write concept");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Failed to write concept")
        }
    }
}

/// `PUT /bulk/{concept_type}/{uuid}` — queue a concept write through the
/// bulk processor.
pub async fn write_bulk(
    State(state): State<AppState>,
    Path((concept_type, uuid)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let publish_ref = publish_reference(&headers);
    let (concept, document) = match parse_payload(&state, &concept_type, &uuid, &publish_ref, &body)
    {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    state
        .engine
        .bulk_write(concept.preferred_uuid(), document)
        .await;
    state.engine.cleanup(&concept).await;
    message(StatusCode::OK, "Concept written successfully")
}

/// `PUT /{concept_type}/{uuid}/metrics` — queue a metrics patch.
pub async fn write_metrics(
    State(state): State<AppState>,
    Path((concept_type, uuid)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    if !state.allowed_concept_types.contains(&concept_type) {
        return message(StatusCode::NOT_FOUND, MSG_UNSUPPORTED_TYPE);
    }

    let patch: ConceptPatch = match serde_json::from_slice(&body) {
        Ok(patch) => patch,
        Err(err) => return message(StatusCode::BAD_REQUEST, &err.to_string()),
    };
    if patch.metrics.is_none() {
        return message(
            StatusCode::BAD_REQUEST,
            "Please supply metrics as a JSON object with a single property 'metrics'",
        );
    }

    state
        .engine
        .patch_metrics(&uuid, DocumentPatch::Concept(patch))
        .await;
    message(StatusCode::OK, "Concept updated with metrics successfully")
}

/// `GET /{concept_type}/{uuid}` — read one concept document.
pub async fn read_concept(
    State(state): State<AppState>,
    Path((concept_type, uuid)): Path<(String, String)>,
) -> Response {
    if !state.allowed_concept_types.contains(&concept_type) {
        return message(StatusCode::BAD_REQUEST, MSG_UNSUPPORTED_TYPE);
    }

    let result = match state.engine.read(&uuid).await {
        Ok(result) => result,
        Err(EngineError::Unavailable) => return StatusCode::SERVICE_UNAVAILABLE.into_response(),
        Err(err) => {
            error!(concept_type, uuid, error = %err, "failed to read concept");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if !result.found {
        return StatusCode::NOT_FOUND.into_response();
    }
    let Some(source) = result.source else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    // the document type is an index-internal field; strip it from the body
    match serde_json::from_value::<PersonDocument>(source) {
        Ok(mut document) => {
            document.concept.concept_type = None;
            Json(document).into_response()
        }
        Err(err) => {
            error!(concept_type, uuid, error = %err, "failed to decode stored document");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `DELETE /{concept_type}/{uuid}`.
pub async fn delete_concept(
    State(state): State<AppState>,
    Path((concept_type, uuid)): Path<(String, String)>,
) -> Response {
    if !state.allowed_concept_types.contains(&concept_type) {
        return message(StatusCode::BAD_REQUEST, MSG_UNSUPPORTED_TYPE);
    }

    match state.engine.delete(&concept_type, &uuid).await {
        Ok(DeleteOutcome::NotFound) => StatusCode::NOT_FOUND.into_response(),
        Ok(DeleteOutcome::Deleted) => StatusCode::OK.into_response(),
        Err(EngineError::Unavailable) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        Err(err) => {
            error!(concept_type, uuid, error = %err, "failed to delete concept");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `GET /__ids` — stream every indexed identifier as newline-separated
/// JSON.
pub async fn stream_ids(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let include_types = truthy(params.get("includeTypes"));
    let exclude_ft_pink = truthy(params.get("excludeFTPinkAuthorities"));

    let ids = std::sync::Arc::clone(&state.engine).stream_all_ids(include_types, exclude_ft_pink);
    let lines = ReceiverStream::new(ids).map(|pair| {
        let line = match serde_json::to_string(&pair) {
            Ok(line) => line + "\n",
            Err(err) => {
                error!(error = %err, "could not serialize id pair");
                String::new()
            }
        };
        Ok::<_, Infallible>(Bytes::from(line))
    });

    (
        [(header::CONTENT_TYPE, "text/plain")],
        Body::from_stream(lines),
    )
        .into_response()
}

/// `GET /__health`.
pub async fn health_check(State(state): State<AppState>) -> Response {
    Json(state.health.report().await).into_response()
}

/// `GET /__health-details` — raw cluster health.
pub async fn health_details(State(state): State<AppState>) -> Response {
    match state.health.details().await {
        Ok(health) => Json(health).into_response(),
        Err(err) => {
            error!(error = %err, "failed to read cluster health");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `GET /__gtg`.
pub async fn good_to_go(State(state): State<AppState>) -> Response {
    match state.health.good_to_go().await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(reason) => (StatusCode::SERVICE_UNAVAILABLE, reason).into_response(),
    }
}
