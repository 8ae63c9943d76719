//! Encoding endpoints.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use qbench_circuit::{Circuit, validate_and_normalize};
use qbench_sched::{Encoding, SchedError, SchedResult, counters};
use serde_json::Value;

use crate::dto::{CreateEncodingRequest, CreateEncodingResponse, DeletedResponse};
use crate::error::ApiError;
use crate::state::AppState;

const PERSIST_FAILURE: &str = "Unable to persist in Database.";

/// POST /api/encoding - Validate a circuit and store it as an encoding.
///
/// Invalid circuits are not stored and answer 422 with the validation errors.
pub async fn create_encoding(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateEncodingRequest>,
) -> (StatusCode, Json<CreateEncodingResponse>) {
    let mut document = req.circuit;
    let circuit = match checked(&mut document) {
        Ok(circuit) => circuit,
        Err(errors) => return rejected(StatusCode::UNPROCESSABLE_ENTITY, errors),
    };

    let stored = persist(
        &state,
        req.name,
        req.description,
        req.url,
        document,
        &circuit,
    )
    .await;

    match stored {
        Ok(id) => {
            tracing::info!(encoding_id = id, "encoding stored");
            accepted(id)
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to store encoding");
            rejected(
                StatusCode::INTERNAL_SERVER_ERROR,
                vec![PERSIST_FAILURE.to_string()],
            )
        }
    }
}

/// PUT /api/encoding/:id - Validate a circuit and replace a stored encoding.
///
/// Answers like creation: 422 with the validation errors for an invalid
/// circuit, 404 when no encoding has the id. The creation time is kept.
pub async fn update_encoding(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(req): Json<CreateEncodingRequest>,
) -> (StatusCode, Json<CreateEncodingResponse>) {
    let mut document = req.circuit;
    let circuit = match checked(&mut document) {
        Ok(circuit) => circuit,
        Err(errors) => return rejected(StatusCode::UNPROCESSABLE_ENTITY, errors),
    };

    let existing = match state.store.find_encoding(id).await {
        Ok(Some(existing)) => existing,
        Ok(None) => {
            return rejected(
                StatusCode::NOT_FOUND,
                vec![SchedError::EncodingNotFound(id).to_string()],
            );
        }
        Err(e) => {
            tracing::error!(encoding_id = id, error = %e, "failed to load encoding");
            return rejected(
                StatusCode::INTERNAL_SERVER_ERROR,
                vec![PERSIST_FAILURE.to_string()],
            );
        }
    };

    let mut encoding = Encoding::new(id, req.name, document, &circuit)
        .with_description(req.description.unwrap_or_default())
        .with_url(req.url.unwrap_or_default());
    encoding.created_at = existing.created_at;

    match state.store.save_encoding(&encoding).await {
        Ok(()) => {
            tracing::info!(encoding_id = id, "encoding updated");
            accepted(id)
        }
        Err(e) => {
            tracing::error!(encoding_id = id, error = %e, "failed to store encoding");
            rejected(
                StatusCode::INTERNAL_SERVER_ERROR,
                vec![PERSIST_FAILURE.to_string()],
            )
        }
    }
}

/// Validate and normalize a submitted document, then build its typed form.
fn checked(document: &mut Value) -> Result<Circuit, Vec<String>> {
    let validation = validate_and_normalize(document);
    if !validation.valid {
        return Err(validation.errors);
    }
    Circuit::from_value_unchecked(document).map_err(|e| vec![e.to_string()])
}

async fn persist(
    state: &AppState,
    name: String,
    description: Option<String>,
    url: Option<String>,
    document: Value,
    circuit: &Circuit,
) -> SchedResult<u64> {
    let id = state.store.allocate_next_id(counters::ENCODINGS).await?;
    let mut encoding = Encoding::new(id, name, document, circuit);
    if let Some(description) = description {
        encoding = encoding.with_description(description);
    }
    if let Some(url) = url {
        encoding = encoding.with_url(url);
    }
    state.store.save_encoding(&encoding).await?;
    Ok(id)
}

fn accepted(id: u64) -> (StatusCode, Json<CreateEncodingResponse>) {
    (
        StatusCode::OK,
        Json(CreateEncodingResponse {
            valid: true,
            errors: Vec::new(),
            id: Some(id),
        }),
    )
}

fn rejected(status: StatusCode, errors: Vec<String>) -> (StatusCode, Json<CreateEncodingResponse>) {
    (
        status,
        Json(CreateEncodingResponse {
            valid: false,
            errors,
            id: None,
        }),
    )
}

/// GET /api/encoding - List all encodings.
pub async fn list_encodings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Encoding>>, ApiError> {
    Ok(Json(state.store.list_encodings().await?))
}

/// GET /api/encoding/:id - Get one encoding.
pub async fn get_encoding(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Encoding>, ApiError> {
    let encoding = state
        .store
        .find_encoding(id)
        .await?
        .ok_or(SchedError::EncodingNotFound(id))?;
    Ok(Json(encoding))
}

/// DELETE /api/encoding/:id - Delete an encoding.
pub async fn delete_encoding(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<DeletedResponse>, ApiError> {
    if !state.store.delete_encoding(id).await? {
        return Err(SchedError::EncodingNotFound(id).into());
    }
    Ok(Json(DeletedResponse { deleted: true, id }))
}
