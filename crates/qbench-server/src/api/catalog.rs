//! Ansatz and dataset endpoints.
//!
//! Both kinds share these handlers; the router attaches the kind as an
//! extension.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use qbench_sched::{CatalogEntry, ResourceKind, SchedError};

use crate::dto::{CatalogEntryRequest, CreatedResponse, DeletedResponse};
use crate::error::ApiError;
use crate::state::AppState;

fn check_name(req: &CatalogEntryRequest) -> Result<(), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("'name' must not be empty".to_string()));
    }
    Ok(())
}

fn not_found(kind: ResourceKind, id: u64) -> ApiError {
    SchedError::ResourceNotFound { kind, id }.into()
}

/// POST /api/{kind} - Store a new ansatz or dataset.
pub async fn create_entry(
    State(state): State<Arc<AppState>>,
    Extension(kind): Extension<ResourceKind>,
    Json(req): Json<CatalogEntryRequest>,
) -> Result<Json<CreatedResponse>, ApiError> {
    check_name(&req)?;
    let id = state.store.allocate_next_id(kind.counter()).await?;
    state.store.save_resource(&req.into_entry(id, kind)).await?;

    tracing::info!(%kind, id, "catalog entry stored");
    Ok(Json(CreatedResponse {
        message: format!("Created {kind} with ID {id}"),
        id,
    }))
}

/// GET /api/{kind} - List every entry of one kind.
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    Extension(kind): Extension<ResourceKind>,
) -> Result<Json<Vec<CatalogEntry>>, ApiError> {
    Ok(Json(state.store.list_resources(kind).await?))
}

/// GET /api/{kind}/:id - Get one entry.
pub async fn get_entry(
    State(state): State<Arc<AppState>>,
    Extension(kind): Extension<ResourceKind>,
    Path(id): Path<u64>,
) -> Result<Json<CatalogEntry>, ApiError> {
    state
        .store
        .find_resource(kind, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(kind, id))
}

/// PUT /api/{kind}/:id - Replace an entry's name, description, depth and
/// circuit.
pub async fn update_entry(
    State(state): State<Arc<AppState>>,
    Extension(kind): Extension<ResourceKind>,
    Path(id): Path<u64>,
    Json(req): Json<CatalogEntryRequest>,
) -> Result<Json<CatalogEntry>, ApiError> {
    check_name(&req)?;
    let mut entry = state
        .store
        .find_resource(kind, id)
        .await?
        .ok_or_else(|| not_found(kind, id))?;
    entry.replace_with(req.into_entry(id, kind));
    state.store.save_resource(&entry).await?;

    tracing::info!(%kind, id, "catalog entry updated");
    Ok(Json(entry))
}

/// DELETE /api/{kind}/:id - Delete an entry.
pub async fn delete_entry(
    State(state): State<Arc<AppState>>,
    Extension(kind): Extension<ResourceKind>,
    Path(id): Path<u64>,
) -> Result<Json<DeletedResponse>, ApiError> {
    if !state.store.delete_resource(kind, id).await? {
        return Err(not_found(kind, id));
    }
    Ok(Json(DeletedResponse { deleted: true, id }))
}
