//! Benchmark result endpoints.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use qbench_sched::{BenchmarkResult, ResourceKind, ResourceSummary, RunId, RunResult};

use crate::dto::{DeletedResponse, ResultListing, UpdateResultRequest};
use crate::error::ApiError;
use crate::state::AppState;

fn no_result(run_id: u64) -> ApiError {
    ApiError::NotFound(format!("No result for run {run_id}"))
}

/// GET /api/result - List all benchmark results.
///
/// Alongside the results come name/description/depth summaries of every
/// encoding and ansatz they reference. Ids no longer in the store are left
/// out of the summaries.
pub async fn list_results(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ResultListing>, ApiError> {
    let results = state.store.list_results().await?;
    let encoding_ids: BTreeSet<u64> = results.iter().map(|r| r.encoding_id).collect();
    let ansatz_ids: BTreeSet<u64> = results.iter().map(|r| r.ansatz_id).collect();

    let mut listing = ResultListing {
        results,
        ..ResultListing::default()
    };
    for id in encoding_ids {
        if let Some(encoding) = state.store.find_encoding(id).await? {
            listing.encodings.insert(id, ResourceSummary::from(&encoding));
        }
    }
    for id in ansatz_ids {
        if let Some(ansatz) = state.store.find_resource(ResourceKind::Ansatz, id).await? {
            listing.ansaetze.insert(id, ansatz.summary());
        }
    }

    Ok(Json(listing))
}

/// GET /api/result/:run_id - Get the result of a finished run.
pub async fn get_result(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<u64>,
) -> Result<Json<BenchmarkResult>, ApiError> {
    state
        .store
        .find_result(RunId(run_id))
        .await?
        .map(Json)
        .ok_or_else(|| no_result(run_id))
}

/// PUT /api/result/:run_id - Correct a stored result.
pub async fn update_result(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<u64>,
    Json(req): Json<UpdateResultRequest>,
) -> Result<Json<BenchmarkResult>, ApiError> {
    if state.store.find_result(RunId(run_id)).await?.is_none() {
        return Err(no_result(run_id));
    }

    let result = BenchmarkResult::new(
        RunId(run_id),
        req.encoding_id,
        req.ansatz_id,
        req.data_id,
        RunResult {
            loss: req.loss,
            accuracy: req.accuracy,
        },
    );
    state.store.save_result(&result).await?;

    tracing::info!(run_id, "result updated");
    Ok(Json(result))
}

/// DELETE /api/result/:run_id - Delete a stored result. The run is kept.
pub async fn delete_result(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<u64>,
) -> Result<Json<DeletedResponse>, ApiError> {
    if !state.store.delete_result(RunId(run_id)).await? {
        return Err(no_result(run_id));
    }
    Ok(Json(DeletedResponse {
        deleted: true,
        id: run_id,
    }))
}
