//! Benchmark run endpoints.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use qbench_sched::{BenchmarkRun, RunId, RunRequest, SchedError};

use crate::dto::{DeletedResponse, StartRunResponse, UpdateRunRequest};
use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/run - Create one run per combination and dispatch the tasks.
///
/// Succeeds when at least one task reached the queue; runs that could not be
/// dispatched are listed under `failed`.
pub async fn start_run(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RunRequest>,
) -> Result<Json<StartRunResponse>, ApiError> {
    let report = state.dispatcher.start_run(&request).await?;
    Ok(Json(report.into()))
}

/// GET /api/run - List all runs.
pub async fn list_runs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BenchmarkRun>>, ApiError> {
    Ok(Json(state.store.list_runs().await?))
}

/// GET /api/run/:id - Get one run.
pub async fn get_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<BenchmarkRun>, ApiError> {
    let run = state
        .store
        .find_run(RunId(id))
        .await?
        .ok_or(SchedError::RunNotFound(RunId(id)))?;
    Ok(Json(run))
}

/// PUT /api/run/:id - Point a run at another combination and reset it to
/// `pending`.
///
/// Progress, result and error are cleared. No task is published.
pub async fn update_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(req): Json<UpdateRunRequest>,
) -> Result<Json<BenchmarkRun>, ApiError> {
    let existing = state
        .store
        .find_run(RunId(id))
        .await?
        .ok_or(SchedError::RunNotFound(RunId(id)))?;

    let mut run = BenchmarkRun::new(RunId(id), req.encoding_id, req.ansatz_id, req.data_id);
    run.created_at = existing.created_at;
    state.store.create_run(&run).await?;

    tracing::info!(run_id = id, "run reset to pending");
    Ok(Json(run))
}

/// DELETE /api/run/:id - Delete a run record.
pub async fn delete_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<DeletedResponse>, ApiError> {
    if !state.store.delete_run(RunId(id)).await? {
        return Err(SchedError::RunNotFound(RunId(id)).into());
    }
    Ok(Json(DeletedResponse { deleted: true, id }))
}
