//! Bulk resource lookup.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{Json, extract::State};
use qbench_sched::{ResourceKind, ResourceSummary};
use serde::Serialize;
use serde_json::Value;

use crate::dto::{ResourceFetchRequest, ResourceFetchResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/resources - Fetch encodings, ansaetze and datasets by id in
/// one call.
///
/// Returns full records when `full` is set and name/description/depth
/// summaries otherwise. Unknown ids are skipped.
pub async fn fetch_resources(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResourceFetchRequest>,
) -> Result<Json<ResourceFetchResponse>, ApiError> {
    let mut response = ResourceFetchResponse::default();

    for &id in &req.encoding_ids {
        if let Some(encoding) = state.store.find_encoding(id).await? {
            let summary = ResourceSummary::from(&encoding);
            insert(&mut response.encodings, id, &encoding, &summary, req.full)?;
        }
    }

    for (kind, ids, target) in [
        (ResourceKind::Ansatz, &req.ansatz_ids, &mut response.ansaetze),
        (ResourceKind::Dataset, &req.dataset_ids, &mut response.datasets),
    ] {
        for &id in ids {
            if let Some(entry) = state.store.find_resource(kind, id).await? {
                insert(target, id, &entry, &entry.summary(), req.full)?;
            }
        }
    }

    Ok(Json(response))
}

fn insert<T: Serialize>(
    target: &mut BTreeMap<u64, Value>,
    id: u64,
    full: &T,
    summary: &ResourceSummary,
    want_full: bool,
) -> Result<(), ApiError> {
    let value = if want_full {
        serde_json::to_value(full)
    } else {
        serde_json::to_value(summary)
    };
    target.insert(id, value.map_err(|e| ApiError::Internal(e.to_string()))?);
    Ok(())
}
