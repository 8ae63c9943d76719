//! Data transfer objects for the HTTP API.

use std::collections::BTreeMap;

use qbench_sched::{
    BenchmarkResult, CatalogEntry, DispatchFailure, DispatchReport, ResourceKind,
    ResourceSummary, RunId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Encodings
// ============================================================================

/// Request to validate and store an encoding circuit.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEncodingRequest {
    pub name: String,
    /// Circuit document: `{"circuit": [...], "qubit_count": n}`.
    pub circuit: Value,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Outcome of an encoding submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEncodingResponse {
    pub valid: bool,
    pub errors: Vec<String>,
    pub id: Option<u64>,
}

// ============================================================================
// Ansatz and dataset catalog
// ============================================================================

/// Body of a catalog create or update request.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub depth: Option<usize>,
    /// Ansatz circuit document, stored as given.
    #[serde(default)]
    pub circuit: Option<Value>,
}

impl CatalogEntryRequest {
    /// Build the entry this request describes.
    pub fn into_entry(self, id: u64, kind: ResourceKind) -> CatalogEntry {
        let mut entry = CatalogEntry::new(id, kind, self.name);
        if let Some(description) = self.description {
            entry = entry.with_description(description);
        }
        if let Some(depth) = self.depth {
            entry = entry.with_depth(depth);
        }
        if let Some(circuit) = self.circuit {
            entry = entry.with_circuit(circuit);
        }
        entry
    }
}

/// Response to a create request.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedResponse {
    pub message: String,
    pub id: u64,
}

/// Ids to fetch in one call, with a switch between full records and
/// summaries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceFetchRequest {
    #[serde(default)]
    pub encoding_ids: Vec<u64>,
    #[serde(default)]
    pub ansatz_ids: Vec<u64>,
    #[serde(default)]
    pub dataset_ids: Vec<u64>,
    #[serde(default)]
    pub full: bool,
}

/// Requested resources keyed by id. Unknown ids are left out.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceFetchResponse {
    pub encodings: BTreeMap<u64, Value>,
    pub ansaetze: BTreeMap<u64, Value>,
    pub datasets: BTreeMap<u64, Value>,
}

// ============================================================================
// Runs
// ============================================================================

/// Body of a run update: the run is pointed at one new combination and
/// goes back to `pending`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRunRequest {
    pub encoding_id: u64,
    pub ansatz_id: u64,
    pub data_id: u64,
}

/// Response to a run request that dispatched at least one task.
#[derive(Debug, Clone, Serialize)]
pub struct StartRunResponse {
    pub message: String,
    pub ids: Vec<RunId>,
    pub failed: Vec<DispatchFailure>,
    pub warnings: Vec<String>,
}

impl From<DispatchReport> for StartRunResponse {
    fn from(report: DispatchReport) -> Self {
        let message = match report.created.as_slice() {
            [id] => format!("Created benchmark run with ID {id}"),
            ids if report.failed.is_empty() => {
                format!("Created {} benchmark runs", ids.len())
            }
            ids => format!(
                "Created {} benchmark runs, {} failed to start",
                ids.len(),
                report.failed.len()
            ),
        };

        Self {
            message,
            ids: report.created,
            failed: report.failed,
            warnings: report.warnings,
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// All results with summaries of the encodings and ansaetze they used.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultListing {
    pub results: Vec<BenchmarkResult>,
    pub encodings: BTreeMap<u64, ResourceSummary>,
    pub ansaetze: BTreeMap<u64, ResourceSummary>,
}

/// Body of a result update.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateResultRequest {
    pub encoding_id: u64,
    pub ansatz_id: u64,
    pub data_id: u64,
    pub loss: f64,
    pub accuracy: f64,
}

/// Response to a delete request.
#[derive(Debug, Clone, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
    pub id: u64,
}

// ============================================================================
// Health check response
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status (always "ok" if responding).
    pub status: String,
    /// Server version.
    pub version: String,
    /// Whether the result consumer is running.
    pub consumer_running: bool,
}

impl HealthResponse {
    pub fn new(consumer_running: bool) -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            consumer_running,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_run_message() {
        let single = StartRunResponse::from(DispatchReport {
            created: vec![RunId(7)],
            ..DispatchReport::default()
        });
        assert_eq!(single.message, "Created benchmark run with ID 7");

        let partial = StartRunResponse::from(DispatchReport {
            created: vec![RunId(1), RunId(3)],
            failed: vec![DispatchFailure {
                run_id: Some(RunId(2)),
                encoding_id: 1,
                ansatz_id: 1,
                data_id: 2,
                error: "Failed to send to worker".to_string(),
            }],
            warnings: Vec::new(),
        });
        assert_eq!(
            partial.message,
            "Created 2 benchmark runs, 1 failed to start"
        );
        assert_eq!(partial.ids, vec![RunId(1), RunId(3)]);
    }

    #[test]
    fn test_catalog_request_defaults() {
        let req: CatalogEntryRequest = serde_json::from_str(r#"{"name": "iris"}"#).unwrap();
        let entry = req.into_entry(5, ResourceKind::Dataset);
        assert_eq!(entry.id, 5);
        assert_eq!(entry.kind, ResourceKind::Dataset);
        assert_eq!(entry.depth, 0);
        assert!(entry.description.is_empty());
        assert!(entry.circuit.is_none());

        let fetch: ResourceFetchRequest =
            serde_json::from_str(r#"{"ansatz_ids": [2]}"#).unwrap();
        assert!(fetch.encoding_ids.is_empty());
        assert_eq!(fetch.ansatz_ids, vec![2]);
        assert!(!fetch.full);
    }
}
