//! Circuit validation endpoint.

use axum::Json;
use qbench_circuit::ValidationResult;
use serde_json::Value;

/// POST /api/validate - Validate a circuit document without storing it.
///
/// Always answers 200; the verdict is in the body.
pub async fn validate(Json(document): Json<Value>) -> Json<ValidationResult> {
    Json(qbench_circuit::validate(&document))
}
