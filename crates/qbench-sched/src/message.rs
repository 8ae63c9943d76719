//! Wire messages exchanged with benchmark workers.
//!
//! Tasks go out on the task queue as JSON [`TaskMessage`]s. Workers answer on
//! the result queue with status messages (`{"id": .., "status": .., ...}`),
//! decoded here into [`StatusMessage`] variants. Anything that does not fit
//! the schema is a [`MessageError`]; a well-formed message with a status this
//! version does not know is [`StatusMessage::Unknown`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::run::{RunId, RunResult};

/// Task descriptor published once per benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    pub run_id: RunId,
    pub encoding_id: u64,
    pub ansatz_id: u64,
    pub data_id: u64,
    pub measure_index: u32,
    /// Qubit hint for the worker; `0` means "recompute from the encoding".
    #[serde(alias = "qubits")]
    pub qubit_count: u32,
}

impl TaskMessage {
    /// Serialize to the JSON body sent to the task queue.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Parse a task body.
    pub fn from_bytes(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }
}

/// Errors raised while decoding a status message.
#[derive(Debug, Error)]
pub enum MessageError {
    /// Body is not JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Body is JSON but not an object.
    #[error("message is not a JSON object")]
    NotAnObject,

    /// A required field is absent.
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    /// A field has the wrong type or value.
    #[error("invalid field '{field}': {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

/// Status update reported by a worker for one run.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusMessage {
    /// The worker picked up the task.
    Init { run_id: RunId },
    /// Training progress in percent.
    Progress { run_id: RunId, progress: f64 },
    /// Training finished with metrics.
    Done { run_id: RunId, result: RunResult },
    /// The worker gave up on the run.
    Failed { run_id: RunId, error: String },
    /// Well-formed message with a status this consumer does not handle.
    Unknown { run_id: RunId, status: String },
}

impl StatusMessage {
    /// Run the message refers to.
    pub fn run_id(&self) -> RunId {
        match self {
            StatusMessage::Init { run_id }
            | StatusMessage::Progress { run_id, .. }
            | StatusMessage::Done { run_id, .. }
            | StatusMessage::Failed { run_id, .. }
            | StatusMessage::Unknown { run_id, .. } => *run_id,
        }
    }

    /// Status label as it appears on the wire.
    pub fn status(&self) -> &str {
        match self {
            StatusMessage::Init { .. } => "init",
            StatusMessage::Progress { .. } => "progress",
            StatusMessage::Done { .. } => "done",
            StatusMessage::Failed { .. } => "failed",
            StatusMessage::Unknown { status, .. } => status,
        }
    }

    /// Decode a status message body.
    pub fn decode(body: &[u8]) -> Result<Self, MessageError> {
        let value: Value = serde_json::from_slice(body)?;
        let obj = value.as_object().ok_or(MessageError::NotAnObject)?;

        let run_id = decode_run_id(obj)?;
        let status = obj
            .get("status")
            .ok_or(MessageError::MissingField("status"))?
            .as_str()
            .ok_or_else(|| MessageError::InvalidField {
                field: "status",
                reason: "expected a string".to_string(),
            })?;

        match status {
            "init" => Ok(StatusMessage::Init { run_id }),
            "progress" => {
                let progress = match obj.get("progress") {
                    None | Some(Value::Null) => 0.0,
                    Some(v) => v.as_f64().ok_or_else(|| MessageError::InvalidField {
                        field: "progress",
                        reason: format!("expected a number, got {v}"),
                    })?,
                };
                // Percentages outside 0..=100 are pinned to the nearest bound
                let progress = progress.clamp(0.0, 100.0);
                Ok(StatusMessage::Progress { run_id, progress })
            }
            "done" => {
                let raw = obj
                    .get("result")
                    .filter(|v| !v.is_null())
                    .ok_or(MessageError::MissingField("result"))?;
                let result = RunResult::deserialize(raw).map_err(|e| {
                    MessageError::InvalidField {
                        field: "result",
                        reason: e.to_string(),
                    }
                })?;
                Ok(StatusMessage::Done { run_id, result })
            }
            "failed" => {
                let error = obj
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("worker reported failure")
                    .to_string();
                Ok(StatusMessage::Failed { run_id, error })
            }
            other => Ok(StatusMessage::Unknown {
                run_id,
                status: other.to_string(),
            }),
        }
    }

    /// Encode to the JSON shape workers send.
    pub fn to_value(&self) -> Value {
        match self {
            StatusMessage::Init { run_id } => json!({"id": run_id, "status": "init"}),
            StatusMessage::Progress { run_id, progress } => {
                json!({"id": run_id, "status": "progress", "progress": progress})
            }
            StatusMessage::Done { run_id, result } => {
                json!({"id": run_id, "status": "done", "result": result})
            }
            StatusMessage::Failed { run_id, error } => {
                json!({"id": run_id, "status": "failed", "error": error})
            }
            StatusMessage::Unknown { run_id, status } => json!({"id": run_id, "status": status}),
        }
    }

    /// Encode to a message body.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_value().to_string().into_bytes()
    }
}

/// Run ids arrive as numbers, or as numeric strings from older workers.
fn decode_run_id(obj: &Map<String, Value>) -> Result<RunId, MessageError> {
    let raw = obj.get("id").ok_or(MessageError::MissingField("id"))?;
    let id = match raw {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    id.map(RunId).ok_or_else(|| MessageError::InvalidField {
        field: "id",
        reason: format!("expected a non-negative integer, got {raw}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(v: Value) -> Result<StatusMessage, MessageError> {
        StatusMessage::decode(v.to_string().as_bytes())
    }

    #[test]
    fn test_task_message_json() {
        let task = TaskMessage {
            run_id: RunId(4),
            encoding_id: 1,
            ansatz_id: 2,
            data_id: 3,
            measure_index: 0,
            qubit_count: 5,
        };
        let json: Value = serde_json::from_slice(&task.to_bytes().unwrap()).unwrap();
        assert_eq!(
            json,
            json!({"run_id": 4, "encoding_id": 1, "ansatz_id": 2, "data_id": 3,
                   "measure_index": 0, "qubit_count": 5})
        );

        let legacy = br#"{"run_id": 4, "encoding_id": 1, "ansatz_id": 2, "data_id": 3,
                          "measure_index": 0, "qubits": 5}"#;
        assert_eq!(TaskMessage::from_bytes(legacy).unwrap(), task);
    }

    #[test]
    fn test_decode_known_statuses() {
        assert_eq!(
            decode(json!({"id": 1, "status": "init"})).unwrap(),
            StatusMessage::Init { run_id: RunId(1) }
        );
        assert_eq!(
            decode(json!({"id": "2", "status": "progress", "progress": 37.5})).unwrap(),
            StatusMessage::Progress {
                run_id: RunId(2),
                progress: 37.5
            }
        );
        assert_eq!(
            decode(json!({"id": 2, "status": "progress"})).unwrap(),
            StatusMessage::Progress {
                run_id: RunId(2),
                progress: 0.0
            }
        );
        let done = decode(json!({
            "id": 3,
            "status": "done",
            "result": {"run_id": 3, "encoding_id": 1, "loss": 0.25, "accuracy": 0.75}
        }))
        .unwrap();
        assert_eq!(
            done,
            StatusMessage::Done {
                run_id: RunId(3),
                result: RunResult {
                    loss: 0.25,
                    accuracy: 0.75
                }
            }
        );
    }

    #[test]
    fn test_decode_progress_out_of_range() {
        assert_eq!(
            decode(json!({"id": 1, "status": "progress", "progress": 250})).unwrap(),
            StatusMessage::Progress {
                run_id: RunId(1),
                progress: 100.0
            }
        );
        assert_eq!(
            decode(json!({"id": 1, "status": "progress", "progress": -5})).unwrap(),
            StatusMessage::Progress {
                run_id: RunId(1),
                progress: 0.0
            }
        );
    }

    #[test]
    fn test_decode_unknown_status() {
        let msg = decode(json!({"id": 9, "status": "paused"})).unwrap();
        assert_eq!(msg.status(), "paused");
        assert_eq!(msg.run_id(), RunId(9));
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(
            StatusMessage::decode(b"not json"),
            Err(MessageError::Json(_))
        ));
        assert!(matches!(decode(json!([1])), Err(MessageError::NotAnObject)));
        assert!(matches!(
            decode(json!({"status": "init"})),
            Err(MessageError::MissingField("id"))
        ));
        assert!(matches!(
            decode(json!({"id": -1, "status": "init"})),
            Err(MessageError::InvalidField { field: "id", .. })
        ));
        assert!(matches!(
            decode(json!({"id": 1})),
            Err(MessageError::MissingField("status"))
        ));
        assert!(matches!(
            decode(json!({"id": 1, "status": "done"})),
            Err(MessageError::MissingField("result"))
        ));
        assert!(matches!(
            decode(json!({"id": 1, "status": "progress", "progress": "half"})),
            Err(MessageError::InvalidField {
                field: "progress",
                ..
            })
        ));
    }

    #[test]
    fn test_encode_decode_failed() {
        let msg = StatusMessage::Failed {
            run_id: RunId(5),
            error: "dataset missing".to_string(),
        };
        assert_eq!(StatusMessage::decode(&msg.to_bytes()).unwrap(), msg);
    }
}
