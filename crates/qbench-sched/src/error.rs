//! Error handling for the benchmark pipeline.

use thiserror::Error;

use crate::catalog::ResourceKind;
use crate::run::RunId;

/// Result type for pipeline operations.
pub type SchedResult<T> = Result<T, SchedError>;

/// Errors that can occur while dispatching or reconciling benchmark runs.
#[derive(Error, Debug)]
pub enum SchedError {
    /// Run not found in the store.
    #[error("Run not found: {0}")]
    RunNotFound(RunId),

    /// Encoding not found in the store.
    #[error("Encoding not found: {0}")]
    EncodingNotFound(u64),

    /// Ansatz or dataset not found in the catalog.
    #[error("{kind} not found: {id}")]
    ResourceNotFound { kind: ResourceKind, id: u64 },

    /// The request cannot be dispatched as given.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Every combination of a run request failed to dispatch.
    #[error("All {attempted} tasks failed to start")]
    AllTasksFailed {
        /// Number of combinations attempted.
        attempted: usize,
        /// Failure messages, keyed by run id where one was allocated.
        failures: Vec<(Option<RunId>, String)>,
    },

    /// Opening a broker connection failed.
    #[error("Broker connection failed: {0}")]
    Connection(String),

    /// A broker operation on an open channel failed.
    #[error("Broker error: {0}")]
    Broker(String),

    /// Publishing a task failed after all attempts.
    #[error("Publish failed after {attempts} attempts: {reason}")]
    PublishFailed {
        /// Attempts made.
        attempts: u32,
        /// Last error seen.
        reason: String,
    },

    /// A message body could not be decoded.
    #[error("Malformed message: {0}")]
    Message(#[from] crate::message::MessageError),

    /// Persistence error.
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    /// SQLite database error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Internal pipeline error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for SchedError {
    fn from(e: rusqlite::Error) -> Self {
        SchedError::DatabaseError(e.to_string())
    }
}

#[cfg(feature = "amqp")]
impl From<lapin::Error> for SchedError {
    fn from(e: lapin::Error) -> Self {
        SchedError::Broker(e.to_string())
    }
}

impl SchedError {
    /// Whether the error came from the message broker.
    pub fn is_broker_error(&self) -> bool {
        matches!(
            self,
            SchedError::Connection(_) | SchedError::Broker(_) | SchedError::PublishFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SchedError::RunNotFound(RunId(42));
        assert_eq!(err.to_string(), "Run not found: 42");

        let err = SchedError::PublishFailed {
            attempts: 3,
            reason: "channel closed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Publish failed after 3 attempts: channel closed"
        );
        assert!(err.is_broker_error());

        let err = SchedError::AllTasksFailed {
            attempted: 2,
            failures: vec![],
        };
        assert_eq!(err.to_string(), "All 2 tasks failed to start");
        assert!(!err.is_broker_error());
    }
}
