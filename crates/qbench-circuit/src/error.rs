//! Error types for the circuit crate.

use thiserror::Error;

/// Errors that can occur when decoding or inspecting a circuit.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CircuitError {
    /// Gate name is not part of the supported set.
    #[error("Unsupported gate '{0}'")]
    UnsupportedGate(String),

    /// String parameter that is not an `input_<k>` reference.
    #[error("Unknown parameter reference '{0}'")]
    UnknownParameter(String),

    /// The document failed validation and cannot be turned into a typed circuit.
    #[error("Invalid circuit: {}", .errors.join("; "))]
    Invalid {
        /// Validation messages, in the order they were found.
        errors: Vec<String>,
    },

    /// The document is structurally valid JSON but does not match the circuit schema.
    #[error("Malformed circuit document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Result type for circuit operations.
pub type CircuitResult<T> = Result<T, CircuitError>;
