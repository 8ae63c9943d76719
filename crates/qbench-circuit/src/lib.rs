//! qbench encoding circuits
//!
//! This crate holds the circuit model shared by the qbench server and CLI:
//! gate kinds, typed circuits, circuit metrics, and the rule-based validator
//! that every encoding passes before it is stored or benchmarked.
//!
//! # Core Components
//!
//! - **Gates**: [`GateKind`] for the supported operations and [`Param`] for
//!   angles and `input_<k>` feature references
//! - **Circuit**: [`Circuit`] typed view of a validated document, with
//!   qubit count, depth and feature metrics
//! - **Validation**: [`validate`] and friends, producing a [`ValidationResult`]
//!
//! # Example: Validating an Encoding
//!
//! ```rust
//! use qbench_circuit::validate;
//! use serde_json::json;
//!
//! let doc = json!({
//!     "circuit": [
//!         {"gate": "RY", "wires": [0], "params": ["input_0"]},
//!         {"gate": "CNOT", "wires": [1], "control": [0]}
//!     ]
//! });
//!
//! let result = validate(&doc);
//! assert!(!result.valid);
//! assert_eq!(
//!     result.errors,
//!     vec!["Number of distinct inputs (1) does not match qubit count (2)"]
//! );
//! ```
//!
//! # Supported Gates
//!
//! | Gate | Params | Control |
//! |------|--------|---------|
//! | `H`, `X`, `Y`, `Z` | no | no |
//! | `RX`, `RY`, `RZ` | yes | no |
//! | `CNOT`, `CZ` | no | yes |
//! | `SWAP` | no | no |
//! | `MEASURE` | no | no (last gate only) |

pub mod circuit;
pub mod error;
pub mod gate;
pub mod validate;

pub use circuit::{Circuit, qubit_hint};
pub use error::{CircuitError, CircuitResult};
pub use gate::{Gate, GateKind, INPUT_PREFIX, MAX_ANGLE, Param, parse_input_ref};
pub use validate::{
    ValidationResult, validate, validate_and_normalize, validate_file, validate_str,
};
