//! Typed encoding circuits and their metrics.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CircuitError, CircuitResult};
use crate::gate::Gate;
use crate::validate::validate;

/// An encoding circuit: an ordered list of gates plus an optional declared
/// qubit count.
///
/// Build one from an untyped document with [`Circuit::from_value`], which runs
/// the validator first, so every `Circuit` obtained that way satisfies the
/// validation rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    /// Gates in execution order.
    pub circuit: Vec<Gate>,
    /// Declared qubit count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qubit_count: Option<u32>,
    /// Legacy name of `qubit_count`.
    #[serde(default, skip_serializing)]
    qubits: Option<u32>,
}

impl Circuit {
    /// Create a circuit from gates, without a declared qubit count.
    pub fn new(gates: impl Into<Vec<Gate>>) -> Self {
        Self {
            circuit: gates.into(),
            qubit_count: None,
            qubits: None,
        }
    }

    /// Declare the qubit count.
    pub fn with_qubit_count(mut self, count: u32) -> Self {
        self.qubit_count = Some(count);
        self
    }

    /// Validate an untyped document and decode it.
    pub fn from_value(value: &Value) -> CircuitResult<Self> {
        let report = validate(value);
        if !report.valid {
            return Err(CircuitError::Invalid {
                errors: report.errors,
            });
        }
        Ok(Self::deserialize(value)?)
    }

    /// Decode a document without validating it.
    ///
    /// Fails only if the shape does not fit the typed model.
    pub fn from_value_unchecked(value: &Value) -> CircuitResult<Self> {
        Ok(Self::deserialize(value)?)
    }

    /// Gates in execution order.
    pub fn gates(&self) -> &[Gate] {
        &self.circuit
    }

    /// Number of gates.
    pub fn gate_count(&self) -> usize {
        self.circuit.len()
    }

    /// Declared qubit count, accepting the legacy `qubits` field.
    pub fn declared_qubit_count(&self) -> Option<u32> {
        self.qubit_count.or(self.qubits)
    }

    /// Qubit count derived from target wires: highest wire index plus one.
    ///
    /// Control qubits are not counted; they must refer to existing wires.
    pub fn derived_qubit_count(&self) -> u32 {
        self.circuit
            .iter()
            .flat_map(|g| g.wires.iter().copied())
            .max()
            .map_or(0, |max| max + 1)
    }

    /// Qubit count over every qubit touched, controls included.
    pub fn occupied_qubit_count(&self) -> u32 {
        self.circuit
            .iter()
            .flat_map(|g| g.qubits())
            .max()
            .map_or(0, |max| max + 1)
    }

    /// Circuit depth: the longest chain of gates sharing a qubit.
    pub fn depth(&self) -> usize {
        let mut qubit_depth: FxHashMap<u32, usize> = FxHashMap::default();
        let mut max_depth = 0;

        for gate in &self.circuit {
            let layer = gate
                .qubits()
                .filter_map(|q| qubit_depth.get(&q).copied())
                .max()
                .unwrap_or(0)
                + 1;
            for q in gate.qubits() {
                qubit_depth.insert(q, layer);
            }
            max_depth = max_depth.max(layer);
        }

        max_depth
    }

    /// Distinct `input_<k>` feature indices, sorted.
    pub fn input_indices(&self) -> Vec<u32> {
        self.circuit
            .iter()
            .flat_map(|g| g.params.iter().filter_map(|p| p.input_index()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Best-effort occupied qubit count of an untyped document.
///
/// Walks `wires` and `control` of every gate without validating anything
/// else. Returns `None` when the document has no `circuit` list.
pub fn qubit_hint(value: &Value) -> Option<u32> {
    let gates = value.get("circuit")?.as_array()?;
    let mut max: Option<u64> = None;
    for gate in gates {
        for field in ["wires", "control"] {
            if let Some(indices) = gate.get(field).and_then(Value::as_array) {
                for idx in indices.iter().filter_map(Value::as_u64) {
                    max = Some(max.map_or(idx, |m| m.max(idx)));
                }
            }
        }
    }
    let count = max.map_or(0, |m| m + 1);
    u32::try_from(count).ok()
}
