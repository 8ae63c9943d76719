//! Stored encoding circuits.

use chrono::{DateTime, Utc};
use qbench_circuit::Circuit;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A validated encoding circuit as kept in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encoding {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    /// The circuit document as submitted, after normalization.
    pub circuit: Value,
    pub qubit_count: u32,
    pub depth: usize,
    pub created_at: DateTime<Utc>,
}

impl Encoding {
    /// Build an encoding record from a circuit that already passed validation.
    pub fn new(
        id: u64,
        name: impl Into<String>,
        document: Value,
        circuit: &Circuit,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            url: String::new(),
            circuit: document,
            qubit_count: circuit.derived_qubit_count(),
            depth: circuit.depth(),
            created_at: Utc::now(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the reference URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Qubit hint for task messages: every qubit the circuit touches,
    /// controls included.
    pub fn qubit_hint(&self) -> Option<u32> {
        qbench_circuit::qubit_hint(&self.circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encoding_from_circuit() {
        let doc = json!({
            "circuit": [
                {"gate": "RY", "wires": [0], "params": ["input_0"]},
                {"gate": "RY", "wires": [1], "params": ["input_1"]},
                {"gate": "CZ", "wires": [1], "control": [0]}
            ]
        });
        let circuit = Circuit::from_value(&doc).unwrap();
        let encoding = Encoding::new(3, "angle", doc, &circuit).with_description("RY feature map");

        assert_eq!(encoding.qubit_count, 2);
        assert_eq!(encoding.depth, 2);
        assert_eq!(encoding.qubit_hint(), Some(2));
        assert_eq!(encoding.description, "RY feature map");
    }
}
