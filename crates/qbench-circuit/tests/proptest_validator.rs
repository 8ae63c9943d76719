//! Property-based tests for the circuit validator.

use proptest::prelude::*;
use qbench_circuit::{validate, validate_and_normalize};
use serde_json::{Value, json};

/// One `RY(input_k)` per qubit: a valid `n`-qubit encoding.
fn feature_map(n: u32) -> Vec<Value> {
    (0..n)
        .map(|k| json!({"gate": "RY", "wires": [k], "params": [format!("input_{k}")]}))
        .collect()
}

fn joined(indices: impl IntoIterator<Item = u32>) -> String {
    indices
        .into_iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

proptest! {
    /// Normalizing never changes the verdict, and the normalized document
    /// always declares a qubit count.
    #[test]
    fn normalization_preserves_validity(
        n in 1_u32..6,
        declared in proptest::option::of(0_u32..8),
        extra in prop::collection::vec((0_u32..6, 0_u32..6), 0..5),
    ) {
        let mut gates = feature_map(n);
        for (a, b) in extra {
            let (a, b) = (a % n, b % n);
            if a == b {
                gates.push(json!({"gate": "H", "wires": [a]}));
            } else {
                gates.push(json!({"gate": "CZ", "wires": [a], "control": [b]}));
            }
        }
        let mut doc = json!({"circuit": gates});
        if let Some(q) = declared {
            doc["qubit_count"] = json!(q);
        }

        let before = validate(&doc);
        let mut normalized = doc.clone();
        let during = validate_and_normalize(&mut normalized);

        prop_assert_eq!(&during, &before);
        prop_assert_eq!(validate(&normalized).valid, before.valid);
        prop_assert!(normalized.get("qubit_count").is_some());
        prop_assert_eq!(before.valid, declared.is_none_or(|q| q == n));
    }

    /// A control index equal to one of the gate's own wires is always
    /// reported, naming exactly the shared indices.
    #[test]
    fn overlap_names_exact_indices(
        n in 2_u32..6,
        wires in prop::collection::btree_set(0_u32..6, 1..4),
        control in prop::collection::btree_set(0_u32..6, 1..4),
    ) {
        let wires: std::collections::BTreeSet<u32> = wires.into_iter().map(|w| w % n).collect();
        let control: std::collections::BTreeSet<u32> = control.into_iter().map(|c| c % n).collect();
        let shared: Vec<u32> = wires.intersection(&control).copied().collect();

        let mut gates = feature_map(n);
        gates.push(json!({"gate": "CNOT", "wires": wires, "control": control}));
        let result = validate(&json!({"circuit": gates}));

        let overlap_errors: Vec<&String> = result
            .errors
            .iter()
            .filter(|e| e.contains("overlap"))
            .collect();

        if shared.is_empty() {
            prop_assert!(overlap_errors.is_empty());
            prop_assert!(result.valid);
        } else {
            prop_assert!(!result.valid);
            prop_assert_eq!(overlap_errors.len(), 1);
            let expected = format!(
                "Gate #{}: control and wires overlap: [{}]",
                n + 1,
                joined(shared)
            );
            prop_assert_eq!(overlap_errors[0], &expected);
        }
    }

    /// Wires define the register, so a control index at or past it is
    /// always rejected.
    #[test]
    fn control_beyond_wires_rejected(n in 1_u32..6, past in 0_u32..4, target in 0_u32..6) {
        let control = n + past;
        let mut gates = feature_map(n);
        gates.push(json!({"gate": "CNOT", "wires": [target % n], "control": [control]}));

        let result = validate(&json!({"circuit": gates}));
        prop_assert!(!result.valid);
        prop_assert_eq!(
            result.errors,
            vec![format!(
                "Gate #{}: control qubit {control} outside register ({n})",
                n + 1
            )]
        );
    }

    /// Valid only when the distinct input count equals the qubit count;
    /// otherwise the message carries both numbers.
    #[test]
    fn feature_count_must_match_qubits(n in 1_u32..8, m in 0_u32..8) {
        let mut gates: Vec<Value> = (0..n)
            .map(|k| {
                if k < m {
                    json!({"gate": "RY", "wires": [k], "params": [format!("input_{k}")]})
                } else {
                    json!({"gate": "H", "wires": [k]})
                }
            })
            .collect();
        for k in n..m {
            gates.push(json!({"gate": "RZ", "wires": [0], "params": [format!("input_{k}")]}));
        }

        let result = validate(&json!({"circuit": gates}));
        if m == n {
            prop_assert!(result.valid, "{}", result);
        } else {
            prop_assert_eq!(
                result.errors,
                vec![format!(
                    "Number of distinct inputs ({m}) does not match qubit count ({n})"
                )]
            );
        }
    }
}
