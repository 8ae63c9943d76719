//! Integration tests for the validator entry points and the typed circuit.

use std::io::Write;

use qbench_circuit::{Circuit, GateKind, validate, validate_file, validate_str};
use serde_json::json;

#[test]
fn test_feature_count_example() {
    let result = validate(&json!({
        "circuit": [
            {"gate": "RY", "wires": [0], "params": ["input_0"]},
            {"gate": "CNOT", "wires": [1], "control": [0]}
        ]
    }));
    assert!(!result.valid);
    assert_eq!(result.errors.len(), 1);
    assert!(
        result.errors[0].contains("distinct inputs (1) does not match qubit count (2)"),
        "{}",
        result.errors[0]
    );
}

#[test]
fn test_overlap_example() {
    let result = validate(&json!({
        "circuit": [
            {"gate": "RY", "wires": [0], "params": ["input_0"]},
            {"gate": "RY", "wires": [1], "params": ["input_1"]},
            {"gate": "CNOT", "wires": [1], "control": [1]}
        ]
    }));
    assert!(!result.valid);
    assert_eq!(
        result.errors,
        vec!["Gate #3: control and wires overlap: [1]"]
    );
}

#[test]
fn test_validate_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let result = validate_file(&path);
    assert!(!result.valid);
    assert_eq!(
        result.errors,
        vec![format!("File does not exist: {}", path.display())]
    );
}

#[test]
fn test_validate_file_bad_json() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{\"circuit\": [").unwrap();
    let result = validate_file(file.path());
    assert!(!result.valid);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("JSON parsing error:"));
}

#[test]
fn test_validate_file_valid() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let doc = json!({
        "qubit_count": 2,
        "circuit": [
            {"gate": "RX", "wires": [0], "params": ["input_0"]},
            {"gate": "RX", "wires": [1], "params": ["input_1"]},
            {"gate": "CZ", "wires": [0], "control": [1]},
            {"gate": "MEASURE", "wires": [0, 1]}
        ]
    });
    write!(file, "{doc}").unwrap();
    let result = validate_file(file.path());
    assert!(result.valid, "{result}");
}

#[test]
fn test_validate_str_matches_validate() {
    let text = r#"{"circuit": [{"gate": "SWAP", "wires": [0, 1]}]}"#;
    let doc: serde_json::Value = serde_json::from_str(text).unwrap();
    assert_eq!(validate_str(text), validate(&doc));
}

#[test]
fn test_typed_circuit_from_valid_document() {
    let doc = json!({
        "circuit": [
            {"gate": "RY", "wires": [0], "params": ["input_0"]},
            {"gate": "RY", "wires": [1], "params": ["input_1"]},
            {"gate": "RZ", "wires": [1], "params": [0.25]},
            {"gate": "CNOT", "wires": [1], "control": [0]}
        ]
    });
    let circuit = Circuit::from_value(&doc).unwrap();
    assert_eq!(circuit.gate_count(), 4);
    assert_eq!(circuit.gates()[3].gate, GateKind::Cnot);
    assert_eq!(circuit.derived_qubit_count(), 2);
    assert_eq!(circuit.depth(), 3);
    assert_eq!(circuit.input_indices(), vec![0, 1]);
}
