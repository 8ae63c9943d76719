//! Rule-based validation of untyped circuit documents.
//!
//! The validator walks a JSON document and collects every problem it finds
//! instead of stopping at the first one. Only a missing or non-list
//! `circuit` field ends validation early, since nothing else can be checked
//! without it.
//!
//! Checks, in order:
//!
//! 1. `circuit` exists and is a list.
//! 2. The qubit count is derived from target wires (`max + 1`). A declared
//!    `qubit_count` (or legacy `qubits`) must match it; when absent the
//!    derived value is used. A circuit with no wires at all is rejected here.
//! 3. Every gate is checked on its own (kind, placement, wires, control,
//!    params). Control qubits must fall inside the derived register.
//!    Messages number gates from 1.
//! 4. The number of distinct `input_<k>` references must equal the qubit
//!    count.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CircuitError, CircuitResult};
use crate::gate::{GateKind, MAX_ANGLE, parse_input_ref};

const QUBIT_COUNT_FIELD: &str = "qubit_count";
const LEGACY_QUBITS_FIELD: &str = "qubits";

/// Outcome of validating a circuit document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether no errors were found.
    pub valid: bool,
    /// Human-readable errors in the order they were found.
    pub errors: Vec<String>,
}

impl ValidationResult {
    /// Build a result from collected errors.
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// A result carrying a single error.
    pub fn single(error: impl Into<String>) -> Self {
        Self::from_errors(vec![error.into()])
    }

    /// Convert into a `Result`, keeping the messages on failure.
    pub fn into_result(self) -> CircuitResult<()> {
        if self.valid {
            Ok(())
        } else {
            Err(CircuitError::Invalid {
                errors: self.errors,
            })
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            return write!(f, "valid");
        }
        writeln!(f, "invalid ({} errors):", self.errors.len())?;
        for err in &self.errors {
            writeln!(f, "  - {err}")?;
        }
        Ok(())
    }
}

/// Validate a circuit document.
///
/// Never panics on malformed input; all problems are reported in the result.
pub fn validate(doc: &Value) -> ValidationResult {
    Validator::default().run(doc).0
}

/// Validate a circuit document and write the derived qubit count into it
/// when it declares none.
///
/// Normalizing a document never changes whether it is valid.
pub fn validate_and_normalize(doc: &mut Value) -> ValidationResult {
    let (result, derived) = Validator::default().run(doc);
    if let (Some(derived), Some(obj)) = (derived, doc.as_object_mut()) {
        obj.insert(QUBIT_COUNT_FIELD.to_string(), Value::from(derived));
    }
    result
}

/// Validate a circuit document given as JSON text.
pub fn validate_str(text: &str) -> ValidationResult {
    match serde_json::from_str::<Value>(text) {
        Ok(doc) => validate(&doc),
        Err(e) => ValidationResult::single(format!("JSON parsing error: {e}")),
    }
}

/// Validate a circuit document stored in a JSON file.
///
/// Missing files, read failures and malformed JSON are each reported as a
/// single validation error.
pub fn validate_file(path: impl AsRef<Path>) -> ValidationResult {
    let path = path.as_ref();
    if !path.exists() {
        return ValidationResult::single(format!("File does not exist: {}", path.display()));
    }
    match std::fs::read_to_string(path) {
        Ok(text) => validate_str(&text),
        Err(e) => ValidationResult::single(format!("File reading error: {e}")),
    }
}

#[derive(Default)]
struct Validator {
    errors: Vec<String>,
    inputs: BTreeSet<u64>,
    register: u64,
}

impl Validator {
    /// Returns the result and, when the document declares no qubit count,
    /// the derived one.
    fn run(mut self, doc: &Value) -> (ValidationResult, Option<u64>) {
        let Some(gates) = doc.get("circuit").and_then(Value::as_array) else {
            return (
                ValidationResult::single("Missing or invalid 'circuit'"),
                None,
            );
        };

        let derived = derive_qubit_count(gates);
        self.register = derived;
        let (qubits, normalized) = self.check_qubit_count(doc, derived);

        let last = gates.len().saturating_sub(1);
        for (idx, gate) in gates.iter().enumerate() {
            self.check_gate(idx + 1, gate, idx == last);
        }

        let distinct = self.inputs.len() as u64;
        if distinct != qubits {
            self.errors.push(format!(
                "Number of distinct inputs ({distinct}) does not match qubit count ({qubits})"
            ));
        }

        (ValidationResult::from_errors(self.errors), normalized)
    }

    fn check_qubit_count(&mut self, doc: &Value, derived: u64) -> (u64, Option<u64>) {
        if derived == 0 {
            self.errors
                .push("'circuit' has no wires; derived qubit count is 0".to_string());
        }

        let declared = doc
            .get(QUBIT_COUNT_FIELD)
            .filter(|v| !v.is_null())
            .or_else(|| doc.get(LEGACY_QUBITS_FIELD).filter(|v| !v.is_null()));

        match declared {
            None => (derived, Some(derived)),
            Some(value) => match value.as_u64() {
                Some(provided) => {
                    if provided != derived {
                        self.errors.push(format!(
                            "'qubit_count' ({provided}) inconsistent with wires+1 ({derived})"
                        ));
                    }
                    (provided, None)
                }
                None => {
                    self.errors.push(format!(
                        "'qubit_count' must be a non-negative integer, got {}",
                        show(value)
                    ));
                    (derived, None)
                }
            },
        }
    }

    fn check_gate(&mut self, n: usize, gate: &Value, is_last: bool) {
        let Some(obj) = gate.as_object() else {
            self.errors.push(format!("Gate #{n} must be an object"));
            return;
        };

        let mut missing = false;
        for field in ["gate", "wires"] {
            if !obj.contains_key(field) {
                self.errors.push(format!("Gate #{n} missing '{field}'"));
                missing = true;
            }
        }
        if missing {
            return;
        }

        let raw_kind = &obj["gate"];
        let kind = raw_kind.as_str().and_then(|s| s.parse::<GateKind>().ok());
        match kind {
            None => self
                .errors
                .push(format!("Gate #{n}: unsupported 'gate' {}", show(raw_kind))),
            Some(k) if k.is_measurement() && !is_last => self
                .errors
                .push(format!("Gate #{n}: '{}' must be last", k.name())),
            Some(_) => {}
        }

        let wires = &obj["wires"];
        self.check_wires(n, wires);

        if let Some(control) = obj.get("control").filter(|c| !c.is_null()) {
            self.check_control(n, control, kind, raw_kind);
            if let (Some(control), Some(wires)) = (control.as_array(), wires.as_array()) {
                self.check_overlap(n, control, wires);
            }
        }

        self.check_params(n, obj.get("params"), kind, raw_kind);
    }

    fn check_wires(&mut self, n: usize, wires: &Value) {
        let Some(list) = wires.as_array().filter(|l| !l.is_empty()) else {
            self.errors.push(format!("Gate #{n}: invalid 'wires'"));
            return;
        };
        for w in list {
            if w.as_u64().is_none() {
                self.errors
                    .push(format!("Gate #{n}: invalid wire index {}", show(w)));
            }
        }
    }

    fn check_control(&mut self, n: usize, control: &Value, kind: Option<GateKind>, raw_kind: &Value) {
        let Some(list) = control.as_array() else {
            self.errors
                .push(format!("Gate #{n}: 'control' must be a list"));
            return;
        };
        if !kind.is_some_and(|k| k.is_controlled()) {
            self.errors.push(format!(
                "Gate #{n}: 'control' not allowed for {}",
                show(raw_kind)
            ));
            return;
        }
        for c in list {
            match c.as_u64() {
                None => self
                    .errors
                    .push(format!("Gate #{n}: invalid control qubit {}", show(c))),
                // An empty register is already reported by the qubit count check
                Some(q) if self.register > 0 && q >= self.register => {
                    self.errors.push(format!(
                        "Gate #{n}: control qubit {q} outside register ({})",
                        self.register
                    ));
                }
                Some(_) => {}
            }
        }
    }

    fn check_overlap(&mut self, n: usize, control: &[Value], wires: &[Value]) {
        let control: BTreeSet<i64> = control.iter().filter_map(Value::as_i64).collect();
        let wires: BTreeSet<i64> = wires.iter().filter_map(Value::as_i64).collect();
        let overlap: Vec<String> = control
            .intersection(&wires)
            .map(ToString::to_string)
            .collect();
        if !overlap.is_empty() {
            self.errors.push(format!(
                "Gate #{n}: control and wires overlap: [{}]",
                overlap.join(", ")
            ));
        }
    }

    fn check_params(
        &mut self,
        n: usize,
        params: Option<&Value>,
        kind: Option<GateKind>,
        raw_kind: &Value,
    ) {
        let list = params.and_then(Value::as_array);
        if let Some(list) = list {
            self.inputs.extend(
                list.iter()
                    .filter_map(Value::as_str)
                    .filter_map(parse_input_ref)
                    .map(u64::from),
            );
        }

        if kind.is_some_and(|k| k.is_parameterized()) {
            let Some(list) = list.filter(|l| !l.is_empty()) else {
                self.errors
                    .push(format!("Gate #{n}: invalid or missing 'params'"));
                return;
            };
            for p in list {
                match p {
                    Value::Number(num) => {
                        let out_of_range = num.as_f64().is_none_or(|v| v.abs() > MAX_ANGLE);
                        if out_of_range {
                            self.errors
                                .push(format!("Gate #{n}: param {num} out of range"));
                        }
                    }
                    Value::String(s) => {
                        if parse_input_ref(s).is_none() {
                            self.errors.push(format!(
                                "Gate #{n}: unknown parameter reference '{s}'"
                            ));
                        }
                    }
                    _ => self.errors.push(format!("Gate #{n}: invalid param type")),
                }
            }
        } else if params.is_some_and(is_present) {
            self.errors.push(format!(
                "Gate #{n}: 'params' not allowed for {}",
                show(raw_kind)
            ));
        }
    }
}

fn derive_qubit_count(gates: &[Value]) -> u64 {
    gates
        .iter()
        .filter_map(|g| g.get("wires").and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_u64)
        .max()
        .map_or(0, |max| max.saturating_add(1))
}

/// Whether a `params` value carries anything (`null` and `[]` do not).
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

/// Render a JSON value for an error message; strings appear without quotes.
fn show(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn errors(doc: Value) -> Vec<String> {
        validate(&doc).errors
    }

    #[test]
    fn test_valid_circuit() {
        let result = validate(&json!({
            "circuit": [
                {"gate": "RY", "wires": [0], "params": ["input_0"]},
                {"gate": "RY", "wires": [1], "params": ["input_1"]},
                {"gate": "CNOT", "wires": [1], "control": [0]},
                {"gate": "MEASURE", "wires": [0, 1]}
            ]
        }));
        assert!(result.valid, "{result}");
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_missing_circuit_stops_early() {
        assert_eq!(errors(json!({})), vec!["Missing or invalid 'circuit'"]);
        assert_eq!(
            errors(json!({"circuit": "H 0"})),
            vec!["Missing or invalid 'circuit'"]
        );
        assert_eq!(errors(json!([1, 2])), vec!["Missing or invalid 'circuit'"]);
    }

    #[test]
    fn test_empty_circuit_reported_once() {
        let errs = errors(json!({"circuit": []}));
        assert_eq!(errs.len(), 1);
        assert!(errs[0].contains("no wires"));
    }

    #[test]
    fn test_qubit_count_mismatch_continues() {
        let errs = errors(json!({
            "qubit_count": 3,
            "circuit": [{"gate": "FOO", "wires": [0]}]
        }));
        assert_eq!(errs[0], "'qubit_count' (3) inconsistent with wires+1 (1)");
        assert!(errs.contains(&"Gate #1: unsupported 'gate' FOO".to_string()));
    }

    #[test]
    fn test_legacy_qubits_alias() {
        let errs = errors(json!({
            "qubits": 2,
            "circuit": [{"gate": "RX", "wires": [0], "params": ["input_0"]}]
        }));
        assert_eq!(errs[0], "'qubit_count' (2) inconsistent with wires+1 (1)");
    }

    #[test]
    fn test_missing_fields_skip_gate() {
        let errs = errors(json!({
            "circuit": [
                {"params": [1.0]},
                {"gate": "H", "wires": [0], "params": []},
                "not a gate"
            ]
        }));
        assert!(errs.contains(&"Gate #1 missing 'gate'".to_string()));
        assert!(errs.contains(&"Gate #1 missing 'wires'".to_string()));
        assert!(errs.contains(&"Gate #3 must be an object".to_string()));
        assert!(!errs.iter().any(|e| e.starts_with("Gate #2")));
    }

    #[test]
    fn test_measure_must_be_last() {
        let errs = errors(json!({
            "circuit": [
                {"gate": "MEASURE", "wires": [0]},
                {"gate": "RX", "wires": [0], "params": ["input_0"]}
            ]
        }));
        assert_eq!(errs, vec!["Gate #1: 'MEASURE' must be last"]);
    }

    #[test]
    fn test_invalid_wires() {
        let errs = errors(json!({
            "circuit": [
                {"gate": "RX", "wires": [0], "params": ["input_0"]},
                {"gate": "H", "wires": []},
                {"gate": "X", "wires": [-1, "a"]}
            ]
        }));
        assert!(errs.contains(&"Gate #2: invalid 'wires'".to_string()));
        assert!(errs.contains(&"Gate #3: invalid wire index -1".to_string()));
        assert!(errs.contains(&"Gate #3: invalid wire index a".to_string()));
    }

    #[test]
    fn test_control_rules() {
        let errs = errors(json!({
            "circuit": [
                {"gate": "RX", "wires": [0], "params": ["input_0"]},
                {"gate": "H", "wires": [0], "control": [1]},
                {"gate": "CZ", "wires": [0], "control": 1},
                {"gate": "CNOT", "wires": [0], "control": [-2]}
            ]
        }));
        assert!(errs.contains(&"Gate #2: 'control' not allowed for H".to_string()));
        assert!(errs.contains(&"Gate #3: 'control' must be a list".to_string()));
        assert!(errs.contains(&"Gate #4: invalid control qubit -2".to_string()));
    }

    #[test]
    fn test_null_control_ignored() {
        let result = validate(&json!({
            "circuit": [{"gate": "RX", "wires": [0], "params": ["input_0"], "control": null}]
        }));
        assert!(result.valid, "{result}");
    }

    #[test]
    fn test_control_wire_overlap() {
        let errs = errors(json!({
            "circuit": [
                {"gate": "RX", "wires": [0], "params": ["input_0"]},
                {"gate": "RX", "wires": [1], "params": ["input_1"]},
                {"gate": "CNOT", "wires": [1], "control": [1]}
            ]
        }));
        assert_eq!(errs, vec!["Gate #3: control and wires overlap: [1]"]);
    }

    #[test]
    fn test_control_outside_register() {
        let errs = errors(json!({
            "circuit": [
                {"gate": "RY", "wires": [0], "params": ["input_0"]},
                {"gate": "CNOT", "wires": [0], "control": [5]}
            ]
        }));
        assert_eq!(errs, vec!["Gate #2: control qubit 5 outside register (1)"]);
    }

    #[test]
    fn test_param_rules() {
        let errs = errors(json!({
            "circuit": [
                {"gate": "RX", "wires": [0]},
                {"gate": "RY", "wires": [0], "params": [7.0, "theta", true, "input_0"]},
                {"gate": "RZ", "wires": [0], "params": [-6.28]},
                {"gate": "X", "wires": [0], "params": [0.5]}
            ]
        }));
        assert_eq!(
            errs,
            vec![
                "Gate #1: invalid or missing 'params'",
                "Gate #2: param 7.0 out of range",
                "Gate #2: unknown parameter reference 'theta'",
                "Gate #2: invalid param type",
                "Gate #4: 'params' not allowed for X",
            ]
        );
    }

    #[test]
    fn test_feature_count_mismatch() {
        let errs = errors(json!({
            "circuit": [
                {"gate": "RY", "wires": [0], "params": ["input_0"]},
                {"gate": "CNOT", "wires": [1], "control": [0]}
            ]
        }));
        assert_eq!(
            errs,
            vec!["Number of distinct inputs (1) does not match qubit count (2)"]
        );
    }

    #[test]
    fn test_repeated_inputs_count_once() {
        let result = validate(&json!({
            "circuit": [
                {"gate": "RY", "wires": [0], "params": ["input_0"]},
                {"gate": "RZ", "wires": [0], "params": ["input_0"]}
            ]
        }));
        assert!(result.valid, "{result}");
    }

    #[test]
    fn test_normalize_sets_qubit_count() {
        let mut doc = json!({
            "circuit": [
                {"gate": "RY", "wires": [0], "params": ["input_0"]},
                {"gate": "RY", "wires": [1], "params": ["input_1"]}
            ]
        });
        let first = validate_and_normalize(&mut doc);
        assert!(first.valid);
        assert_eq!(doc["qubit_count"], json!(2));
        assert_eq!(validate(&doc), first);
    }

    #[test]
    fn test_normalize_keeps_declared_count() {
        let mut doc = json!({"qubit_count": 5, "circuit": [{"gate": "H", "wires": [0]}]});
        validate_and_normalize(&mut doc);
        assert_eq!(doc["qubit_count"], json!(5));
    }

    #[test]
    fn test_validate_str_bad_json() {
        let result = validate_str("{not json");
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("JSON parsing error"));
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationResult::from_errors(vec![]).into_result().is_ok());
        assert!(ValidationResult::single("bad").into_result().is_err());
    }
}
