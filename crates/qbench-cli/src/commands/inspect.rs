//! Inspect command implementation.
//!
//! Print the metrics of a valid circuit file.

use anyhow::Result;
use console::style;
use serde::Serialize;

use qbench_circuit::{Circuit, CircuitError};

use super::common::{OutputFormat, load_document};

/// Metrics reported for a circuit.
#[derive(Debug, Serialize)]
pub struct CircuitSummary {
    pub qubit_count: u32,
    pub occupied_qubits: u32,
    pub depth: usize,
    pub gate_count: usize,
    pub inputs: Vec<u32>,
    pub gates: Vec<(String, usize)>,
}

impl CircuitSummary {
    pub fn of(circuit: &Circuit) -> Self {
        let mut gates: Vec<(String, usize)> = Vec::new();
        for gate in circuit.gates() {
            let name = gate.gate.name();
            match gates.iter_mut().find(|(n, _)| n == name) {
                Some((_, count)) => *count += 1,
                None => gates.push((name.to_string(), 1)),
            }
        }

        Self {
            qubit_count: circuit
                .declared_qubit_count()
                .unwrap_or_else(|| circuit.derived_qubit_count()),
            occupied_qubits: circuit.occupied_qubit_count(),
            depth: circuit.depth(),
            gate_count: circuit.gate_count(),
            inputs: circuit.input_indices(),
            gates,
        }
    }
}

/// Execute the inspect command.
pub fn execute(input: &str, format: &str) -> Result<()> {
    let doc = load_document(input)?;

    let circuit = Circuit::from_value(&doc).map_err(|e| match e {
        CircuitError::Invalid { errors } => anyhow::anyhow!(
            "{input} is not a valid circuit:\n  - {}",
            errors.join("\n  - ")
        ),
        other => anyhow::anyhow!("Failed to decode {input}: {other}"),
    })?;

    let summary = CircuitSummary::of(&circuit);

    match OutputFormat::parse(format) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Table => print_summary(input, &summary),
    }

    Ok(())
}

fn print_summary(input: &str, summary: &CircuitSummary) {
    println!("{} {}", style("Circuit").cyan().bold(), style(input).dim());
    println!("  Qubits:     {}", style(summary.qubit_count).yellow());
    if summary.occupied_qubits != summary.qubit_count {
        println!(
            "  Occupied:   {} (controls included)",
            style(summary.occupied_qubits).yellow()
        );
    }
    println!("  Depth:      {}", style(summary.depth).yellow());
    println!("  Gates:      {}", style(summary.gate_count).yellow());

    let inputs: Vec<String> = summary.inputs.iter().map(|k| format!("input_{k}")).collect();
    println!("  Inputs:     {}", inputs.join(", "));

    println!();
    println!("  Gate counts:");
    for (name, count) in &summary.gates {
        println!("    {:<8} {:>5}", style(name).cyan(), count);
    }
}
