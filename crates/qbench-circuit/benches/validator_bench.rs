//! Benchmarks for circuit validation
//!
//! Run with: cargo bench -p qbench-circuit

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use qbench_circuit::{Circuit, validate};
use serde_json::{Value, json};

/// Layered feature map: one `RY(input_k)` per qubit followed by a CNOT ladder,
/// repeated `layers` times.
fn feature_map(num_qubits: u32, layers: u32) -> Value {
    let mut gates = Vec::new();
    for _ in 0..layers {
        for k in 0..num_qubits {
            gates.push(json!({"gate": "RY", "wires": [k], "params": [format!("input_{k}")]}));
        }
        for k in 1..num_qubits {
            gates.push(json!({"gate": "CNOT", "wires": [k], "control": [k - 1]}));
        }
    }
    json!({ "circuit": gates })
}

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");

    for num_qubits in &[2, 8, 32] {
        let doc = feature_map(*num_qubits, 10);
        group.bench_with_input(BenchmarkId::new("feature_map", num_qubits), &doc, |b, doc| {
            b.iter(|| validate(black_box(doc)));
        });
    }

    group.finish();
}

fn bench_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("depth");

    for num_qubits in &[2, 8, 32] {
        let doc = feature_map(*num_qubits, 10);
        let circuit = Circuit::from_value_unchecked(&doc).expect("benchmark circuit decodes");
        group.bench_with_input(
            BenchmarkId::new("feature_map", num_qubits),
            &circuit,
            |b, circuit| {
                b.iter(|| black_box(circuit).depth());
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_validate, bench_depth);
criterion_main!(benches);
