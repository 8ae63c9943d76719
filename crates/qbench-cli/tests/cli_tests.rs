//! CLI command parsing and circuit file tests.
//!
//! The CLI is a binary crate, so argument parsing is checked against a
//! mirror of the clap structs and file handling through the circuit crate
//! the commands call into.

// ============================================================================
// Circuit files
// ============================================================================

mod circuit_files {
    use std::fs;

    use qbench_circuit::{Circuit, validate_and_normalize, validate_file};
    use serde_json::{Value, json};

    fn bell_encoding() -> Value {
        json!({
            "circuit": [
                {"gate": "RY", "wires": [0], "params": ["input_0"]},
                {"gate": "RY", "wires": [1], "params": ["input_1"]},
                {"gate": "CNOT", "wires": [1], "control": [0]},
                {"gate": "MEASURE", "wires": [0, 1]}
            ]
        })
    }

    #[test]
    fn test_validate_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encoding.json");
        fs::write(&path, bell_encoding().to_string()).unwrap();

        let result = validate_file(&path);
        assert!(result.valid, "{result}");
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_validate_reports_every_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        let doc = json!({
            "circuit": [
                {"gate": "CCX", "wires": [0]},
                {"gate": "RX", "wires": [1]}
            ]
        });
        fs::write(&path, doc.to_string()).unwrap();

        let result = validate_file(&path);
        assert!(!result.valid);
        assert!(result.errors.len() >= 2, "{result}");
        assert!(result.errors.iter().any(|e| e.starts_with("Gate #1")));
        assert!(result.errors.iter().any(|e| e.starts_with("Gate #2")));
    }

    #[test]
    fn test_validate_missing_file() {
        let path = "/tmp/qbench_test_nonexistent_file_12345.json";
        let result = validate_file(path);
        assert!(!result.valid);
        assert_eq!(result.errors, vec![format!("File does not exist: {path}")]);
    }

    #[test]
    fn test_normalize_writes_qubit_count() {
        let mut doc = bell_encoding();
        let result = validate_and_normalize(&mut doc);
        assert!(result.valid, "{result}");
        assert_eq!(doc["qubit_count"], 2);
    }

    #[test]
    fn test_inspect_metrics() {
        let circuit = Circuit::from_value(&bell_encoding()).unwrap();
        assert_eq!(circuit.gate_count(), 4);
        assert_eq!(circuit.derived_qubit_count(), 2);
        assert_eq!(circuit.depth(), 3);
        assert_eq!(circuit.input_indices(), vec![0, 1]);
    }

    #[test]
    fn test_inspect_rejects_invalid_document() {
        let doc = json!({"circuit": [{"gate": "H", "wires": []}]});
        assert!(Circuit::from_value(&doc).is_err());
    }
}

// ============================================================================
// Clap argument parsing (test via try_parse_from on equivalent structs)
// ============================================================================

mod clap_parsing {
    use clap::{Parser, Subcommand};

    // Mirror the CLI struct for testing (since main.rs is a binary)
    #[derive(Parser)]
    #[command(name = "qbench")]
    struct TestCli {
        #[arg(short, long, action = clap::ArgAction::Count, global = true)]
        verbose: u8,

        #[command(subcommand)]
        command: TestCommands,
    }

    #[derive(Subcommand)]
    enum TestCommands {
        Validate {
            #[arg(short, long)]
            input: String,
            #[arg(short, long, default_value = "table")]
            format: String,
            #[arg(long)]
            normalize: bool,
        },
        Inspect {
            #[arg(short, long)]
            input: String,
            #[arg(short, long, default_value = "table")]
            format: String,
        },
        Version,
    }

    #[test]
    fn test_parse_validate_minimal() {
        let cli = TestCli::try_parse_from(["qbench", "validate", "-i", "enc.json"]).unwrap();
        match cli.command {
            TestCommands::Validate {
                input,
                format,
                normalize,
            } => {
                assert_eq!(input, "enc.json");
                assert_eq!(format, "table");
                assert!(!normalize);
            }
            _ => panic!("Expected Validate command"),
        }
    }

    #[test]
    fn test_parse_validate_with_all_args() {
        let cli = TestCli::try_parse_from([
            "qbench",
            "validate",
            "--input",
            "enc.json",
            "--format",
            "json",
            "--normalize",
        ])
        .unwrap();
        match cli.command {
            TestCommands::Validate {
                input,
                format,
                normalize,
            } => {
                assert_eq!(input, "enc.json");
                assert_eq!(format, "json");
                assert!(normalize);
            }
            _ => panic!("Expected Validate command"),
        }
    }

    #[test]
    fn test_parse_validate_missing_input() {
        let result = TestCli::try_parse_from(["qbench", "validate"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_inspect() {
        let cli =
            TestCli::try_parse_from(["qbench", "inspect", "-i", "enc.json", "-f", "json"]).unwrap();
        match cli.command {
            TestCommands::Inspect { input, format } => {
                assert_eq!(input, "enc.json");
                assert_eq!(format, "json");
            }
            _ => panic!("Expected Inspect command"),
        }
    }

    #[test]
    fn test_parse_version() {
        let cli = TestCli::try_parse_from(["qbench", "version"]).unwrap();
        assert!(matches!(cli.command, TestCommands::Version));
    }

    #[test]
    fn test_parse_verbose_flag() {
        let cli = TestCli::try_parse_from(["qbench", "-vv", "version"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_parse_verbose_after_subcommand() {
        let cli = TestCli::try_parse_from(["qbench", "inspect", "-i", "a.json", "-v"]).unwrap();
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn test_no_subcommand() {
        let result = TestCli::try_parse_from(["qbench"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_subcommand() {
        let result = TestCli::try_parse_from(["qbench", "compile"]);
        assert!(result.is_err());
    }
}
