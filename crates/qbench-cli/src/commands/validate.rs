//! Validate command implementation.
//!
//! Check a circuit file against the encoding circuit rules and report every
//! problem found.

use anyhow::Result;
use console::style;
use serde::Serialize;
use serde_json::Value;

use qbench_circuit::{ValidationResult, validate_and_normalize, validate_file};

use super::common::{OutputFormat, load_document};

#[derive(Serialize)]
struct ValidateReport<'a> {
    file: &'a str,
    valid: bool,
    errors: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    circuit: Option<&'a Value>,
}

/// Execute the validate command.
pub fn execute(input: &str, format: &str, normalize: bool) -> Result<()> {
    tracing::debug!(input, normalize, "validating circuit");

    let (result, normalized) = if normalize {
        let mut doc = load_document(input)?;
        let result = validate_and_normalize(&mut doc);
        (result, Some(doc))
    } else {
        (validate_file(input), None)
    };

    match OutputFormat::parse(format) {
        OutputFormat::Json => {
            let report = ValidateReport {
                file: input,
                valid: result.valid,
                errors: &result.errors,
                circuit: normalized.as_ref(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => print_table(input, &result, normalized.as_ref())?,
    }

    if !result.valid {
        anyhow::bail!(
            "{input} is not a valid circuit ({} error{})",
            result.errors.len(),
            if result.errors.len() == 1 { "" } else { "s" }
        );
    }

    Ok(())
}

fn print_table(input: &str, result: &ValidationResult, normalized: Option<&Value>) -> Result<()> {
    if result.valid {
        println!("{} {} is valid", style("✓").green().bold(), style(input).cyan());
    } else {
        println!("{} {} is invalid:", style("✗").red().bold(), style(input).cyan());
        for (i, error) in result.errors.iter().enumerate() {
            println!("  {:>3}. {}", i + 1, error);
        }
    }

    if let Some(doc) = normalized {
        println!();
        println!("{}", style("Normalized document:").dim());
        println!("{}", serde_json::to_string_pretty(doc)?);
    }

    Ok(())
}
