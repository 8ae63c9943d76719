//! qbench command-line interface.
//!
//! Offline tooling for encoding circuits: validate a circuit file before
//! submitting it to the server, or inspect its metrics.
//!
//! ```text
//! qbench validate -i encoding.json
//! qbench validate -i encoding.json --normalize --format json
//! qbench inspect -i encoding.json
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{inspect, validate, version};

/// qbench - encoding circuit tooling
#[derive(Parser)]
#[command(name = "qbench")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a circuit file
    Validate {
        /// Input file (JSON)
        #[arg(short, long)]
        input: String,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Write the derived qubit count into the document and print it
        #[arg(long)]
        normalize: bool,
    },

    /// Show qubit count, depth, gate count and inputs of a circuit
    Inspect {
        /// Input file (JSON)
        #[arg(short, long)]
        input: String,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Validate {
            input,
            format,
            normalize,
        } => validate::execute(&input, &format, normalize),

        Commands::Inspect { input, format } => inspect::execute(&input, &format),

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
