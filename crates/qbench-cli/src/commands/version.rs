//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - quantum encoding benchmark orchestration",
        style("qbench").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  qbench-circuit  Encoding circuit model and validator");
    println!("  qbench-sched    Run dispatch, result consumption and run state");
    println!("  qbench-server   HTTP API server");
    println!("  qbench-cli      Command-line interface");
}
