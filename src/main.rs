use std::process;

use clap::Parser;
use nescient::cli::{self, Cli};

/// Entry point for the Nescient CLI.
///
/// # Exit Codes
/// * 0 - Success
/// * 1 - Error (message printed to stderr)
fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    if let Err(e) = cli::run_command(Cli::parse().command) {
        eprintln!("Error: {e:?}");
        process::exit(1);
    }
}
