//! CLI module for wallfetch.
//!
//! Parses the command line and dispatches to the command implementations.

mod commands;
mod output;

use clap::Parser;
pub use commands::Cli;

use crate::error::WallfetchError;

/// Runs the CLI.
///
/// Parses command-line arguments and executes the appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), WallfetchError> {
    let cli = Cli::parse();
    cli.execute()
}
