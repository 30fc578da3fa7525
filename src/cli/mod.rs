//! CLI module for citesync
//!
//! Developer commands over the engine:
//! - replay: run operations through an orchestrator over in-memory stores
//! - compose: merge bursts of operations
//! - resolve: spatial conflict resolution
//! - invert: inverse of each operation

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    compose, invert, load_config, replay, replay_operations, resolve, run_command, DocumentState,
    ReplayReport,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{parse_operations, read_document, read_operations};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}
