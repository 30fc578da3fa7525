//! citesync CLI entry point
//!
//! Installs the log subscriber (stderr, filtered by `RUST_LOG`), then
//! delegates to the CLI module. Errors go to stderr with a non-zero exit.

use citesync::cli;
use tracing_subscriber::EnvFilter;

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
