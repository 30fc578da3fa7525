//! CLI argument definitions using clap
//!
//! Commands:
//! - citesync replay --document <path> --ops <path> [--config <path>] [--version <n>]
//! - citesync compose --ops <path> [--config <path>]
//! - citesync resolve --ops <path> [--config <path>]
//! - citesync invert --ops <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// citesync - operational transformation for collaborative citation editing
#[derive(Parser, Debug)]
#[command(name = "citesync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply a stream of operations to a document and print every result
    Replay {
        /// Initial document content (UTF-8 text)
        #[arg(long)]
        document: PathBuf,

        /// Operations, one JSON object per line
        #[arg(long)]
        ops: PathBuf,

        /// Engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Version of the initial document
        #[arg(long, default_value_t = 0)]
        version: u64,
    },

    /// Merge bursts of adjacent operations
    Compose {
        /// Operations, one JSON object per line
        #[arg(long)]
        ops: PathBuf,

        /// Engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Drop operations superseded by a later nearby edit
    Resolve {
        /// Operations, one JSON object per line
        #[arg(long)]
        ops: PathBuf,

        /// Engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the inverse of each operation
    Invert {
        /// Operations, one JSON object per line
        #[arg(long)]
        ops: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_replay() {
        let cli = Cli::try_parse_from([
            "citesync", "replay", "--document", "doc.txt", "--ops", "ops.jsonl", "--version", "3",
        ])
        .unwrap();
        match cli.command {
            Command::Replay {
                document,
                version,
                config,
                ..
            } => {
                assert_eq!(document, PathBuf::from("doc.txt"));
                assert_eq!(version, 3);
                assert!(config.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_ops_required() {
        assert!(Cli::try_parse_from(["citesync", "invert"]).is_err());
    }
}
