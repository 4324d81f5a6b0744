//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// logbundle - collect system diagnostic logs into a single archive.
#[derive(Parser, Debug)]
#[command(name = "logbundle")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect the requested log categories and pack them into an archive.
    Export {
        /// Category tokens to collect (all known categories if omitted).
        categories: Vec<String>,

        /// Output archive path (defaults to a timestamped name in the
        /// current directory).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the known category tokens and how each is acquired.
    Categories,

    /// Resolve categories into an acquisition plan without exporting.
    Plan {
        /// Category tokens to resolve (all known categories if omitted).
        categories: Vec<String>,

        /// Print the plan as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// List configured applications and their log parse strategy.
    Apps,
}
