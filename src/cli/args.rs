//! CLI argument definitions using clap
//!
//! Commands:
//! - depotdb count
//! - depotdb get <id>
//! - depotdb put [--json <doc>]
//! - depotdb del <id>...
//! - depotdb find [--where <pred>]... [--sort <field>] [--limit <n>]
//! - depotdb backup <file.gz>
//! - depotdb restore <file.gz>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// depotdb - typed document store with streaming gzip backup and restore
#[derive(Parser, Debug)]
#[command(name = "depotdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Store location: an existing directory, or `:mem:`
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Path to a JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Minimum log severity written to stderr (trace, info, warn, error, fatal)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Count stored documents
    Count,

    /// Print one document
    Get {
        /// Document id (integer or string)
        id: String,
    },

    /// Insert or replace a document
    Put {
        /// Document JSON; read from stdin when absent
        #[arg(long)]
        json: Option<String>,
    },

    /// Delete documents
    Del {
        /// Document ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Query documents
    Find {
        /// Field predicate such as `age>=30`; repeat to combine
        #[arg(long = "where")]
        predicates: Vec<String>,

        /// Sort field; prefix with `-` for descending
        #[arg(long, allow_hyphen_values = true)]
        sort: Option<String>,

        /// Stop after this many matches (applied before sorting)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Write a gzip backup of the store
    Backup {
        /// Output file, conventionally `*.gz`
        output: PathBuf,

        /// gzip level 0-9
        #[arg(long)]
        level: Option<u32>,
    },

    /// Load a gzip backup into the store
    Restore {
        /// Backup file
        input: PathBuf,

        /// Documents per store write
        #[arg(long)]
        batch_size: Option<usize>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
