//! CLI commands and argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Materialize JSON arrays of objects into DuckDB tables
#[derive(Parser, Debug)]
#[command(name = "json2table")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run file (YAML) supplying defaults for the target options
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Target store and table options shared by the store commands
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Database file (`:memory:` for a throwaway database)
    #[arg(short, long)]
    pub database: Option<PathBuf>,

    /// Target table
    #[arg(short, long)]
    pub table: Option<String>,

    /// Staging table name (default `__<table>`)
    #[arg(long)]
    pub staging: Option<String>,

    /// Column whose values are printed for the inserted rows
    #[arg(short, long)]
    pub returning: Option<String>,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Insert a JSON array of objects into a table, adding missing columns
    Load {
        /// Input file (`-` for stdin)
        input: PathBuf,

        #[command(flatten)]
        target: TargetArgs,

        /// Do not require an identifier column on the target table
        #[arg(long)]
        no_id_check: bool,
    },

    /// Assign citation keys to CSL-JSON entries, then insert them
    Csl {
        /// CSL-JSON file (`-` for stdin)
        input: PathBuf,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Assign citation keys to CSL-JSON entries and print the result
    UpdateCsl {
        /// CSL-JSON file (`-` for stdin)
        input: PathBuf,

        /// File of ids already taken, one per line
        ids: PathBuf,

        /// Print the array on a single line
        #[arg(long)]
        compact: bool,
    },

    /// Check that the target table exists and has an identifier column
    Check {
        #[command(flatten)]
        target: TargetArgs,
    },
}
