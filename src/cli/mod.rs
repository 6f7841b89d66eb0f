//! CLI module
//!
//! Command-line interface for ingestion runs.
//!
//! # Commands
//!
//! - `load` - Insert a JSON array of objects into a table
//! - `csl` - Assign citation keys to CSL-JSON entries, then insert them
//! - `update-csl` - Assign citation keys only, printing the entries
//! - `check` - Validate the target table

mod commands;
mod runner;

pub use commands::{Cli, Commands, TargetArgs};
pub use runner::{resolve_target, Runner};
