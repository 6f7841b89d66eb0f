// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::ref_option)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # json2table
//!
//! Materializes a JSON array of objects into an existing DuckDB table,
//! adding any columns the table lacks before inserting one row per object.
//!
//! ## Features
//!
//! - **Schema Evolution**: Keys without a column become new nullable columns
//! - **Type Inference**: Column types inferred from observed values
//! - **Failure Atomicity**: Every effect of a run commits or rolls back together
//! - **Returning**: Values of one column reported for the inserted rows
//! - **CSL-JSON**: Citation keys assigned to bibliography entries before loading
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use json2table::{decode_documents, IngestConfig, Result, Store};
//!
//! fn main() -> Result<()> {
//!     let mut store = Store::open("refs.duckdb")?;
//!     let documents = decode_documents(r#"[{"id": "a1", "title": "Foo"}]"#)?;
//!
//!     let report = store.ingest(IngestConfig::new("refs").with_returning("id"), &documents)?;
//!     for id in report.returned_lines() {
//!         println!("{id}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                  Run (one DuckDB transaction)                 │
//! │   load() → inspect() → evolve() → materialize() → commit()    │
//! └───────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────────┬───────────────┴──┬──────────────┬──────────────┐
//! │   Staging    │    Inspector     │   Evolver    │ Materializer │
//! ├──────────────┼──────────────────┼──────────────┼──────────────┤
//! │ Appender     │ Existing columns │ ADD COLUMN   │ INSERT ...   │
//! │ seq + obj    │ Observed keys    │ per new key  │ SELECT       │
//! │              │ Schema delta     │              │ RETURNING    │
//! └──────────────┴──────────────────┴──────────────┴──────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Run configuration and run files
pub mod config;

/// Input decoding
pub mod decode;

/// Schema inference from staged documents
pub mod schema;

/// Target store support via DuckDB
pub mod database;

/// Run execution
pub mod engine;

/// CSL-JSON preprocessing
pub mod csl;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use config::{IngestConfig, RunFile};
pub use database::Store;
pub use decode::{decode_documents, InputSource};
pub use engine::{ingest, IngestReport, Run};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
