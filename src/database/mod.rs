//! Target store support via DuckDB
//!
//! This module provides the store a run materializes into, and the store
//! side of each run step:
//!
//! - `staging` - bulk-writes raw documents into a staging table
//! - `inspect` - reads existing columns and scans staged keys
//! - `evolve` - appends missing columns
//! - `materialize` - projects staged documents into rows

mod engine;
pub mod evolve;
pub mod inspect;
pub mod materialize;
pub mod sql;
pub mod staging;

pub use engine::{Store, IN_MEMORY};
pub use materialize::Materialized;
pub use staging::StagingHandle;
