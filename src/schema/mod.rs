//! Schema inference module
//!
//! Derives the column set a target table needs from the documents of a run.
//!
//! # Features
//!
//! - **Key Scan**: Union of top-level keys with a non-null value
//! - **Type Inference**: One column type per key from an ordered rule table
//! - **Widening**: Deterministic type when documents disagree on a key
//! - **Schema Delta**: Set difference against the existing columns, ignoring
//!   ASCII case the way the store resolves names

mod inference;
mod types;

pub use inference::{compute_delta, infer_column_type, infer_profile_type};
pub use types::{
    Column, ColumnSpec, ColumnType, KeyProfile, ObservedKeys, SchemaDelta, TableColumns,
};
