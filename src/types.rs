//! Common types used throughout json2table
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// One input object, materialized as one row
pub type Document = JsonObject;

/// Value returned for one inserted row (`None` for SQL NULL)
pub type ReturnedValue = Option<String>;

// ============================================================================
// Value Kinds
// ============================================================================

/// Tagged kind of a JSON value, as used by column type inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    /// Integer above `i64::MAX`
    BigInt,
    Float,
    String,
    Array,
    Object,
}

impl ValueKind {
    /// Classify a JSON value
    pub fn of(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => ValueKind::Null,
            JsonValue::Bool(_) => ValueKind::Bool,
            JsonValue::Number(n) => {
                if n.is_i64() {
                    ValueKind::Int
                } else if n.is_u64() {
                    ValueKind::BigInt
                } else {
                    ValueKind::Float
                }
            }
            JsonValue::String(_) => ValueKind::String,
            JsonValue::Array(_) => ValueKind::Array,
            JsonValue::Object(_) => ValueKind::Object,
        }
    }

    /// Arrays and objects
    pub fn is_container(self) -> bool {
        matches!(self, ValueKind::Array | ValueKind::Object)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Null => write!(f, "null"),
            ValueKind::Bool => write!(f, "boolean"),
            ValueKind::Int => write!(f, "integer"),
            ValueKind::BigInt => write!(f, "big integer"),
            ValueKind::Float => write!(f, "float"),
            ValueKind::String => write!(f, "string"),
            ValueKind::Array => write!(f, "array"),
            ValueKind::Object => write!(f, "object"),
        }
    }
}

// ============================================================================
// Run State
// ============================================================================

/// Lifecycle of one ingestion run
///
/// Runs move strictly forward through
/// `Start → Loaded → Inspected → Evolved → Materialized`; any step may
/// move the run to `Aborted` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Transaction open, nothing staged yet
    Start,
    /// Documents staged
    Loaded,
    /// Existing columns and observed keys known
    Inspected,
    /// Schema delta applied
    Evolved,
    /// Rows inserted
    Materialized,
    /// A step failed; the run can only be dropped
    Aborted,
}

impl RunState {
    /// The state a successful step moves to
    pub fn next(self) -> Option<RunState> {
        match self {
            RunState::Start => Some(RunState::Loaded),
            RunState::Loaded => Some(RunState::Inspected),
            RunState::Inspected => Some(RunState::Evolved),
            RunState::Evolved => Some(RunState::Materialized),
            RunState::Materialized | RunState::Aborted => None,
        }
    }

    /// Whether no further step may run
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Materialized | RunState::Aborted)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Start => write!(f, "started"),
            RunState::Loaded => write!(f, "loaded"),
            RunState::Inspected => write!(f, "inspected"),
            RunState::Evolved => write!(f, "evolved"),
            RunState::Materialized => write!(f, "materialized"),
            RunState::Aborted => write!(f, "aborted"),
        }
    }
}
