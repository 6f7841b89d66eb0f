//! Error types for json2table
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Every failure after the store has been touched aborts the run; the
//! transaction is rolled back before the error reaches the caller.

use thiserror::Error;

/// The main error type for json2table
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Input Errors
    // ============================================================================
    #[error("Failed to parse input: {message}")]
    Parse { message: String },

    // ============================================================================
    // Store Errors
    // ============================================================================
    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Table '{table}' does not exist")]
    TableNotFound { table: String },

    #[error("Table '{table}' has no identifier column '{column}'")]
    MissingIdColumn { table: String, column: String },

    // ============================================================================
    // Run Errors (each aborts and rolls back the run)
    // ============================================================================
    #[error("Staging failed: {message}")]
    Ingest { message: String },

    #[error("Failed to read staging area: {message}")]
    StagingRead { message: String },

    #[error("Failed to add column '{column}': {message}")]
    SchemaEvolution { column: String, message: String },

    #[error("Projection failed{}: {message}", projection_location(.column, .document))]
    Projection {
        column: Option<String>,
        document: Option<usize>,
        message: String,
    },

    #[error("Run is {state}, cannot {step}")]
    InvalidState { state: String, step: String },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

fn projection_location(column: &Option<String>, document: &Option<usize>) -> String {
    match (column, document) {
        (Some(column), Some(document)) => format!(" for column '{column}' in document {document}"),
        (Some(column), None) => format!(" for column '{column}'"),
        (None, Some(document)) => format!(" in document {document}"),
        (None, None) => String::new(),
    }
}

impl Error {
    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a staging write error
    pub fn ingest(message: impl Into<String>) -> Self {
        Self::Ingest {
            message: message.into(),
        }
    }

    /// Create a staging read error
    pub fn staging_read(message: impl Into<String>) -> Self {
        Self::StagingRead {
            message: message.into(),
        }
    }

    /// Create a schema evolution error
    pub fn schema_evolution(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaEvolution {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a projection error without location
    pub fn projection(message: impl Into<String>) -> Self {
        Self::Projection {
            column: None,
            document: None,
            message: message.into(),
        }
    }

    /// Create a projection error naming the offending column and document
    pub fn projection_at(
        column: impl Into<String>,
        document: Option<usize>,
        message: impl Into<String>,
    ) -> Self {
        Self::Projection {
            column: Some(column.into()),
            document,
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error can only happen after the store was touched,
    /// i.e. it aborted a run that has been rolled back
    pub fn is_run_failure(&self) -> bool {
        matches!(
            self,
            Error::Ingest { .. }
                | Error::StagingRead { .. }
                | Error::SchemaEvolution { .. }
                | Error::Projection { .. }
                | Error::TableNotFound { .. }
                | Error::MissingIdColumn { .. }
                | Error::InvalidState { .. }
        )
    }
}

/// Result type alias for json2table
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
