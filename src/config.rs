//! Configuration types
//!
//! `IngestConfig` describes one run against one target table. `RunFile` is
//! the optional YAML file the command line reads its defaults from.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of the default staging table name
pub const STAGING_PREFIX: &str = "__";

/// Default identifier column required on the target table
pub const DEFAULT_ID_COLUMN: &str = "id";

// ============================================================================
// Ingest Config
// ============================================================================

/// Parameters of one ingestion run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Target table (must already exist)
    pub table: String,

    /// Staging table name (defaults to `__<table>`)
    #[serde(default)]
    pub staging_table: Option<String>,

    /// Column whose values are returned for the inserted rows
    #[serde(default)]
    pub returning: Option<String>,

    /// Identifier column the target must have (`None` skips the check)
    #[serde(default = "default_id_column")]
    pub id_column: Option<String>,
}

fn default_id_column() -> Option<String> {
    Some(DEFAULT_ID_COLUMN.to_string())
}

impl IngestConfig {
    /// Create a config for the given target table
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            staging_table: None,
            returning: None,
            id_column: default_id_column(),
        }
    }

    /// Set the staging table name
    #[must_use]
    pub fn with_staging_table(mut self, name: impl Into<String>) -> Self {
        self.staging_table = Some(name.into());
        self
    }

    /// Return this column's values for the inserted rows
    #[must_use]
    pub fn with_returning(mut self, column: impl Into<String>) -> Self {
        self.returning = Some(column.into());
        self
    }

    /// Require a different identifier column
    #[must_use]
    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = Some(column.into());
        self
    }

    /// Do not require an identifier column
    #[must_use]
    pub fn without_id_check(mut self) -> Self {
        self.id_column = None;
        self
    }

    /// Effective staging table name
    pub fn staging_name(&self) -> String {
        self.staging_table
            .clone()
            .unwrap_or_else(|| format!("{STAGING_PREFIX}{}", self.table))
    }

    /// Check the config before touching the store
    pub fn validate(&self) -> Result<()> {
        if self.table.is_empty() {
            return Err(Error::config("table name must not be empty"));
        }
        if self.staging_name() == self.table {
            return Err(Error::config(format!(
                "staging table must differ from target table '{}'",
                self.table
            )));
        }
        if matches!(&self.returning, Some(c) if c.is_empty()) {
            return Err(Error::config("returning column must not be empty"));
        }
        Ok(())
    }
}

// ============================================================================
// Run File
// ============================================================================

/// Defaults for the command line, loaded from YAML
///
/// ```yaml
/// database: refs.duckdb
/// table: refs
/// staging: __refs_import
/// returning: id
/// id_column: id
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFile {
    /// Database file
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Target table
    #[serde(default)]
    pub table: Option<String>,

    /// Staging table name
    #[serde(default)]
    pub staging: Option<String>,

    /// Returning column
    #[serde(default)]
    pub returning: Option<String>,

    /// Identifier column
    #[serde(default)]
    pub id_column: Option<String>,
}

impl RunFile {
    /// Parse a run file from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a run file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }
}
