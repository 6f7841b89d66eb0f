//! DuckDB-backed target store
//!
//! Owns the connection every run borrows. A run takes the connection
//! mutably, so nothing else can use the session while it is open.

use super::inspect;
use super::sql::quote_ident;
use crate::config::IngestConfig;
use crate::engine::{IngestReport, Run};
use crate::error::{Error, Result};
use crate::schema::TableColumns;
use crate::types::Document;
use duckdb::Connection;
use std::collections::HashSet;
use std::path::Path;

/// Location string for an in-memory database
pub const IN_MEMORY: &str = ":memory:";

/// Target store
pub struct Store {
    /// DuckDB connection
    conn: Connection,
    /// Database path or `:memory:` (for logging)
    location: String,
}

impl Store {
    /// Open (or create) a database file; `:memory:` opens an in-memory one
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path == Path::new(IN_MEMORY) {
            return Self::open_in_memory();
        }

        let conn = Connection::open(path).map_err(|e| {
            Error::connection(format!("Failed to open '{}': {e}", path.display()))
        })?;

        tracing::debug!(database = %path.display(), "Opened store");

        Ok(Self {
            conn,
            location: path.display().to_string(),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::connection(format!("Failed to create DuckDB connection: {e}")))?;

        Ok(Self {
            conn,
            location: IN_MEMORY.to_string(),
        })
    }

    /// Test the connection
    pub fn check_connection(&self) -> Result<()> {
        self.conn
            .execute_batch("SELECT 1;")
            .map_err(|e| Error::connection(format!("Connection check failed: {e}")))
    }

    /// Current columns of a table
    pub fn table_columns(&self, table: &str) -> Result<TableColumns> {
        inspect::existing_columns(&self.conn, table)
    }

    /// Validate that `table` exists and carries the configured identifier column
    pub fn check_table(&self, config: &IngestConfig) -> Result<TableColumns> {
        let columns = self.table_columns(&config.table)?;
        if let Some(id_column) = &config.id_column {
            inspect::require_column(&columns, &config.table, id_column)?;
        }
        Ok(columns)
    }

    /// Every non-null value of `column` in `table`, as text
    pub fn known_ids(&self, table: &str, column: &str) -> Result<HashSet<String>> {
        let sql = format!(
            "SELECT CAST({col} AS VARCHAR) FROM {table} WHERE {col} IS NOT NULL",
            col = quote_ident(column),
            table = quote_ident(table),
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| Error::connection(format!("Failed to prepare id query: {e}")))?;

        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| Error::connection(format!("Failed to read ids of '{table}': {e}")))?
            .collect::<std::result::Result<HashSet<_>, _>>()
            .map_err(|e| Error::connection(format!("Failed to read ids of '{table}': {e}")))?;

        tracing::debug!(table, ids = ids.len(), "Loaded known ids");
        Ok(ids)
    }

    /// Begin a run against `config.table`
    pub fn begin(&mut self, config: IngestConfig) -> Result<Run<'_>> {
        Run::begin(&mut self.conn, config)
    }

    /// Run all four steps and commit
    pub fn ingest(&mut self, config: IngestConfig, documents: &[Document]) -> Result<IngestReport> {
        crate::engine::ingest(&mut self.conn, config, documents)
    }

    /// Execute raw SQL outside any run
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| Error::Other(format!("SQL failed: {e}")))
    }

    /// Underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Database path or `:memory:`
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}
