//! Staging loader
//!
//! Writes the raw documents of a run into a staging table through one
//! DuckDB appender. The table lives only inside the run's transaction.

use super::sql::quote_ident;
use crate::error::{Error, Result};
use crate::types::Document;
use duckdb::{params, Connection};

/// Reference to a populated staging table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingHandle {
    /// Staging table name
    pub name: String,
    /// Number of staged documents
    pub rows: usize,
}

impl StagingHandle {
    /// Quoted table name for statements
    pub fn quoted(&self) -> String {
        quote_ident(&self.name)
    }
}

/// Create the staging table and bulk-append every document in input order
pub fn load(conn: &Connection, name: &str, documents: &[Document]) -> Result<StagingHandle> {
    let quoted = quote_ident(name);

    conn.execute_batch(&format!(
        "CREATE TABLE {quoted} (seq BIGINT NOT NULL, obj VARCHAR NOT NULL);"
    ))
    .map_err(|e| Error::ingest(format!("Failed to create staging table '{name}': {e}")))?;

    {
        let mut appender = conn
            .appender(name)
            .map_err(|e| Error::ingest(format!("Failed to open appender on '{name}': {e}")))?;

        for (seq, document) in documents.iter().enumerate() {
            let obj = serde_json::to_string(document).map_err(|e| {
                Error::ingest(format!("Failed to serialize document {seq}: {e}"))
            })?;
            appender
                .append_row(params![seq as i64, obj])
                .map_err(|e| Error::ingest(format!("Failed to stage document {seq}: {e}")))?;
        }
        // dropping the appender flushes it
    }

    let staged: i64 = conn
        .query_row(&format!("SELECT count(*) FROM {quoted}"), [], |row| {
            row.get(0)
        })
        .map_err(|e| Error::ingest(format!("Failed to count staged documents: {e}")))?;

    if staged as usize != documents.len() {
        return Err(Error::ingest(format!(
            "staged {staged} of {} documents",
            documents.len()
        )));
    }

    tracing::debug!(staging = name, rows = staged, "Documents staged");

    Ok(StagingHandle {
        name: name.to_string(),
        rows: documents.len(),
    })
}

/// Drop the staging table
pub fn discard(conn: &Connection, handle: &StagingHandle) -> Result<()> {
    conn.execute_batch(&format!("DROP TABLE {};", handle.quoted()))
        .map_err(|e| Error::ingest(format!("Failed to drop staging table '{}': {e}", handle.name)))
}
