//! Schema inspector
//!
//! Reads the target table's columns and scans the staging table once for
//! the keys the documents use.

use super::staging::StagingHandle;
use crate::error::{Error, Result};
use crate::schema::{Column, ColumnType, ObservedKeys, TableColumns};
use crate::types::Document;
use duckdb::Connection;

/// Current columns of `table` in ordinal order
///
/// Fails with [`Error::TableNotFound`] when the table has no columns in the
/// current schema, i.e. does not exist.
pub fn existing_columns(conn: &Connection, table: &str) -> Result<TableColumns> {
    let mut stmt = conn
        .prepare(
            "SELECT column_name, data_type
             FROM information_schema.columns
             WHERE table_catalog = current_database()
               AND table_schema = current_schema()
               AND table_name = ?
             ORDER BY ordinal_position",
        )
        .map_err(|e| Error::staging_read(format!("Failed to prepare column query: {e}")))?;

    let columns: Vec<Column> = stmt
        .query_map([table], |row| {
            let name: String = row.get(0)?;
            let declared: String = row.get(1)?;
            Ok(Column::new(name, ColumnType::from_declared(&declared)))
        })
        .map_err(|e| Error::staging_read(format!("Failed to query columns of '{table}': {e}")))?
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| Error::staging_read(format!("Failed to read columns of '{table}': {e}")))?;

    if columns.is_empty() {
        return Err(Error::TableNotFound {
            table: table.to_string(),
        });
    }

    Ok(TableColumns::new(columns))
}

/// Check the identifier column precondition
pub fn require_column(columns: &TableColumns, table: &str, column: &str) -> Result<()> {
    if columns.contains(column) {
        Ok(())
    } else {
        Err(Error::MissingIdColumn {
            table: table.to_string(),
            column: column.to_string(),
        })
    }
}

/// Scan the staging table in staging order and collect the observed keys
pub fn observed_keys(conn: &Connection, staging: &StagingHandle) -> Result<ObservedKeys> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT seq, obj FROM {} ORDER BY seq",
            staging.quoted()
        ))
        .map_err(|e| Error::staging_read(format!("Failed to prepare staging scan: {e}")))?;

    let mut rows = stmt
        .query([])
        .map_err(|e| Error::staging_read(format!("Failed to scan '{}': {e}", staging.name)))?;

    let mut observed = ObservedKeys::new();
    while let Some(row) = rows
        .next()
        .map_err(|e| Error::staging_read(format!("Failed to scan '{}': {e}", staging.name)))?
    {
        let seq: i64 = row
            .get(0)
            .map_err(|e| Error::staging_read(format!("Bad staging row: {e}")))?;
        let obj: String = row
            .get(1)
            .map_err(|e| Error::staging_read(format!("Bad staging row {seq}: {e}")))?;
        let document: Document = serde_json::from_str(&obj).map_err(|e| {
            Error::staging_read(format!("Staged document {seq} is not an object: {e}"))
        })?;
        observed.observe(&document);
    }

    if observed.documents() != staging.rows {
        return Err(Error::staging_read(format!(
            "scanned {} of {} staged documents",
            observed.documents(),
            staging.rows
        )));
    }

    Ok(observed)
}
