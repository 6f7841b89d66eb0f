//! Schema evolver
//!
//! Appends one column per delta entry. Columns are never dropped or retyped.

use super::sql::quote_ident;
use crate::error::{Error, Result};
use crate::schema::{ColumnSpec, SchemaDelta};
use duckdb::Connection;

/// Add a single column to `table`
pub fn add_column(conn: &Connection, table: &str, spec: &ColumnSpec) -> Result<()> {
    let sql = format!(
        "ALTER TABLE {} ADD COLUMN {} {};",
        quote_ident(table),
        quote_ident(&spec.name),
        spec.column_type.sql_name()
    );

    conn.execute_batch(&sql)
        .map_err(|e| Error::schema_evolution(&spec.name, e.to_string()))?;

    tracing::info!(
        table,
        column = %spec.name,
        column_type = %spec.column_type,
        "Added column"
    );
    Ok(())
}

/// Apply every column of the delta, stopping at the first rejection
pub fn apply(conn: &Connection, table: &str, delta: &SchemaDelta) -> Result<()> {
    for spec in delta.iter() {
        add_column(conn, table, spec)?;
    }
    Ok(())
}
