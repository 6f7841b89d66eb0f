//! Materializer
//!
//! Projects every staged document onto the target's current columns with a
//! single `INSERT ... SELECT`. Keys match columns ignoring ASCII case. Keys
//! without a matching column are ignored; columns without a matching key
//! receive NULL.

use super::sql::{key_is_null, key_not_integral, key_text, projection, quote_ident};
use super::staging::StagingHandle;
use crate::error::{Error, Result};
use crate::schema::{ObservedKeys, TableColumns};
use crate::types::ReturnedValue;
use duckdb::Connection;

/// Outcome of the bulk insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialized {
    /// Rows inserted
    pub rows: usize,
    /// Values of the returning column, in the store's insert result order
    pub returned: Option<Vec<ReturnedValue>>,
}

/// Document keys feeding `column`; the column's own name when none was seen
fn column_keys<'a>(observed: &'a ObservedKeys, column: &'a str) -> Vec<&'a str> {
    let keys = observed.variants(column);
    if keys.is_empty() {
        vec![column]
    } else {
        keys
    }
}

/// Run a lookup for the first offending staged document
///
/// The statement selects `seq` and, optionally, the offending text.
fn first_offender(
    conn: &Connection,
    column: &str,
    sql: &str,
) -> Result<Option<(usize, Option<String>)>> {
    let mut stmt = conn.prepare(sql).map_err(|e| {
        Error::projection_at(column, None, format!("Failed to prepare check: {e}"))
    })?;
    let mut rows = stmt
        .query([])
        .map_err(|e| Error::projection_at(column, None, format!("Failed to run check: {e}")))?;

    let Some(row) = rows
        .next()
        .map_err(|e| Error::projection_at(column, None, e.to_string()))?
    else {
        return Ok(None);
    };
    let seq: i64 = row
        .get(0)
        .map_err(|e| Error::projection_at(column, None, e.to_string()))?;
    let value: Option<String> = row
        .get(1)
        .map_err(|e| Error::projection_at(column, None, e.to_string()))?;
    Ok(Some((seq as usize, value)))
}

/// Build the bulk insert statement
pub fn insert_statement(
    table: &str,
    columns: &TableColumns,
    observed: &ObservedKeys,
    staging: &StagingHandle,
    returning: Option<&str>,
) -> String {
    let names = columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let values = columns
        .iter()
        .map(|c| projection(&c.name, &column_keys(observed, &c.name), &c.column_type))
        .collect::<Vec<_>>()
        .join(",\n       ");

    let mut sql = format!(
        "INSERT INTO {} ({names})\nSELECT {values}\nFROM {}\nORDER BY seq",
        quote_ident(table),
        staging.quoted()
    );
    if let Some(column) = returning {
        sql.push_str(&format!(
            "\nRETURNING CAST({} AS VARCHAR)",
            quote_ident(column)
        ));
    }
    sql
}

/// Find the first document carrying a value under more than one spelling
/// of the same column
///
/// Such a document has no single value for the column, so the run fails
/// with a [`Error::Projection`] naming the column, the keys and the
/// zero-based input index.
pub fn check_conflicts(
    conn: &Connection,
    columns: &TableColumns,
    observed: &ObservedKeys,
    staging: &StagingHandle,
) -> Result<()> {
    for column in columns.iter() {
        let keys = observed.variants(&column.name);
        if keys.len() < 2 {
            continue;
        }

        let present = keys
            .iter()
            .map(|key| format!("CASE WHEN {} THEN 0 ELSE 1 END", key_is_null(key)))
            .collect::<Vec<_>>()
            .join(" + ");
        let sql = format!(
            "SELECT seq, CAST(NULL AS VARCHAR) FROM {} WHERE {present} > 1 ORDER BY seq LIMIT 1",
            staging.quoted()
        );

        if let Some((seq, _)) = first_offender(conn, &column.name, &sql)? {
            return Err(Error::projection_at(
                &column.name,
                Some(seq),
                format!("keys {} map to the same column", keys.join(", ")),
            ));
        }
    }
    Ok(())
}

/// Find the first document whose value cannot be cast to its column's type
///
/// Only typed columns whose key was observed can fail, so only those are
/// checked. Integral columns also reject numbers with a fraction or
/// exponent, which a cast would round. Returns a [`Error::Projection`]
/// naming the column and the zero-based input index.
pub fn check_casts(
    conn: &Connection,
    columns: &TableColumns,
    observed: &ObservedKeys,
    staging: &StagingHandle,
) -> Result<()> {
    for column in columns.iter().filter(|c| c.column_type.needs_cast()) {
        for key in observed.variants(&column.name) {
            let mut rejected = format!(
                "TRY_CAST({} AS {}) IS NULL",
                key_text(key),
                column.column_type.sql_name()
            );
            if column.column_type.is_integral() {
                rejected = format!("({rejected} OR {})", key_not_integral(key));
            }
            let sql = format!(
                "SELECT seq, {text} FROM {staging}
                 WHERE NOT ({null})
                   AND {rejected}
                 ORDER BY seq
                 LIMIT 1",
                text = key_text(key),
                null = key_is_null(key),
                staging = staging.quoted(),
            );

            if let Some((seq, value)) = first_offender(conn, &column.name, &sql)? {
                return Err(Error::projection_at(
                    &column.name,
                    Some(seq),
                    format!(
                        "cannot convert {} to {}",
                        value.as_deref().unwrap_or("NULL"),
                        column.column_type
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// Insert one row per staged document
pub fn materialize(
    conn: &Connection,
    table: &str,
    columns: &TableColumns,
    observed: &ObservedKeys,
    staging: &StagingHandle,
    returning: Option<&str>,
) -> Result<Materialized> {
    if let Some(column) = returning {
        if !columns.contains(column) {
            return Err(Error::projection_at(
                column,
                None,
                format!("returning column does not exist in '{table}'"),
            ));
        }
    }

    let sql = insert_statement(table, columns, observed, staging, returning);
    tracing::debug!(table, sql = %sql, "Bulk insert");

    match returning {
        Some(_) => {
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| Error::projection(format!("Failed to prepare insert: {e}")))?;
            let returned = stmt
                .query_map([], |row| row.get::<_, Option<String>>(0))
                .map_err(|e| Error::projection(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::projection(e.to_string()))?;
            Ok(Materialized {
                rows: returned.len(),
                returned: Some(returned),
            })
        }
        None => {
            let rows = conn
                .execute(&sql, [])
                .map_err(|e| Error::projection(e.to_string()))?;
            Ok(Materialized {
                rows,
                returned: None,
            })
        }
    }
}
