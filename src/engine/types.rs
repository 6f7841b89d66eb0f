//! Engine types
//!
//! Inspection results and the report of a committed run.

use crate::schema::{ColumnSpec, ObservedKeys, SchemaDelta, TableColumns};
use crate::types::ReturnedValue;

/// What the inspector found
#[derive(Debug, Clone, Default)]
pub struct Inspection {
    /// Target columns before evolution
    pub existing: TableColumns,
    /// Keys observed in the staged documents
    pub observed: ObservedKeys,
    /// Columns the evolver will add
    pub delta: SchemaDelta,
}

/// Summary of a committed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Target table
    pub table: String,
    /// Documents staged
    pub documents: usize,
    /// Columns added, sorted by name
    pub columns_added: Vec<ColumnSpec>,
    /// Rows inserted
    pub rows_inserted: usize,
    /// Values of the returning column, when one was requested
    pub returned: Option<Vec<ReturnedValue>>,
}

impl IngestReport {
    /// Whether the run changed the table's structure
    pub fn schema_changed(&self) -> bool {
        !self.columns_added.is_empty()
    }

    /// Returned values as output lines (NULL as an empty line)
    pub fn returned_lines(&self) -> Vec<String> {
        self.returned
            .iter()
            .flatten()
            .map(|v| v.clone().unwrap_or_default())
            .collect()
    }
}
