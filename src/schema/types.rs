//! Schema types

use crate::types::{Document, JsonValue, ValueKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Column type of the target table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Schemaless container holding any JSON value verbatim
    Json,
    /// Text
    Text,
    /// 64-bit integer
    Integer,
    /// 128-bit integer, for values past the 64-bit signed range
    HugeInt,
    /// Double precision float
    Float,
    /// Any other declared type, kept as declared
    Other(String),
}

impl ColumnType {
    /// Type name used in DDL and casts
    pub fn sql_name(&self) -> &str {
        match self {
            ColumnType::Json => "JSON",
            ColumnType::Text => "VARCHAR",
            ColumnType::Integer => "BIGINT",
            ColumnType::HugeInt => "HUGEINT",
            ColumnType::Float => "DOUBLE",
            ColumnType::Other(declared) => declared,
        }
    }

    /// Map a declared type as reported by the store
    pub fn from_declared(declared: &str) -> Self {
        match declared.trim().to_ascii_uppercase().as_str() {
            "JSON" => ColumnType::Json,
            "VARCHAR" | "TEXT" | "STRING" => ColumnType::Text,
            "BIGINT" | "INT8" | "LONG" => ColumnType::Integer,
            "HUGEINT" | "INT128" => ColumnType::HugeInt,
            "DOUBLE" | "FLOAT8" => ColumnType::Float,
            _ => ColumnType::Other(declared.trim().to_string()),
        }
    }

    /// Whether projection has to cast the value and may fail
    pub fn needs_cast(&self) -> bool {
        !matches!(self, ColumnType::Json | ColumnType::Text)
    }

    /// Whether the type only holds whole numbers
    ///
    /// A cast from `2001.7` to these rounds instead of failing, so
    /// projection rejects fractional and exponent forms itself.
    pub fn is_integral(&self) -> bool {
        match self {
            ColumnType::Integer | ColumnType::HugeInt => true,
            ColumnType::Other(declared) => matches!(
                declared.to_ascii_uppercase().as_str(),
                "INTEGER"
                    | "INT"
                    | "INT4"
                    | "INT2"
                    | "INT1"
                    | "SMALLINT"
                    | "TINYINT"
                    | "UBIGINT"
                    | "UINTEGER"
                    | "USMALLINT"
                    | "UTINYINT"
                    | "UHUGEINT"
            ),
            _ => false,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

// ============================================================================
// Table Columns
// ============================================================================

/// A column of the target table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, unquoted
    pub name: String,
    /// Declared type
    pub column_type: ColumnType,
}

impl Column {
    /// Create a column
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Current columns of a table, in ordinal order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableColumns {
    columns: Vec<Column>,
}

impl TableColumns {
    /// Create from columns in ordinal order
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Column names compare ASCII case-insensitively, as the store does
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Look up a column by name, ignoring ASCII case
    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// All column names
    pub fn names(&self) -> BTreeSet<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Iterate in ordinal order
    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// ============================================================================
// Schema Delta
// ============================================================================

/// A column to add: name and inferred type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name (the document key)
    pub name: String,
    /// Inferred type
    pub column_type: ColumnType,
}

impl ColumnSpec {
    /// Create a column spec
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Columns to add before projection, one per key, sorted by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDelta {
    columns: Vec<ColumnSpec>,
}

impl SchemaDelta {
    /// Build a delta; names equal up to ASCII case keep the first spec
    pub fn new(columns: impl IntoIterator<Item = ColumnSpec>) -> Self {
        let mut by_name: BTreeMap<String, ColumnSpec> = BTreeMap::new();
        for spec in columns {
            by_name
                .entry(spec.name.to_ascii_lowercase())
                .or_insert(spec);
        }
        Self {
            columns: by_name.into_values().collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter()
    }

    /// Names of the columns to add
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Consume into column specs
    pub fn into_columns(self) -> Vec<ColumnSpec> {
        self.columns
    }
}

// ============================================================================
// Observed Keys
// ============================================================================

/// What the scan saw for one key
#[derive(Debug, Clone, PartialEq)]
pub struct KeyProfile {
    /// First non-null value in scan order
    pub sample: JsonValue,
    /// Every non-null kind seen
    pub kinds: BTreeSet<ValueKind>,
    /// Number of documents with a non-null value
    pub occurrences: usize,
}

impl KeyProfile {
    fn new(sample: &JsonValue) -> Self {
        Self {
            sample: sample.clone(),
            kinds: BTreeSet::from([ValueKind::of(sample)]),
            occurrences: 1,
        }
    }

    /// Whether all non-null values had the same kind
    pub fn is_uniform(&self) -> bool {
        self.kinds.len() <= 1
    }

    /// Fold in the profile of another key feeding the same column
    ///
    /// The sample stays the one already held.
    pub fn merge(&mut self, other: &KeyProfile) {
        self.kinds.extend(other.kinds.iter().copied());
        self.occurrences += other.occurrences;
    }
}

/// Union of top-level keys with a non-null value across documents
///
/// A key present with a JSON null does not count for that document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservedKeys {
    keys: BTreeMap<String, KeyProfile>,
    documents: usize,
}

impl ObservedKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one document into the set
    pub fn observe(&mut self, document: &Document) {
        self.documents += 1;
        for (key, value) in document {
            if value.is_null() {
                continue;
            }
            match self.keys.get_mut(key) {
                Some(profile) => {
                    profile.kinds.insert(ValueKind::of(value));
                    profile.occurrences += 1;
                }
                None => {
                    self.keys.insert(key.clone(), KeyProfile::new(value));
                }
            }
        }
    }

    /// Observed key names, sorted
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    /// One non-null value observed for `key`
    pub fn sample_value(&self, key: &str) -> Option<&JsonValue> {
        self.keys.get(key).map(|p| &p.sample)
    }

    pub fn profile(&self, key: &str) -> Option<&KeyProfile> {
        self.keys.get(key)
    }

    /// Iterate keys with their profiles, sorted by key
    pub fn profiles(&self) -> impl Iterator<Item = (&str, &KeyProfile)> {
        self.keys.iter().map(|(k, p)| (k.as_str(), p))
    }

    /// Observed keys that land in `column`, i.e. equal to it up to ASCII case
    pub fn variants(&self, column: &str) -> Vec<&str> {
        self.keys()
            .filter(|key| key.eq_ignore_ascii_case(column))
            .collect()
    }

    /// Profiles merged per column name, keyed by the first spelling in
    /// sorted order
    pub fn columns(&self) -> Vec<(&str, KeyProfile)> {
        let mut merged: BTreeMap<String, (&str, KeyProfile)> = BTreeMap::new();
        for (key, profile) in self.profiles() {
            merged
                .entry(key.to_ascii_lowercase())
                .and_modify(|(_, existing)| existing.merge(profile))
                .or_insert_with(|| (key, profile.clone()));
        }
        merged.into_values().collect()
    }

    /// Number of documents scanned
    pub fn documents(&self) -> usize {
        self.documents
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<'a> FromIterator<&'a Document> for ObservedKeys {
    fn from_iter<I: IntoIterator<Item = &'a Document>>(iter: I) -> Self {
        let mut observed = ObservedKeys::new();
        for document in iter {
            observed.observe(document);
        }
        observed
    }
}
