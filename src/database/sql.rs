//! SQL text helpers
//!
//! Identifiers and paths come from user documents, so every name that ends
//! up in a statement goes through one of these.

use crate::schema::ColumnType;

/// Quote an identifier (`"name"`, embedded quotes doubled)
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal (`'text'`, embedded quotes doubled)
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// JSON pointer to a top-level key, as a SQL literal
pub fn key_pointer(key: &str) -> String {
    let escaped = key.replace('~', "~0").replace('/', "~1");
    quote_literal(&format!("/{escaped}"))
}

/// Condition true when `key` is absent from `obj` or holds JSON null
pub fn key_is_null(key: &str) -> String {
    format!(
        "coalesce(json_type(obj, {}), 'NULL') = 'NULL'",
        key_pointer(key)
    )
}

/// The key's value as text (strings unquoted, other values as JSON text)
pub fn key_text(key: &str) -> String {
    format!("json_extract_string(obj, {})", key_pointer(key))
}

/// Condition true when the key's text is not a whole number literal
///
/// JSON numbers with a fraction or exponent would round on a cast to an
/// integer type instead of failing.
pub fn key_not_integral(key: &str) -> String {
    format!("regexp_matches({}, '[.eE]')", key_text(key))
}

/// Value of one key converted to the column type
fn key_value(key: &str, column: &str, column_type: &ColumnType) -> String {
    match column_type {
        ColumnType::Json => format!("json_extract(obj, {})", key_pointer(key)),
        ColumnType::Text => key_text(key),
        integral if integral.is_integral() => format!(
            "CASE WHEN {} THEN error({}) ELSE CAST({} AS {}) END",
            key_not_integral(key),
            quote_literal(&format!("column '{column}' expects a whole number")),
            key_text(key),
            integral.sql_name()
        ),
        other => format!("CAST({} AS {})", key_text(key), other.sql_name()),
    }
}

/// Expression producing the value of one target column from `obj`
///
/// `keys` are the document keys that land in `column`; the first non-null
/// one wins. Absent and null keys project to SQL NULL. Container columns
/// take the JSON value verbatim, text columns take the text, everything
/// else is cast to the declared type and fails the statement when it does
/// not convert.
pub fn projection(column: &str, keys: &[&str], column_type: &ColumnType) -> String {
    if keys.is_empty() {
        return "NULL".to_string();
    }
    let arms = keys
        .iter()
        .map(|key| {
            format!(
                "WHEN NOT ({}) THEN {}",
                key_is_null(key),
                key_value(key, column, column_type)
            )
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!("CASE {arms} ELSE NULL END")
}
