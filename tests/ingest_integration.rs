//! End-to-end ingestion runs against DuckDB
//!
//! Each test builds its own in-memory (or temp-file) database, so tests are
//! independent and need no external services.

use json2table::database::{evolve, inspect, staging};
use json2table::error::Error;
use json2table::schema::{ColumnSpec, ColumnType, SchemaDelta};
use json2table::{decode_documents, IngestConfig, RunState, Store};
use pretty_assertions::assert_eq;

/// Store with `refs(id VARCHAR NOT NULL)` and optional extra DDL
fn store(extra: &str) -> Store {
    let store = Store::open_in_memory().unwrap();
    store
        .execute_batch(&format!("CREATE TABLE refs (id VARCHAR NOT NULL); {extra}"))
        .unwrap();
    store
}

/// Column names and types, in table order
fn snapshot_columns(store: &Store) -> Vec<(String, ColumnType)> {
    store
        .table_columns("refs")
        .unwrap()
        .iter()
        .map(|c| (c.name.clone(), c.column_type.clone()))
        .collect()
}

fn row_count(store: &Store) -> i64 {
    store
        .connection()
        .query_row("SELECT count(*) FROM refs", [], |row| row.get(0))
        .unwrap()
}

fn text(store: &Store, sql: &str) -> Option<String> {
    store.connection().query_row(sql, [], |row| row.get(0)).unwrap()
}

fn staging_tables(store: &Store) -> i64 {
    store
        .connection()
        .query_row(
            "SELECT count(*) FROM information_schema.tables WHERE starts_with(table_name, '__')",
            [],
            |row| row.get(0),
        )
        .unwrap()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_new_columns_added_and_row_inserted() {
    let mut store = store("");
    let documents = decode_documents(r#"[{"id":"a1","title":"Foo","year":2001}]"#).unwrap();

    let report = store.ingest(IngestConfig::new("refs"), &documents).unwrap();

    assert_eq!(
        report.columns_added,
        vec![
            ColumnSpec::new("title", ColumnType::Text),
            ColumnSpec::new("year", ColumnType::Integer),
        ]
    );
    assert_eq!(report.rows_inserted, 1);

    let (id, title, year): (String, String, i64) = store
        .connection()
        .query_row("SELECT id, title, year FROM refs", [], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })
        .unwrap();
    assert_eq!((id.as_str(), title.as_str(), year), ("a1", "Foo", 2001));
}

#[test]
fn test_container_column_and_missing_keys_null() {
    let mut store = store("ALTER TABLE refs ADD COLUMN title VARCHAR;");
    let documents =
        decode_documents(r#"[{"id":"a2","title":"Bar"}, {"id":"a3","note":["x","y"]}]"#).unwrap();

    let report = store.ingest(IngestConfig::new("refs"), &documents).unwrap();
    assert_eq!(
        report.columns_added,
        vec![ColumnSpec::new("note", ColumnType::Json)]
    );

    assert_eq!(text(&store, "SELECT CAST(note AS VARCHAR) FROM refs WHERE id = 'a2'"), None);
    assert_eq!(text(&store, "SELECT title FROM refs WHERE id = 'a3'"), None);

    let note = text(&store, "SELECT CAST(note AS VARCHAR) FROM refs WHERE id = 'a3'").unwrap();
    let note: serde_json::Value = serde_json::from_str(&note).unwrap();
    assert_eq!(note, serde_json::json!(["x", "y"]));
}

#[test]
fn test_null_only_key_not_added() {
    let mut store = store("");
    let documents = decode_documents(r#"[{"id":"a1","edition":null}]"#).unwrap();

    let report = store.ingest(IngestConfig::new("refs"), &documents).unwrap();

    assert!(!report.schema_changed());
    assert_eq!(snapshot_columns(&store), vec![("id".to_string(), ColumnType::Text)]);
    assert_eq!(row_count(&store), 1);
}

#[test]
fn test_empty_input() {
    let mut store = store("");
    let before = snapshot_columns(&store);

    let report = store
        .ingest(IngestConfig::new("refs").with_returning("id"), &[])
        .unwrap();

    assert_eq!(report.rows_inserted, 0);
    assert!(report.returned_lines().is_empty());
    assert_eq!(snapshot_columns(&store), before);
    assert_eq!(row_count(&store), 0);
}

#[test]
fn test_rerun_appends_without_schema_change() {
    let mut store = store("");
    store
        .ingest(
            IngestConfig::new("refs"),
            &decode_documents(r#"[{"id":"a1","title":"Foo","year":2001}]"#).unwrap(),
        )
        .unwrap();
    let after_first = snapshot_columns(&store);

    let report = store
        .ingest(
            IngestConfig::new("refs"),
            &decode_documents(r#"[{"id":"b1","title":"Foo","year":2001}]"#).unwrap(),
        )
        .unwrap();

    assert!(!report.schema_changed());
    assert_eq!(snapshot_columns(&store), after_first);
    assert_eq!(row_count(&store), 2);
}

#[test]
fn test_projection_failure_leaves_table_unchanged() {
    let mut store = store("");
    store
        .ingest(
            IngestConfig::new("refs"),
            &decode_documents(r#"[{"id":"a1","year":2001}]"#).unwrap(),
        )
        .unwrap();
    let before = snapshot_columns(&store);

    let err = store
        .ingest(
            IngestConfig::new("refs"),
            &decode_documents(r#"[{"id":"a2","year":"not-a-number","extra":"x"}]"#).unwrap(),
        )
        .unwrap_err();

    match err {
        Error::Projection { column, .. } => assert_eq!(column.as_deref(), Some("year")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(snapshot_columns(&store), before);
    assert_eq!(row_count(&store), 1);
    assert_eq!(staging_tables(&store), 0);
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_schema_convergence_and_idempotence() {
    let mut store = store("ALTER TABLE refs ADD COLUMN legacy VARCHAR;");
    let documents = decode_documents(
        r#"[
            {"id":"a1","title":"Foo","tags":["x"]},
            {"id":"a2","score":1.5,"meta":{"k":1}},
            {"id":"a3","pages":12}
        ]"#,
    )
    .unwrap();

    store.ingest(IngestConfig::new("refs"), &documents).unwrap();
    let columns = store.table_columns("refs").unwrap().names();
    for key in ["id", "legacy", "title", "tags", "score", "meta", "pages"] {
        assert!(columns.contains(key), "missing column {key}");
    }

    // the same keys again need no new columns
    let mut run = store.begin(IngestConfig::new("refs")).unwrap();
    run.load(&decode_documents(r#"[{"id":"b1","title":"Bar","pages":3}]"#).unwrap())
        .unwrap();
    assert!(run.inspect().unwrap().delta.is_empty());
}

#[test]
fn test_missing_keys_are_null() {
    let mut store = store(
        "ALTER TABLE refs ADD COLUMN title VARCHAR; ALTER TABLE refs ADD COLUMN year BIGINT;",
    );
    let documents =
        decode_documents(r#"[{"id":"a1"}, {"id":"a2","note":"n"}, {"id":"a3","year":null}]"#)
            .unwrap();

    store.ingest(IngestConfig::new("refs"), &documents).unwrap();

    let non_null: i64 = store
        .connection()
        .query_row(
            "SELECT count(title) + count(year) FROM refs",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(non_null, 0);
    assert_eq!(text(&store, "SELECT note FROM refs WHERE id = 'a1'"), None);
}

#[test]
fn test_returning_one_value_per_document() {
    let mut store = store("");
    let documents =
        decode_documents(r#"[{"id":"c"}, {"id":"a"}, {"id":"b","title":"T"}]"#).unwrap();

    let report = store
        .ingest(IngestConfig::new("refs").with_returning("id"), &documents)
        .unwrap();

    let mut returned = report.returned_lines();
    assert_eq!(returned.len(), documents.len());
    returned.sort();
    assert_eq!(returned, vec!["a", "b", "c"]);
}

#[test]
fn test_returning_null_values() {
    let mut store = store("ALTER TABLE refs ADD COLUMN title VARCHAR;");
    let documents = decode_documents(r#"[{"id":"a1"}, {"id":"a2","title":"T"}]"#).unwrap();

    let report = store
        .ingest(IngestConfig::new("refs").with_returning("title"), &documents)
        .unwrap();

    let mut returned = report.returned.unwrap();
    returned.sort();
    assert_eq!(returned, vec![None, Some("T".to_string())]);
}

#[test]
fn test_mixed_numbers_widen_to_double() {
    let mut store = store("");
    let documents = decode_documents(r#"[{"id":"a1","score":1}, {"id":"a2","score":2.5}]"#).unwrap();

    let report = store.ingest(IngestConfig::new("refs"), &documents).unwrap();
    assert_eq!(
        report.columns_added,
        vec![ColumnSpec::new("score", ColumnType::Float)]
    );
}

#[test]
fn test_mixed_kinds_widen_to_json() {
    let mut store = store("");
    let documents =
        decode_documents(r#"[{"id":"a1","edition":2}, {"id":"a2","edition":"2nd"}]"#).unwrap();

    store.ingest(IngestConfig::new("refs"), &documents).unwrap();
    assert_eq!(
        store
            .table_columns("refs")
            .unwrap()
            .get("edition")
            .unwrap()
            .column_type,
        ColumnType::Json
    );
    assert_eq!(
        text(&store, "SELECT CAST(edition AS VARCHAR) FROM refs WHERE id = 'a2'").as_deref(),
        Some("\"2nd\"")
    );
}

#[test]
fn test_unsigned_beyond_bigint_gets_hugeint() {
    let mut store = store("");
    let documents = decode_documents(
        r#"[{"id":"a1","big":18446744073709551615}, {"id":"a2","big":7}]"#,
    )
    .unwrap();

    let report = store.ingest(IngestConfig::new("refs"), &documents).unwrap();
    assert_eq!(
        report.columns_added,
        vec![ColumnSpec::new("big", ColumnType::HugeInt)]
    );
    assert_eq!(
        text(&store, "SELECT CAST(big AS VARCHAR) FROM refs WHERE id = 'a1'").as_deref(),
        Some("18446744073709551615")
    );
    assert_eq!(row_count(&store), 2);
}

#[test]
fn test_case_variant_keys_share_one_column() {
    let mut store = store("ALTER TABLE refs ADD COLUMN title VARCHAR;");
    let documents = decode_documents(
        r#"[
            {"id":"a1","Note":"first","Title":"Foo"},
            {"id":"a2","note":"second"}
        ]"#,
    )
    .unwrap();

    let report = store.ingest(IngestConfig::new("refs"), &documents).unwrap();

    assert_eq!(
        report.columns_added,
        vec![ColumnSpec::new("Note", ColumnType::Text)]
    );
    assert_eq!(
        text(&store, "SELECT note FROM refs WHERE id = 'a2'").as_deref(),
        Some("second")
    );
    assert_eq!(
        text(&store, "SELECT note FROM refs WHERE id = 'a1'").as_deref(),
        Some("first")
    );
    assert_eq!(
        text(&store, "SELECT title FROM refs WHERE id = 'a1'").as_deref(),
        Some("Foo")
    );
}

#[test]
fn test_case_variant_keys_in_one_document_fail() {
    let mut store = store("");
    let before = snapshot_columns(&store);

    let err = store
        .ingest(
            IngestConfig::new("refs"),
            &decode_documents(r#"[{"id":"a1"}, {"id":"a2","Note":"x","note":"y"}]"#).unwrap(),
        )
        .unwrap_err();

    match err {
        Error::Projection {
            column, document, ..
        } => {
            assert_eq!(column.as_deref(), Some("Note"));
            assert_eq!(document, Some(1));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(snapshot_columns(&store), before);
    assert_eq!(row_count(&store), 0);
}

#[test]
fn test_fraction_into_integer_column_fails() {
    let mut store = store("ALTER TABLE refs ADD COLUMN year BIGINT;");
    let before = snapshot_columns(&store);

    let err = store
        .ingest(
            IngestConfig::new("refs"),
            &decode_documents(r#"[{"id":"a1","year":2001}, {"id":"a2","year":2001.7}]"#)
                .unwrap(),
        )
        .unwrap_err();

    match err {
        Error::Projection {
            column, document, ..
        } => {
            assert_eq!(column.as_deref(), Some("year"));
            assert_eq!(document, Some(1));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(snapshot_columns(&store), before);
    assert_eq!(row_count(&store), 0);
}

// ============================================================================
// Atomicity
// ============================================================================

#[test]
fn test_staging_failure_is_atomic() {
    let mut store = store("CREATE TABLE refs_import (x INTEGER);");
    let before = snapshot_columns(&store);

    let err = store
        .ingest(
            IngestConfig::new("refs").with_staging_table("refs_import"),
            &decode_documents(r#"[{"id":"a1","title":"Foo"}]"#).unwrap(),
        )
        .unwrap_err();

    assert!(matches!(err, Error::Ingest { .. }));
    assert_eq!(snapshot_columns(&store), before);
    assert_eq!(row_count(&store), 0);
}

#[test]
fn test_missing_table_fails_before_changes() {
    let mut store = store("");
    let err = store
        .ingest(
            IngestConfig::new("nope"),
            &decode_documents(r#"[{"id":"a1"}]"#).unwrap(),
        )
        .unwrap_err();

    assert!(matches!(err, Error::TableNotFound { .. }));
    assert_eq!(staging_tables(&store), 0);
}

#[test]
fn test_insert_failure_rolls_back_new_columns() {
    let mut store = store("");
    store
        .ingest(
            IngestConfig::new("refs"),
            &decode_documents(r#"[{"id":"a1"}]"#).unwrap(),
        )
        .unwrap();
    let before = snapshot_columns(&store);

    // a missing id violates NOT NULL after `title` was added
    let err = store
        .ingest(
            IngestConfig::new("refs"),
            &decode_documents(r#"[{"id":"a2"}, {"title":"Untitled"}]"#).unwrap(),
        )
        .unwrap_err();

    assert!(matches!(err, Error::Projection { .. }));
    assert_eq!(snapshot_columns(&store), before);
    assert_eq!(row_count(&store), 1);
}

#[test]
fn test_evolve_failure_rolls_back_earlier_columns() {
    let mut conn = duckdb::Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE refs (id VARCHAR, title VARCHAR);
         INSERT INTO refs VALUES ('a0', 'Zero');",
    )
    .unwrap();
    let before = inspect::existing_columns(&conn, "refs").unwrap();

    {
        let tx = conn.transaction().unwrap();
        let documents = decode_documents(r#"[{"id":"a1","abc":1,"title":"Foo"}]"#).unwrap();
        staging::load(&tx, "__refs", &documents).unwrap();

        // `abc` goes in first, then `title` collides with the existing column
        let delta = SchemaDelta::new([
            ColumnSpec::new("abc", ColumnType::Integer),
            ColumnSpec::new("title", ColumnType::Text),
        ]);
        let err = evolve::apply(&tx, "refs", &delta).unwrap_err();
        match err {
            Error::SchemaEvolution { column, .. } => assert_eq!(column, "title"),
            other => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(inspect::existing_columns(&conn, "refs").unwrap(), before);
    let rows: i64 = conn
        .query_row("SELECT count(*) FROM refs", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
    let staged: i64 = conn
        .query_row(
            "SELECT count(*) FROM information_schema.tables WHERE table_name = '__refs'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(staged, 0);
}

#[test]
fn test_abandoned_run_rolls_back() {
    let mut store = store("");
    let before = snapshot_columns(&store);
    {
        let mut run = store.begin(IngestConfig::new("refs")).unwrap();
        run.load(&decode_documents(r#"[{"id":"a1","title":"Foo"}]"#).unwrap())
            .unwrap();
        run.inspect().unwrap();
        run.evolve().unwrap();
        run.materialize().unwrap();
        assert_eq!(run.state(), RunState::Materialized);
    }

    assert_eq!(snapshot_columns(&store), before);
    assert_eq!(row_count(&store), 0);
    assert_eq!(staging_tables(&store), 0);
}

// ============================================================================
// File databases
// ============================================================================

#[test]
fn test_committed_run_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("refs.duckdb");
    {
        let mut store = Store::open(&path).unwrap();
        store
            .execute_batch("CREATE TABLE refs (id VARCHAR NOT NULL);")
            .unwrap();
        store
            .ingest(
                IngestConfig::new("refs"),
                &decode_documents(r#"[{"id":"a1","title":"Foo"}]"#).unwrap(),
            )
            .unwrap();
    }

    let store = Store::open(&path).unwrap();
    assert_eq!(row_count(&store), 1);
    assert_eq!(
        store.table_columns("refs").unwrap().names().into_iter().collect::<Vec<_>>(),
        vec!["id", "title"]
    );
}
