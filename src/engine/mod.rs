//! Execution engine module
//!
//! Drives one ingestion run through its four steps inside a single
//! transaction.
//!
//! # Overview
//!
//! The engine module provides:
//! - `Run` - one run, stepped manually (`load`, `inspect`, `evolve`,
//!   `materialize`, `commit`)
//! - `ingest` - all steps in order, then commit
//! - `IngestReport` - what a committed run did
//!
//! A run that is dropped before `commit` rolls back: no staging table, no
//! added columns and no inserted rows become visible.

mod types;

pub use types::{IngestReport, Inspection};

use crate::config::IngestConfig;
use crate::database::{evolve, inspect, materialize, staging, Materialized, StagingHandle};
use crate::error::{Error, Result};
use crate::schema::compute_delta;
use crate::types::{Document, RunState};
use duckdb::{Connection, Transaction};
use std::time::Instant;

/// One ingestion run against one target table
pub struct Run<'conn> {
    /// Transaction holding every effect of the run
    tx: Transaction<'conn>,
    /// Run configuration
    config: IngestConfig,
    /// Current step
    state: RunState,
    /// Populated staging table
    staging: Option<StagingHandle>,
    /// Inspector output
    inspection: Option<Inspection>,
    /// Materializer output
    materialized: Option<Materialized>,
    /// Start time
    started: Instant,
}

impl<'conn> Run<'conn> {
    /// Open the run's transaction
    pub fn begin(conn: &'conn mut Connection, config: IngestConfig) -> Result<Self> {
        config.validate()?;

        let tx = conn
            .transaction()
            .map_err(|e| Error::connection(format!("Failed to begin transaction: {e}")))?;

        tracing::debug!(table = %config.table, staging = %config.staging_name(), "Run started");

        Ok(Self {
            tx,
            config,
            state: RunState::Start,
            staging: None,
            inspection: None,
            materialized: None,
            started: Instant::now(),
        })
    }

    /// Current step
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run configuration
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Staging table, once loaded
    pub fn staging(&self) -> Option<&StagingHandle> {
        self.staging.as_ref()
    }

    /// Inspector output, once inspected
    pub fn inspection(&self) -> Option<&Inspection> {
        self.inspection.as_ref()
    }

    /// Stage the documents
    pub fn load(&mut self, documents: &[Document]) -> Result<usize> {
        self.step(RunState::Start, "load", |run| {
            let name = run.config.staging_name();
            let handle = staging::load(&run.tx, &name, documents)?;
            let rows = handle.rows;
            run.staging = Some(handle);
            Ok(rows)
        })
    }

    /// Read existing columns, scan staged keys and compute the delta
    pub fn inspect(&mut self) -> Result<&Inspection> {
        self.step(RunState::Loaded, "inspect", |run| {
            let table = run.config.table.as_str();
            let existing = inspect::existing_columns(&run.tx, table)?;
            if let Some(id_column) = &run.config.id_column {
                inspect::require_column(&existing, table, id_column)?;
            }

            let observed = inspect::observed_keys(&run.tx, run.staged()?)?;
            let delta = compute_delta(&observed, &existing);

            tracing::debug!(
                table,
                existing = existing.len(),
                observed = observed.len(),
                delta = delta.len(),
                "Inspected"
            );

            run.inspection = Some(Inspection {
                existing,
                observed,
                delta,
            });
            Ok(())
        })?;
        self.inspected()
    }

    /// Add the missing columns; returns how many were added
    pub fn evolve(&mut self) -> Result<usize> {
        self.step(RunState::Inspected, "evolve", |run| {
            let inspection = run.inspected()?;
            evolve::apply(&run.tx, &run.config.table, &inspection.delta)?;
            Ok(inspection.delta.len())
        })
    }

    /// Insert one row per staged document
    pub fn materialize(&mut self) -> Result<&Materialized> {
        self.step(RunState::Evolved, "materialize", |run| {
            let table = run.config.table.as_str();
            let staged = run.staged()?;

            // columns as evolved, read back from the store
            let columns = inspect::existing_columns(&run.tx, table)?;
            let observed = &run.inspected()?.observed;
            materialize::check_conflicts(&run.tx, &columns, observed, staged)?;
            materialize::check_casts(&run.tx, &columns, observed, staged)?;

            let result = materialize::materialize(
                &run.tx,
                table,
                &columns,
                observed,
                staged,
                run.config.returning.as_deref(),
            )?;

            tracing::debug!(table, rows = result.rows, "Materialized");
            run.materialized = Some(result);
            Ok(())
        })?;
        self.materialized
            .as_ref()
            .ok_or_else(|| self.invalid("read materialized rows"))
    }

    /// Drop the staging table and commit every effect of the run
    pub fn commit(mut self) -> Result<IngestReport> {
        if self.state != RunState::Materialized {
            return Err(self.invalid("commit"));
        }

        let staged = self.staged()?.clone();
        staging::discard(&self.tx, &staged)?;

        let inspection = self.inspection.take().unwrap_or_default();
        let materialized = self.materialized.take().unwrap_or(Materialized {
            rows: 0,
            returned: None,
        });
        let report = IngestReport {
            table: self.config.table.clone(),
            documents: staged.rows,
            columns_added: inspection.delta.into_columns(),
            rows_inserted: materialized.rows,
            returned: materialized.returned,
        };

        let elapsed = self.started.elapsed();
        self.tx
            .commit()
            .map_err(|e| Error::connection(format!("Failed to commit: {e}")))?;

        tracing::info!(
            table = %report.table,
            rows = report.rows_inserted,
            columns_added = report.columns_added.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Run committed"
        );
        Ok(report)
    }

    /// Run one step: check the state, run it, advance or abort
    fn step<T>(
        &mut self,
        expected: RunState,
        name: &str,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        if self.state != expected {
            return Err(self.invalid(name));
        }

        match f(self) {
            Ok(value) => {
                self.state = expected.next().unwrap_or(RunState::Aborted);
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(
                    table = %self.config.table,
                    step = name,
                    error = %e,
                    "Run aborted, rolling back"
                );
                self.state = RunState::Aborted;
                Err(e)
            }
        }
    }

    fn staged(&self) -> Result<&StagingHandle> {
        self.staging
            .as_ref()
            .ok_or_else(|| self.invalid("read the staging table"))
    }

    fn inspected(&self) -> Result<&Inspection> {
        self.inspection
            .as_ref()
            .ok_or_else(|| self.invalid("read the inspection"))
    }

    fn invalid(&self, step: &str) -> Error {
        Error::InvalidState {
            state: self.state.to_string(),
            step: step.to_string(),
        }
    }
}

/// Stage, inspect, evolve, materialize and commit in one transaction
pub fn ingest(
    conn: &mut Connection,
    config: IngestConfig,
    documents: &[Document],
) -> Result<IngestReport> {
    tracing::info!(
        table = %config.table,
        documents = documents.len(),
        "Starting run"
    );

    let mut run = Run::begin(conn, config)?;
    run.load(documents)?;
    run.inspect()?;
    run.evolve()?;
    run.materialize()?;
    run.commit()
}
