//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, TargetArgs};
use crate::config::{IngestConfig, RunFile, DEFAULT_ID_COLUMN};
use crate::csl::{parse_known_ids, update_csl, KnownIds};
use crate::database::Store;
use crate::decode::InputSource;
use crate::engine::IngestReport;
use crate::error::{Error, Result, ResultExt};
use crate::types::Document;
use std::path::{Path, PathBuf};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Load {
                input,
                target,
                no_id_check,
            } => self.load(input, target, *no_id_check),
            Commands::Csl { input, target } => self.csl(input, target),
            Commands::UpdateCsl {
                input,
                ids,
                compact,
            } => self.update_csl(input, ids, *compact),
            Commands::Check { target } => self.check(target),
        }
    }

    /// Load the run file, if one was given
    fn load_run_file(&self) -> Result<RunFile> {
        match &self.cli.config {
            Some(path) => RunFile::load(path),
            None => Ok(RunFile::default()),
        }
    }

    /// Database path and run config, flags taking precedence over the run file
    fn resolve(&self, target: &TargetArgs) -> Result<(PathBuf, IngestConfig)> {
        resolve_target(target, self.load_run_file()?)
    }

    /// Generic array-to-table run
    fn load(&self, input: &Path, target: &TargetArgs, no_id_check: bool) -> Result<()> {
        let documents = InputSource::from_arg(input).read_documents()?;
        let (database, mut config) = self.resolve(target)?;
        if no_id_check {
            config = config.without_id_check();
        }

        let mut store = Store::open(&database)?;
        let report = store.ingest(config, &documents)?;
        print_report(&report);
        Ok(())
    }

    /// CSL preprocessing against the table's ids, then a run
    fn csl(&self, input: &Path, target: &TargetArgs) -> Result<()> {
        let mut entries = InputSource::from_arg(input).read_documents()?;
        let (database, config) = self.resolve(target)?;

        let mut store = Store::open(&database)?;
        let id_column = config
            .id_column
            .clone()
            .unwrap_or_else(|| DEFAULT_ID_COLUMN.to_string());
        store.check_table(&config)?;
        let known = store.known_ids(&config.table, &id_column)?;

        update_csl(&mut entries, known)?;
        let report = store.ingest(config, &entries)?;
        print_report(&report);
        Ok(())
    }

    /// CSL preprocessing only, printing the updated entries
    fn update_csl(&self, input: &Path, ids: &Path, compact: bool) -> Result<()> {
        let mut entries = InputSource::from_arg(input).read_documents()?;
        let known = read_known_ids(ids)?;
        update_csl(&mut entries, known)?;

        println!("{}", render_entries(&entries, compact)?);
        Ok(())
    }

    /// Validate the target table and print its columns
    fn check(&self, target: &TargetArgs) -> Result<()> {
        let (database, config) = self.resolve(target)?;
        let store = Store::open(&database)?;
        store.check_connection()?;

        let columns = store.check_table(&config)?;
        tracing::info!(
            database = %store.location(),
            table = %config.table,
            columns = columns.len(),
            "Target table is ready"
        );
        for column in columns.iter() {
            println!("{}\t{}", column.name, column.column_type);
        }
        Ok(())
    }
}

/// Merge command-line target options over run file values
pub fn resolve_target(target: &TargetArgs, file: RunFile) -> Result<(PathBuf, IngestConfig)> {
    let database = target
        .database
        .clone()
        .or(file.database)
        .ok_or_else(|| Error::config("Database not specified (use --database or a run file)"))?;
    let table = target
        .table
        .clone()
        .or(file.table)
        .ok_or_else(|| Error::config("Table not specified (use --table or a run file)"))?;

    let mut config = IngestConfig::new(table);
    if let Some(staging) = target.staging.clone().or(file.staging) {
        config = config.with_staging_table(staging);
    }
    if let Some(returning) = target.returning.clone().or(file.returning) {
        config = config.with_returning(returning);
    }
    if let Some(id_column) = file.id_column {
        config = config.with_id_column(id_column);
    }

    config.validate()?;
    Ok((database, config))
}

/// Read a known-ids file
fn read_known_ids(path: &Path) -> Result<KnownIds> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read ids file {}", path.display()))?;
    Ok(parse_known_ids(&text))
}

/// Serialize entries as a JSON array
fn render_entries(entries: &[Document], compact: bool) -> Result<String> {
    let rendered = if compact {
        serde_json::to_string(entries)
    } else {
        serde_json::to_string_pretty(entries)
    };
    rendered.map_err(|e| Error::Other(format!("Failed to serialize entries: {e}")))
}

/// Print returned values, one per line
fn print_report(report: &IngestReport) {
    for line in report.returned_lines() {
        println!("{line}");
    }
}
