//! Row- and catalog-level outcomes and the sink that narrates them.
//!
//! Sinks observe; nothing they do feeds back into the import.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::data::{CatalogKind, Record};
use crate::error::{ImportError, RowError};

/// What happened to one row.
#[derive(Debug)]
pub enum RowOutcome {
    Persisted { id: Uuid, summary: String },
    Skipped(RowError),
}

impl RowOutcome {
    pub fn persisted(record: &Record) -> Self {
        Self::Persisted {
            id: record.id(),
            summary: record.describe(),
        }
    }
}

/// Where a row came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowContext<'a> {
    pub kind: CatalogKind,
    pub file: &'a Path,
    pub line: u64,
    pub source_id: Option<&'a str>,
}

/// Tally of one catalog step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogReport {
    pub kind: CatalogKind,
    pub files: Vec<PathBuf>,
    pub skipped_files: Vec<PathBuf>,
    pub removed: usize,
    pub persisted: usize,
    pub malformed: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub reindexed: usize,
}

impl CatalogReport {
    pub fn new(kind: CatalogKind) -> Self {
        Self {
            kind,
            files: Vec::new(),
            skipped_files: Vec::new(),
            removed: 0,
            persisted: 0,
            malformed: 0,
            duplicates: 0,
            failed: 0,
            reindexed: 0,
        }
    }

    pub fn record(&mut self, outcome: &RowOutcome) {
        match outcome {
            RowOutcome::Persisted { .. } => self.persisted += 1,
            RowOutcome::Skipped(err) => match err {
                RowError::Malformed { .. }
                | RowError::FieldTooLong { .. }
                | RowError::Unparseable(_) => self.malformed += 1,
                RowError::DuplicateCode { .. } => self.duplicates += 1,
                RowError::MissingField(_) | RowError::Store(_) => self.failed += 1,
            },
        }
    }

    pub fn skipped_rows(&self) -> usize {
        self.malformed + self.duplicates + self.failed
    }
}

pub trait ReportSink {
    fn file_found(&mut self, kind: CatalogKind, path: &Path);
    fn file_skipped(&mut self, kind: CatalogKind, path: &Path);
    fn row(&mut self, ctx: &RowContext<'_>, outcome: &RowOutcome);
    /// Called every [`PROGRESS_EVERY`] rows read from a file.
    fn progress(&mut self, kind: CatalogKind, rows: u64);
    fn duplicate_source_id(&mut self, ctx: &RowContext<'_>, previous: Uuid);
    fn catalog_done(&mut self, report: &CatalogReport);
    fn catalog_aborted(&mut self, kind: CatalogKind, err: &ImportError);
}

pub const PROGRESS_EVERY: u64 = 100;

/// Default sink: narrates the run through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn file_found(&mut self, kind: CatalogKind, path: &Path) {
        info!(catalog = %kind, "found file: {}", path.display());
    }

    fn file_skipped(&mut self, kind: CatalogKind, path: &Path) {
        warn!(catalog = %kind, "ignoring file {}", path.display());
    }

    fn row(&mut self, ctx: &RowContext<'_>, outcome: &RowOutcome) {
        match outcome {
            RowOutcome::Persisted { id, summary } => {
                info!(
                    catalog = %ctx.kind,
                    line = ctx.line,
                    "{} persisted - new id: {id} {summary}",
                    ctx.kind
                );
            }
            RowOutcome::Skipped(err) => {
                warn!(
                    catalog = %ctx.kind,
                    file = %ctx.file.display(),
                    line = ctx.line,
                    reason = err.label(),
                    "{}: {err}",
                    ctx.kind
                );
            }
        }
    }

    fn progress(&mut self, kind: CatalogKind, rows: u64) {
        info!(catalog = %kind, "row {rows}");
    }

    fn duplicate_source_id(&mut self, ctx: &RowContext<'_>, previous: Uuid) {
        warn!(
            catalog = %ctx.kind,
            line = ctx.line,
            "source id {} already imported in this run as {previous}",
            ctx.source_id.unwrap_or_default()
        );
    }

    fn catalog_done(&mut self, report: &CatalogReport) {
        info!(
            catalog = %report.kind,
            persisted = report.persisted,
            malformed = report.malformed,
            duplicates = report.duplicates,
            failed = report.failed,
            "catalog imported"
        );
    }

    fn catalog_aborted(&mut self, kind: CatalogKind, err: &ImportError) {
        error!(catalog = %kind, "{err}");
    }
}
