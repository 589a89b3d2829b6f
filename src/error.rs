//! Error taxonomy for the seeding pipeline.
//!
//! [`ImportError`] ends a catalog step. [`RowError`] describes why a single row was skipped;
//! the driver records it and keeps reading.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::data::CatalogKind;

/// Failures of the backing store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("store file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Fatal to the catalog step that raised it. Catalogs already completed stay as they are.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("input file {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("{kind}: there's no data to initialize")]
    NoInputAvailable { kind: CatalogKind },

    #[error("header of {} is missing required columns: {}", path.display(), missing.join(", "))]
    MissingRequiredColumns { path: PathBuf, missing: Vec<String> },

    #[error("{} has no header row", path.display())]
    EmptyFile { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Reason a row produced no record.
#[derive(Error, Debug)]
pub enum RowError {
    #[error("row has {columns} elements")]
    Malformed { columns: usize },

    #[error("column {column} exceeds {limit} characters")]
    FieldTooLong { column: usize, limit: usize },

    #[error("unreadable row: {0}")]
    Unparseable(String),

    #[error("missing value for '{0}'")]
    MissingField(&'static str),

    #[error("nothing done - tag retrieved from store id: {existing_id} cod: {code}")]
    DuplicateCode { code: String, existing_id: Uuid },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RowError {
    /// Short label used in reports and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Malformed { .. } | Self::FieldTooLong { .. } | Self::Unparseable(_) => "malformed",
            Self::MissingField(_) => "incomplete",
            Self::DuplicateCode { .. } => "duplicate",
            Self::Store(_) => "store",
        }
    }
}
