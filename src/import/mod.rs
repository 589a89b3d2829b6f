//! The repository-initialisation pipeline: locate input, read rows, build and persist records.

pub mod driver;
pub mod locator;
pub mod reader;
pub mod report;
pub mod tree;

pub use driver::{CatalogFailure, CatalogSelection, ImportRequest, Importer, Phase, RunSummary};
pub use locator::BroadcastVariant;
pub use report::{CatalogReport, ReportSink, RowOutcome, TracingSink};
