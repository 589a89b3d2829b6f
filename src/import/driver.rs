//! Catalog import driver.
//!
//! Each catalog step walks `Idle -> Located -> Wiped -> Streaming -> Flushed -> Done`, or stops
//! in `Aborted` on a file-level error. Row failures are reported and never stop a step. The
//! `all` selection runs the catalogs in [`CatalogKind::ALL`] order and stops at the first
//! aborted step without undoing the ones already done.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::config::SeedConfig;
use crate::data::{BuildContext, CatalogKind, PermissionCatalog, Record, RowSchema, TagHeader};
use crate::error::{ImportError, RowError};
use crate::import::locator::{locate, BroadcastVariant};
use crate::import::reader::{RawRow, ReadIssue, RowReader};
use crate::import::report::{
    CatalogReport, ReportSink, RowContext, RowOutcome, PROGRESS_EVERY,
};
use crate::import::tree::{self, TagArena};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSelection {
    One(CatalogKind),
    All,
}

impl CatalogSelection {
    pub fn kinds(&self) -> Vec<CatalogKind> {
        match self {
            Self::One(kind) => vec![*kind],
            Self::All => CatalogKind::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Located,
    Wiped,
    Streaming,
    Flushed,
    Done,
    Aborted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Located => "located",
            Self::Wiped => "wiped",
            Self::Streaming => "streaming",
            Self::Flushed => "flushed",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Inputs shared by every catalog step of one invocation.
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub file: Option<PathBuf>,
    pub broadcast_variant: BroadcastVariant,
}

/// A catalog step that ended in [`Phase::Aborted`].
#[derive(Debug)]
pub struct CatalogFailure {
    pub kind: CatalogKind,
    /// Last phase reached before the error.
    pub phase: Phase,
    pub error: ImportError,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub completed: Vec<CatalogReport>,
    pub failure: Option<CatalogFailure>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

pub struct Importer<'a> {
    config: &'a SeedConfig,
    permissions: PermissionCatalog,
    store: &'a mut dyn Store,
    sink: &'a mut dyn ReportSink,
}

impl<'a> Importer<'a> {
    /// Snapshots the permission catalog from `config`; later config changes are not seen.
    pub fn new(
        config: &'a SeedConfig,
        store: &'a mut dyn Store,
        sink: &'a mut dyn ReportSink,
    ) -> Self {
        Self {
            config,
            permissions: config.permission_catalog(),
            store,
            sink,
        }
    }

    pub fn run(&mut self, selection: CatalogSelection, request: &ImportRequest) -> RunSummary {
        let mut summary = RunSummary::default();
        for kind in selection.kinds() {
            match self.run_catalog(kind, request) {
                Ok(report) => {
                    self.sink.catalog_done(&report);
                    summary.completed.push(report);
                }
                Err(failure) => {
                    self.sink.catalog_aborted(failure.kind, &failure.error);
                    summary.failure = Some(failure);
                    break;
                }
            }
        }
        summary
    }

    pub fn run_catalog(
        &mut self,
        kind: CatalogKind,
        request: &ImportRequest,
    ) -> Result<CatalogReport, CatalogFailure> {
        let mut phase = Phase::Idle;
        let mut report = CatalogReport::new(kind);
        match self.drive(kind, request, &mut phase, &mut report) {
            Ok(()) => Ok(report),
            Err(error) => {
                debug!(catalog = %kind, from = %phase, to = %Phase::Aborted, "phase change");
                Err(CatalogFailure { kind, phase, error })
            }
        }
    }

    fn drive(
        &mut self,
        kind: CatalogKind,
        request: &ImportRequest,
        phase: &mut Phase,
        report: &mut CatalogReport,
    ) -> Result<(), ImportError> {
        let dir = self.config.catalog_dir(kind);
        let located = locate(
            kind,
            request.file.as_deref(),
            &dir,
            request.broadcast_variant,
        )?;
        for skipped in &located.skipped {
            self.sink.file_skipped(kind, skipped);
        }
        report.skipped_files = located.skipped.clone();
        advance(kind, phase, Phase::Located);

        report.removed = self.store.remove_all(kind)?;
        advance(kind, phase, Phase::Wiped);

        let mut arena = match kind {
            CatalogKind::Tag => TagArena::seed(&mut *self.store, &self.config.locales)?,
            _ => TagArena::default(),
        };
        advance(kind, phase, Phase::Streaming);

        // source id -> new record id, shared by every file of this step
        let mut source_ids = HashMap::new();
        for file in &located.files {
            self.stream_file(kind, file, &mut arena, &mut source_ids, report)?;
        }

        self.store.commit()?;
        advance(kind, phase, Phase::Flushed);

        if kind == CatalogKind::Tag {
            report.reindexed = tree::reindex(&mut *self.store)?;
        }
        advance(kind, phase, Phase::Done);
        Ok(())
    }

    fn stream_file(
        &mut self,
        kind: CatalogKind,
        path: &Path,
        arena: &mut TagArena,
        source_ids: &mut HashMap<String, Uuid>,
        report: &mut CatalogReport,
    ) -> Result<(), ImportError> {
        let mut reader = RowReader::open(path)?;
        let schema = match kind {
            CatalogKind::Tag => RowSchema::Tag(TagHeader::parse(reader.read_header()?, path)?),
            CatalogKind::Broadcast => RowSchema::Broadcast,
            CatalogKind::Role => RowSchema::Role,
            CatalogKind::PermissionProfile => RowSchema::PermissionProfile,
        };
        self.sink.file_found(kind, path);
        report.files.push(path.to_path_buf());

        let mut rows_read = 0u64;
        for item in reader {
            rows_read += 1;
            if rows_read % PROGRESS_EVERY == 0 {
                self.sink.progress(kind, rows_read);
            }

            let row = match item {
                Ok(row) => row,
                Err(ReadIssue::Fatal(err)) => return Err(err),
                Err(ReadIssue::Row { line, error }) => {
                    let ctx = RowContext {
                        kind,
                        file: path,
                        line,
                        source_id: None,
                    };
                    let outcome = RowOutcome::Skipped(error);
                    report.record(&outcome);
                    self.sink.row(&ctx, &outcome);
                    continue;
                }
            };
            if row.is_stray_header() {
                continue;
            }

            let outcome = self.import_row(&schema, &row, arena);
            let ctx = RowContext {
                kind,
                file: path,
                line: row.line,
                source_id: row.source_id(),
            };
            if let (RowOutcome::Persisted { id, .. }, Some(source_id)) = (&outcome, ctx.source_id)
            {
                if let Some(previous) = source_ids.insert(source_id.to_string(), *id) {
                    self.sink.duplicate_source_id(&ctx, previous);
                }
            }
            report.record(&outcome);
            self.sink.row(&ctx, &outcome);
        }
        Ok(())
    }

    /// Builds and persists one row. Every failure is contained in the returned outcome.
    fn import_row(&mut self, schema: &RowSchema, row: &RawRow, arena: &mut TagArena) -> RowOutcome {
        let built = {
            let ctx = BuildContext {
                locales: &self.config.locales,
                permissions: &self.permissions,
                arena: &*arena,
                store: &*self.store,
            };
            schema.build(row, &ctx)
        };
        let record = match built {
            Ok(record) => record,
            Err(err) => return RowOutcome::Skipped(err),
        };

        if let Err(err) = self.store.save(record.clone()) {
            return RowOutcome::Skipped(RowError::Store(err));
        }
        let outcome = RowOutcome::persisted(&record);
        if let Record::Tag(tag) = record {
            arena.register(tag);
        }
        outcome
    }
}

fn advance(kind: CatalogKind, phase: &mut Phase, next: Phase) {
    debug!(catalog = %kind, from = %phase, to = %next, "phase change");
    *phase = next;
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::data::tag::ROOT_CODE;
    use crate::import::report::TracingSink;
    use crate::store::MemoryStore;
    use crate::test_support::unique_temp_dir;

    fn config_for(dir: &Path) -> SeedConfig {
        SeedConfig {
            permissions: vec!["view".into(), "edit".into()],
            ..SeedConfig::default()
        }
        .with_data_dir(Some(dir.to_path_buf()))
    }

    fn write(dir: &Path, kind: CatalogKind, name: &str, contents: &str) -> PathBuf {
        let catalog_dir = dir.join(kind.dir_name());
        fs::create_dir_all(&catalog_dir).expect("catalog dir");
        let path = catalog_dir.join(name);
        fs::write(&path, contents).expect("fixture");
        path
    }

    #[test]
    fn selection_all_runs_in_fixed_order() {
        assert_eq!(
            CatalogSelection::All.kinds(),
            vec![
                CatalogKind::Tag,
                CatalogKind::Broadcast,
                CatalogKind::Role,
                CatalogKind::PermissionProfile
            ]
        );
    }

    #[test]
    fn tag_step_creates_root_once_and_resolves_in_batch_parents() {
        let dir = unique_temp_dir("driver-tags");
        write(
            &dir,
            CatalogKind::Tag,
            "tags.csv",
            "id;cod;tree_parent_cod;metatag;display;name_en\n;A;;0;1;Alpha\n;B;A;0;1;Beta\n",
        );
        let config = config_for(&dir);
        let mut store = MemoryStore::default();
        let mut sink = TracingSink;
        let mut importer = Importer::new(&config, &mut store, &mut sink);

        let report = importer
            .run_catalog(CatalogKind::Tag, &ImportRequest::default())
            .expect("tag step succeeds");
        assert_eq!(report.persisted, 2);
        assert_eq!(report.reindexed, 3);

        assert_eq!(store.count(CatalogKind::Tag), 3);
        let b = store.find_tag_by_code("B").expect("lookup").expect("B");
        assert_eq!(b.parent_code.as_deref(), Some("A"));
        let a = store.find_tag_by_code("A").expect("lookup").expect("A");
        assert_eq!(a.parent_code.as_deref(), Some(ROOT_CODE));
        assert!(a.is_ancestor_of(&b));
        // root commit, flush, reindex commit
        assert_eq!(store.commits(), 3);
    }

    #[test]
    fn malformed_rows_are_skipped_without_stopping_the_file() {
        let dir = unique_temp_dir("driver-roles");
        write(
            &dir,
            CatalogKind::Role,
            "roles.csv",
            "id;cod;xml;display;name_es;name_gl;name_en\n\
             1;actor;ACT;1;Actor;Actor;Actor\n\
             2;broken;row\n\
             3;pres;PRE;1;Presentador;Presentador;Presenter\n",
        );
        let config = config_for(&dir);
        let mut store = MemoryStore::default();
        let mut sink = TracingSink;
        let mut importer = Importer::new(&config, &mut store, &mut sink);

        let report = importer
            .run_catalog(CatalogKind::Role, &ImportRequest::default())
            .expect("role step succeeds");
        assert_eq!(report.persisted, 2);
        assert_eq!(report.malformed, 1);
        assert_eq!(store.count(CatalogKind::Role), 2);
        assert_eq!(store.commits(), 1);
    }

    #[derive(Default)]
    struct RecordingSink {
        duplicate_source_ids: Vec<(String, u64)>,
        progress: Vec<u64>,
    }

    impl ReportSink for RecordingSink {
        fn file_found(&mut self, _kind: CatalogKind, _path: &Path) {}
        fn file_skipped(&mut self, _kind: CatalogKind, _path: &Path) {}
        fn row(&mut self, _ctx: &RowContext<'_>, _outcome: &RowOutcome) {}

        fn progress(&mut self, _kind: CatalogKind, rows: u64) {
            self.progress.push(rows);
        }

        fn duplicate_source_id(&mut self, ctx: &RowContext<'_>, _previous: Uuid) {
            self.duplicate_source_ids
                .push((ctx.source_id.unwrap_or_default().to_string(), ctx.line));
        }

        fn catalog_done(&mut self, _report: &CatalogReport) {}
        fn catalog_aborted(&mut self, _kind: CatalogKind, _err: &ImportError) {}
    }

    #[test]
    fn repeated_source_ids_across_files_warn_but_still_import() {
        let dir = unique_temp_dir("driver-source-ids");
        write(
            &dir,
            CatalogKind::Role,
            "a_roles.csv",
            "1;actor;ACT;1;Actor;Actor;Actor\n2;pres;PRE;1;Presentador;Presentador;Presenter\n",
        );
        write(
            &dir,
            CatalogKind::Role,
            "b_roles.csv",
            "3;dir;DIR;1;Director;Director;Director\n1;owner;OWN;0;Propietario;Propietario;Owner\n",
        );
        let config = config_for(&dir);
        let mut store = MemoryStore::default();
        let mut sink = RecordingSink::default();
        let report = Importer::new(&config, &mut store, &mut sink)
            .run_catalog(CatalogKind::Role, &ImportRequest::default())
            .expect("role step succeeds");

        assert_eq!(report.persisted, 4);
        assert_eq!(store.count(CatalogKind::Role), 4);
        assert_eq!(sink.duplicate_source_ids, vec![("1".to_string(), 2)]);
    }

    #[test]
    fn progress_is_reported_every_hundred_rows() {
        let dir = unique_temp_dir("driver-progress");
        let rows: String = (1..=250)
            .map(|id| format!("{id};r{id};X;1;Rol;Rol;Role\n"))
            .collect();
        write(&dir, CatalogKind::Role, "roles.csv", &rows);
        let config = config_for(&dir);
        let mut store = MemoryStore::default();
        let mut sink = RecordingSink::default();
        Importer::new(&config, &mut store, &mut sink)
            .run_catalog(CatalogKind::Role, &ImportRequest::default())
            .expect("role step succeeds");

        assert_eq!(sink.progress, vec![100, 200]);
        assert!(sink.duplicate_source_ids.is_empty());
    }

    #[test]
    fn missing_header_columns_abort_the_step_after_wipe() {
        let dir = unique_temp_dir("driver-bad-header");
        write(&dir, CatalogKind::Tag, "tags.csv", "cod;name_en\nA;Alpha\n");
        let config = config_for(&dir);
        let mut store = MemoryStore::default();
        let mut sink = TracingSink;
        let mut importer = Importer::new(&config, &mut store, &mut sink);

        let failure = importer
            .run_catalog(CatalogKind::Tag, &ImportRequest::default())
            .expect_err("header is incomplete");
        assert_eq!(failure.phase, Phase::Streaming);
        assert!(matches!(
            failure.error,
            ImportError::MissingRequiredColumns { .. }
        ));
    }

    #[test]
    fn all_stops_at_first_failed_catalog() {
        let dir = unique_temp_dir("driver-all");
        write(
            &dir,
            CatalogKind::Tag,
            "tags.csv",
            "cod;tree_parent_cod;metatag;display;name_en\nA;;0;1;Alpha\n",
        );
        // no broadcasts directory
        write(&dir, CatalogKind::Role, "roles.csv", "1;actor;ACT;1;Actor;Actor;Actor\n");
        let config = config_for(&dir);
        let mut store = MemoryStore::default();
        let mut sink = TracingSink;
        let mut importer = Importer::new(&config, &mut store, &mut sink);

        let summary = importer.run(CatalogSelection::All, &ImportRequest::default());
        assert!(!summary.is_success());
        assert_eq!(summary.completed.len(), 1);
        let failure = summary.failure.expect("broadcast step fails");
        assert_eq!(failure.kind, CatalogKind::Broadcast);
        assert_eq!(failure.phase, Phase::Idle);
        assert_eq!(store.count(CatalogKind::Tag), 2);
        assert_eq!(store.count(CatalogKind::Role), 0);
    }
}
