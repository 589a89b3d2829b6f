//! File-backed store: one pretty-printed JSON array per catalog.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::data::{CatalogKind, Record, Tag};
use crate::error::StoreError;
use crate::store::{Collections, Store};

/// Writes are staged in memory and reach disk on [`Store::commit`], which rewrites every
/// catalog touched since the previous commit.
#[derive(Debug)]
pub struct JsonStore {
    dir: PathBuf,
    collections: Collections,
    dirty: BTreeSet<CatalogKind>,
}

impl JsonStore {
    /// Opens the store directory, loading any catalog files already present.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        let mut collections = Collections::default();
        for kind in CatalogKind::ALL {
            let path = catalog_path(&dir, kind);
            if !path.exists() {
                continue;
            }
            let raw = fs::read_to_string(&path)?;
            let records: Vec<Record> = serde_json::from_str(&raw)
                .map_err(|source| StoreError::Corrupt { path: path.clone(), source })?;
            debug!(path = %path.display(), records = records.len(), "loaded catalog file");
            collections.replace(kind, records);
        }
        Ok(Self {
            dir,
            collections,
            dirty: BTreeSet::new(),
        })
    }

    pub fn catalog_path(&self, kind: CatalogKind) -> PathBuf {
        catalog_path(&self.dir, kind)
    }
}

fn catalog_path(dir: &Path, kind: CatalogKind) -> PathBuf {
    let file = match kind {
        CatalogKind::Tag => "tags.json",
        CatalogKind::Broadcast => "broadcasts.json",
        CatalogKind::Role => "roles.json",
        CatalogKind::PermissionProfile => "permission_profiles.json",
    };
    dir.join(file)
}

impl Store for JsonStore {
    fn save(&mut self, record: Record) -> Result<(), StoreError> {
        self.dirty.insert(record.kind());
        self.collections.upsert(record);
        Ok(())
    }

    fn find_tag_by_code(&self, code: &str) -> Result<Option<Tag>, StoreError> {
        Ok(self.collections.find_tag(code))
    }

    fn load_all(&self, kind: CatalogKind) -> Result<Vec<Record>, StoreError> {
        Ok(self.collections.of(kind).to_vec())
    }

    fn remove_all(&mut self, kind: CatalogKind) -> Result<usize, StoreError> {
        self.dirty.insert(kind);
        Ok(self.collections.clear(kind))
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if self.dirty.is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir)?;
        for kind in std::mem::take(&mut self.dirty) {
            let path = catalog_path(&self.dir, kind);
            let serialized = serde_json::to_string_pretty(self.collections.of(kind))?;
            fs::write(&path, serialized)?;
            debug!(path = %path.display(), "wrote catalog file");
        }
        Ok(())
    }
}
