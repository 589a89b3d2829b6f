//! Persistence boundary for seeded records.
//!
//! The pipeline only needs a handful of primitives: upsert a record, look a tag up by code,
//! wipe a catalog, list a catalog and commit. Writes made between two commits are not
//! isolated from readers of the same store.

use std::collections::HashMap;

use uuid::Uuid;

use crate::data::{CatalogKind, Record, Tag};
use crate::error::StoreError;

mod json;
mod memory;

pub use json::JsonStore;
pub use memory::MemoryStore;

pub trait Store {
    /// Inserts the record, or replaces the stored record with the same id.
    fn save(&mut self, record: Record) -> Result<(), StoreError>;

    fn find_tag_by_code(&self, code: &str) -> Result<Option<Tag>, StoreError>;

    /// Every record of one catalog, in insertion order.
    fn load_all(&self, kind: CatalogKind) -> Result<Vec<Record>, StoreError>;

    /// Removes every record of one catalog. Returns how many were removed.
    fn remove_all(&mut self, kind: CatalogKind) -> Result<usize, StoreError>;

    fn commit(&mut self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default)]
struct Catalog {
    records: Vec<Record>,
    by_id: HashMap<Uuid, usize>,
}

/// In-memory record collections shared by both store implementations, indexed by record id
/// and by tag code.
#[derive(Debug, Clone, Default)]
pub(crate) struct Collections {
    tags: Catalog,
    broadcasts: Catalog,
    roles: Catalog,
    permission_profiles: Catalog,
    tag_codes: HashMap<String, usize>,
}

impl Collections {
    fn catalog(&self, kind: CatalogKind) -> &Catalog {
        match kind {
            CatalogKind::Tag => &self.tags,
            CatalogKind::Broadcast => &self.broadcasts,
            CatalogKind::Role => &self.roles,
            CatalogKind::PermissionProfile => &self.permission_profiles,
        }
    }

    fn catalog_mut(&mut self, kind: CatalogKind) -> &mut Catalog {
        match kind {
            CatalogKind::Tag => &mut self.tags,
            CatalogKind::Broadcast => &mut self.broadcasts,
            CatalogKind::Role => &mut self.roles,
            CatalogKind::PermissionProfile => &mut self.permission_profiles,
        }
    }

    /// Records of one catalog, in insertion order.
    pub(crate) fn of(&self, kind: CatalogKind) -> &[Record] {
        &self.catalog(kind).records
    }

    pub(crate) fn replace(&mut self, kind: CatalogKind, records: Vec<Record>) {
        self.clear(kind);
        for record in records {
            self.upsert(record);
        }
    }

    pub(crate) fn upsert(&mut self, record: Record) {
        let id = record.id();
        let code = match &record {
            Record::Tag(tag) => Some(tag.code.clone()),
            _ => None,
        };
        let catalog = self.catalog_mut(record.kind());
        let position = match catalog.by_id.get(&id) {
            Some(&position) => {
                catalog.records[position] = record;
                position
            }
            None => {
                let position = catalog.records.len();
                catalog.records.push(record);
                catalog.by_id.insert(id, position);
                position
            }
        };
        if let Some(code) = code {
            self.tag_codes.insert(code, position);
        }
    }

    pub(crate) fn find_tag(&self, code: &str) -> Option<Tag> {
        let position = *self.tag_codes.get(code)?;
        match self.tags.records.get(position) {
            // a re-saved tag may have changed code, leaving a stale entry behind
            Some(Record::Tag(tag)) if tag.code == code => Some(tag.clone()),
            _ => None,
        }
    }

    pub(crate) fn clear(&mut self, kind: CatalogKind) -> usize {
        if kind == CatalogKind::Tag {
            self.tag_codes.clear();
        }
        let catalog = self.catalog_mut(kind);
        let removed = catalog.records.len();
        catalog.records.clear();
        catalog.by_id.clear();
        removed
    }
}
