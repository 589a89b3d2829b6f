use crate::data::{CatalogKind, Record, Tag};
use crate::error::StoreError;
use crate::store::{Collections, Store};

/// Process-local store. Commits are counted but otherwise no-ops.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Collections,
    commits: usize,
}

impl MemoryStore {
    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn count(&self, kind: CatalogKind) -> usize {
        self.collections.of(kind).len()
    }
}

impl Store for MemoryStore {
    fn save(&mut self, record: Record) -> Result<(), StoreError> {
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
        Ok(self.collections.clear(kind))
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.commits += 1;
        Ok(())
    }
}
