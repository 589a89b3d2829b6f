//! Tag tree assembly.
//!
//! [`TagArena`] is the run-scoped code -> tag map that lets a row reference a parent created
//! earlier in the same batch. [`assign_nested_set`] is the separate reindexing pass that fills
//! `left`/`right`/`level`/`root_code` once the whole catalog has been written.

use std::collections::{HashMap, HashSet};

use crate::data::tag::ROOT_CODE;
use crate::data::{CatalogKind, Record, Tag};
use crate::error::StoreError;
use crate::store::Store;

#[derive(Debug, Default)]
pub struct TagArena {
    root: Option<Tag>,
    by_code: HashMap<String, Tag>,
}

impl TagArena {
    /// Creates the synthetic root, persists and commits it, and seeds the arena with it.
    pub fn seed(store: &mut dyn Store, locales: &[String]) -> Result<Self, StoreError> {
        let root = Tag::root(locales);
        store.save(Record::Tag(root.clone()))?;
        store.commit()?;
        let mut arena = Self::default();
        arena.by_code.insert(root.code.clone(), root.clone());
        arena.root = Some(root);
        Ok(arena)
    }

    pub fn root(&self) -> Option<&Tag> {
        self.root.as_ref()
    }

    pub fn get(&self, code: &str) -> Option<&Tag> {
        self.by_code.get(code)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    pub fn register(&mut self, tag: Tag) {
        self.by_code.insert(tag.code.clone(), tag);
    }

    /// Resolves a declared parent code: arena first, then the store, then the root.
    pub fn resolve_parent(
        &self,
        declared: &str,
        store: &dyn Store,
    ) -> Result<Option<String>, StoreError> {
        if !declared.is_empty() {
            if let Some(parent) = self.by_code.get(declared) {
                return Ok(Some(parent.code.clone()));
            }
            if let Some(parent) = store.find_tag_by_code(declared)? {
                return Ok(Some(parent.code));
            }
        }
        Ok(self.root.as_ref().map(|root| root.code.clone()))
    }
}

/// Assigns nested-set coordinates to every tag.
///
/// Tags whose parent is absent or unknown start their own tree. Children are visited in slice
/// order, counters restart at 1 for each tree and tree tops sit at level 0.
pub fn assign_nested_set(tags: &mut [Tag]) {
    let position: HashMap<String, usize> = tags
        .iter()
        .enumerate()
        .map(|(index, tag)| (tag.code.clone(), index))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); tags.len()];
    let mut tops = Vec::new();
    for (index, tag) in tags.iter().enumerate() {
        match tag
            .parent_code
            .as_deref()
            .and_then(|code| position.get(code))
        {
            Some(&parent) if parent != index => children[parent].push(index),
            _ => tops.push(index),
        }
    }

    // Synthetic root first so its tree is numbered before any stray tops.
    tops.sort_by_key(|&index| tags[index].code != ROOT_CODE);

    let mut visited = HashSet::new();
    for top in tops {
        let root_code = tags[top].code.clone();
        number_tree(tags, &children, top, &root_code, &mut visited);
    }
}

/// Depth-first numbering of the tree under `top`. Uses an explicit `(index, next child)` stack;
/// tag chains can be far deeper than the thread stack allows.
fn number_tree(
    tags: &mut [Tag],
    children: &[Vec<usize>],
    top: usize,
    root_code: &str,
    visited: &mut HashSet<usize>,
) {
    if !visited.insert(top) {
        return;
    }
    let mut counter = 1u32;
    enter(&mut tags[top], 0, root_code, &mut counter);
    let mut stack: Vec<(usize, usize)> = vec![(top, 0)];

    while let Some(frame) = stack.last_mut() {
        let (index, cursor) = *frame;
        frame.1 += 1;
        match children[index].get(cursor) {
            Some(&child) => {
                if visited.insert(child) {
                    let level = tags[index].level + 1;
                    enter(&mut tags[child], level, root_code, &mut counter);
                    stack.push((child, 0));
                }
            }
            None => {
                tags[index].right = counter;
                counter += 1;
                stack.pop();
            }
        }
    }
}

fn enter(tag: &mut Tag, level: u32, root_code: &str, counter: &mut u32) {
    tag.left = *counter;
    tag.level = level;
    tag.root_code = Some(root_code.to_string());
    *counter += 1;
}

/// Reindex pass over the stored tag catalog: load, assign coordinates, save, commit.
pub fn reindex(store: &mut dyn Store) -> Result<usize, StoreError> {
    let mut tags: Vec<Tag> = store
        .load_all(CatalogKind::Tag)?
        .into_iter()
        .filter_map(|record| match record {
            Record::Tag(tag) => Some(tag),
            _ => None,
        })
        .collect();

    assign_nested_set(&mut tags);
    let count = tags.len();
    for tag in tags {
        store.save(Record::Tag(tag))?;
    }
    store.commit()?;
    Ok(count)
}
