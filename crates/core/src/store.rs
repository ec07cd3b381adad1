//! Authoritative per-page annotation collection.

use crate::error::StoreError;
use doc_model::{AnnotationId, AnnotationPatch, AnnotationRecord, FlatAnnotation, PageAnnotations};
use std::collections::{BTreeMap, HashMap};

/// Annotation records keyed by 1-based page, in z-order within each page.
///
/// Pages with no records are never kept, and ids are unique across all pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationStore {
    pages: BTreeMap<u32, Vec<AnnotationRecord>>,
    index: HashMap<AnnotationId, u32>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a snapshot, assigning ids to records that lack one.
    pub fn from_snapshot(snapshot: &PageAnnotations) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for flat in snapshot.flatten() {
            store.add(flat.page, flat.record)?;
        }
        Ok(store)
    }

    /// Appends `record` on top of `page`, assigning an id if it has none.
    pub fn add(
        &mut self,
        page: u32,
        record: AnnotationRecord,
    ) -> Result<AnnotationRecord, StoreError> {
        let position = self.pages.get(&page).map_or(0, Vec::len);
        self.insert_at(page, position, record)
    }

    /// Inserts at a z-order position; positions past the end append.
    pub fn insert_at(
        &mut self,
        page: u32,
        position: usize,
        mut record: AnnotationRecord,
    ) -> Result<AnnotationRecord, StoreError> {
        if page == 0 {
            return Err(StoreError::InvalidPage);
        }
        if record.id.is_empty() {
            record.id = AnnotationId::generate();
        }
        if self.index.contains_key(&record.id) {
            return Err(StoreError::DuplicateId(record.id));
        }

        let records = self.pages.entry(page).or_default();
        let position = position.min(records.len());
        records.insert(position, record.clone());
        self.index.insert(record.id.clone(), page);
        Ok(record)
    }

    /// Removes a record, returning its former z-order position and contents.
    pub fn remove(&mut self, page: u32, id: &AnnotationId) -> Option<(usize, AnnotationRecord)> {
        let records = self.pages.get_mut(&page)?;
        let position = records.iter().position(|record| &record.id == id)?;
        let record = records.remove(position);
        if records.is_empty() {
            self.pages.remove(&page);
        }
        self.index.remove(id);
        Some((position, record))
    }

    /// Merges `patch` into the record; `None` when the record does not exist.
    pub fn update(
        &mut self,
        page: u32,
        id: &AnnotationId,
        patch: &AnnotationPatch,
    ) -> Option<&AnnotationRecord> {
        let record = self.get_mut(page, id)?;
        patch.apply(record);
        Some(record)
    }

    /// Swaps in a record with the same id, returning the previous version.
    pub fn replace(&mut self, page: u32, record: AnnotationRecord) -> Option<AnnotationRecord> {
        let slot = self.get_mut(page, &record.id)?;
        Some(std::mem::replace(slot, record))
    }

    pub fn get(&self, page: u32, id: &AnnotationId) -> Option<&AnnotationRecord> {
        self.pages.get(&page)?.iter().find(|record| &record.id == id)
    }

    fn get_mut(&mut self, page: u32, id: &AnnotationId) -> Option<&mut AnnotationRecord> {
        self.pages.get_mut(&page)?.iter_mut().find(|record| &record.id == id)
    }

    pub fn position(&self, page: u32, id: &AnnotationId) -> Option<usize> {
        self.pages.get(&page)?.iter().position(|record| &record.id == id)
    }

    pub fn page_of(&self, id: &AnnotationId) -> Option<u32> {
        self.index.get(id).copied()
    }

    pub fn contains_id(&self, id: &AnnotationId) -> bool {
        self.index.contains_key(id)
    }

    pub fn page(&self, page: u32) -> &[AnnotationRecord] {
        self.pages.get(&page).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages.keys().copied()
    }

    pub fn clear_page(&mut self, page: u32) -> Vec<AnnotationRecord> {
        let records = self.pages.remove(&page).unwrap_or_default();
        for record in &records {
            self.index.remove(&record.id);
        }
        records
    }

    pub fn clear_all(&mut self) {
        self.pages.clear();
        self.index.clear();
    }

    pub fn count(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Ascending page, then z-order, each tagged with its page.
    pub fn flat_list(&self) -> Vec<FlatAnnotation> {
        self.snapshot().flatten()
    }

    pub fn snapshot(&self) -> PageAnnotations {
        PageAnnotations(self.pages.clone())
    }
}
