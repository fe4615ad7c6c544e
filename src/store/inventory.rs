//! Inventory slice: stock records keyed by product id

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use super::stamp;
use crate::error::ApiError;
use crate::types::{InventoryPatch, InventoryRecord, ProductId};

#[derive(Debug, Clone, Default)]
pub struct InventoryState {
    by_product_id: HashMap<ProductId, InventoryRecord>,
    loading: bool,
    error: Option<ApiError>,
    /// Time of the last bulk fetch or pushed batch
    last_synced: Option<u64>,
    revision: u64,
}

impl InventoryState {
    pub fn get(&self, product_id: &str) -> Option<&InventoryRecord> {
        self.by_product_id.get(product_id)
    }

    pub fn by_product_id(&self) -> &HashMap<ProductId, InventoryRecord> {
        &self.by_product_id
    }

    pub fn len(&self) -> usize {
        self.by_product_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_product_id.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub fn last_synced(&self) -> Option<u64> {
        self.last_synced
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    // === Mutations (dispatcher only) ===

    pub(crate) fn begin_fetch(&mut self) {
        self.loading = true;
        self.error = None;
        self.touch();
    }

    pub(crate) fn fetch_failed(&mut self, error: ApiError) {
        self.loading = false;
        self.error = Some(error);
        self.touch();
    }

    /// Record that an update was rejected; the optimistic value stays in place
    pub(crate) fn update_failed(&mut self, error: ApiError) {
        self.error = Some(error);
        self.touch();
    }

    /// Bulk replace of the whole map
    pub(crate) fn replace_all(&mut self, records: Vec<InventoryRecord>, now: u64) {
        self.loading = false;
        self.by_product_id.clear();
        for mut record in records {
            record.last_updated = now;
            self.by_product_id.insert(record.product_id.clone(), record);
        }
        self.last_synced = Some(now);
        self.touch();
    }

    /// Delta merge of one record
    pub(crate) fn merge(&mut self, patch: &InventoryPatch, default_threshold: u32, now: u64) {
        self.merge_one(patch, default_threshold, now);
        self.touch();
    }

    /// Delta merge of a pushed batch, applied in batch order
    pub(crate) fn merge_batch(&mut self, patches: &[InventoryPatch], default_threshold: u32, now: u64) {
        for patch in patches {
            self.merge_one(patch, default_threshold, now);
        }
        self.last_synced = Some(now);
        self.touch();
    }

    pub(crate) fn clear(&mut self) {
        self.by_product_id.clear();
        self.last_synced = None;
        self.loading = false;
        self.error = None;
        self.touch();
    }

    fn merge_one(&mut self, patch: &InventoryPatch, default_threshold: u32, now: u64) {
        let record = match self.by_product_id.entry(patch.product_id.clone()) {
            Entry::Occupied(entry) => {
                let record = entry.into_mut();
                patch.apply_to(record);
                record
            }
            Entry::Vacant(entry) => entry.insert(patch.to_record(default_threshold)),
        };
        record.last_updated = stamp(record.last_updated, now);
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}
