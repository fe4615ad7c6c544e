//! Derived read-only views over the local store
//!
//! Views are memoized on the revisions of the slices they read, so repeated
//! reads between changes return the same `Arc` without recomputing.

mod batches;

pub use batches::{Batch, CancelHandle, RenderBatches};

use std::cell::RefCell;
use std::sync::Arc;

use serde::Serialize;

use crate::offline::{Operation, OperationQueue};
use crate::store::{matches_search, LocalStore};
use crate::types::{InventoryRecord, ProductRecord};

/// A product merged with its stock record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: ProductRecord,
    pub inventory: InventoryRecord,
}

impl ProductView {
    pub fn id(&self) -> &str {
        &self.product.id
    }

    pub fn is_low_stock(&self) -> bool {
        self.inventory.is_low_stock()
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.inventory.is_out_of_stock()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryMetrics {
    pub total_items: usize,
    pub low_stock_items: usize,
    pub out_of_stock_items: usize,
    pub in_stock_items: usize,
}

/// Single-slot cache keyed by source revisions
struct Memo<K, V> {
    slot: RefCell<Option<(K, Arc<V>)>>,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self {
            slot: RefCell::new(None),
        }
    }
}

impl<K: PartialEq + Copy, V> Memo<K, V> {
    fn get_or_compute(&self, key: K, compute: impl FnOnce() -> V) -> Arc<V> {
        if let Some((cached, value)) = &*self.slot.borrow() {
            if *cached == key {
                return Arc::clone(value);
            }
        }
        let value = Arc::new(compute());
        *self.slot.borrow_mut() = Some((key, Arc::clone(&value)));
        value
    }
}

/// Memo slots owned by the engine
#[derive(Default)]
pub struct ViewCache {
    with_inventory: Memo<(u64, u64), Vec<ProductView>>,
    low_stock: Memo<(u64, u64), Vec<ProductView>>,
    out_of_stock: Memo<(u64, u64), Vec<ProductView>>,
    metrics: Memo<u64, InventoryMetrics>,
    pending: Memo<u64, Vec<Operation>>,
    search: Memo<u64, Vec<ProductRecord>>,
    filtered: Memo<u64, Vec<ProductRecord>>,
}

impl std::fmt::Debug for ViewCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewCache").finish_non_exhaustive()
    }
}

/// Borrowed view set, obtained from `SyncEngine::views`
pub struct Views<'a> {
    store: &'a LocalStore,
    queue: &'a OperationQueue,
    cache: &'a ViewCache,
    default_threshold: u32,
    batch_size: usize,
}

impl<'a> Views<'a> {
    pub(crate) fn new(
        store: &'a LocalStore,
        queue: &'a OperationQueue,
        cache: &'a ViewCache,
        default_threshold: u32,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            queue,
            cache,
            default_threshold,
            batch_size,
        }
    }

    fn catalog_key(&self) -> (u64, u64) {
        (self.store.products().revision(), self.store.inventory().revision())
    }

    /// Every loaded product in load order, with a zeroed stock record when
    /// none is known
    pub fn products_with_inventory(&self) -> Arc<Vec<ProductView>> {
        self.cache.with_inventory.get_or_compute(self.catalog_key(), || {
            let inventory = self.store.inventory();
            self.store
                .products()
                .iter()
                .map(|product| ProductView {
                    inventory: inventory
                        .get(&product.id)
                        .cloned()
                        .unwrap_or_else(|| InventoryRecord::empty(product.id.clone(), self.default_threshold)),
                    product: product.clone(),
                })
                .collect()
        })
    }

    /// In stock but at or under the threshold
    pub fn low_stock_products(&self) -> Arc<Vec<ProductView>> {
        self.cache.low_stock.get_or_compute(self.catalog_key(), || {
            self.products_with_inventory()
                .iter()
                .filter(|view| view.is_low_stock())
                .cloned()
                .collect()
        })
    }

    pub fn out_of_stock_products(&self) -> Arc<Vec<ProductView>> {
        self.cache.out_of_stock.get_or_compute(self.catalog_key(), || {
            self.products_with_inventory()
                .iter()
                .filter(|view| view.is_out_of_stock())
                .cloned()
                .collect()
        })
    }

    /// Counts over inventory records
    pub fn inventory_metrics(&self) -> Arc<InventoryMetrics> {
        let inventory = self.store.inventory();
        self.cache.metrics.get_or_compute(inventory.revision(), || {
            let mut metrics = InventoryMetrics::default();
            for record in inventory.by_product_id().values() {
                metrics.total_items += 1;
                if record.is_out_of_stock() {
                    metrics.out_of_stock_items += 1;
                } else if record.is_low_stock() {
                    metrics.low_stock_items += 1;
                }
            }
            metrics.in_stock_items = metrics.total_items - metrics.out_of_stock_items;
            metrics
        })
    }

    /// Operations still awaiting replay, oldest first
    pub fn pending_operations(&self) -> Arc<Vec<Operation>> {
        self.cache
            .pending
            .get_or_compute(self.queue.revision(), || self.queue.pending().cloned().collect())
    }

    /// Products matching the current search term; all of them when empty
    pub fn search_results(&self) -> Arc<Vec<ProductRecord>> {
        let products = self.store.products();
        self.cache.search.get_or_compute(products.revision(), || {
            let term = products.search_term();
            products
                .iter()
                .filter(|product| term.is_empty() || matches_search(product, term))
                .cloned()
                .collect()
        })
    }

    /// Search results narrowed by the active filters
    pub fn filtered_products(&self) -> Arc<Vec<ProductRecord>> {
        let products = self.store.products();
        self.cache.filtered.get_or_compute(products.revision(), || {
            let filters = products.filters();
            self.search_results()
                .iter()
                .filter(|product| filters.accepts(product))
                .cloned()
                .collect()
        })
    }

    /// Lazy batches of the merged product list for incremental rendering
    pub fn render_batches(&self) -> RenderBatches<ProductView> {
        RenderBatches::new(self.products_with_inventory(), self.batch_size)
    }

    pub fn render_batches_of(&self, batch_size: usize) -> RenderBatches<ProductView> {
        RenderBatches::new(self.products_with_inventory(), batch_size)
    }
}
