//! Product slice: normalized records plus search/filter state

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::stamp;
use crate::error::ApiError;
use crate::types::{ProductId, ProductPatch, ProductRecord};

/// Presentation filters applied by the filtered-products view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductFilters {
    /// Inclusive (min, max) price
    pub price_range: (f64, f64),
    /// Empty means every category
    pub categories: Vec<String>,
    pub min_rating: Option<f32>,
}

impl Default for ProductFilters {
    fn default() -> Self {
        Self {
            price_range: (0.0, 1000.0),
            categories: Vec::new(),
            min_rating: None,
        }
    }
}

impl ProductFilters {
    pub fn accepts(&self, product: &ProductRecord) -> bool {
        let (min, max) = self.price_range;
        if product.price < min || product.price > max {
            return false;
        }
        if !self.categories.is_empty() && !self.categories.iter().any(|c| c == &product.category) {
            return false;
        }
        match (self.min_rating, product.rating) {
            (Some(min), Some(rating)) => rating >= min,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProductsState {
    by_id: HashMap<ProductId, ProductRecord>,
    /// Load order, used by list views
    all_ids: Vec<ProductId>,
    featured_ids: Vec<ProductId>,
    search_term: String,
    filters: ProductFilters,
    loading: bool,
    error: Option<ApiError>,
    revision: u64,
}

impl ProductsState {
    pub fn get(&self, id: &str) -> Option<&ProductRecord> {
        self.by_id.get(id)
    }

    pub fn by_id(&self) -> &HashMap<ProductId, ProductRecord> {
        &self.by_id
    }

    pub fn all_ids(&self) -> &[ProductId] {
        &self.all_ids
    }

    pub fn featured_ids(&self) -> &[ProductId] {
        &self.featured_ids
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Last fetch failure, cleared by the next fetch
    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn filters(&self) -> &ProductFilters {
        &self.filters
    }

    /// Bumped on every change; views memoize on it
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Records in load order
    pub fn iter(&self) -> impl Iterator<Item = &ProductRecord> {
        self.all_ids.iter().filter_map(|id| self.by_id.get(id))
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

    /// A single-record edit was rejected; records keep their current values
    pub(crate) fn set_error(&mut self, error: ApiError) {
        self.error = Some(error);
        self.touch();
    }

    /// Bulk replace: nothing from the previous map survives
    pub(crate) fn replace_all(&mut self, products: Vec<ProductRecord>, now: u64) {
        self.loading = false;
        self.by_id.clear();
        self.all_ids.clear();
        self.featured_ids.clear();

        for mut product in products {
            product.last_updated = now;
            if !self.by_id.contains_key(&product.id) {
                self.all_ids.push(product.id.clone());
            }
            self.by_id.insert(product.id.clone(), product);
        }
        self.rebuild_featured();
        self.touch();
    }

    /// Delta merge: shallow-merge into an existing record, else insert
    pub(crate) fn merge(&mut self, patch: &ProductPatch, now: u64) {
        match self.by_id.get_mut(&patch.id) {
            Some(record) => {
                patch.apply_to(record);
                record.last_updated = stamp(record.last_updated, now);
            }
            None => {
                let mut record = patch.to_record();
                record.last_updated = now;
                self.all_ids.push(record.id.clone());
                self.by_id.insert(record.id.clone(), record);
            }
        }
        if patch.is_featured.is_some() {
            self.rebuild_featured();
        }
        self.touch();
    }

    /// Insert a server-confirmed new record
    pub(crate) fn insert(&mut self, mut record: ProductRecord, now: u64) {
        let previous = self.by_id.get(&record.id).map(|r| r.last_updated).unwrap_or(0);
        record.last_updated = stamp(previous, now);
        if !self.by_id.contains_key(&record.id) {
            self.all_ids.push(record.id.clone());
        }
        self.by_id.insert(record.id.clone(), record);
        self.rebuild_featured();
        self.touch();
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<ProductRecord> {
        let removed = self.by_id.remove(id);
        if removed.is_some() {
            self.all_ids.retain(|existing| existing != id);
            self.featured_ids.retain(|existing| existing != id);
            self.touch();
        }
        removed
    }

    pub(crate) fn clear(&mut self) {
        self.by_id.clear();
        self.all_ids.clear();
        self.featured_ids.clear();
        self.loading = false;
        self.error = None;
        self.touch();
    }

    pub(crate) fn set_search_term(&mut self, term: &str) {
        self.search_term = term.trim().to_lowercase();
        self.touch();
    }

    pub(crate) fn set_filters(&mut self, filters: ProductFilters) {
        self.filters = filters;
        self.touch();
    }

    fn rebuild_featured(&mut self) {
        self.featured_ids = self
            .all_ids
            .iter()
            .filter(|id| self.by_id.get(*id).map(|p| p.is_featured).unwrap_or(false))
            .cloned()
            .collect();
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

/// Case-insensitive match over name, description, category and brand.
/// `term` must already be lowercased.
pub fn matches_search(product: &ProductRecord, term: &str) -> bool {
    [
        &product.name,
        &product.description,
        &product.category,
        &product.brand,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(term))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, price: f64) -> ProductRecord {
        ProductRecord {
            id: id.into(),
            name: format!("Product {}", id),
            price,
            category: "Electronics".into(),
            brand: "Acme".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_replace_all_drops_previous_keys() {
        let mut state = ProductsState::default();
        state.replace_all(vec![product("a1", 1.0), product("a2", 2.0)], 10);
        state.replace_all(vec![product("b1", 3.0)], 20);

        assert_eq!(state.len(), 1);
        assert!(state.get("a1").is_none());
        assert_eq!(state.all_ids(), &["b1".to_string()]);
        assert_eq!(state.get("b1").unwrap().last_updated, 20);
    }

    #[test]
    fn test_merge_inserts_unknown_and_merges_known() {
        let mut state = ProductsState::default();
        state.replace_all(vec![product("p1", 10.0)], 100);

        state.merge(&ProductPatch::new("p1").with_price(12.0), 200);
        state.merge(&ProductPatch::new("p2").with_name("New"), 300);

        let p1 = state.get("p1").unwrap();
        assert_eq!(p1.price, 12.0);
        assert_eq!(p1.name, "Product p1");
        assert_eq!(p1.last_updated, 200);
        assert_eq!(state.get("p2").unwrap().name, "New");
        assert_eq!(state.all_ids().len(), 2);
    }

    #[test]
    fn test_last_updated_never_goes_backwards() {
        let mut state = ProductsState::default();
        state.replace_all(vec![product("p1", 10.0)], 500);
        state.merge(&ProductPatch::new("p1").with_price(9.0), 400);
        assert_eq!(state.get("p1").unwrap().last_updated, 500);
    }

    #[test]
    fn test_featured_ids_follow_records() {
        let mut state = ProductsState::default();
        let mut featured = product("p1", 1.0);
        featured.is_featured = true;
        state.replace_all(vec![featured, product("p2", 2.0)], 1);
        assert_eq!(state.featured_ids(), &["p1".to_string()]);

        state.remove("p1");
        assert!(state.featured_ids().is_empty());
    }

    #[test]
    fn test_filters() {
        let filters = ProductFilters {
            price_range: (5.0, 50.0),
            categories: vec!["Electronics".into()],
            min_rating: None,
        };
        assert!(filters.accepts(&product("p1", 10.0)));
        assert!(!filters.accepts(&product("p2", 60.0)));
    }

    #[test]
    fn test_search_matching() {
        let p = product("p1", 1.0);
        assert!(matches_search(&p, "acme"));
        assert!(matches_search(&p, "electr"));
        assert!(!matches_search(&p, "kitchen"));
    }
}
