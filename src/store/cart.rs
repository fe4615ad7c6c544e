//! Cart slice
//!
//! `total` and `count` are recomputed from the lines after every change so
//! they always equal Σ price×quantity and Σ quantity.

use serde::{Deserialize, Serialize};

use crate::types::ProductId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: ProductId,
    pub name: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub quantity: u32,
    pub max_quantity: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartState {
    items: Vec<CartItem>,
    #[serde(skip)]
    total: f64,
    #[serde(skip)]
    count: u32,
    #[serde(default)]
    is_open: bool,
    #[serde(skip)]
    revision: u64,
}

impl CartState {
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn item(&self, id: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    // === Mutations (dispatcher only) ===

    /// Add `line.quantity` units; an existing line grows up to its cap
    pub(crate) fn add(&mut self, line: CartItem) {
        match self.items.iter_mut().find(|item| item.id == line.id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .saturating_add(line.quantity)
                    .clamp(1, existing.max_quantity.max(1));
            }
            None => {
                let max = line.max_quantity.max(1);
                self.items.push(CartItem {
                    quantity: line.quantity.clamp(1, max),
                    max_quantity: max,
                    ..line
                });
            }
        }
        self.recalculate();
    }

    pub(crate) fn remove(&mut self, id: &str) {
        self.items.retain(|item| item.id != id);
        self.recalculate();
    }

    /// Clamp to `[1, max_quantity]`; unknown ids are ignored
    pub(crate) fn update_quantity(&mut self, id: &str, quantity: u32) {
        if let Some(item) = self.items.iter_mut().find(|item| item.id == id) {
            item.quantity = quantity.clamp(1, item.max_quantity.max(1));
        }
        self.recalculate();
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
        self.recalculate();
    }

    pub(crate) fn toggle(&mut self) {
        self.is_open = !self.is_open;
        self.revision += 1;
    }

    /// Recompute derived totals, e.g. after rehydrating the lines
    pub(crate) fn recalculate(&mut self) {
        self.count = self.items.iter().map(|item| item.quantity).sum();
        self.total = self
            .items
            .iter()
            .map(|item| item.price * item.quantity as f64)
            .sum();
        self.revision += 1;
    }
}
