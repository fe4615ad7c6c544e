//! Local store: the normalized client cache
//!
//! Holds products, inventory, cart and session. Reads are public; every
//! mutation is `pub(crate)` so only the dispatcher can write.
//!
//! Merge rules:
//! - **Bulk replace** (full fetch): the category map is rebuilt from the payload
//! - **Delta merge** (confirmed edit or push): shallow-merge, else insert,
//!   stamping `last_updated` with local receipt time
//!
//! `last_updated` is monotonic per record: a stamp never moves backwards even
//! if the wall clock does.

mod cart;
mod inventory;
mod products;
mod session;

pub use cart::{CartItem, CartState};
pub use inventory::InventoryState;
pub use products::{matches_search, ProductFilters, ProductsState};
pub use session::SessionState;

/// Receipt stamp that never precedes the previous one
pub(crate) fn stamp(previous: u64, now: u64) -> u64 {
    now.max(previous)
}

#[derive(Debug, Clone, Default)]
pub struct LocalStore {
    pub(crate) products: ProductsState,
    pub(crate) inventory: InventoryState,
    pub(crate) cart: CartState,
    pub(crate) session: SessionState,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn products(&self) -> &ProductsState {
        &self.products
    }

    pub fn inventory(&self) -> &InventoryState {
        &self.inventory
    }

    pub fn cart(&self) -> &CartState {
        &self.cart
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Drop every tenant-scoped record
    pub(crate) fn clear_catalog(&mut self) {
        self.products.clear();
        self.inventory.clear();
    }
}
