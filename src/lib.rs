//! Catalog Sync - offline-first sync engine for multi-tenant catalogs
//!
//! Keeps a local, mutable view of a product/inventory catalog consistent
//! under intermittent connectivity, optimistic local edits and server
//! pushes.
//!
//! # Architecture
//!
//! Every state change is an [`Action`] dispatched through one ordered chain:
//! - **Offline**: deferred into the [`OperationQueue`] while disconnected,
//!   replayed in FIFO order once back online
//! - **Store**: the [`LocalStore`] is updated, optimistically or on
//!   confirmation
//! - **Audit**: confirmed mutations are recorded in the [`AuditLog`]
//! - **Realtime**: the [`ChannelManager`] keeps one subscription for the
//!   active tenant
//!
//! Transports stay outside the crate behind [`CatalogApi`] and
//! [`ChannelTransport`].
//!
//! # Example
//!
//! ```rust,ignore
//! use catalog_sync::{Action, EngineConfig, InventoryPatch, SyncEngine};
//!
//! let mut engine = SyncEngine::new(api, transport, EngineConfig::default());
//! engine.rehydrate()?;
//! engine.start()?;
//!
//! engine.dispatch(Action::SwitchTenant("tenant1".into()))?;
//! engine.dispatch(Action::UpdateInventory(InventoryPatch::quantity("p1", 12)))?;
//! engine.settle().await;
//!
//! let low_stock = engine.views().low_stock_products();
//! ```

// Transport contracts
pub mod api;

// Offline interceptor and operation queue
pub mod offline;

// Realtime channel manager
pub mod realtime;

// Audit trail
pub mod audit;

// Local store slices
pub mod store;

// Dispatcher and engine
pub mod dispatch;

// Derived views
pub mod views;

// Slice persistence
pub mod persist;

// Engine configuration
pub mod config;

// Catalog entities
pub mod types;

// Error types
pub mod error;

// Re-export transport contracts
pub use api::{channel_events, ApiResult, CatalogApi, ChannelEvent, ChannelTransport};

// Re-export engine types
pub use dispatch::{command_channel, Action, Capabilities, Command, EntityType, StoreObserver, SyncEngine};

// Re-export component types
pub use audit::{AuditEntry, AuditLog};
pub use offline::{intercept, Connectivity, Interception, Operation, OperationQueue, OperationStatus};
pub use realtime::{ChannelManager, ConnectionState};
pub use store::{CartItem, LocalStore, ProductFilters};
pub use views::{InventoryMetrics, ProductView, RenderBatches};

// Re-export persistence
pub use persist::{JsonFileStore, KeyValueStore, MemoryStore};

// Re-export config
pub use config::EngineConfig;

// Re-export entity types
pub use types::{
    Credentials, InventoryPatch, InventoryRecord, ProductDraft, ProductPatch, ProductRecord,
    ProductRef, Tenant, UserProfile,
};

// Re-export error types
pub use error::{ApiError, Result, SyncError};
