//! Actions, capability tags and commands

use serde::{Deserialize, Serialize};

use crate::api::ChannelEvent;
use crate::error::ApiError;
use crate::offline::Connectivity;
use crate::store::ProductFilters;
use crate::types::{
    Credentials, InventoryPatch, InventoryRecord, ProductDraft, ProductId, ProductPatch,
    ProductRecord, ProductRef, Tenant, TenantId, UserProfile,
};

/// Kind of entity a mutating action changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Inventory,
    Product,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::Product => "product",
        }
    }

    /// Payload field that identifies the entity
    pub fn id_field(&self) -> &'static str {
        match self {
            Self::Inventory => "productId",
            Self::Product => "id",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the interceptor chain may do with a command.
///
/// Attached when the command is authored, never inferred from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    /// May be deferred into the operation queue while offline
    pub offlineable: bool,
    /// Applied to the local store before remote confirmation
    pub optimistic: bool,
    /// Audited as a change to this entity type
    pub mutating: Option<EntityType>,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        offlineable: false,
        optimistic: false,
        mutating: None,
    };

    pub const fn offlineable() -> Self {
        Self {
            offlineable: true,
            optimistic: false,
            mutating: None,
        }
    }

    pub const fn optimistic(self) -> Self {
        Self {
            optimistic: true,
            ..self
        }
    }

    pub const fn mutating(entity: EntityType) -> Self {
        Self {
            offlineable: false,
            optimistic: false,
            mutating: Some(entity),
        }
    }
}

/// Everything that can change engine state.
///
/// Commands issued by the presentation layer, fulfilled/rejected follow-ups
/// of remote calls, and inbound channel messages all share this type and go
/// through the same chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Action {
    // === Lifecycle / realtime ===
    /// Engine start: opens the realtime connection
    Initialize,
    /// Explicit reconnect request, also after logout
    Reconnect,
    ConnectivityChanged(Connectivity),
    ChannelConnected,
    ChannelDisconnected,
    InventoryPushed(Vec<InventoryPatch>),
    ProductPushed(ProductPatch),

    // === Session ===
    Login(Credentials),
    LoginFulfilled(UserProfile),
    LoginRejected(ApiError),
    FetchTenants,
    TenantsFetched(Vec<Tenant>),
    TenantsRejected(ApiError),
    /// Clears the catalog; `TenantSwitched` follows
    SwitchTenant(TenantId),
    TenantSwitched(TenantId),
    Logout,

    // === Products ===
    FetchProducts(TenantId),
    ProductsFetched {
        tenant_id: TenantId,
        products: Vec<ProductRecord>,
    },
    ProductsRejected {
        tenant_id: TenantId,
        error: ApiError,
    },
    UpdateProduct(ProductPatch),
    ProductUpdated(ProductPatch),
    ProductUpdateRejected {
        product_id: ProductId,
        error: ApiError,
    },
    CreateProduct(ProductDraft),
    ProductCreated(ProductRecord),
    ProductCreateRejected(ApiError),
    DeleteProduct(ProductRef),
    ProductDeleted(ProductRef),
    ProductDeleteRejected {
        product_id: ProductId,
        error: ApiError,
    },
    ClearProducts,
    SearchProducts(String),
    FilterProducts(ProductFilters),

    // === Inventory ===
    FetchInventory(TenantId),
    InventoryFetched {
        tenant_id: TenantId,
        records: Vec<InventoryRecord>,
    },
    InventoryRejected {
        tenant_id: TenantId,
        error: ApiError,
    },
    UpdateInventory(InventoryPatch),
    BulkUpdateInventory(Vec<InventoryPatch>),
    InventoryUpdated(InventoryPatch),
    InventoryUpdateRejected {
        product_ids: Vec<ProductId>,
        error: ApiError,
    },
    ClearInventory,

    // === Offline queue ===
    ReplaySucceeded {
        operation_id: String,
        follow_ups: Vec<Action>,
    },
    ReplayFailed {
        operation_id: String,
        error: ApiError,
    },
    MarkOperationCompleted(String),
    MarkOperationFailed {
        operation_id: String,
        error: String,
    },
    /// Re-enqueue a failed operation as a fresh pending one
    RetryOperation(String),
    RemoveCompletedOperations,

    // === Audit ===
    /// Remote ack: drop these ids from the pending list
    LogsSynced(Vec<String>),
    AuditPersistFailed {
        entry_id: String,
        error: ApiError,
    },
    FlushPendingAudit,
    ClearAuditLog,

    // === Cart ===
    AddToCart {
        product_id: ProductId,
        quantity: u32,
    },
    RemoveFromCart(ProductId),
    UpdateQuantity {
        product_id: ProductId,
        quantity: u32,
    },
    ClearCart,
    ToggleCart,
}

impl Action {
    /// The capability table: one explicit entry per taggable action
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Action::UpdateInventory(_)
            | Action::BulkUpdateInventory(_)
            | Action::UpdateProduct(_) => Capabilities::offlineable().optimistic(),
            // Creation needs a server-assigned id and deletes are only shown once confirmed
            Action::CreateProduct(_) | Action::DeleteProduct(_) => Capabilities::offlineable(),
            Action::InventoryUpdated(_) => Capabilities::mutating(EntityType::Inventory),
            Action::ProductUpdated(_) | Action::ProductCreated(_) | Action::ProductDeleted(_) => {
                Capabilities::mutating(EntityType::Product)
            }
            _ => Capabilities::NONE,
        }
    }

    /// Stable name used in operations and audit entries
    pub fn action_type(&self) -> &'static str {
        match self {
            Action::Initialize => "engine.initialize",
            Action::Reconnect => "realtime.reconnect",
            Action::ConnectivityChanged(_) => "offline.connectivity",
            Action::ChannelConnected => "realtime.connected",
            Action::ChannelDisconnected => "realtime.disconnected",
            Action::InventoryPushed(_) => "realtime.inventory_update",
            Action::ProductPushed(_) => "realtime.product_update",
            Action::Login(_) => "session.login",
            Action::LoginFulfilled(_) => "session.login.fulfilled",
            Action::LoginRejected(_) => "session.login.rejected",
            Action::FetchTenants => "session.fetch_tenants",
            Action::TenantsFetched(_) => "session.fetch_tenants.fulfilled",
            Action::TenantsRejected(_) => "session.fetch_tenants.rejected",
            Action::SwitchTenant(_) => "session.switch_tenant",
            Action::TenantSwitched(_) => "session.switch_tenant.fulfilled",
            Action::Logout => "session.logout",
            Action::FetchProducts(_) => "products.fetch",
            Action::ProductsFetched { .. } => "products.fetch.fulfilled",
            Action::ProductsRejected { .. } => "products.fetch.rejected",
            Action::UpdateProduct(_) => "products.update",
            Action::ProductUpdated(_) => "products.update.fulfilled",
            Action::ProductUpdateRejected { .. } => "products.update.rejected",
            Action::CreateProduct(_) => "products.create",
            Action::ProductCreated(_) => "products.create.fulfilled",
            Action::ProductCreateRejected(_) => "products.create.rejected",
            Action::DeleteProduct(_) => "products.delete",
            Action::ProductDeleted(_) => "products.delete.fulfilled",
            Action::ProductDeleteRejected { .. } => "products.delete.rejected",
            Action::ClearProducts => "products.clear",
            Action::SearchProducts(_) => "products.search",
            Action::FilterProducts(_) => "products.filter",
            Action::FetchInventory(_) => "inventory.fetch",
            Action::InventoryFetched { .. } => "inventory.fetch.fulfilled",
            Action::InventoryRejected { .. } => "inventory.fetch.rejected",
            Action::UpdateInventory(_) => "inventory.update",
            Action::BulkUpdateInventory(_) => "inventory.bulk_update",
            Action::InventoryUpdated(_) => "inventory.update.fulfilled",
            Action::InventoryUpdateRejected { .. } => "inventory.update.rejected",
            Action::ClearInventory => "inventory.clear",
            Action::ReplaySucceeded { .. } => "offline.replay.fulfilled",
            Action::ReplayFailed { .. } => "offline.replay.rejected",
            Action::MarkOperationCompleted(_) => "offline.mark_completed",
            Action::MarkOperationFailed { .. } => "offline.mark_failed",
            Action::RetryOperation(_) => "offline.retry",
            Action::RemoveCompletedOperations => "offline.remove_completed",
            Action::LogsSynced(_) => "audit.logs_synced",
            Action::AuditPersistFailed { .. } => "audit.persist.rejected",
            Action::FlushPendingAudit => "audit.flush",
            Action::ClearAuditLog => "audit.clear",
            Action::AddToCart { .. } => "cart.add",
            Action::RemoveFromCart(_) => "cart.remove",
            Action::UpdateQuantity { .. } => "cart.update_quantity",
            Action::ClearCart => "cart.clear",
            Action::ToggleCart => "cart.toggle",
        }
    }

    /// Remote completions whose effect belongs to the tenant that issued them
    pub fn is_tenant_scoped(&self) -> bool {
        matches!(
            self,
            Action::ProductsFetched { .. }
                | Action::ProductsRejected { .. }
                | Action::ProductUpdated(_)
                | Action::ProductUpdateRejected { .. }
                | Action::ProductCreated(_)
                | Action::ProductCreateRejected(_)
                | Action::ProductDeleted(_)
                | Action::ProductDeleteRejected { .. }
                | Action::InventoryFetched { .. }
                | Action::InventoryRejected { .. }
                | Action::InventoryUpdated(_)
                | Action::InventoryUpdateRejected { .. }
        )
    }

    /// The action's payload as JSON (`Null` for unit actions)
    pub fn payload(&self) -> serde_json::Value {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(mut map)) => {
                map.remove("payload").unwrap_or(serde_json::Value::Null)
            }
            _ => serde_json::Value::Null,
        }
    }
}

impl From<ChannelEvent> for Action {
    fn from(event: ChannelEvent) -> Self {
        match event {
            ChannelEvent::Connected => Action::ChannelConnected,
            ChannelEvent::Disconnected => Action::ChannelDisconnected,
            ChannelEvent::InventoryUpdate(batch) => Action::InventoryPushed(batch),
            ChannelEvent::ProductUpdate(patch) => Action::ProductPushed(patch),
        }
    }
}

/// An action plus the capability tags it was authored with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub action: Action,
    pub capabilities: Capabilities,
}

impl Command {
    /// Tag with the action's default capabilities
    pub fn new(action: Action) -> Self {
        let capabilities = action.capabilities();
        Self {
            action,
            capabilities,
        }
    }

    /// Tag explicitly, overriding the defaults
    pub fn with_capabilities(action: Action, capabilities: Capabilities) -> Self {
        Self {
            action,
            capabilities,
        }
    }

    pub fn action_type(&self) -> &'static str {
        self.action.action_type()
    }
}

impl From<Action> for Command {
    fn from(action: Action) -> Self {
        Command::new(action)
    }
}
