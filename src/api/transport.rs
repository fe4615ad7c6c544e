//! Request/response transport

use async_trait::async_trait;

use crate::audit::AuditEntry;
use crate::error::ApiError;
use crate::types::{
    Credentials, InventoryPatch, InventoryRecord, ProductDraft, ProductPatch, ProductRecord,
    Tenant, UserProfile,
};

/// Result of a single remote call
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Remote catalog service.
///
/// Implementations own transport concerns (base URL, auth header, timeouts,
/// retry-on-timeout). Every failure must come back as `Err(ApiError)`; the
/// engine converts it into a rejected action.
///
/// # Example
///
/// ```rust,ignore
/// use catalog_sync::{CatalogApi, ApiResult};
///
/// struct HttpCatalog { client: reqwest::Client, base_url: String }
///
/// #[async_trait::async_trait]
/// impl CatalogApi for HttpCatalog {
///     async fn fetch_products(&self, tenant_id: &str) -> ApiResult<Vec<ProductRecord>> {
///         // GET {base_url}/products?tenantId={tenant_id}
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait CatalogApi: Send + Sync + 'static {
    async fn login(&self, credentials: &Credentials) -> ApiResult<UserProfile>;

    async fn fetch_tenants(&self) -> ApiResult<Vec<Tenant>>;

    // === Inventory ===

    async fn fetch_inventory(&self, tenant_id: &str) -> ApiResult<Vec<InventoryRecord>>;

    /// Returns the fields the server accepted
    async fn update_inventory(
        &self,
        tenant_id: &str,
        patch: &InventoryPatch,
    ) -> ApiResult<InventoryPatch>;

    async fn bulk_update_inventory(
        &self,
        tenant_id: &str,
        patches: &[InventoryPatch],
    ) -> ApiResult<Vec<InventoryPatch>>;

    // === Products ===

    async fn fetch_products(&self, tenant_id: &str) -> ApiResult<Vec<ProductRecord>>;

    async fn update_product(&self, tenant_id: &str, patch: &ProductPatch) -> ApiResult<ProductPatch>;

    async fn create_product(&self, tenant_id: &str, draft: &ProductDraft) -> ApiResult<ProductRecord>;

    async fn delete_product(&self, tenant_id: &str, product_id: &str) -> ApiResult<()>;

    // === Audit ===

    async fn record_audit_entry(&self, tenant_id: &str, entry: &AuditEntry) -> ApiResult<()>;
}
