//! Remote calls started by the dispatcher
//!
//! Every builder returns a `'static` boxed future that owns its inputs, so it
//! can sit in the engine's in-flight set while further actions are applied.
//! Each one resolves to the follow-up actions to dispatch.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use super::Action;
use crate::api::{ApiResult, CatalogApi};
use crate::audit::AuditEntry;
use crate::error::ApiError;
use crate::types::{Credentials, TenantId};

/// The rejected follow-up for a remote mutation
pub(crate) fn rejection(action: &Action, error: ApiError) -> Option<Action> {
    let rejected = match action {
        Action::UpdateInventory(patch) => Action::InventoryUpdateRejected {
            product_ids: vec![patch.product_id.clone()],
            error,
        },
        Action::BulkUpdateInventory(patches) => Action::InventoryUpdateRejected {
            product_ids: patches.iter().map(|p| p.product_id.clone()).collect(),
            error,
        },
        Action::UpdateProduct(patch) => Action::ProductUpdateRejected {
            product_id: patch.id.clone(),
            error,
        },
        Action::CreateProduct(_) => Action::ProductCreateRejected(error),
        Action::DeleteProduct(product) => Action::ProductDeleteRejected {
            product_id: product.id.clone(),
            error,
        },
        _ => return None,
    };
    Some(rejected)
}

/// The remote call behind a mutation command, or `None` for commands that
/// are purely local. Resolves to the fulfilled follow-ups.
pub(crate) fn mutation_call<A: CatalogApi>(
    api: Arc<A>,
    tenant_id: TenantId,
    action: &Action,
) -> Option<BoxFuture<'static, ApiResult<Vec<Action>>>> {
    let call: BoxFuture<'static, ApiResult<Vec<Action>>> = match action.clone() {
        Action::UpdateInventory(patch) => async move {
            let confirmed = api.update_inventory(&tenant_id, &patch).await?;
            Ok::<_, ApiError>(vec![Action::InventoryUpdated(confirmed)])
        }
        .boxed(),
        Action::BulkUpdateInventory(patches) => async move {
            let confirmed = api.bulk_update_inventory(&tenant_id, &patches).await?;
            Ok::<_, ApiError>(confirmed.into_iter().map(Action::InventoryUpdated).collect())
        }
        .boxed(),
        Action::UpdateProduct(patch) => async move {
            let confirmed = api.update_product(&tenant_id, &patch).await?;
            Ok::<_, ApiError>(vec![Action::ProductUpdated(confirmed)])
        }
        .boxed(),
        Action::CreateProduct(draft) => async move {
            let created = api.create_product(&tenant_id, &draft).await?;
            Ok::<_, ApiError>(vec![Action::ProductCreated(created)])
        }
        .boxed(),
        Action::DeleteProduct(product) => async move {
            api.delete_product(&tenant_id, &product.id).await?;
            Ok::<_, ApiError>(vec![Action::ProductDeleted(product)])
        }
        .boxed(),
        _ => return None,
    };
    Some(call)
}

pub(crate) fn login<A: CatalogApi>(api: Arc<A>, credentials: Credentials) -> BoxFuture<'static, Action> {
    async move {
        let result = api.login(&credentials).await;
        match result {
            Ok(profile) => Action::LoginFulfilled(profile),
            Err(error) => Action::LoginRejected(error),
        }
    }
    .boxed()
}

pub(crate) fn fetch_tenants<A: CatalogApi>(api: Arc<A>) -> BoxFuture<'static, Action> {
    async move {
        let result = api.fetch_tenants().await;
        match result {
            Ok(tenants) => Action::TenantsFetched(tenants),
            Err(error) => Action::TenantsRejected(error),
        }
    }
    .boxed()
}

pub(crate) fn fetch_products<A: CatalogApi>(api: Arc<A>, tenant_id: TenantId) -> BoxFuture<'static, Action> {
    async move {
        let result = api.fetch_products(&tenant_id).await;
        match result {
            Ok(products) => Action::ProductsFetched { tenant_id, products },
            Err(error) => Action::ProductsRejected { tenant_id, error },
        }
    }
    .boxed()
}

pub(crate) fn fetch_inventory<A: CatalogApi>(api: Arc<A>, tenant_id: TenantId) -> BoxFuture<'static, Action> {
    async move {
        let result = api.fetch_inventory(&tenant_id).await;
        match result {
            Ok(records) => Action::InventoryFetched { tenant_id, records },
            Err(error) => Action::InventoryRejected { tenant_id, error },
        }
    }
    .boxed()
}

/// Push one audit entry; success acknowledges it by id
pub(crate) fn persist_audit<A: CatalogApi>(
    api: Arc<A>,
    tenant_id: TenantId,
    entry: AuditEntry,
) -> BoxFuture<'static, Action> {
    async move {
        let result = api.record_audit_entry(&tenant_id, &entry).await;
        match result {
            Ok(()) => Action::LogsSynced(vec![entry.id]),
            Err(error) => Action::AuditPersistFailed {
                entry_id: entry.id,
                error,
            },
        }
    }
    .boxed()
}
