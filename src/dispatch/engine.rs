//! The sync engine: one dispatcher, one writer
//!
//! Every state change enters through [`SyncEngine::dispatch`] and runs the
//! interceptor chain to completion before the next action is accepted:
//!
//! 1. offline interceptor (defer into the queue, forward if optimistic)
//! 2. store reducer (local mutation, remote calls started)
//! 3. audit interceptor (mutating actions only)
//! 4. realtime hooks (connect, subscribe, teardown)
//! 5. observers and persistence
//!
//! Remote calls are futures parked in an in-flight set. When one resolves
//! its fulfilled or rejected follow-up goes through the same chain. Actions
//! emitted while processing are queued and run afterwards, never reentrantly.

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{effects, Action, Command, EntityType};
use crate::api::{CatalogApi, ChannelEvent, ChannelEventReceiver, ChannelTransport};
use crate::audit::{self, AuditEntry, AuditLog};
use crate::config::EngineConfig;
use crate::error::{ApiError, Result, SyncError};
use crate::offline::{self, Connectivity, Interception, Operation, OperationQueue, OperationStatus};
use crate::persist::{slice_key, KeyValueStore, CART_SLICE, OFFLINE_SLICE, SESSION_SLICE};
use crate::realtime::ChannelManager;
use crate::store::{CartItem, CartState, LocalStore, SessionState};
use crate::types::{now_millis, ProductId, TenantId};
use crate::views::{ViewCache, Views};

pub type CommandSender = mpsc::UnboundedSender<Command>;
pub type CommandReceiver = mpsc::UnboundedReceiver<Command>;

/// Create the queue the presentation layer uses to feed [`SyncEngine::run`]
pub fn command_channel() -> (CommandSender, CommandReceiver) {
    mpsc::unbounded_channel()
}

/// Called after every processed action with the post-action store
pub trait StoreObserver: Send {
    fn on_change(&mut self, action: &Action, store: &LocalStore);
}

impl<F> StoreObserver for F
where
    F: FnMut(&Action, &LocalStore) + Send,
{
    fn on_change(&mut self, action: &Action, store: &LocalStore) {
        self(action, store)
    }
}

/// A resolved remote call, tagged with the tenant epoch it was started in
struct Completion {
    epoch: u64,
    actions: Vec<Action>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct SliceRevisions {
    session: u64,
    offline: u64,
    cart: u64,
}

pub struct SyncEngine<A: CatalogApi, T: ChannelTransport> {
    config: EngineConfig,
    api: Arc<A>,
    store: LocalStore,
    queue: OperationQueue,
    audit: AuditLog,
    channel: ChannelManager<T>,
    connectivity: Connectivity,
    in_flight: FuturesUnordered<BoxFuture<'static, Completion>>,
    follow_ups: VecDeque<Action>,
    observers: Vec<Box<dyn StoreObserver>>,
    persistence: Option<Arc<dyn KeyValueStore>>,
    saved: SliceRevisions,
    views: ViewCache,
    /// Bumped whenever the catalog is cleared for another tenant; completions
    /// from an older epoch no longer apply
    epoch: u64,
    /// Operation whose replay call is in flight
    replaying: Option<String>,
    /// Audit entries whose persist call is in flight
    audit_in_flight: HashSet<String>,
}

impl<A: CatalogApi, T: ChannelTransport> SyncEngine<A, T> {
    pub fn new(api: Arc<A>, transport: T, config: EngineConfig) -> Self {
        let channel = ChannelManager::new(transport, config.realtime.channel_prefix.clone());
        Self {
            audit: AuditLog::with_capacity(config.audit.capacity),
            config,
            api,
            store: LocalStore::new(),
            queue: OperationQueue::new(),
            channel,
            connectivity: Connectivity::Online,
            in_flight: FuturesUnordered::new(),
            follow_ups: VecDeque::new(),
            observers: Vec::new(),
            persistence: None,
            saved: SliceRevisions::default(),
            views: ViewCache::default(),
            epoch: 0,
            replaying: None,
            audit_in_flight: HashSet::new(),
        }
    }

    /// Save whitelisted slices to `store` after every change
    pub fn with_persistence(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.persistence = Some(store);
        self
    }

    pub fn on_change(&mut self, observer: impl StoreObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    // === Read access ===

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn queue(&self) -> &OperationQueue {
        &self.queue
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn channel(&self) -> &ChannelManager<T> {
        &self.channel
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn views(&self) -> Views<'_> {
        Views::new(
            &self.store,
            &self.queue,
            &self.views,
            self.config.inventory.default_low_stock_threshold,
            self.config.views.render_batch_size,
        )
    }

    /// No remote call in flight and nothing left to dispatch
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty() && self.follow_ups.is_empty()
    }

    // === Lifecycle ===

    /// Load whitelisted slices from the persistence backend
    pub fn rehydrate(&mut self) -> Result<()> {
        let Some(backend) = self.persistence.clone() else {
            return Ok(());
        };
        let prefix = self.config.persistence.key_prefix.clone();

        if self.config.persists(SESSION_SLICE) {
            if let Some(value) = backend.load(&slice_key(&prefix, SESSION_SLICE))? {
                self.store.session = serde_json::from_value::<SessionState>(value)?;
            }
        }
        if self.config.persists(OFFLINE_SLICE) {
            if let Some(value) = backend.load(&slice_key(&prefix, OFFLINE_SLICE))? {
                let queue: OperationQueue = serde_json::from_value(value)?;
                self.queue.restore(queue.operations().to_vec());
            }
        }
        if self.config.persists(CART_SLICE) {
            if let Some(value) = backend.load(&slice_key(&prefix, CART_SLICE))? {
                let mut cart: CartState = serde_json::from_value(value)?;
                cart.recalculate();
                self.store.cart = cart;
            }
        }

        self.saved = self.revisions();
        info!(
            tenant_id = ?self.store.session.tenant_id(),
            pending_operations = self.queue.pending().count(),
            cart_items = self.store.cart.items().len(),
            "Rehydrated persisted state"
        );
        Ok(())
    }

    /// Open the realtime connection and resume any pending replay
    pub fn start(&mut self) -> Result<Interception> {
        self.dispatch(Action::Initialize)
    }

    /// Run one command through the chain, then every follow-up it produced.
    ///
    /// Only the command itself can fail (validation); follow-up failures
    /// are logged.
    pub fn dispatch(&mut self, command: impl Into<Command>) -> Result<Interception> {
        let outcome = self.process(command.into())?;
        self.drain_follow_ups();
        Ok(outcome)
    }

    /// Feed one transport callback into the chain
    pub fn handle_channel_event(&mut self, event: ChannelEvent) {
        self.dispatch_logged(Command::new(event.into()));
    }

    /// Wait for every in-flight remote call, including the ones their
    /// follow-ups start
    pub async fn settle(&mut self) {
        while let Some(completion) = self.in_flight.next().await {
            self.complete(completion);
        }
    }

    /// Process commands, channel events and remote completions until both
    /// receivers are closed and nothing is in flight
    pub async fn run(&mut self, mut commands: CommandReceiver, mut events: ChannelEventReceiver) {
        let mut commands_open = true;
        let mut events_open = true;
        info!("Sync engine running");

        loop {
            tokio::select! {
                command = commands.recv(), if commands_open => match command {
                    Some(command) => self.dispatch_logged(command),
                    None => commands_open = false,
                },
                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_channel_event(event),
                    None => events_open = false,
                },
                Some(completion) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.complete(completion);
                }
                else => break,
            }
        }

        info!("Sync engine stopped");
    }

    // === Chain ===

    fn dispatch_logged(&mut self, command: Command) {
        let action_type = command.action_type();
        if let Err(e) = self.dispatch(command) {
            warn!(action_type, error = %e, "Command rejected");
        }
    }

    fn drain_follow_ups(&mut self) {
        while let Some(action) = self.follow_ups.pop_front() {
            let action_type = action.action_type();
            if let Err(e) = self.process(Command::new(action)) {
                warn!(action_type, error = %e, "Follow-up action rejected");
            }
        }
    }

    fn complete(&mut self, completion: Completion) {
        let stale = completion.epoch != self.epoch;
        for action in completion.actions {
            if stale && action.is_tenant_scoped() {
                debug!(
                    action_type = action.action_type(),
                    "Dropping completion started under a previous tenant"
                );
                continue;
            }
            self.dispatch_logged(Command::new(action));
        }
    }

    fn process(&mut self, command: Command) -> Result<Interception> {
        self.validate(&command.action)?;

        // Offlineable commands line up behind a replay backlog so one origin's
        // edits reach the server in dispatch order
        let connectivity = if self.has_replay_backlog() {
            Connectivity::Offline
        } else {
            self.connectivity
        };
        let outcome = offline::intercept(&command, connectivity);
        if outcome.queued {
            let operation = Operation::new(command.clone(), self.tenant_id());
            let operation_id = self.queue.enqueue(operation);
            info!(
                operation_id = %operation_id,
                action_type = command.action_type(),
                optimistic = outcome.forwarded,
                online = self.connectivity.is_online(),
                "Deferred operation"
            );
        }

        if outcome.forwarded {
            self.reduce(&command, !outcome.queued);
            if let Some(entity) = command.capabilities.mutating {
                self.record_audit(&command.action, entity, None);
            }
            self.realtime(&command.action);
        }
        if outcome.queued {
            self.start_next_replay();
        }

        for observer in self.observers.iter_mut() {
            observer.on_change(&command.action, &self.store);
        }
        self.persist_changes();
        Ok(outcome)
    }

    /// Apply an action to the store. `remote` is false when the command was
    /// deferred, in which case no remote call starts.
    fn reduce(&mut self, command: &Command, remote: bool) {
        let now = now_millis();
        let threshold = self.config.inventory.default_low_stock_threshold;
        let optimistic = command.capabilities.optimistic;

        match &command.action {
            Action::Initialize => self.start_next_replay(),
            Action::Reconnect | Action::ChannelConnected | Action::ChannelDisconnected => {}
            Action::ConnectivityChanged(connectivity) => self.set_connectivity(*connectivity),
            Action::InventoryPushed(batch) => {
                if self.channel.accepts_pushes() {
                    self.store.inventory.merge_batch(batch, threshold, now);
                } else {
                    debug!(records = batch.len(), "Inventory push without a live channel ignored");
                }
            }
            Action::ProductPushed(patch) => {
                if self.channel.accepts_pushes() {
                    self.store.products.merge(patch, now);
                } else {
                    debug!(product_id = %patch.id, "Product push without a live channel ignored");
                }
            }

            // === Session ===
            Action::Login(credentials) => {
                self.store.session.login_started();
                if remote {
                    self.spawn_one(effects::login(Arc::clone(&self.api), credentials.clone()));
                }
            }
            Action::LoginFulfilled(profile) => {
                self.store.session.login_succeeded(profile);
                info!(user_id = %profile.user_id, "Logged in");
            }
            Action::LoginRejected(error) => {
                warn!(error = %error, "Login rejected");
                self.store.session.login_failed(error.to_string());
            }
            Action::FetchTenants => {
                if remote {
                    self.spawn_one(effects::fetch_tenants(Arc::clone(&self.api)));
                }
            }
            Action::TenantsFetched(tenants) => {
                self.store.session.set_tenants(tenants.clone());
                if self.store.session.tenant_id().is_none() {
                    if let Some(first) = tenants.first() {
                        self.follow_ups.push_back(Action::SwitchTenant(first.id.clone()));
                    }
                }
            }
            Action::TenantsRejected(error) => {
                warn!(error = %error, "Failed to fetch tenants");
                self.store.session.set_error(error.to_string());
            }
            Action::SwitchTenant(tenant_id) => {
                info!(tenant_id = %tenant_id, "Switching tenant");
                self.epoch += 1;
                self.store.clear_catalog();
                self.follow_ups.push_back(Action::TenantSwitched(tenant_id.clone()));
            }
            Action::TenantSwitched(tenant_id) => {
                self.store.session.select_tenant(tenant_id.clone());
                if self.config.session.refresh_on_tenant_switch {
                    self.follow_ups.push_back(Action::FetchProducts(tenant_id.clone()));
                    self.follow_ups.push_back(Action::FetchInventory(tenant_id.clone()));
                }
            }
            Action::Logout => {
                info!("Logging out");
                self.epoch += 1;
                self.store.session.logout();
                self.store.clear_catalog();
            }

            // === Products ===
            Action::FetchProducts(tenant_id) => {
                self.store.products.begin_fetch();
                if remote {
                    self.spawn_one(effects::fetch_products(Arc::clone(&self.api), tenant_id.clone()));
                }
            }
            Action::ProductsFetched { tenant_id, products } => {
                if self.is_current_tenant(tenant_id) {
                    debug!(tenant_id = %tenant_id, count = products.len(), "Products loaded");
                    self.store.products.replace_all(products.clone(), now);
                } else {
                    debug!(tenant_id = %tenant_id, "Discarding products for inactive tenant");
                }
            }
            Action::ProductsRejected { tenant_id, error } => {
                if self.is_current_tenant(tenant_id) {
                    warn!(tenant_id = %tenant_id, error = %error, "Failed to fetch products");
                    self.store.products.fetch_failed(error.clone());
                }
            }
            Action::UpdateProduct(patch) => {
                if optimistic {
                    self.store.products.merge(patch, now);
                }
                if remote {
                    self.spawn_mutation(&command.action);
                }
            }
            Action::ProductUpdated(patch) => self.store.products.merge(patch, now),
            Action::ProductUpdateRejected { product_id, error } => {
                warn!(product_id = %product_id, error = %error, "Product update rejected");
                self.store.products.set_error(error.clone());
            }
            Action::CreateProduct(_) => {
                if remote {
                    self.spawn_mutation(&command.action);
                }
            }
            Action::ProductCreated(record) => self.store.products.insert(record.clone(), now),
            Action::ProductCreateRejected(error) => {
                warn!(error = %error, "Product creation rejected");
                self.store.products.set_error(error.clone());
            }
            Action::DeleteProduct(product) => {
                if optimistic {
                    self.store.products.remove(&product.id);
                }
                if remote {
                    self.spawn_mutation(&command.action);
                }
            }
            Action::ProductDeleted(product) => {
                self.store.products.remove(&product.id);
            }
            Action::ProductDeleteRejected { product_id, error } => {
                warn!(product_id = %product_id, error = %error, "Product deletion rejected");
                self.store.products.set_error(error.clone());
            }
            Action::ClearProducts => self.store.products.clear(),
            Action::SearchProducts(term) => self.store.products.set_search_term(term),
            Action::FilterProducts(filters) => self.store.products.set_filters(filters.clone()),

            // === Inventory ===
            Action::FetchInventory(tenant_id) => {
                self.store.inventory.begin_fetch();
                if remote {
                    self.spawn_one(effects::fetch_inventory(Arc::clone(&self.api), tenant_id.clone()));
                }
            }
            Action::InventoryFetched { tenant_id, records } => {
                if self.is_current_tenant(tenant_id) {
                    debug!(tenant_id = %tenant_id, count = records.len(), "Inventory loaded");
                    self.store.inventory.replace_all(records.clone(), now);
                } else {
                    debug!(tenant_id = %tenant_id, "Discarding inventory for inactive tenant");
                }
            }
            Action::InventoryRejected { tenant_id, error } => {
                if self.is_current_tenant(tenant_id) {
                    warn!(tenant_id = %tenant_id, error = %error, "Failed to fetch inventory");
                    self.store.inventory.fetch_failed(error.clone());
                }
            }
            Action::UpdateInventory(patch) => {
                if optimistic {
                    self.store.inventory.merge(patch, threshold, now);
                }
                if remote {
                    self.spawn_mutation(&command.action);
                }
            }
            Action::BulkUpdateInventory(patches) => {
                if optimistic {
                    for patch in patches {
                        self.store.inventory.merge(patch, threshold, now);
                    }
                }
                if remote {
                    self.spawn_mutation(&command.action);
                }
            }
            Action::InventoryUpdated(patch) => self.store.inventory.merge(patch, threshold, now),
            Action::InventoryUpdateRejected { product_ids, error } => {
                warn!(products = ?product_ids, error = %error, "Inventory update rejected");
                self.store.inventory.update_failed(error.clone());
            }
            Action::ClearInventory => self.store.inventory.clear(),

            // === Offline queue ===
            Action::ReplaySucceeded {
                operation_id,
                follow_ups,
            } => self.replay_succeeded(operation_id, follow_ups),
            Action::ReplayFailed { operation_id, error } => self.replay_failed(operation_id, error),
            Action::MarkOperationCompleted(operation_id) => {
                if !self.queue.complete(operation_id) {
                    debug!(operation_id = %operation_id, "No pending operation to complete");
                }
            }
            Action::MarkOperationFailed { operation_id, error } => {
                if !self.queue.fail(operation_id, error.clone()) {
                    debug!(operation_id = %operation_id, "No pending operation to fail");
                }
            }
            Action::RetryOperation(operation_id) => match self.queue.retry(operation_id) {
                Some(retry_id) => {
                    info!(operation_id = %operation_id, retry_id = %retry_id, "Retrying failed operation");
                    self.start_next_replay();
                }
                None => warn!(operation_id = %operation_id, "Only failed operations can be retried"),
            },
            Action::RemoveCompletedOperations => {
                let removed = self.queue.remove_completed();
                debug!(removed, "Removed completed operations");
            }

            // === Audit ===
            Action::LogsSynced(entry_ids) => {
                for entry_id in entry_ids {
                    self.audit_in_flight.remove(entry_id);
                }
                let synced = self.audit.mark_synced(entry_ids);
                debug!(synced, "Audit entries acknowledged");
            }
            Action::AuditPersistFailed { entry_id, error } => {
                self.audit_in_flight.remove(entry_id);
                warn!(entry_id = %entry_id, error = %error, "Failed to sync audit entry");
            }
            Action::FlushPendingAudit => self.flush_audit(),
            Action::ClearAuditLog => self.audit.clear(),

            // === Cart ===
            Action::AddToCart {
                product_id,
                quantity,
            } => self.add_to_cart(product_id, *quantity),
            Action::RemoveFromCart(product_id) => self.store.cart.remove(product_id),
            Action::UpdateQuantity {
                product_id,
                quantity,
            } => self.store.cart.update_quantity(product_id, *quantity),
            Action::ClearCart => self.store.cart.clear(),
            Action::ToggleCart => self.store.cart.toggle(),
        }
    }

    /// Connection lifecycle side effects, after the store and audit steps
    fn realtime(&mut self, action: &Action) {
        match action {
            Action::Initialize => {
                if let Err(e) = self.channel.start() {
                    warn!(error = %e, "Failed to open realtime channel");
                }
            }
            Action::Reconnect => {
                if let Err(e) = self.channel.reconnect() {
                    warn!(error = %e, "Failed to reopen realtime channel");
                }
            }
            Action::ChannelConnected => {
                let was_connected = self.channel.is_connected();
                let tenant_id = self.tenant_id();
                if let Err(e) = self.channel.on_connected(tenant_id.as_deref()) {
                    warn!(error = %e, "Tenant subscription failed");
                }
                if !was_connected && self.channel.is_connected() {
                    self.follow_ups
                        .push_back(Action::ConnectivityChanged(Connectivity::Online));
                }
            }
            Action::ChannelDisconnected => {
                if self.channel.on_disconnected() {
                    self.follow_ups
                        .push_back(Action::ConnectivityChanged(Connectivity::Offline));
                }
            }
            Action::TenantSwitched(tenant_id) => {
                if let Err(e) = self.channel.switch_tenant(tenant_id) {
                    warn!(tenant_id = %tenant_id, error = %e, "Tenant re-subscription failed");
                }
            }
            Action::Logout => self.channel.logout(),
            _ => {}
        }
    }

    // === Offline replay ===

    fn set_connectivity(&mut self, connectivity: Connectivity) {
        if self.connectivity != connectivity {
            info!(?connectivity, "Connectivity changed");
        }
        self.connectivity = connectivity;
        if connectivity.is_online() {
            self.start_next_replay();
        }
    }

    /// Start replaying the oldest pending operation, one at a time
    fn start_next_replay(&mut self) {
        if self.replaying.is_some() || !self.connectivity.is_online() {
            return;
        }

        while let Some(operation) = self.queue.next_pending().cloned() {
            let Some(tenant_id) = operation.tenant_id.clone() else {
                warn!(operation_id = %operation.id, "Deferred operation has no tenant");
                self.queue
                    .fail(&operation.id, "no tenant selected when the operation was deferred".into());
                continue;
            };

            info!(
                operation_id = %operation.id,
                action_type = %operation.action_type,
                tenant_id = %tenant_id,
                "Replaying deferred operation"
            );
            self.replaying = Some(operation.id.clone());
            let operation_id = operation.id;
            let action = operation.command.action;

            match effects::mutation_call(Arc::clone(&self.api), tenant_id, &action) {
                Some(call) => self.spawn(async move {
                    match call.await {
                        Ok(follow_ups) => vec![Action::ReplaySucceeded {
                            operation_id,
                            follow_ups,
                        }],
                        Err(error) => vec![Action::ReplayFailed { operation_id, error }],
                    }
                }),
                None => {
                    // Local-only command: replay means applying it now, unless
                    // it was already applied optimistically
                    let follow_ups = if operation.command.capabilities.optimistic {
                        Vec::new()
                    } else {
                        vec![action]
                    };
                    self.follow_ups.push_back(Action::ReplaySucceeded {
                        operation_id,
                        follow_ups,
                    });
                }
            }
            return;
        }
    }

    fn replay_succeeded(&mut self, operation_id: &str, follow_ups: &[Action]) {
        let tenant_id = self.queue.get(operation_id).and_then(|op| op.tenant_id.clone());
        if self.queue.complete(operation_id) {
            info!(operation_id = %operation_id, "Deferred operation replayed");
        }
        self.finish_replay(operation_id);

        if tenant_id.is_some() && tenant_id == self.tenant_id() {
            self.follow_ups.extend(follow_ups.iter().cloned());
        } else if !follow_ups.is_empty() {
            debug!(
                operation_id = %operation_id,
                "Tenant changed since the operation was deferred, dropping its follow-ups"
            );
            // Confirmed on the server all the same; audit under the operation's tenant
            for action in follow_ups {
                if let Some(entity) = action.capabilities().mutating {
                    self.record_audit(action, entity, tenant_id.clone());
                }
            }
        }
        self.start_next_replay();
    }

    fn replay_failed(&mut self, operation_id: &str, error: &ApiError) {
        if self.queue.fail(operation_id, error.to_string()) {
            warn!(operation_id = %operation_id, error = %error, "Deferred operation failed");
        }
        self.finish_replay(operation_id);
        self.start_next_replay();
    }

    fn finish_replay(&mut self, operation_id: &str) {
        if self.replaying.as_deref() == Some(operation_id) {
            self.replaying = None;
        }
    }

    // === Audit ===

    /// `tenant_id` overrides the session tenant for confirmations that
    /// arrive after a switch
    fn record_audit(&mut self, action: &Action, entity: EntityType, tenant_id: Option<TenantId>) {
        let Some(mut entry) = audit::synthesize(action, entity, &self.store.session) else {
            warn!(
                action_type = action.action_type(),
                entity_type = %entity,
                "Mutating action carries no entity id, not audited"
            );
            return;
        };
        if tenant_id.is_some() {
            entry.tenant_id = tenant_id;
        }

        debug!(
            entry_id = %entry.id,
            entity_type = %entity,
            entity_id = %entry.entity_id,
            "Recorded audit entry"
        );
        self.audit.record(entry.clone());
        if self.connectivity.is_online() {
            self.persist_audit_entry(entry);
        }
    }

    fn flush_audit(&mut self) {
        if !self.connectivity.is_online() {
            debug!(pending = self.audit.pending().len(), "Offline, audit flush skipped");
            return;
        }
        for entry in self.audit.pending().to_vec() {
            self.persist_audit_entry(entry);
        }
    }

    fn persist_audit_entry(&mut self, entry: AuditEntry) {
        let Some(tenant_id) = entry.tenant_id.clone() else {
            debug!(entry_id = %entry.id, "Audit entry has no tenant, left pending");
            return;
        };
        if !self.audit_in_flight.insert(entry.id.clone()) {
            debug!(entry_id = %entry.id, "Audit persist already in flight");
            return;
        }
        self.spawn_one(effects::persist_audit(Arc::clone(&self.api), tenant_id, entry));
    }

    // === Cart ===

    fn add_to_cart(&mut self, product_id: &ProductId, quantity: u32) {
        let Some(product) = self.store.products.get(product_id) else {
            warn!(product_id = %product_id, "Cannot add an unloaded product to the cart");
            return;
        };
        let max_quantity = self
            .store
            .inventory
            .get(product_id)
            .map(|record| record.quantity)
            .filter(|stock| *stock > 0)
            .unwrap_or(self.config.cart.default_max_quantity);

        let line = CartItem {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
            quantity,
            max_quantity,
        };
        self.store.cart.add(line);
    }

    // === Helpers ===

    /// Deferred operations still waiting for, or in, replay
    fn has_replay_backlog(&self) -> bool {
        self.replaying.is_some() || self.queue.has_pending()
    }

    /// Reject malformed input before anything mutates
    fn validate(&self, action: &Action) -> Result<()> {
        match action {
            Action::Login(credentials) if !credentials.is_well_formed() => Err(
                SyncError::Validation("a username or a token is required".to_string()),
            ),
            Action::RetryOperation(operation_id) => match self.queue.get(operation_id) {
                None => Err(SyncError::NotFound(format!("operation {}", operation_id))),
                Some(operation) if operation.status != OperationStatus::Failed => {
                    Err(SyncError::Sync(format!(
                        "operation {} is {:?}, only failed operations can be retried",
                        operation_id, operation.status
                    )))
                }
                Some(_) => Ok(()),
            },
            _ => Ok(()),
        }
    }

    fn tenant_id(&self) -> Option<TenantId> {
        self.store.session.tenant_id().map(str::to_string)
    }

    /// Fetch results apply only to the active tenant (or before one is chosen)
    fn is_current_tenant(&self, tenant_id: &str) -> bool {
        self.store
            .session
            .tenant_id()
            .map_or(true, |current| current == tenant_id)
    }

    fn spawn<F>(&mut self, call: F)
    where
        F: Future<Output = Vec<Action>> + Send + 'static,
    {
        let epoch = self.epoch;
        self.in_flight.push(
            async move {
                Completion {
                    epoch,
                    actions: call.await,
                }
            }
            .boxed(),
        );
    }

    fn spawn_one(&mut self, call: BoxFuture<'static, Action>) {
        self.spawn(call.map(|action| vec![action]));
    }

    /// Start the remote call for a mutation command against the active tenant
    fn spawn_mutation(&mut self, action: &Action) {
        let Some(tenant_id) = self.tenant_id() else {
            warn!(action_type = action.action_type(), "No tenant selected, mutation rejected");
            if let Some(rejected) = effects::rejection(action, ApiError::new("no tenant selected")) {
                self.follow_ups.push_back(rejected);
            }
            return;
        };
        let Some(call) = effects::mutation_call(Arc::clone(&self.api), tenant_id, action) else {
            return;
        };

        let action = action.clone();
        self.spawn(async move {
            match call.await {
                Ok(follow_ups) => follow_ups,
                Err(error) => effects::rejection(&action, error).into_iter().collect(),
            }
        });
    }

    fn revisions(&self) -> SliceRevisions {
        SliceRevisions {
            session: self.store.session.revision(),
            offline: self.queue.revision(),
            cart: self.store.cart.revision(),
        }
    }

    /// Save each whitelisted slice whose revision moved
    fn persist_changes(&mut self) {
        let Some(backend) = self.persistence.as_deref() else {
            return;
        };
        let current = self.revisions();
        if current == self.saved {
            return;
        }

        let prefix = &self.config.persistence.key_prefix;
        if current.session != self.saved.session && self.config.persists(SESSION_SLICE) {
            save_slice(backend, &slice_key(prefix, SESSION_SLICE), &self.store.session);
        }
        if current.offline != self.saved.offline && self.config.persists(OFFLINE_SLICE) {
            save_slice(backend, &slice_key(prefix, OFFLINE_SLICE), &self.queue);
        }
        if current.cart != self.saved.cart && self.config.persists(CART_SLICE) {
            save_slice(backend, &slice_key(prefix, CART_SLICE), &self.store.cart);
        }
        self.saved = current;
    }
}

fn save_slice<S: Serialize>(backend: &dyn KeyValueStore, key: &str, value: &S) {
    let result = serde_json::to_value(value)
        .map_err(SyncError::from)
        .and_then(|json| backend.save(key, &json));
    if let Err(e) = result {
        warn!(key, error = %e, "Failed to persist slice");
    }
}
