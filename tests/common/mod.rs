//! Shared fakes for engine integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use catalog_sync::{
    ApiError, ApiResult, AuditEntry, CatalogApi, ChannelTransport, Credentials, EngineConfig,
    InventoryPatch, InventoryRecord, ProductDraft, ProductPatch, ProductRecord, SyncEngine, Tenant,
    UserProfile,
};

pub type TestEngine = SyncEngine<FakeCatalogApi, FakeChannel>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn product(id: &str, name: &str, price: f64, category: &str) -> ProductRecord {
    ProductRecord {
        id: id.to_string(),
        name: name.to_string(),
        price,
        category: category.to_string(),
        brand: "Acme".to_string(),
        ..Default::default()
    }
}

pub fn stock(product_id: &str, quantity: u32) -> InventoryRecord {
    InventoryRecord {
        product_id: product_id.to_string(),
        quantity,
        reserved: 0,
        low_stock_threshold: 5,
        last_updated: 0,
    }
}

/// In-memory catalog service with per-method failure switches
pub struct FakeCatalogApi {
    tenants: Vec<Tenant>,
    products: Mutex<HashMap<String, Vec<ProductRecord>>>,
    inventory: Mutex<HashMap<String, Vec<InventoryRecord>>>,
    failing: Mutex<HashSet<&'static str>>,
    delays: Mutex<HashMap<&'static str, Duration>>,
    calls: Mutex<Vec<String>>,
    inventory_writes: Mutex<Vec<InventoryPatch>>,
    created: AtomicUsize,
}

impl Default for FakeCatalogApi {
    fn default() -> Self {
        let mut products = HashMap::new();
        products.insert(
            "t1".to_string(),
            vec![
                product("p1", "Desk Lamp", 30.0, "lighting"),
                product("p2", "Oak Desk", 300.0, "furniture"),
                product("p3", "Stool", 45.0, "furniture"),
            ],
        );
        products.insert(
            "t2".to_string(),
            vec![
                product("q1", "Espresso Cup", 8.0, "kitchen"),
                product("q2", "Kettle", 25.0, "kitchen"),
            ],
        );

        let mut inventory = HashMap::new();
        inventory.insert("t1".to_string(), vec![stock("p1", 3), stock("p2", 40), stock("p3", 0)]);
        inventory.insert("t2".to_string(), vec![stock("q1", 12), stock("q2", 2)]);

        Self {
            tenants: vec![
                Tenant {
                    id: "t1".into(),
                    name: "Home Goods".into(),
                },
                Tenant {
                    id: "t2".into(),
                    name: "Kitchen Co".into(),
                },
            ],
            products: Mutex::new(products),
            inventory: Mutex::new(inventory),
            failing: Mutex::new(HashSet::new()),
            delays: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            inventory_writes: Mutex::new(Vec::new()),
            created: AtomicUsize::new(0),
        }
    }
}

impl FakeCatalogApi {
    /// Make every call to `method` fail until `recover`
    pub fn fail(&self, method: &'static str) {
        self.failing.lock().unwrap().insert(method);
    }

    pub fn recover(&self, method: &'static str) {
        self.failing.lock().unwrap().remove(method);
    }

    /// Hold the next call to `method` for `delay` before it reaches the server
    pub fn delay_next(&self, method: &'static str, delay: Duration) {
        self.delays.lock().unwrap().insert(method, delay);
    }

    /// Inventory patches in the order the server applied them
    pub fn inventory_writes(&self) -> Vec<InventoryPatch> {
        self.inventory_writes.lock().unwrap().clone()
    }

    async fn hold(&self, method: &'static str) {
        let delay = self.delays.lock().unwrap().remove(method);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    /// Every call so far as `method:tenant:subject`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.split(':').next() == Some(method))
            .collect()
    }

    fn record(&self, method: &'static str, tenant: &str, subject: &str) -> ApiResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:{}:{}", method, tenant, subject));
        if self.failing.lock().unwrap().contains(method) {
            return Err(ApiError::with_status(503, format!("{} unavailable", method)));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogApi for FakeCatalogApi {
    async fn login(&self, credentials: &Credentials) -> ApiResult<UserProfile> {
        let user = credentials.username.clone().unwrap_or_else(|| "token-user".into());
        self.record("login", "-", &user)?;
        if credentials.password.as_deref() == Some("wrong") {
            return Err(ApiError::with_status(401, "Invalid credentials"));
        }
        Ok(UserProfile {
            user_id: "user-123".into(),
            user_name: "Demo User".into(),
            user_email: "demo@example.com".into(),
            token: Some("token".into()),
        })
    }

    async fn fetch_tenants(&self) -> ApiResult<Vec<Tenant>> {
        self.record("fetch_tenants", "-", "-")?;
        Ok(self.tenants.clone())
    }

    async fn fetch_inventory(&self, tenant_id: &str) -> ApiResult<Vec<InventoryRecord>> {
        self.record("fetch_inventory", tenant_id, "-")?;
        Ok(self
            .inventory
            .lock()
            .unwrap()
            .get(tenant_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_inventory(&self, tenant_id: &str, patch: &InventoryPatch) -> ApiResult<InventoryPatch> {
        self.hold("update_inventory").await;
        self.record("update_inventory", tenant_id, &patch.product_id)?;
        self.inventory_writes.lock().unwrap().push(patch.clone());
        Ok(patch.clone())
    }

    async fn bulk_update_inventory(
        &self,
        tenant_id: &str,
        patches: &[InventoryPatch],
    ) -> ApiResult<Vec<InventoryPatch>> {
        let ids: Vec<_> = patches.iter().map(|p| p.product_id.as_str()).collect();
        self.record("bulk_update_inventory", tenant_id, &ids.join(","))?;
        self.inventory_writes.lock().unwrap().extend_from_slice(patches);
        Ok(patches.to_vec())
    }

    async fn fetch_products(&self, tenant_id: &str) -> ApiResult<Vec<ProductRecord>> {
        self.record("fetch_products", tenant_id, "-")?;
        Ok(self
            .products
            .lock()
            .unwrap()
            .get(tenant_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_product(&self, tenant_id: &str, patch: &ProductPatch) -> ApiResult<ProductPatch> {
        self.record("update_product", tenant_id, &patch.id)?;
        Ok(patch.clone())
    }

    async fn create_product(&self, tenant_id: &str, draft: &ProductDraft) -> ApiResult<ProductRecord> {
        self.record("create_product", tenant_id, &draft.name)?;
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ProductRecord {
            id: format!("new-{}", n),
            name: draft.name.clone(),
            description: draft.description.clone(),
            price: draft.price,
            category: draft.category.clone(),
            brand: draft.brand.clone(),
            image: draft.image.clone(),
            ..Default::default()
        })
    }

    async fn delete_product(&self, tenant_id: &str, product_id: &str) -> ApiResult<()> {
        self.record("delete_product", tenant_id, product_id)
    }

    async fn record_audit_entry(&self, tenant_id: &str, entry: &AuditEntry) -> ApiResult<()> {
        self.hold("record_audit_entry").await;
        self.record("record_audit_entry", tenant_id, &entry.entity_id)
    }
}

/// Channel transport that records what the engine asked of it
#[derive(Debug, Default)]
pub struct FakeChannel {
    pub connects: usize,
    pub subscribes: Vec<String>,
    pub disconnects: usize,
}

impl ChannelTransport for FakeChannel {
    fn connect(&mut self) -> catalog_sync::Result<()> {
        self.connects += 1;
        Ok(())
    }

    fn subscribe(&mut self, channel: &str) -> catalog_sync::Result<()> {
        self.subscribes.push(channel.to_string());
        Ok(())
    }

    fn disconnect(&mut self) {
        self.disconnects += 1;
    }
}

pub fn engine() -> (Arc<FakeCatalogApi>, TestEngine) {
    engine_with(EngineConfig::default())
}

pub fn engine_with(config: EngineConfig) -> (Arc<FakeCatalogApi>, TestEngine) {
    init_tracing();
    let api = Arc::new(FakeCatalogApi::default());
    let engine = SyncEngine::new(Arc::clone(&api), FakeChannel::default(), config);
    (api, engine)
}

/// Select `tenant` and wait for its catalog to load
pub async fn select_tenant(engine: &mut TestEngine, tenant: &str) {
    engine
        .dispatch(catalog_sync::Action::SwitchTenant(tenant.to_string()))
        .unwrap();
    engine.settle().await;
}

pub fn product_ids(engine: &TestEngine) -> Vec<String> {
    engine.store().products().iter().map(|p| p.id.clone()).collect()
}
