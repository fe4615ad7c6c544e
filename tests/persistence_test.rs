//! Slice persistence and rehydration
//!
//! Covers:
//! - Whitelisted slices written under `<prefix>.<slice>`
//! - A fresh engine restores session, queue and cart, then resumes replay
//! - Non-whitelisted slices are never written

mod common;

use std::sync::Arc;

use catalog_sync::{
    Action, Connectivity, Credentials, EngineConfig, InventoryPatch, JsonFileStore, KeyValueStore,
    MemoryStore, OperationStatus, SyncEngine,
};
use common::{init_tracing, select_tenant, FakeCatalogApi, FakeChannel, TestEngine};
use tempfile::TempDir;

fn persisted_engine(
    config: EngineConfig,
    backend: Arc<dyn KeyValueStore>,
) -> (Arc<FakeCatalogApi>, TestEngine) {
    init_tracing();
    let api = Arc::new(FakeCatalogApi::default());
    let engine = SyncEngine::new(Arc::clone(&api), FakeChannel::default(), config).with_persistence(backend);
    (api, engine)
}

// =============================================================================
// Restart
// =============================================================================

#[tokio::test]
async fn test_restart_restores_slices_and_resumes_replay() {
    let dir = TempDir::new().unwrap();
    let backend: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(dir.path()));

    {
        let (api, mut engine) = persisted_engine(EngineConfig::default(), Arc::clone(&backend));
        engine.dispatch(Action::Login(Credentials::password("demo", "demo"))).unwrap();
        engine.settle().await;
        select_tenant(&mut engine, "t1").await;
        engine
            .dispatch(Action::AddToCart {
                product_id: "p1".into(),
                quantity: 2,
            })
            .unwrap();

        engine
            .dispatch(Action::ConnectivityChanged(Connectivity::Offline))
            .unwrap();
        engine
            .dispatch(Action::UpdateInventory(InventoryPatch::quantity("p2", 7)))
            .unwrap();
        engine.settle().await;
        assert!(api.calls_to("update_inventory").is_empty());
    }

    for slice in ["session", "offline", "cart"] {
        assert!(dir.path().join(format!("root.{}.json", slice)).exists());
    }

    let (api, mut engine) = persisted_engine(EngineConfig::default(), Arc::clone(&backend));
    engine.rehydrate().unwrap();

    let session = engine.store().session();
    assert!(session.is_authenticated());
    assert_eq!(session.user_id(), Some("user-123"));
    assert_eq!(session.tenant_id(), Some("t1"));

    let cart = engine.store().cart();
    assert_eq!(cart.item("p1").unwrap().quantity, 2);
    assert_eq!(cart.count(), 2);
    assert_eq!(cart.total(), 60.0);

    assert_eq!(engine.queue().pending().count(), 1);
    // The catalog itself is never persisted
    assert!(engine.store().products().is_empty());

    engine.start().unwrap();
    engine.settle().await;

    assert_eq!(api.calls_to("update_inventory"), vec!["update_inventory:t1:p2"]);
    assert_eq!(engine.queue().operations()[0].status, OperationStatus::Completed);

    // The completed status is written back
    let saved = backend.load("root.offline").unwrap().unwrap();
    assert_eq!(saved["operations"][0]["status"], "completed");
}

#[tokio::test]
async fn test_rehydrate_without_saved_state_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let backend: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(dir.path().join("fresh")));
    let (_api, mut engine) = persisted_engine(EngineConfig::default(), backend);

    engine.rehydrate().unwrap();
    assert!(!engine.store().session().is_authenticated());
    assert!(engine.queue().is_empty());
    assert!(engine.store().cart().items().is_empty());
}

#[tokio::test]
async fn test_corrupt_slice_fails_rehydrate() {
    let backend = Arc::new(MemoryStore::new());
    backend
        .save("root.cart", &serde_json::json!({"items": "not a list"}))
        .unwrap();
    let (_api, mut engine) = persisted_engine(EngineConfig::default(), backend);

    assert!(engine.rehydrate().is_err());
}

// =============================================================================
// Whitelist
// =============================================================================

#[tokio::test]
async fn test_only_whitelisted_slices_are_written() {
    let mut config = EngineConfig::default();
    config.persistence.key_prefix = "shop".into();
    config.persistence.whitelist = vec!["cart".into()];

    let backend = Arc::new(MemoryStore::new());
    let (_api, mut engine) = persisted_engine(config, Arc::clone(&backend) as Arc<dyn KeyValueStore>);

    engine.dispatch(Action::Login(Credentials::token("stored-token"))).unwrap();
    engine.settle().await;
    select_tenant(&mut engine, "t1").await;
    engine
        .dispatch(Action::ConnectivityChanged(Connectivity::Offline))
        .unwrap();
    engine
        .dispatch(Action::UpdateInventory(InventoryPatch::quantity("p1", 1)))
        .unwrap();
    assert!(backend.keys().is_empty());

    engine
        .dispatch(Action::AddToCart {
            product_id: "p2".into(),
            quantity: 1,
        })
        .unwrap();

    assert_eq!(backend.keys(), vec!["shop.cart"]);
    let cart = backend.load("shop.cart").unwrap().unwrap();
    assert_eq!(cart["items"][0]["id"], "p2");
    assert_eq!(cart["items"][0]["maxQuantity"], 40);
}
