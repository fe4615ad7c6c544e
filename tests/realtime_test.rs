//! Realtime channel integration tests
//!
//! Covers:
//! - Connection state machine driven by engine lifecycle and transport events
//! - Single tenant-scoped subscription, superseded on tenant switch
//! - Logout teardown and explicit reconnect
//! - Inbound delta merges

mod common;

use catalog_sync::{
    Action, ChannelEvent, ConnectionState, Connectivity, InventoryPatch, OperationStatus,
    ProductPatch,
};
use common::{engine, select_tenant};

// =============================================================================
// Connection lifecycle
// =============================================================================

#[tokio::test]
async fn test_start_connects_and_handshake_subscribes_once() {
    let (_api, mut engine) = engine();
    select_tenant(&mut engine, "t1").await;

    engine.start().unwrap();
    assert_eq!(engine.channel().state(), ConnectionState::Connecting);
    assert_eq!(engine.channel().transport().connects, 1);
    assert!(engine.channel().transport().subscribes.is_empty());

    engine.handle_channel_event(ChannelEvent::Connected);
    engine.handle_channel_event(ChannelEvent::Connected);

    assert_eq!(engine.channel().state(), ConnectionState::Connected);
    assert_eq!(engine.channel().transport().subscribes, vec!["tenant:t1"]);
    assert_eq!(engine.connectivity(), Connectivity::Online);
}

#[tokio::test]
async fn test_handshake_without_tenant_does_not_subscribe() {
    let (_api, mut engine) = engine();
    engine.start().unwrap();
    engine.handle_channel_event(ChannelEvent::Connected);

    assert!(engine.channel().is_connected());
    assert!(engine.channel().transport().subscribes.is_empty());

    select_tenant(&mut engine, "t2").await;
    assert_eq!(engine.channel().transport().subscribes, vec!["tenant:t2"]);
}

#[tokio::test]
async fn test_tenant_switch_resubscribes_while_connected() {
    let (_api, mut engine) = engine();
    select_tenant(&mut engine, "t1").await;
    engine.start().unwrap();
    engine.handle_channel_event(ChannelEvent::Connected);

    select_tenant(&mut engine, "t2").await;

    assert_eq!(
        engine.channel().transport().subscribes,
        vec!["tenant:t1", "tenant:t2"]
    );
    assert_eq!(engine.channel().subscribed_channel(), Some("tenant:t2"));
}

#[tokio::test]
async fn test_disconnect_goes_offline_and_reconnect_replays() {
    let (api, mut engine) = engine();
    select_tenant(&mut engine, "t1").await;
    engine.start().unwrap();
    engine.handle_channel_event(ChannelEvent::Connected);

    engine.handle_channel_event(ChannelEvent::Disconnected);
    assert_eq!(engine.channel().state(), ConnectionState::Disconnected);
    assert_eq!(engine.connectivity(), Connectivity::Offline);

    let outcome = engine
        .dispatch(Action::UpdateInventory(InventoryPatch::quantity("p1", 6)))
        .unwrap();
    assert!(outcome.queued);

    // Transport-level reconnection
    engine.handle_channel_event(ChannelEvent::Connected);
    assert_eq!(engine.connectivity(), Connectivity::Online);
    assert_eq!(
        engine.channel().transport().subscribes,
        vec!["tenant:t1", "tenant:t1"]
    );

    engine.settle().await;
    assert_eq!(api.calls_to("update_inventory").len(), 1);
    assert_eq!(engine.queue().operations()[0].status, OperationStatus::Completed);
}

#[tokio::test]
async fn test_logout_tears_down_until_explicit_reconnect() {
    let (_api, mut engine) = engine();
    select_tenant(&mut engine, "t1").await;
    engine.start().unwrap();
    engine.handle_channel_event(ChannelEvent::Connected);

    engine.dispatch(Action::Logout).unwrap();
    assert_eq!(engine.channel().state(), ConnectionState::Disconnected);
    assert_eq!(engine.channel().transport().disconnects, 1);
    assert!(engine.channel().is_torn_down());

    // A late handshake from the transport is ignored
    engine.handle_channel_event(ChannelEvent::Connected);
    assert_eq!(engine.channel().state(), ConnectionState::Disconnected);
    engine.start().unwrap();
    assert_eq!(engine.channel().transport().connects, 1);

    engine.dispatch(Action::Reconnect).unwrap();
    assert_eq!(engine.channel().state(), ConnectionState::Connecting);
    assert_eq!(engine.channel().transport().connects, 2);
}

// =============================================================================
// Inbound deltas
// =============================================================================

#[tokio::test]
async fn test_pushes_merge_in_arrival_order() {
    let (_api, mut engine) = engine();
    select_tenant(&mut engine, "t1").await;
    engine.start().unwrap();
    engine.handle_channel_event(ChannelEvent::Connected);

    let before = engine.store().inventory().get("p1").unwrap().last_updated;
    engine.handle_channel_event(ChannelEvent::InventoryUpdate(vec![
        InventoryPatch::quantity("p1", 7),
        InventoryPatch::quantity("p9", 1),
    ]));
    engine.handle_channel_event(ChannelEvent::InventoryUpdate(vec![InventoryPatch::quantity("p1", 4)]));

    let p1 = engine.store().inventory().get("p1").unwrap();
    assert_eq!(p1.quantity, 4);
    assert!(p1.last_updated >= before);
    assert_eq!(engine.store().inventory().get("p9").unwrap().low_stock_threshold, 5);

    engine.handle_channel_event(ChannelEvent::ProductUpdate(ProductPatch::new("p2").with_price(275.0)));
    let p2 = engine.store().products().get("p2").unwrap();
    assert_eq!(p2.price, 275.0);
    assert_eq!(p2.name, "Oak Desk");

    // Pushes are not audited
    assert!(engine.audit().is_empty());
}

#[tokio::test]
async fn test_push_overwrites_optimistic_edit() {
    let (_api, mut engine) = engine();
    select_tenant(&mut engine, "t1").await;
    engine.start().unwrap();
    engine.handle_channel_event(ChannelEvent::Connected);

    engine
        .dispatch(Action::UpdateInventory(InventoryPatch::quantity("p1", 20)))
        .unwrap();
    engine.handle_channel_event(ChannelEvent::InventoryUpdate(vec![InventoryPatch::quantity("p1", 2)]));
    assert_eq!(engine.store().inventory().get("p1").unwrap().quantity, 2);

    // The confirmation arrives last and wins
    engine.settle().await;
    assert_eq!(engine.store().inventory().get("p1").unwrap().quantity, 20);
}

#[tokio::test]
async fn test_pushes_ignored_without_live_connection() {
    let (_api, mut engine) = engine();
    select_tenant(&mut engine, "t1").await;

    engine.handle_channel_event(ChannelEvent::InventoryUpdate(vec![InventoryPatch::quantity("p1", 99)]));
    assert_eq!(engine.store().inventory().get("p1").unwrap().quantity, 3);
}
