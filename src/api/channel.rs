//! Persistent push channel transport

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::types::{InventoryPatch, ProductPatch};

/// Inbound channel callbacks, in arrival order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ChannelEvent {
    /// Handshake acknowledged (`onConnect`)
    Connected,
    /// Transport-level disconnect (`onDisconnect`)
    Disconnected,
    /// `inventory_update`: batch of changed stock fields
    InventoryUpdate(Vec<InventoryPatch>),
    /// `product_update`: one full or partial product
    ProductUpdate(ProductPatch),
}

pub type ChannelEventSender = mpsc::UnboundedSender<ChannelEvent>;
pub type ChannelEventReceiver = mpsc::UnboundedReceiver<ChannelEvent>;

/// Create the queue a transport uses to hand events to the engine
pub fn channel_events() -> (ChannelEventSender, ChannelEventReceiver) {
    mpsc::unbounded_channel()
}

/// One logical push connection.
///
/// Calls are fire-and-forget; outcomes arrive later as [`ChannelEvent`]s on
/// the sender the transport was built with. A connection holds at most one
/// subscription and `subscribe` supersedes the previous one.
pub trait ChannelTransport: Send {
    /// Begin connecting; `Connected` follows once the handshake completes
    fn connect(&mut self) -> Result<()>;

    fn subscribe(&mut self, channel: &str) -> Result<()>;

    /// Close the connection and stop any transport-level reconnection
    fn disconnect(&mut self);
}
