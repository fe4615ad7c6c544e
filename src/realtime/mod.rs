//! Realtime channel manager
//!
//! Owns one logical push connection and at most one tenant subscription.
//!
//! ```text
//! Disconnected ──start/reconnect──▶ Connecting ──handshake──▶ Connected
//!      ▲                                                          │
//!      └──────────────── transport disconnect / logout ───────────┘
//! ```
//!
//! Reaching `Connected` subscribes to `<prefix>:<tenant id>`. Logout tears the
//! connection down for good: later handshakes and `start` calls are ignored
//! until an explicit `reconnect`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::ChannelTransport;
use crate::error::{Result, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

pub struct ChannelManager<T> {
    transport: T,
    state: ConnectionState,
    subscribed: Option<String>,
    torn_down: bool,
    prefix: String,
}

impl<T: ChannelTransport> ChannelManager<T> {
    pub fn new(transport: T, prefix: impl Into<String>) -> Self {
        Self {
            transport,
            state: ConnectionState::Disconnected,
            subscribed: None,
            torn_down: false,
            prefix: prefix.into(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// The single active subscription, if any
    pub fn subscribed_channel(&self) -> Option<&str> {
        self.subscribed.as_deref()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn channel_name(&self, tenant_id: &str) -> String {
        format!("{}:{}", self.prefix, tenant_id)
    }

    /// Inbound pushes are merged only on a live connection
    pub fn accepts_pushes(&self) -> bool {
        self.is_connected()
    }

    /// `Disconnected → Connecting`. No-op when already connecting, connected
    /// or torn down.
    pub fn start(&mut self) -> Result<()> {
        if self.torn_down {
            debug!("Channel torn down, ignoring start");
            return Ok(());
        }
        if self.state != ConnectionState::Disconnected {
            return Ok(());
        }

        self.transport.connect()?;
        self.state = ConnectionState::Connecting;
        info!("Realtime channel connecting");
        Ok(())
    }

    /// Explicit reconnect request, the only way back after logout
    pub fn reconnect(&mut self) -> Result<()> {
        self.torn_down = false;
        self.start()
    }

    /// Handshake acknowledged. Returns true if this was a transition into
    /// `Connected`.
    pub fn on_connected(&mut self, tenant_id: Option<&str>) -> Result<bool> {
        if self.torn_down {
            warn!("Handshake after teardown ignored");
            return Ok(false);
        }
        if self.state == ConnectionState::Connected {
            return Ok(false);
        }

        self.state = ConnectionState::Connected;
        info!("Realtime channel connected");
        if let Some(tenant_id) = tenant_id {
            self.subscribe(tenant_id)?;
        }
        Ok(true)
    }

    /// Transport-level disconnect. Returns true if the state changed.
    pub fn on_disconnected(&mut self) -> bool {
        if self.state == ConnectionState::Disconnected {
            return false;
        }
        self.state = ConnectionState::Disconnected;
        self.subscribed = None;
        info!("Realtime channel disconnected");
        true
    }

    /// Re-subscribe for the new tenant while connected; otherwise the
    /// subscription happens on the next handshake.
    pub fn switch_tenant(&mut self, tenant_id: &str) -> Result<()> {
        if self.is_connected() {
            self.subscribe(tenant_id)?;
        }
        Ok(())
    }

    /// Close the connection and block automatic reconnection
    pub fn logout(&mut self) {
        self.transport.disconnect();
        self.state = ConnectionState::Disconnected;
        self.subscribed = None;
        self.torn_down = true;
        info!("Realtime channel torn down");
    }

    fn subscribe(&mut self, tenant_id: &str) -> Result<()> {
        let channel = self.channel_name(tenant_id);
        if self.subscribed.as_deref() == Some(channel.as_str()) {
            return Ok(());
        }
        self.transport
            .subscribe(&channel)
            .map_err(|e| SyncError::Channel(format!("subscribe to {} failed: {}", channel, e)))?;
        info!(channel = %channel, "Subscribed to tenant channel");
        self.subscribed = Some(channel);
        Ok(())
    }
}
