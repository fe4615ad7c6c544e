//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SyncError};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub cart: CartConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub views: ViewsConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Maximum entries kept in the visible audit log
    #[serde(default = "default_audit_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartConfig {
    /// Cap applied to cart lines whose stock level is unknown
    #[serde(default = "default_max_quantity")]
    pub default_max_quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Threshold used for records that arrive without one
    #[serde(default = "default_low_stock_threshold")]
    pub default_low_stock_threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Channel names are `<prefix>:<tenant id>`
    #[serde(default = "default_channel_prefix")]
    pub channel_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Namespace for persisted keys
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Slices that survive restarts
    #[serde(default = "default_whitelist")]
    pub whitelist: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewsConfig {
    /// Products per render batch
    #[serde(default = "default_render_batch_size")]
    pub render_batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Fetch products and inventory after every tenant switch
    #[serde(default = "default_true")]
    pub refresh_on_tenant_switch: bool,
}

// Defaults
fn default_audit_capacity() -> usize { 100 }
fn default_max_quantity() -> u32 { 10 }
fn default_low_stock_threshold() -> u32 { 5 }
fn default_channel_prefix() -> String { "tenant".to_string() }
fn default_key_prefix() -> String { "root".to_string() }
fn default_whitelist() -> Vec<String> {
    vec![
        "session".to_string(),
        "offline".to_string(),
        "cart".to_string(),
    ]
}
fn default_render_batch_size() -> usize { 200 }
fn default_true() -> bool { true }

impl Default for AuditConfig {
    fn default() -> Self {
        Self { capacity: default_audit_capacity() }
    }
}

impl Default for CartConfig {
    fn default() -> Self {
        Self { default_max_quantity: default_max_quantity() }
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self { default_low_stock_threshold: default_low_stock_threshold() }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self { channel_prefix: default_channel_prefix() }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            whitelist: default_whitelist(),
        }
    }
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self { render_batch_size: default_render_batch_size() }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { refresh_on_tenant_switch: true }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, falling back to defaults when it does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.audit.capacity == 0 {
            return Err(SyncError::Config("audit.capacity must be at least 1".into()));
        }
        if self.cart.default_max_quantity == 0 {
            return Err(SyncError::Config("cart.default_max_quantity must be at least 1".into()));
        }
        if self.views.render_batch_size == 0 {
            return Err(SyncError::Config("views.render_batch_size must be at least 1".into()));
        }
        if self.realtime.channel_prefix.is_empty() {
            return Err(SyncError::Config("realtime.channel_prefix must not be empty".into()));
        }
        Ok(())
    }

    /// Whether a persisted slice is whitelisted
    pub fn persists(&self, slice: &str) -> bool {
        self.persistence.whitelist.iter().any(|s| s == slice)
    }
}
