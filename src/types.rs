//! Catalog entities and transport payloads

use serde::{Deserialize, Serialize};

pub type TenantId = String;
pub type ProductId = String;

/// Current wall-clock time in Unix millis
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A product as held in the local store
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default)]
    pub is_featured: bool,
    /// Local receipt time (Unix millis), never a server value
    #[serde(default)]
    pub last_updated: u64,
}

/// Partial product update: only the fields that changed are present
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
}

impl ProductPatch {
    pub fn new(id: impl Into<ProductId>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Shallow-merge the present fields into `record`
    pub fn apply_to(&self, record: &mut ProductRecord) {
        if let Some(ref name) = self.name {
            record.name = name.clone();
        }
        if let Some(ref description) = self.description {
            record.description = description.clone();
        }
        if let Some(price) = self.price {
            record.price = price;
        }
        if let Some(ref category) = self.category {
            record.category = category.clone();
        }
        if let Some(ref brand) = self.brand {
            record.brand = brand.clone();
        }
        if let Some(ref image) = self.image {
            record.image = Some(image.clone());
        }
        if let Some(rating) = self.rating {
            record.rating = Some(rating);
        }
        if let Some(is_featured) = self.is_featured {
            record.is_featured = is_featured;
        }
    }

    /// Build a record from a patch for an id not yet in the store
    pub fn to_record(&self) -> ProductRecord {
        let mut record = ProductRecord {
            id: self.id.clone(),
            ..Default::default()
        };
        self.apply_to(&mut record);
        record
    }
}

impl From<&ProductRecord> for ProductPatch {
    fn from(record: &ProductRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: Some(record.name.clone()),
            description: Some(record.description.clone()),
            price: Some(record.price),
            category: Some(record.category.clone()),
            brand: Some(record.brand.clone()),
            image: record.image.clone(),
            rating: record.rating,
            is_featured: Some(record.is_featured),
        }
    }
}

/// New product awaiting a server-assigned id
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Reference to a product by id (delete payload)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: ProductId,
}

/// Stock level for one product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub product_id: ProductId,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub reserved: u32,
    pub low_stock_threshold: u32,
    /// Local receipt time (Unix millis), monotonic per product
    #[serde(default)]
    pub last_updated: u64,
}

impl InventoryRecord {
    /// Placeholder used when a product has no stock record yet
    pub fn empty(product_id: impl Into<ProductId>, low_stock_threshold: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity: 0,
            reserved: 0,
            low_stock_threshold,
            last_updated: 0,
        }
    }

    pub fn available(&self) -> u32 {
        self.quantity.saturating_sub(self.reserved)
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity == 0
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity > 0 && self.quantity <= self.low_stock_threshold
    }
}

/// Partial stock update keyed by product id
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryPatch {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_stock_threshold: Option<u32>,
}

impl InventoryPatch {
    pub fn new(product_id: impl Into<ProductId>) -> Self {
        Self {
            product_id: product_id.into(),
            ..Default::default()
        }
    }

    pub fn quantity(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity: Some(quantity),
            ..Default::default()
        }
    }

    pub fn with_reserved(mut self, reserved: u32) -> Self {
        self.reserved = Some(reserved);
        self
    }

    pub fn apply_to(&self, record: &mut InventoryRecord) {
        if let Some(quantity) = self.quantity {
            record.quantity = quantity;
        }
        if let Some(reserved) = self.reserved {
            record.reserved = reserved;
        }
        if let Some(threshold) = self.low_stock_threshold {
            record.low_stock_threshold = threshold;
        }
    }

    pub fn to_record(&self, default_threshold: u32) -> InventoryRecord {
        let mut record = InventoryRecord::empty(self.product_id.clone(), default_threshold);
        self.apply_to(&mut record);
        record
    }
}

/// Login credentials: a username/password pair or a stored token
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Credentials {
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            token: None,
        }
    }

    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Default::default()
        }
    }

    /// Either a non-empty username or a non-empty token must be present
    pub fn is_well_formed(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false);
        present(&self.username) || present(&self.token)
    }
}

/// Authenticated user returned by `login`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// A seller partition the user can switch into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
}
