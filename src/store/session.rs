//! Session slice: authenticated user and active tenant

use serde::{Deserialize, Serialize};

use crate::types::{Tenant, TenantId, UserProfile};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    user_email: Option<String>,
    #[serde(default)]
    is_authenticated: bool,
    #[serde(default)]
    selected_tenant_id: Option<TenantId>,
    #[serde(default)]
    available_tenants: Vec<Tenant>,
    #[serde(skip)]
    loading: bool,
    #[serde(skip)]
    error: Option<String>,
    #[serde(skip)]
    revision: u64,
}

impl SessionState {
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    pub fn user_email(&self) -> Option<&str> {
        self.user_email.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    /// The tenant every product/inventory record currently belongs to
    pub fn tenant_id(&self) -> Option<&str> {
        self.selected_tenant_id.as_deref()
    }

    pub fn available_tenants(&self) -> &[Tenant] {
        &self.available_tenants
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    // === Mutations (dispatcher only) ===

    pub(crate) fn login_started(&mut self) {
        self.loading = true;
        self.error = None;
        self.touch();
    }

    pub(crate) fn login_succeeded(&mut self, profile: &UserProfile) {
        self.loading = false;
        self.is_authenticated = true;
        self.user_id = Some(profile.user_id.clone());
        self.user_name = Some(profile.user_name.clone());
        self.user_email = Some(profile.user_email.clone());
        self.touch();
    }

    pub(crate) fn login_failed(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
        self.touch();
    }

    pub(crate) fn set_error(&mut self, message: String) {
        self.error = Some(message);
        self.touch();
    }

    pub(crate) fn set_tenants(&mut self, tenants: Vec<Tenant>) {
        self.available_tenants = tenants;
        self.touch();
    }

    pub(crate) fn select_tenant(&mut self, tenant_id: TenantId) {
        self.selected_tenant_id = Some(tenant_id);
        self.touch();
    }

    pub(crate) fn logout(&mut self) {
        self.user_id = None;
        self.user_name = None;
        self.user_email = None;
        self.is_authenticated = false;
        self.selected_tenant_id = None;
        self.loading = false;
        self.error = None;
        self.touch();
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}
