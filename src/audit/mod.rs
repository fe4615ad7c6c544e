//! Audit trail of mutating actions
//!
//! Every confirmed inventory or product change produces an [`AuditEntry`].
//! Entries go to two places:
//! - `logs`: most recent first, capped (oldest dropped)
//! - `pending`: everything not yet acknowledged by the remote audit service,
//!   uncapped and pruned only by an id-matched `LogsSynced` ack

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::dispatch::{Action, EntityType};
use crate::store::SessionState;
use crate::types::{now_millis, TenantId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub timestamp: u64,
    pub user_id: Option<String>,
    pub tenant_id: Option<TenantId>,
    pub action_type: String,
    pub entity_id: String,
    pub entity_type: EntityType,
    /// The action payload minus its id field
    pub changes: serde_json::Value,
}

/// Build the entry for a mutating action.
///
/// Returns `None` when the payload carries no identifier for `entity`.
pub fn synthesize(action: &Action, entity: EntityType, session: &SessionState) -> Option<AuditEntry> {
    let id_field = entity.id_field();
    let mut changes = action.payload();
    let entity_id = match changes.as_object_mut()?.remove(id_field)? {
        serde_json::Value::String(id) => id,
        other => other.to_string(),
    };

    Some(AuditEntry {
        id: uuid::Uuid::new_v4().to_string(),
        timestamp: now_millis(),
        user_id: session.user_id().map(str::to_string),
        tenant_id: session.tenant_id().map(str::to_string),
        action_type: action.action_type().to_string(),
        entity_id,
        entity_type: entity,
        changes,
    })
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    logs: VecDeque<AuditEntry>,
    pending: Vec<AuditEntry>,
    capacity: usize,
    revision: u64,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::with_capacity(100)
    }
}

impl AuditLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            logs: VecDeque::with_capacity(capacity),
            pending: Vec::new(),
            capacity,
            revision: 0,
        }
    }

    /// Most recent first
    pub fn logs(&self) -> impl Iterator<Item = &AuditEntry> {
        self.logs.iter()
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    /// Entries awaiting remote acknowledgement, oldest first
    pub fn pending(&self) -> &[AuditEntry] {
        &self.pending
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    // === Mutations (dispatcher only) ===

    pub(crate) fn record(&mut self, entry: AuditEntry) {
        self.pending.push(entry.clone());
        self.logs.push_front(entry);
        self.logs.truncate(self.capacity);
        self.revision += 1;
    }

    /// Drop acknowledged ids from `pending`; returns how many matched
    pub(crate) fn mark_synced(&mut self, ids: &[String]) -> usize {
        let before = self.pending.len();
        self.pending.retain(|entry| !ids.contains(&entry.id));
        let removed = before - self.pending.len();
        if removed > 0 {
            self.revision += 1;
        }
        removed
    }

    /// Clear the visible log; unacknowledged entries stay pending
    pub(crate) fn clear(&mut self) {
        self.logs.clear();
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InventoryPatch, ProductRef};

    fn entry(n: usize) -> AuditEntry {
        AuditEntry {
            id: format!("e{}", n),
            timestamp: n as u64,
            user_id: None,
            tenant_id: Some("t1".into()),
            action_type: "inventory.update.fulfilled".into(),
            entity_id: "p1".into(),
            entity_type: EntityType::Inventory,
            changes: serde_json::json!({"quantity": n}),
        }
    }

    #[test]
    fn test_log_is_capped_but_pending_is_not() {
        let mut log = AuditLog::with_capacity(100);
        for n in 0..101 {
            log.record(entry(n));
        }

        assert_eq!(log.len(), 100);
        assert_eq!(log.pending().len(), 101);
        assert_eq!(log.logs().next().unwrap().id, "e100");
        assert_eq!(log.logs().last().unwrap().id, "e1");
    }

    #[test]
    fn test_mark_synced_is_id_matched() {
        let mut log = AuditLog::default();
        log.record(entry(1));
        log.record(entry(2));

        assert_eq!(log.mark_synced(&["e1".into(), "missing".into()]), 1);
        assert_eq!(log.pending().len(), 1);
        assert_eq!(log.pending()[0].id, "e2");
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_clear_keeps_pending() {
        let mut log = AuditLog::default();
        log.record(entry(1));
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.pending().len(), 1);
    }

    #[test]
    fn test_synthesize_strips_id_field() {
        let session = SessionState::default();
        let action = Action::InventoryUpdated(InventoryPatch::quantity("p7", 3));
        let entry = synthesize(&action, EntityType::Inventory, &session).unwrap();

        assert_eq!(entry.entity_id, "p7");
        assert_eq!(entry.entity_type, EntityType::Inventory);
        assert_eq!(entry.changes, serde_json::json!({"quantity": 3}));
        assert_eq!(entry.action_type, "inventory.update.fulfilled");

        let action = Action::ProductDeleted(ProductRef { id: "p2".into() });
        let entry = synthesize(&action, EntityType::Product, &session).unwrap();
        assert_eq!(entry.entity_id, "p2");
        assert_eq!(entry.changes, serde_json::json!({}));
    }

    #[test]
    fn test_synthesize_without_identifier() {
        let session = SessionState::default();
        assert!(synthesize(&Action::Logout, EntityType::Product, &session).is_none());
    }
}
