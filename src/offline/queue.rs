//! Ordered log of deferred commands
//!
//! Status only moves `pending → completed` or `pending → failed`. Operations
//! are never removed implicitly; `remove_completed` is the only pruning.

use serde::{Deserialize, Serialize};

use crate::dispatch::Command;
use crate::types::{now_millis, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Completed,
    Failed,
}

/// A deferred command and its completion state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: String,
    /// Enqueue time (Unix millis)
    pub timestamp: u64,
    pub action_type: String,
    /// The full command as authored
    pub command: Command,
    /// Tenant active at enqueue time; replay targets this tenant
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when this operation retries a failed one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_of: Option<String>,
}

impl Operation {
    pub fn new(command: Command, tenant_id: Option<TenantId>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: now_millis(),
            action_type: command.action_type().to_string(),
            command,
            tenant_id,
            status: OperationStatus::Pending,
            error: None,
            retry_of: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == OperationStatus::Pending
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationQueue {
    operations: Vec<Operation>,
    #[serde(skip)]
    revision: u64,
}

impl OperationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn get(&self, id: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.id == id)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn pending(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter().filter(|op| op.is_pending())
    }

    pub fn has_pending(&self) -> bool {
        self.operations.iter().any(|op| op.is_pending())
    }

    /// Oldest pending operation: the next replay candidate
    pub fn next_pending(&self) -> Option<&Operation> {
        self.operations.iter().find(|op| op.is_pending())
    }

    // === Mutations (dispatcher only) ===

    /// Replace the contents with rehydrated operations
    pub(crate) fn restore(&mut self, operations: Vec<Operation>) {
        self.operations = operations;
        self.touch();
    }

    pub(crate) fn enqueue(&mut self, operation: Operation) -> String {
        let id = operation.id.clone();
        self.operations.push(operation);
        self.touch();
        id
    }

    /// Returns false when the id is unknown or already terminal
    pub(crate) fn complete(&mut self, id: &str) -> bool {
        match self.operations.iter_mut().find(|op| op.id == id && op.is_pending()) {
            Some(op) => {
                op.status = OperationStatus::Completed;
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Returns false when the id is unknown or already terminal
    pub(crate) fn fail(&mut self, id: &str, error: String) -> bool {
        match self.operations.iter_mut().find(|op| op.id == id && op.is_pending()) {
            Some(op) => {
                op.status = OperationStatus::Failed;
                op.error = Some(error);
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Enqueue a fresh pending copy of a failed operation.
    /// The failed one keeps its status.
    pub(crate) fn retry(&mut self, id: &str) -> Option<String> {
        let failed = self
            .operations
            .iter()
            .find(|op| op.id == id && op.status == OperationStatus::Failed)?;
        let mut retry = Operation::new(failed.command.clone(), failed.tenant_id.clone());
        retry.retry_of = Some(failed.id.clone());
        Some(self.enqueue(retry))
    }

    pub(crate) fn remove_completed(&mut self) -> usize {
        let before = self.operations.len();
        self.operations.retain(|op| op.status != OperationStatus::Completed);
        let removed = before - self.operations.len();
        if removed > 0 {
            self.touch();
        }
        removed
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}
