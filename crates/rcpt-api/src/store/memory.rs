//! In-memory receipt store.
//!
//! Thread-safe via `parking_lot::RwLock`. Nothing survives a restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rcpt_core::{AnchorResolution, AnchorStatus, Receipt, ReceiptId, StateTransitionError};

use super::{ReceiptStore, StoreError};

/// Process-local [`ReceiptStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryReceiptStore {
    data: Arc<RwLock<HashMap<ReceiptId, Receipt>>>,
}

impl InMemoryReceiptStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored receipts.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store holds no receipts.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

#[async_trait]
impl ReceiptStore for InMemoryReceiptStore {
    async fn insert(&self, receipt: &Receipt) -> Result<(), StoreError> {
        let mut guard = self.data.write();
        if guard.contains_key(&receipt.id) {
            return Err(StoreError::Duplicate(receipt.id));
        }
        guard.insert(receipt.id, receipt.clone());
        Ok(())
    }

    async fn get(&self, id: &ReceiptId) -> Result<Option<Receipt>, StoreError> {
        Ok(self.data.read().get(id).cloned())
    }

    async fn resolve_anchor(
        &self,
        id: &ReceiptId,
        resolution: &AnchorResolution,
        at: DateTime<Utc>,
    ) -> Result<Receipt, StoreError> {
        let mut guard = self.data.write();
        let receipt = guard.get_mut(id).ok_or(StoreError::NotFound(*id))?;
        receipt
            .resolve(resolution, at)
            .map_err(|StateTransitionError::AlreadyTerminal { from, .. }| {
                StoreError::Conflict {
                    id: *id,
                    status: from,
                }
            })?;
        Ok(receipt.clone())
    }

    async fn list_pending(&self, limit: usize) -> Result<Vec<Receipt>, StoreError> {
        let guard = self.data.read();
        let mut pending: Vec<Receipt> = guard
            .values()
            .filter(|r| r.status == AnchorStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        pending.truncate(limit);
        Ok(pending)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
