//! Reference in-memory [`Store`] implementation.
//!
//! Backed by a [`DashMap`] keyed on [`TransactionId`], following the same
//! concurrent-map preference used by the [`Registry`](crate::registry::Registry).
//! The recovery lease is a single `parking_lot::Mutex`-guarded slot, which is
//! sufficient for one process; a production deployment shares a lease across
//! coordinator instances through an external key-value store instead.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::common::{ComponentId, TransactionId};
use crate::error::{CoordinatorError, Result};
use crate::store::{Lease, Store};
use crate::transaction::{ComponentEntry, Transaction, TransactionStatus, TryStatus};

struct LeaseState {
    holder: Uuid,
    expires_at: Instant,
}

/// In-process reference `Store`. Suitable for tests and single-process
/// deployments; not durable across restarts.
pub struct InMemoryStore {
    transactions: DashMap<TransactionId, Transaction>,
    lease: Mutex<Option<LeaseState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            transactions: DashMap::new(),
            lease: Mutex::new(None),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_tx(&self, components: Vec<ComponentEntry>) -> Result<TransactionId> {
        let id = TransactionId::new();
        let tx = Transaction::new(id, components);
        self.transactions.insert(id, tx);
        Ok(id)
    }

    async fn tx_update(
        &self,
        tx_id: TransactionId,
        component_id: &ComponentId,
        accepted: bool,
    ) -> Result<()> {
        let mut entry = self
            .transactions
            .get_mut(&tx_id)
            .ok_or(CoordinatorError::NotFound(tx_id))?;

        let target = if accepted {
            TryStatus::Accepted
        } else {
            TryStatus::Rejected
        };

        let slot = entry
            .components
            .iter_mut()
            .find(|c| &c.component_id == component_id)
            .ok_or_else(|| {
                CoordinatorError::state_conflict(
                    tx_id,
                    format!("component {component_id} is not part of this transaction"),
                )
            })?;

        match slot.try_status {
            TryStatus::Pending => slot.try_status = target,
            existing if existing == target => {} // idempotent repeat
            _ => {
                return Err(CoordinatorError::state_conflict(
                    tx_id,
                    format!(
                        "component {component_id} already resolved to {:?}, cannot set {:?}",
                        slot.try_status, target
                    ),
                ));
            }
        }
        entry.updated_at = std::time::SystemTime::now();
        Ok(())
    }

    async fn tx_submit(&self, tx_id: TransactionId, success: bool) -> Result<()> {
        let mut entry = self
            .transactions
            .get_mut(&tx_id)
            .ok_or(CoordinatorError::NotFound(tx_id))?;

        let target = if success {
            TransactionStatus::Successful
        } else {
            TransactionStatus::Failed
        };

        match entry.status {
            TransactionStatus::Hanging => {
                if success && !entry.all_accepted() {
                    return Err(CoordinatorError::state_conflict(
                        tx_id,
                        "cannot submit success: not every component accepted",
                    ));
                }
                entry.status = target;
                entry.updated_at = std::time::SystemTime::now();
                Ok(())
            }
            existing if existing == target => Ok(()), // idempotent repeat
            _ => Err(CoordinatorError::state_conflict(
                tx_id,
                format!("transaction already terminal at {:?}", entry.status),
            )),
        }
    }

    async fn get_hanging_txs(&self) -> Result<Vec<Transaction>> {
        Ok(self
            .transactions
            .iter()
            .filter(|entry| entry.status == TransactionStatus::Hanging)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn get_tx(&self, tx_id: TransactionId) -> Result<Transaction> {
        self.transactions
            .get(&tx_id)
            .map(|entry| entry.value().clone())
            .ok_or(CoordinatorError::NotFound(tx_id))
    }

    async fn lock(&self, ttl: Duration) -> Result<Lease> {
        let mut guard = self.lease.lock();
        let now = Instant::now();
        if let Some(existing) = guard.as_ref() {
            if existing.expires_at > now {
                return Err(CoordinatorError::LockHeld);
            }
        }
        let holder = Uuid::new_v4();
        *guard = Some(LeaseState {
            holder,
            expires_at: now + ttl,
        });
        Ok(Lease { holder })
    }

    async fn unlock(&self, lease: Lease) -> Result<()> {
        let mut guard = self.lease.lock();
        if let Some(existing) = guard.as_ref() {
            if existing.holder == lease.holder {
                *guard = None;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn components(ids: &[&str]) -> Vec<ComponentEntry> {
        ids.iter()
            .map(|id| ComponentEntry::new(ComponentId::new(*id), Default::default()))
            .collect()
    }

    #[tokio::test]
    async fn create_then_update_then_submit() {
        let store = InMemoryStore::new();
        let tx_id = store.create_tx(components(&["a", "b"])).await.unwrap();

        store
            .tx_update(tx_id, &ComponentId::new("a"), true)
            .await
            .unwrap();
        store
            .tx_update(tx_id, &ComponentId::new("b"), true)
            .await
            .unwrap();

        store.tx_submit(tx_id, true).await.unwrap();
        let tx = store.get_tx(tx_id).await.unwrap();
        assert_eq!(tx.status, TransactionStatus::Successful);
    }

    #[tokio::test]
    async fn submit_success_rejected_without_full_acceptance() {
        let store = InMemoryStore::new();
        let tx_id = store.create_tx(components(&["a"])).await.unwrap();
        let err = store.tx_submit(tx_id, true).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::StateConflict { .. }));
    }

    #[tokio::test]
    async fn conflicting_update_rejected() {
        let store = InMemoryStore::new();
        let tx_id = store.create_tx(components(&["a"])).await.unwrap();
        store
            .tx_update(tx_id, &ComponentId::new("a"), true)
            .await
            .unwrap();
        let err = store
            .tx_update(tx_id, &ComponentId::new("a"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::StateConflict { .. }));
    }

    #[tokio::test]
    async fn repeated_update_is_idempotent() {
        let store = InMemoryStore::new();
        let tx_id = store.create_tx(components(&["a"])).await.unwrap();
        store
            .tx_update(tx_id, &ComponentId::new("a"), true)
            .await
            .unwrap();
        store
            .tx_update(tx_id, &ComponentId::new("a"), true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn lease_excludes_concurrent_holder() {
        let store = InMemoryStore::new();
        let lease = store.lock(Duration::from_secs(5)).await.unwrap();
        let err = store.lock(Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::LockHeld));
        store.unlock(lease).await.unwrap();
        store.lock(Duration::from_secs(5)).await.unwrap();
    }

    #[tokio::test]
    async fn lease_expires() {
        let store = InMemoryStore::new();
        let _lease = store.lock(Duration::from_millis(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.lock(Duration::from_secs(5)).await.unwrap();
    }
}
