//! The transaction record and its per-component state machine.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::common::{ComponentId, Payload, TransactionId};

/// Per-component Try outcome. `Pending` until the component replies (or the
/// orchestrator gives up waiting for it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TryStatus {
    Pending,
    Accepted,
    Rejected,
}

/// One participant's slot within a [`Transaction`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentEntry {
    pub component_id: ComponentId,
    pub try_status: TryStatus,
    pub request_payload: Payload,
}

impl ComponentEntry {
    pub fn new(component_id: ComponentId, request_payload: Payload) -> Self {
        Self {
            component_id,
            try_status: TryStatus::Pending,
            request_payload,
        }
    }
}

/// Overall transaction status, as persisted by the [`Store`](crate::store::Store).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Hanging,
    Successful,
    Failed,
}

/// A transaction record: one Try/Confirm/Cancel round across a fixed set of
/// components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub status: TransactionStatus,
    pub components: Vec<ComponentEntry>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl Transaction {
    pub fn new(id: TransactionId, components: Vec<ComponentEntry>) -> Self {
        let now = SystemTime::now();
        Self {
            id,
            status: TransactionStatus::Hanging,
            components,
            created_at: now,
            updated_at: now,
        }
    }

    /// Every entry has been accepted.
    pub fn all_accepted(&self) -> bool {
        self.components
            .iter()
            .all(|c| c.try_status == TryStatus::Accepted)
    }

    /// At least one entry was rejected.
    pub fn any_rejected(&self) -> bool {
        self.components
            .iter()
            .any(|c| c.try_status == TryStatus::Rejected)
    }

    /// No entry is still awaiting a Try reply.
    pub fn try_complete(&self) -> bool {
        self.components
            .iter()
            .all(|c| c.try_status != TryStatus::Pending)
    }

    /// Whether `timeout` has elapsed since this record was created.
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.created_at
            .elapsed()
            .map(|elapsed| elapsed > timeout)
            .unwrap_or(false)
    }

    pub fn component_ids(&self) -> Vec<ComponentId> {
        self.components
            .iter()
            .map(|c| c.component_id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, status: TryStatus) -> ComponentEntry {
        ComponentEntry {
            component_id: ComponentId::new(id),
            try_status: status,
            request_payload: Payload::default(),
        }
    }

    #[test]
    fn all_accepted_requires_every_entry() {
        let tx = Transaction::new(
            TransactionId::new(),
            vec![
                entry("a", TryStatus::Accepted),
                entry("b", TryStatus::Accepted),
            ],
        );
        assert!(tx.all_accepted());
        assert!(!tx.any_rejected());
        assert!(tx.try_complete());
    }

    #[test]
    fn any_rejected_short_circuits_all_accepted() {
        let tx = Transaction::new(
            TransactionId::new(),
            vec![
                entry("a", TryStatus::Accepted),
                entry("b", TryStatus::Rejected),
            ],
        );
        assert!(!tx.all_accepted());
        assert!(tx.any_rejected());
        assert!(tx.try_complete());
    }

    #[test]
    fn pending_entry_blocks_try_complete() {
        let tx = Transaction::new(
            TransactionId::new(),
            vec![entry("a", TryStatus::Accepted), entry("b", TryStatus::Pending)],
        );
        assert!(!tx.try_complete());
        assert!(!tx.all_accepted());
    }

    #[test]
    fn expiry_is_relative_to_creation() {
        let tx = Transaction::new(TransactionId::new(), vec![entry("a", TryStatus::Pending)]);
        assert!(!tx.is_expired(Duration::from_secs(60)));
        assert!(tx.is_expired(Duration::from_secs(0)));
    }
}
