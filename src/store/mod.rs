//! The persistence contract the coordinator depends on.
//!
//! Concrete storage drivers (a relational table layout, a distributed lock
//! service) are out of scope for this crate; [`memory::InMemoryStore`] is the
//! reference implementation shipped so the crate is runnable and testable
//! standalone.

pub mod memory;

use async_trait::async_trait;

use crate::common::{ComponentId, TransactionId};
use crate::error::Result;
use crate::transaction::{ComponentEntry, Transaction};

/// A held process-wide recovery lease.
#[derive(Debug, Clone, Copy)]
pub struct Lease {
    pub holder: uuid::Uuid,
}

/// Persists transaction records and arbitrates the recovery lease.
///
/// Implementations must serialize concurrent `tx_update` calls on the same
/// `(tx_id, component_id)` and `tx_submit` calls on the same `tx_id` so that
/// the invariants in the transaction state machine hold under concurrent
/// access from multiple coordinator instances.
#[async_trait]
pub trait Store: Send + Sync {
    /// Persists a fresh record in `Hanging` status with one pending entry
    /// per component, and returns its freshly assigned id.
    async fn create_tx(&self, components: Vec<ComponentEntry>) -> Result<TransactionId>;

    /// Transitions one component entry from `Pending` to `Accepted` or
    /// `Rejected`. Idempotent on repetition of the same value; fails with
    /// [`crate::error::CoordinatorError::StateConflict`] on a conflicting
    /// re-application.
    async fn tx_update(
        &self,
        tx_id: TransactionId,
        component_id: &ComponentId,
        accepted: bool,
    ) -> Result<()>;

    /// Transitions a `Hanging` record to a terminal status. `success = true`
    /// requires every entry to be `Accepted`. Idempotent on repetition of the
    /// same terminal value.
    async fn tx_submit(&self, tx_id: TransactionId, success: bool) -> Result<()>;

    /// Every record currently in `Hanging` status. May be stale, but must
    /// not omit a record whose last write preceded the call.
    async fn get_hanging_txs(&self) -> Result<Vec<Transaction>>;

    /// The current snapshot of one record.
    async fn get_tx(&self, tx_id: TransactionId) -> Result<Transaction>;

    /// Attempts to acquire the process-wide recovery lease for `ttl`.
    /// Fails with [`crate::error::CoordinatorError::LockHeld`] if another
    /// holder is currently active.
    async fn lock(&self, ttl: std::time::Duration) -> Result<Lease>;

    /// Releases a previously acquired lease. Best-effort: the lease's TTL is
    /// the real safety net against a crashed holder.
    async fn unlock(&self, lease: Lease) -> Result<()>;
}
