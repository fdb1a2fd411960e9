//! Coordinator-wide error taxonomy.
//!
//! Mirrors the flat, richly-contexted `#[error(...)]` enum style used
//! throughout this crate's persistence and transaction layers: one variant
//! per distinguishable failure kind, struct-style fields carrying enough
//! context to act on the error without re-deriving it from surrounding
//! state.

use crate::common::{ComponentId, TransactionId};

pub type Result<T> = std::result::Result<T, CoordinatorError>;

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("component `{0}` is not registered")]
    UnknownComponent(ComponentId),

    #[error("component `{0}` is already registered")]
    DuplicateRegistration(ComponentId),

    #[error("component `{0}` appears more than once in a single transaction request")]
    DuplicateRequest(ComponentId),

    #[error("store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("transaction {tx_id} update rejected: {reason}")]
    StateConflict {
        tx_id: TransactionId,
        reason: String,
    },

    #[error("recovery lease already held by another coordinator")]
    LockHeld,

    #[error("manager has been stopped")]
    ManagerStopped,

    #[error("transaction request must reference at least one component")]
    EmptyRequest,

    #[error("transaction {0} does not exist")]
    NotFound(TransactionId),
}

impl CoordinatorError {
    pub fn store_unavailable(reason: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            reason: reason.into(),
        }
    }

    pub fn state_conflict(tx_id: TransactionId, reason: impl Into<String>) -> Self {
        Self::StateConflict {
            tx_id,
            reason: reason.into(),
        }
    }

    /// Whether retrying the same operation later has a chance of succeeding.
    ///
    /// The recovery monitor uses this to decide whether a failure should be
    /// swallowed (retried next tick) or is permanent for this transaction.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. } | Self::LockHeld)
    }

    /// The transaction this error pertains to, if any.
    pub fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            Self::StateConflict { tx_id, .. } | Self::NotFound(tx_id) => Some(*tx_id),
            _ => None,
        }
    }
}
