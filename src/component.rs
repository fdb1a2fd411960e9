//! The `Component` trait: the three-phase contract every TCC participant
//! implements.

use async_trait::async_trait;

use crate::common::{ComponentId, Payload, TransactionId};

/// The Try-phase request handed to a component.
#[derive(Debug, Clone)]
pub struct TryRequest {
    pub tx_id: TransactionId,
    pub component_id: ComponentId,
    pub payload: Payload,
}

/// A component's reply to Try, Confirm, or Cancel.
#[derive(Debug, Clone, Default)]
pub struct TryReply {
    /// `true` means resources were reserved (Try) or the phase succeeded
    /// (Confirm/Cancel).
    pub ack: bool,
    pub payload: Payload,
}

impl TryReply {
    pub fn accept() -> Self {
        Self {
            ack: true,
            payload: Payload::default(),
        }
    }

    pub fn reject() -> Self {
        Self {
            ack: false,
            payload: Payload::default(),
        }
    }
}

/// Raised by a component implementation when a phase cannot be carried out.
/// Never surfaced directly to `Manager::transaction` callers: the
/// orchestrator folds it into a rejection and logs it instead.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ComponentError {
    pub message: String,
}

impl ComponentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A participant in TCC transactions.
///
/// Implementations must make `confirm` and `cancel` idempotent: the
/// coordinator may invoke either more than once for the same transaction,
/// both from foreground retries and from the recovery monitor.
#[async_trait]
pub trait Component: Send + Sync {
    /// Stable identifier this component is registered under.
    fn id(&self) -> ComponentId;

    /// Attempt to reserve the resources described by `request.payload`.
    async fn try_op(&self, request: TryRequest) -> std::result::Result<TryReply, ComponentError>;

    /// Consume resources reserved by a prior, accepted Try. Must succeed
    /// eventually even if invoked without a preceding `try_op` call on this
    /// process (the original Try may have been handled before a crash).
    async fn confirm(
        &self,
        tx_id: TransactionId,
    ) -> std::result::Result<TryReply, ComponentError>;

    /// Release resources reserved by a prior Try, or act as a no-op if Try
    /// never reserved anything. Must succeed eventually.
    async fn cancel(&self, tx_id: TransactionId) -> std::result::Result<TryReply, ComponentError>;
}
