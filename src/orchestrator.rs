//! Drives a single transaction from preflight through Try, decision, and
//! Confirm/Cancel fan-out.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{info, warn};

use crate::common::{ComponentId, Payload, TransactionId};
use crate::component::{Component, TryRequest};
use crate::error::{CoordinatorError, Result};
use crate::registry::Registry;
use crate::store::Store;
use crate::transaction::ComponentEntry;

/// One component reference plus the payload the caller wants it to Try.
pub struct ComponentRequest {
    pub component_id: ComponentId,
    pub payload: Payload,
}

/// The outcome of a foreground `Transaction` call.
pub struct Outcome {
    pub tx_id: TransactionId,
    pub success: bool,
}

pub struct Orchestrator {
    registry: Arc<Registry>,
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(registry: Arc<Registry>, store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self {
            registry,
            store,
            timeout,
        }
    }

    pub async fn run_transaction(&self, requests: Vec<ComponentRequest>) -> Result<Outcome> {
        if requests.is_empty() {
            return Err(CoordinatorError::EmptyRequest);
        }
        let mut seen = std::collections::HashSet::new();
        for req in &requests {
            if !seen.insert(req.component_id.clone()) {
                return Err(CoordinatorError::DuplicateRequest(req.component_id.clone()));
            }
        }

        let ids: Vec<ComponentId> = requests.iter().map(|r| r.component_id.clone()).collect();
        let handles = self.registry.lookup_all(&ids)?;

        let entries: Vec<ComponentEntry> = requests
            .iter()
            .map(|r| ComponentEntry::new(r.component_id.clone(), r.payload.clone()))
            .collect();

        let tx_id = self.store.create_tx(entries).await?;
        info!(%tx_id, components = requests.len(), "transaction allocated");

        let accepted = self.try_phase(tx_id, &handles, &requests).await?;

        let success = if accepted {
            self.confirm_phase(tx_id, &handles).await;
            true
        } else {
            self.cancel_phase(tx_id, &handles).await;
            false
        };

        self.store.tx_submit(tx_id, success).await?;
        info!(%tx_id, success, "transaction decided");

        Ok(Outcome { tx_id, success })
    }

    /// Fans Try out to every component, applies the configured timeout, and
    /// records each outcome via `tx_update`. Returns whether every component
    /// accepted.
    async fn try_phase(
        &self,
        tx_id: TransactionId,
        handles: &[Arc<dyn Component>],
        requests: &[ComponentRequest],
    ) -> Result<bool> {
        let futures = handles.iter().zip(requests.iter()).map(|(handle, req)| {
            let request = TryRequest {
                tx_id,
                component_id: req.component_id.clone(),
                payload: req.payload.clone(),
            };
            async move {
                let outcome = tokio::time::timeout(self.timeout, handle.try_op(request)).await;
                let accepted = match outcome {
                    Ok(Ok(reply)) => reply.ack,
                    Ok(Err(err)) => {
                        warn!(%tx_id, component_id = %req.component_id, error = %err, "try rejected");
                        false
                    }
                    Err(_) => {
                        warn!(%tx_id, component_id = %req.component_id, "try timed out");
                        false
                    }
                };
                (req.component_id.clone(), accepted)
            }
        });

        let outcomes = join_all(futures).await;

        let mut all_accepted = true;
        for (component_id, accepted) in outcomes {
            all_accepted &= accepted;
            self.store.tx_update(tx_id, &component_id, accepted).await?;
        }
        Ok(all_accepted)
    }

    /// Dispatches Confirm to every component, bounded by `self.timeout` per
    /// component so a slow or hanging Confirm cannot stall the foreground
    /// caller. A component that doesn't return in time (or errors) is swept
    /// up by the recovery monitor later; the foreground call only needs the
    /// decision recorded, not every Confirm's completion.
    async fn confirm_phase(&self, tx_id: TransactionId, handles: &[Arc<dyn Component>]) {
        let futures = handles.iter().map(|handle| async move {
            match tokio::time::timeout(self.timeout, handle.confirm(tx_id)).await {
                Ok(Err(err)) => {
                    warn!(%tx_id, component_id = %handle.id(), error = %err, "confirm failed, will be retried by recovery");
                }
                Err(_) => {
                    warn!(%tx_id, component_id = %handle.id(), "confirm timed out, will be retried by recovery");
                }
                Ok(Ok(_)) => {}
            }
        });
        join_all(futures).await;
    }

    /// Dispatches Cancel to every component, bounded by `self.timeout` per
    /// component for the same reason as `confirm_phase`.
    async fn cancel_phase(&self, tx_id: TransactionId, handles: &[Arc<dyn Component>]) {
        let futures = handles.iter().map(|handle| async move {
            match tokio::time::timeout(self.timeout, handle.cancel(tx_id)).await {
                Ok(Err(err)) => {
                    warn!(%tx_id, component_id = %handle.id(), error = %err, "cancel failed, will be retried by recovery");
                }
                Err(_) => {
                    warn!(%tx_id, component_id = %handle.id(), "cancel timed out, will be retried by recovery");
                }
                Ok(Ok(_)) => {}
            }
        });
        join_all(futures).await;
    }
}
