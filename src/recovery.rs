//! Background sweep of hanging transactions.
//!
//! Activated at construction (mirroring this crate's own habit of starting
//! background monitors as soon as they're built, rather than via a separate
//! `start()` call), halted by `stop()`. Wakes on a fixed tick or on an
//! explicit nudge from the orchestrator after a foreground decision,
//! whichever comes first.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rand::Rng;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::registry::Registry;
use crate::store::Store;
use crate::transaction::Transaction;

/// Counters exposed read-only through [`crate::manager::Manager::stats`].
#[derive(Default)]
pub struct RecoveryStats {
    pub swept: AtomicU64,
    pub confirmed: AtomicU64,
    pub cancelled: AtomicU64,
    pub skipped_lease_held: AtomicU64,
}

pub struct RecoveryMonitor {
    registry: Arc<Registry>,
    store: Arc<dyn Store>,
    tick: Duration,
    lease_ttl: Duration,
    timeout: Duration,
    wake: Notify,
    stop: Notify,
    stopped: std::sync::atomic::AtomicBool,
    stats: Arc<RecoveryStats>,
    handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl RecoveryMonitor {
    pub fn spawn(
        registry: Arc<Registry>,
        store: Arc<dyn Store>,
        tick: Duration,
        lease_multiplier: u32,
        timeout: Duration,
        stats: Arc<RecoveryStats>,
    ) -> Arc<Self> {
        let monitor = Arc::new(Self {
            registry,
            store,
            tick,
            lease_ttl: tick * lease_multiplier.max(2),
            timeout,
            wake: Notify::new(),
            stop: Notify::new(),
            stopped: std::sync::atomic::AtomicBool::new(false),
            stats,
            handle: tokio::sync::Mutex::new(None),
        });

        let worker = Arc::clone(&monitor);
        let join = tokio::spawn(async move { worker.run().await });
        // The handle slot is only ever written once, right after spawn, so a
        // blocking try_lock is always available here.
        *monitor.handle.try_lock().unwrap() = Some(join);
        monitor
    }

    /// Non-blocking nudge: coalesces with any already-pending wake.
    pub fn notify(&self) {
        self.wake.notify_one();
    }

    /// Halts the loop and joins the background task. Safe to call more than
    /// once.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop.notify_one();
        if let Some(handle) = self.handle.lock().await.take() {
            let _ = handle.await;
        }
    }

    async fn run(&self) {
        let mut interval = tokio::time::interval(self.tick);
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.wake.notified() => {}
                _ = self.stop.notified() => {
                    debug!("recovery monitor stopping");
                    return;
                }
            }
            if self.stopped.load(Ordering::SeqCst) {
                return;
            }
            self.sweep_once().await;
        }
    }

    async fn sweep_once(&self) {
        let lease = match self.store.lock(self.lease_ttl).await {
            Ok(lease) => lease,
            Err(err) => {
                if err.is_retriable() {
                    self.stats.skipped_lease_held.fetch_add(1, Ordering::Relaxed);
                    debug!("recovery tick skipped: {err}");
                } else {
                    warn!("recovery tick failed acquiring lease: {err}");
                }
                return;
            }
        };

        let hanging = match self.store.get_hanging_txs().await {
            Ok(txs) => txs,
            Err(err) => {
                warn!("failed listing hanging transactions: {err}");
                let _ = self.store.unlock(lease).await;
                return;
            }
        };

        for tx in hanging {
            self.stats.swept.fetch_add(1, Ordering::Relaxed);
            if let Err(err) = self.resolve(&tx).await {
                warn!(tx_id = %tx.id, "recovery failed to resolve transaction: {err}");
                // Jittered backoff: avoid every unresolved transaction
                // hammering the same slow component on every single tick.
                let jitter_ms = rand::rng().random_range(0..50);
                tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
            }
        }

        let _ = self.store.unlock(lease).await;
    }

    async fn resolve(&self, tx: &Transaction) -> Result<()> {
        let should_cancel = tx.any_rejected() || tx.is_expired(self.timeout);
        let should_confirm = !should_cancel && tx.all_accepted();

        if !should_cancel && !should_confirm {
            // Still within its window and not yet try-complete: leave it for
            // a later tick.
            return Ok(());
        }

        let handles = self.registry.lookup_all(&tx.component_ids())?;

        if should_confirm {
            let futures = handles.iter().map(|h| h.confirm(tx.id));
            join_all(futures).await;
            self.store.tx_submit(tx.id, true).await?;
            self.stats.confirmed.fetch_add(1, Ordering::Relaxed);
            info!(tx_id = %tx.id, "recovery confirmed transaction");
        } else {
            let futures = handles.iter().map(|h| h.cancel(tx.id));
            join_all(futures).await;
            self.store.tx_submit(tx.id, false).await?;
            self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
            info!(tx_id = %tx.id, "recovery cancelled transaction");
        }
        Ok(())
    }
}
