//! The public facade: wires a [`Registry`], a [`Store`], an [`Orchestrator`]
//! and a [`RecoveryMonitor`] together behind three operations.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::common::{ComponentId, Payload};
use crate::component::Component;
use crate::error::{CoordinatorError, Result};
use crate::orchestrator::{ComponentRequest, Orchestrator};
use crate::recovery::{RecoveryMonitor, RecoveryStats};
use crate::registry::Registry;
use crate::store::Store;

/// Tunables for a [`Manager`]. Follows this crate's `Default`-plus-builder
/// configuration idiom rather than a free-standing config file.
#[derive(Debug, Clone, Copy)]
pub struct ManagerOptions {
    /// Upper bound on the foreground Try phase. A component that hasn't
    /// replied by this point is treated as a rejection.
    pub timeout: Duration,
    /// Period between recovery sweeps.
    pub monitor_tick: Duration,
    /// Multiplies `monitor_tick` to derive the recovery lease TTL. Must be
    /// at least 2 so a slow tick cannot let the lease lapse mid-sweep.
    pub lease_multiplier: u32,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            monitor_tick: Duration::from_secs(10),
            lease_multiplier: 2,
        }
    }
}

/// Read-only counters snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManagerStats {
    pub started: u64,
    pub committed: u64,
    pub cancelled: u64,
    pub recovery_swept: u64,
    pub recovery_confirmed: u64,
    pub recovery_cancelled: u64,
}

#[derive(Default)]
struct Counters {
    started: AtomicU64,
    committed: AtomicU64,
    cancelled: AtomicU64,
}

/// Facade over the coordinator. Owns the background recovery task: dropping
/// a `Manager` without calling [`Manager::stop`] leaves that task running
/// for as long as the process does, so callers should `stop()` it explicitly
/// during shutdown.
pub struct Manager {
    registry: Arc<Registry>,
    orchestrator: Orchestrator,
    monitor: Arc<RecoveryMonitor>,
    recovery_stats: Arc<RecoveryStats>,
    counters: Counters,
    stopped: AtomicBool,
}

impl Manager {
    pub fn new(store: Arc<dyn Store>, options: ManagerOptions) -> Self {
        let registry = Arc::new(Registry::new());
        let orchestrator = Orchestrator::new(Arc::clone(&registry), Arc::clone(&store), options.timeout);
        let recovery_stats = Arc::new(RecoveryStats::default());
        let monitor = RecoveryMonitor::spawn(
            Arc::clone(&registry),
            store,
            options.monitor_tick,
            options.lease_multiplier,
            options.timeout,
            Arc::clone(&recovery_stats),
        );

        Self {
            registry,
            orchestrator,
            monitor,
            recovery_stats,
            counters: Counters::default(),
            stopped: AtomicBool::new(false),
        }
    }

    /// Registers a component. Fails with
    /// [`CoordinatorError::DuplicateRegistration`] if its id is already in
    /// use.
    pub fn register(&self, component: Arc<dyn Component>) -> Result<()> {
        self.registry.register(component)
    }

    /// Runs one transaction across `requests` end to end. Returns once the
    /// outcome has been durably recorded; Confirm/Cancel delivery to slow or
    /// failing components continues in the background via recovery.
    pub async fn transaction(
        &self,
        requests: Vec<(ComponentId, Payload)>,
    ) -> Result<(crate::common::TransactionId, bool)> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(CoordinatorError::ManagerStopped);
        }
        self.counters.started.fetch_add(1, Ordering::Relaxed);

        let requests = requests
            .into_iter()
            .map(|(component_id, payload)| ComponentRequest {
                component_id,
                payload,
            })
            .collect();

        let outcome = self.orchestrator.run_transaction(requests).await?;
        if outcome.success {
            self.counters.committed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
        }

        // Non-blocking: if recovery is mid-sweep already, this coalesces
        // with the pending wake rather than queuing a second one.
        self.monitor.notify();

        Ok((outcome.tx_id, outcome.success))
    }

    /// Halts the recovery task and joins it. Safe to call more than once;
    /// subsequent `transaction` calls fail with
    /// [`CoordinatorError::ManagerStopped`].
    pub async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.monitor.stop().await;
    }

    pub fn stats(&self) -> ManagerStats {
        ManagerStats {
            started: self.counters.started.load(Ordering::Relaxed),
            committed: self.counters.committed.load(Ordering::Relaxed),
            cancelled: self.counters.cancelled.load(Ordering::Relaxed),
            recovery_swept: self.recovery_stats.swept.load(Ordering::Relaxed),
            recovery_confirmed: self.recovery_stats.confirmed.load(Ordering::Relaxed),
            recovery_cancelled: self.recovery_stats.cancelled.load(Ordering::Relaxed),
        }
    }
}
