//! End-to-end scenarios against mock components and the in-memory store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tcc_coordinator::store::memory::InMemoryStore;
use tcc_coordinator::{
    Component, ComponentError, ComponentId, Manager, ManagerOptions, Payload, TransactionId,
    TryReply, TryRequest,
};

enum Behavior {
    Accept,
    Reject,
    Error,
    HangThenAccept(Duration),
}

struct ScriptedComponent {
    id: ComponentId,
    behavior: Behavior,
    confirms: Arc<AtomicUsize>,
    cancels: Arc<AtomicUsize>,
}

#[async_trait]
impl Component for ScriptedComponent {
    fn id(&self) -> ComponentId {
        self.id.clone()
    }

    async fn try_op(&self, _request: TryRequest) -> Result<TryReply, ComponentError> {
        match &self.behavior {
            Behavior::Accept => Ok(TryReply::accept()),
            Behavior::Reject => Ok(TryReply::reject()),
            Behavior::Error => Err(ComponentError::new("simulated failure")),
            Behavior::HangThenAccept(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(TryReply::accept())
            }
        }
    }

    async fn confirm(&self, _tx_id: TransactionId) -> Result<TryReply, ComponentError> {
        self.confirms.fetch_add(1, Ordering::SeqCst);
        Ok(TryReply::accept())
    }

    async fn cancel(&self, _tx_id: TransactionId) -> Result<TryReply, ComponentError> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(TryReply::accept())
    }
}

fn requests(ids: &[&str]) -> Vec<(ComponentId, Payload)> {
    ids.iter()
        .map(|id| (ComponentId::new(*id), Payload::default()))
        .collect()
}

#[tokio::test]
async fn scenario_happy_path_three_components() {
    let store: Arc<dyn tcc_coordinator::store::Store> = Arc::new(InMemoryStore::new());
    let manager = Manager::new(store, ManagerOptions::default());

    let mut confirms = Vec::new();
    for id in ["a", "b", "c"] {
        let c = Arc::new(AtomicUsize::new(0));
        manager
            .register(Arc::new(ScriptedComponent {
                id: ComponentId::new(id),
                behavior: Behavior::Accept,
                confirms: Arc::clone(&c),
                cancels: Arc::new(AtomicUsize::new(0)),
            }))
            .unwrap();
        confirms.push(c);
    }

    let (_, success) = manager.transaction(requests(&["a", "b", "c"])).await.unwrap();
    assert!(success);
    for c in &confirms {
        assert_eq!(c.load(Ordering::SeqCst), 1);
    }
    manager.stop().await;
}

#[tokio::test]
async fn scenario_one_rejection_cancels_all() {
    let store: Arc<dyn tcc_coordinator::store::Store> = Arc::new(InMemoryStore::new());
    let manager = Manager::new(store, ManagerOptions::default());

    let mut cancels = Vec::new();
    for (id, behavior) in [("a", Behavior::Accept), ("b", Behavior::Reject), ("c", Behavior::Accept)] {
        let k = Arc::new(AtomicUsize::new(0));
        manager
            .register(Arc::new(ScriptedComponent {
                id: ComponentId::new(id),
                behavior,
                confirms: Arc::new(AtomicUsize::new(0)),
                cancels: Arc::clone(&k),
            }))
            .unwrap();
        cancels.push(k);
    }

    let (_, success) = manager.transaction(requests(&["a", "b", "c"])).await.unwrap();
    assert!(!success);
    for k in &cancels {
        assert_eq!(k.load(Ordering::SeqCst), 1);
    }
    manager.stop().await;
}

#[tokio::test]
async fn scenario_try_error_cancels_all() {
    let store: Arc<dyn tcc_coordinator::store::Store> = Arc::new(InMemoryStore::new());
    let manager = Manager::new(store, ManagerOptions::default());

    let mut cancels = Vec::new();
    for (id, behavior) in [("a", Behavior::Accept), ("b", Behavior::Error), ("c", Behavior::Accept)] {
        let k = Arc::new(AtomicUsize::new(0));
        manager
            .register(Arc::new(ScriptedComponent {
                id: ComponentId::new(id),
                behavior,
                confirms: Arc::new(AtomicUsize::new(0)),
                cancels: Arc::clone(&k),
            }))
            .unwrap();
        cancels.push(k);
    }

    let (_, success) = manager.transaction(requests(&["a", "b", "c"])).await.unwrap();
    assert!(!success);
    for k in &cancels {
        assert_eq!(k.load(Ordering::SeqCst), 1);
    }
    manager.stop().await;
}

#[tokio::test]
async fn scenario_timeout_cancels_all() {
    let store: Arc<dyn tcc_coordinator::store::Store> = Arc::new(InMemoryStore::new());
    let options = ManagerOptions {
        timeout: Duration::from_millis(50),
        ..ManagerOptions::default()
    };
    let manager = Manager::new(store, options);

    let mut cancels = Vec::new();
    for (id, behavior) in [
        ("a", Behavior::HangThenAccept(Duration::from_millis(10))),
        ("b", Behavior::HangThenAccept(Duration::from_secs(10))),
        ("c", Behavior::Accept),
    ] {
        let k = Arc::new(AtomicUsize::new(0));
        manager
            .register(Arc::new(ScriptedComponent {
                id: ComponentId::new(id),
                behavior,
                confirms: Arc::new(AtomicUsize::new(0)),
                cancels: Arc::clone(&k),
            }))
            .unwrap();
        cancels.push(k);
    }

    let (_, success) = manager.transaction(requests(&["a", "b", "c"])).await.unwrap();
    assert!(!success);
    for k in &cancels {
        assert_eq!(k.load(Ordering::SeqCst), 1);
    }
    manager.stop().await;
}

#[tokio::test]
async fn scenario_crash_recovery_confirms_hanging_transaction() {
    // Simulates a coordinator that allocated a transaction and recorded all
    // accepts but crashed before issuing Confirm. A fresh Manager sharing
    // the same store recovers it on its next tick.
    let store: Arc<dyn tcc_coordinator::store::Store> = Arc::new(InMemoryStore::new());
    let tx_id = store
        .create_tx(vec![
            tcc_coordinator::transaction::ComponentEntry::new(ComponentId::new("a"), Payload::default()),
            tcc_coordinator::transaction::ComponentEntry::new(ComponentId::new("b"), Payload::default()),
        ])
        .await
        .unwrap();
    store.tx_update(tx_id, &ComponentId::new("a"), true).await.unwrap();
    store.tx_update(tx_id, &ComponentId::new("b"), true).await.unwrap();

    let options = ManagerOptions {
        monitor_tick: Duration::from_millis(30),
        lease_multiplier: 2,
        ..ManagerOptions::default()
    };
    let manager = Manager::new(Arc::clone(&store), options);

    let mut confirms = Vec::new();
    for id in ["a", "b"] {
        let c = Arc::new(AtomicUsize::new(0));
        manager
            .register(Arc::new(ScriptedComponent {
                id: ComponentId::new(id),
                behavior: Behavior::Accept,
                confirms: Arc::clone(&c),
                cancels: Arc::new(AtomicUsize::new(0)),
            }))
            .unwrap();
        confirms.push(c);
    }

    tokio::time::sleep(Duration::from_millis(150)).await;

    let recovered = store.get_tx(tx_id).await.unwrap();
    assert_eq!(
        recovered.status,
        tcc_coordinator::TransactionStatus::Successful
    );
    for c in &confirms {
        assert_eq!(c.load(Ordering::SeqCst), 1);
    }
    manager.stop().await;
}

#[tokio::test]
async fn scenario_double_monitor_lease_excludes_concurrent_sweep() {
    let store: Arc<dyn tcc_coordinator::store::Store> = Arc::new(InMemoryStore::new());
    let lease = store.lock(Duration::from_secs(5)).await.unwrap();

    let options = ManagerOptions {
        monitor_tick: Duration::from_millis(20),
        ..ManagerOptions::default()
    };
    let manager = Manager::new(Arc::clone(&store), options);
    // The manager's own recovery monitor starts ticking immediately; since
    // we hold the lease it must observe LockHeld and skip every tick rather
    // than panicking or blocking.
    tokio::time::sleep(Duration::from_millis(100)).await;

    store.unlock(lease).await.unwrap();
    manager.stop().await;
}
