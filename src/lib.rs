//! `tcc-coordinator` drives distributed transactions across independently
//! owned business components using the Try-Confirm-Cancel protocol.
//!
//! # Module overview
//!
//! | Module | Responsibility |
//! |---|---|
//! | [`common`] | Shared identifier and payload types. |
//! | [`error`] | Coordinator-wide error taxonomy. |
//! | [`component`] | The `Component` trait implemented by participants. |
//! | [`registry`] | Component-id to handle lookup. |
//! | [`transaction`] | The transaction record and its state machine. |
//! | [`store`] | The persistence contract, plus an in-memory reference impl. |
//! | [`orchestrator`] | Drives one transaction end to end. |
//! | [`recovery`] | Background sweep of hanging transactions. |
//! | [`manager`] | Facade wiring registry, store, orchestrator and recovery. |
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tcc_coordinator::{Manager, ManagerOptions, store::memory::InMemoryStore};
//!
//! # async fn run() -> tcc_coordinator::Result<()> {
//! let store = Arc::new(InMemoryStore::new());
//! let manager = Manager::new(store, ManagerOptions::default());
//! // manager.register(Arc::new(my_component)).await?;
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod component;
pub mod error;
pub mod manager;
pub mod orchestrator;
pub mod recovery;
pub mod registry;
pub mod store;
pub mod transaction;

pub use common::{ComponentId, Payload, TransactionId};
pub use component::{Component, ComponentError, TryReply, TryRequest};
pub use error::{CoordinatorError, Result};
pub use manager::{Manager, ManagerOptions, ManagerStats};
pub use registry::Registry;
pub use transaction::{ComponentEntry, Transaction, TransactionStatus, TryStatus};
