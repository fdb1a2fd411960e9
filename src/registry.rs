//! In-memory component registry.
//!
//! Backed by [`DashMap`] rather than `Arc<RwLock<HashMap>>`: readers never
//! block each other, which matters here since `Registry::lookup_all` is
//! called on every foreground `Transaction` call.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use crate::component::Component;
use crate::common::ComponentId;
use crate::error::{CoordinatorError, Result};

/// Maps component identifiers to live handles.
#[derive(Default)]
pub struct Registry {
    components: DashMap<ComponentId, Arc<dyn Component>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            components: DashMap::new(),
        }
    }

    /// Registers `component` under its own `id()`.
    ///
    /// Fails with [`CoordinatorError::DuplicateRegistration`] if that id is
    /// already present.
    pub fn register(&self, component: Arc<dyn Component>) -> Result<()> {
        let id = component.id();
        if self.components.contains_key(&id) {
            return Err(CoordinatorError::DuplicateRegistration(id));
        }
        info!(component_id = %id, "registering component");
        self.components.insert(id, component);
        Ok(())
    }

    /// Looks up a single component.
    pub fn lookup(&self, id: &ComponentId) -> Result<Arc<dyn Component>> {
        self.components
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| CoordinatorError::UnknownComponent(id.clone()))
    }

    /// Looks up every id in `ids`, preserving order. Fails atomically on the
    /// first missing id, no partial result is returned.
    pub fn lookup_all(&self, ids: &[ComponentId]) -> Result<Vec<Arc<dyn Component>>> {
        let mut handles = Vec::with_capacity(ids.len());
        for id in ids {
            debug!(component_id = %id, "resolving component");
            handles.push(self.lookup(id)?);
        }
        Ok(handles)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
