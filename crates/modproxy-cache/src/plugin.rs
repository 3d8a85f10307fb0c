//! Aposteriori plugin: wraps any other plugin with the write-through cache.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use modproxy_core::error::{Result, ResultExt};
use modproxy_core::{Module, ModuleRequest, Plugin};

use crate::module::AposterioriModule;
use crate::store::FileStore;

/// Versions known to be fully materialised in the cache, per module path.
pub type Registry = HashMap<String, BTreeSet<String>>;

/// `Versions` readers take the lock shared; the zip-commit path takes it
/// exclusive.
pub(crate) type SharedRegistry = Arc<RwLock<Registry>>;

pub struct AposterioriPlugin {
    next: Arc<dyn Plugin>,
    store: Arc<dyn FileStore>,
    registry: Option<SharedRegistry>,
}

impl AposterioriPlugin {
    /// Plain write-through cache; `Versions` still consults the back-end.
    pub fn new(next: Arc<dyn Plugin>, store: Arc<dyn FileStore>) -> Self {
        Self {
            next,
            store,
            registry: None,
        }
    }

    /// Cache-authoritative variant: `Versions` answers from `registry`
    /// (offline mode) and successful zip downloads extend it.
    pub fn with_registry(
        next: Arc<dyn Plugin>,
        store: Arc<dyn FileStore>,
        registry: Registry,
    ) -> Self {
        Self {
            next,
            store,
            registry: Some(Arc::new(RwLock::new(registry))),
        }
    }
}

#[async_trait]
impl Plugin for AposterioriPlugin {
    async fn module_for(&self, request: &ModuleRequest) -> Result<Box<dyn Module>> {
        let next = self
            .next
            .module_for(request)
            .await
            .context("aposteriori delegation")?;
        Ok(Box::new(AposterioriModule::new(
            next,
            self.store.clone(),
            self.registry.clone(),
        )))
    }

    async fn close(&self) -> Result<()> {
        self.next.close().await
    }

    fn name(&self) -> String {
        "aposteriori".into()
    }
}
