//! Apriori plugin: a manifest file declares every (module, version) pair
//! this back-end serves; anything else is unknown.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use modproxy_core::error::{ProxyError, Result};
use modproxy_core::{Module, ModuleRequest, Plugin};

use crate::manifest::{self, ModuleInfo};
use crate::module::AprioriModule;

pub struct AprioriPlugin {
    mapping: HashMap<String, Arc<HashMap<String, ModuleInfo>>>,
}

impl AprioriPlugin {
    /// Loads the manifest at `path`; bad entries abort initialization.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let mapping = manifest::load(path.as_ref())?
            .into_iter()
            .map(|(module, versions)| (module, Arc::new(versions)))
            .collect();
        Ok(Self { mapping })
    }
}

#[async_trait]
impl Plugin for AprioriPlugin {
    async fn module_for(&self, request: &ModuleRequest) -> Result<Box<dyn Module>> {
        let entries = self.mapping.get(&request.module_path).ok_or_else(|| {
            ProxyError::NotFound(format!("module {} in apriori mapping", request.module_path))
        })?;
        Ok(Box::new(AprioriModule::new(
            request.module_path.clone(),
            entries.clone(),
        )))
    }

    fn name(&self) -> String {
        "apriori".into()
    }
}
