//! First-success composition of plugins.
//!
//! Built for putting the apriori store in front of a network back-end:
//! each plugin is asked for a module handle in order and the first success
//! wins; failures only show up at debug level.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ProxyError, Result};
use crate::module::{Module, ModuleRequest, Plugin};

pub struct ChoicePlugin {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl ChoicePlugin {
    pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        Self { plugins }
    }
}

#[async_trait]
impl Plugin for ChoicePlugin {
    async fn module_for(&self, request: &ModuleRequest) -> Result<Box<dyn Module>> {
        for plugin in &self.plugins {
            match plugin.module_for(request).await {
                Ok(module) => return Ok(module),
                Err(err) => {
                    tracing::debug!(
                        plugin = %plugin.name(),
                        module = %request.module_path,
                        error = %err,
                        "plugin skipped"
                    );
                }
            }
        }
        Err(ProxyError::BadRequest(format!(
            "no suitable plugin found for module {}",
            request.module_path
        )))
    }

    fn name(&self) -> String {
        let names: Vec<String> = self.plugins.iter().map(|p| p.name()).collect();
        format!("choice({})", names.join(", "))
    }
}
