//! Cascade plugin: points at another module proxy.

use std::sync::Arc;

use async_trait::async_trait;

use modproxy_core::error::Result;
use modproxy_core::{Module, ModuleRequest, Plugin, encoding};

use crate::module::CascadeModule;

/// Decides whether inbound basic-auth travels to the upstream.
pub type CredsFilter = Arc<dyn Fn(&ModuleRequest) -> bool + Send + Sync>;

pub struct CascadePlugin {
    upstream: String,
    client: reqwest::Client,
    pass_creds: Option<CredsFilter>,
}

impl CascadePlugin {
    /// Forwards to `upstream` (e.g. `https://proxy.golang.org`) without
    /// credentials.
    pub fn new(upstream: impl Into<String>) -> Self {
        Self {
            upstream: upstream.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            pass_creds: None,
        }
    }

    /// Same, but inbound basic-auth is propagated when `filter` approves.
    pub fn with_creds_filter(upstream: impl Into<String>, filter: CredsFilter) -> Self {
        Self {
            upstream: upstream.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            pass_creds: Some(filter),
        }
    }
}

#[async_trait]
impl Plugin for CascadePlugin {
    async fn module_for(&self, request: &ModuleRequest) -> Result<Box<dyn Module>> {
        let basic_auth = match &self.pass_creds {
            Some(filter) if filter(request) => request.basic_auth.clone(),
            _ => None,
        };

        Ok(Box::new(CascadeModule::new(
            request.module_path.clone(),
            encoding::encode(&request.module_path),
            self.upstream.clone(),
            self.client.clone(),
            basic_auth,
        )))
    }

    fn name(&self) -> String {
        "cascade".into()
    }
}
