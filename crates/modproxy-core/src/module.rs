//! Back-end capability contracts.
//!
//! A [`Plugin`] lives for the whole process and hands out per-request
//! [`Module`] handles; a [`Module`] exposes the four module-protocol
//! operations for one module path. All implementors are object-safe so the
//! router and the choice plugin can hold them behind `Arc<dyn Plugin>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use crate::context::RequestContext;
use crate::error::Result;

/// Streaming zip payload; the protocol handler drops it on every path.
pub type ZipReader = Box<dyn AsyncRead + Send + Unpin>;

/// A single revision of a module, as reported to clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevInfo {
    #[serde(rename = "Version")]
    pub version: String,
    /// Commit time, RFC 3339.
    #[serde(rename = "Time")]
    pub time: String,

    // Known for arbitrary rev stats, never sent to clients.
    #[serde(skip)]
    pub name: String,
    #[serde(skip)]
    pub short: String,
}

/// Inbound basic-auth credentials, available for pass-through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub user: String,
    pub password: String,
}

/// What a plugin needs to know about the request to build a module handle.
#[derive(Debug, Clone)]
pub struct ModuleRequest {
    pub module_path: String,
    pub basic_auth: Option<BasicAuth>,
}

impl ModuleRequest {
    pub fn new(module_path: impl Into<String>) -> Self {
        Self {
            module_path: module_path.into(),
            basic_auth: None,
        }
    }
}

/// Per-request handle for one module path.
#[async_trait]
pub trait Module: Send + Sync {
    /// The module path this handle serves.
    fn module_path(&self) -> &str;

    /// All known versions starting with `prefix`, semver-sorted ascending.
    /// Pseudo-versions are not listed unless nothing else exists.
    async fn versions(&self, ctx: &RequestContext, prefix: &str) -> Result<Vec<String>>;

    /// Revision info for `rev`: a version, tag, branch or commit id.
    async fn stat(&self, ctx: &RequestContext, rev: &str) -> Result<RevInfo>;

    /// The go.mod payload for `version`.
    async fn go_mod(&self, ctx: &RequestContext, version: &str) -> Result<Vec<u8>>;

    /// Zip archive stream for `version`, entries under `<path>[/vN]@<version>/`.
    async fn zip(&self, ctx: &RequestContext, version: &str) -> Result<ZipReader>;
}

impl std::fmt::Debug for dyn Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("module_path", &self.module_path())
            .finish()
    }
}

/// Process-lifetime back-end able to produce module handles.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Builds a module handle for one request.
    async fn module_for(&self, request: &ModuleRequest) -> Result<Box<dyn Module>>;

    /// Releases a handle after the response is written.
    fn leave(&self, _module: &dyn Module) -> Result<()> {
        Ok(())
    }

    /// Shutdown hook.
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Human-readable back-end name for logs.
    fn name(&self) -> String;
}
