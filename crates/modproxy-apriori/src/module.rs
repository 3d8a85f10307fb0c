//! Apriori module handle: all answers come from the manifest and the files
//! it references.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use modproxy_core::error::{ProxyError, Result, ResultExt};
use modproxy_core::{Module, RequestContext, RevInfo, ZipReader, version};

use crate::manifest::ModuleInfo;

pub struct AprioriModule {
    path: String,
    entries: Arc<HashMap<String, ModuleInfo>>,
}

impl AprioriModule {
    pub(crate) fn new(path: String, entries: Arc<HashMap<String, ModuleInfo>>) -> Self {
        Self { path, entries }
    }

    fn entry(&self, version: &str) -> Result<&ModuleInfo> {
        self.entries.get(version).ok_or_else(|| {
            ProxyError::NotFound(format!("version {version} of module {}", self.path))
        })
    }
}

#[async_trait]
impl Module for AprioriModule {
    fn module_path(&self) -> &str {
        &self.path
    }

    async fn versions(&self, ctx: &RequestContext, prefix: &str) -> Result<Vec<String>> {
        ctx.check()?;
        let tags: Vec<String> = self
            .entries
            .keys()
            .filter(|v| v.starts_with(prefix))
            .cloned()
            .collect();
        for tag in &tags {
            if !version::is_valid(tag) {
                return Err(ProxyError::BadRequest(format!(
                    "invalid semver value {tag} in apriori mapping"
                )));
            }
        }
        Ok(version::sort_versions(tags))
    }

    async fn stat(&self, ctx: &RequestContext, rev: &str) -> Result<RevInfo> {
        ctx.check()?;
        Ok(self.entry(rev)?.rev_info.clone())
    }

    async fn go_mod(&self, ctx: &RequestContext, ver: &str) -> Result<Vec<u8>> {
        let info = self.entry(ver)?;
        ctx.guard(async {
            tokio::fs::read(&info.go_mod_path)
                .await
                .map_err(ProxyError::Io)
                .with_context(|| format!("reading go.mod for version {ver} of {}", self.path))
        })
        .await
    }

    async fn zip(&self, ctx: &RequestContext, ver: &str) -> Result<ZipReader> {
        let info = self.entry(ver)?;
        ctx.guard(async {
            let file = tokio::fs::File::open(&info.archive_path)
                .await
                .map_err(ProxyError::Io)
                .with_context(|| format!("opening archive for version {ver} of {}", self.path))?;
            Ok(Box::new(file) as ZipReader)
        })
        .await
    }
}
