//! Aposteriori module handle: probe the store first, fall through to the
//! wrapped back-end, record what came back.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;

use modproxy_core::error::{ProxyError, Result, ResultExt};
use modproxy_core::{Module, RequestContext, RevInfo, ZipReader, version};

use crate::plugin::SharedRegistry;
use crate::store::FileStore;
use crate::tee::CachingReader;

const REVINFO_NAME: &str = "revinfo.json";
const GOMOD_NAME: &str = "go.mod";
const ZIP_NAME: &str = "src.zip";

pub struct AposterioriModule {
    next: Box<dyn Module>,
    store: Arc<dyn FileStore>,
    registry: Option<SharedRegistry>,
}

impl AposterioriModule {
    pub(crate) fn new(
        next: Box<dyn Module>,
        store: Arc<dyn FileStore>,
        registry: Option<SharedRegistry>,
    ) -> Self {
        Self {
            next,
            store,
            registry,
        }
    }

    fn rel_path(&self, ver: &str, name: &str) -> String {
        format!("{}/{ver}/{name}", self.next.module_path())
    }
}

#[async_trait]
impl Module for AposterioriModule {
    fn module_path(&self) -> &str {
        self.next.module_path()
    }

    async fn versions(&self, ctx: &RequestContext, prefix: &str) -> Result<Vec<String>> {
        if let Some(registry) = &self.registry {
            ctx.check()?;
            let reg = registry
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let tags = reg
                .get(self.module_path())
                .map(|versions| {
                    versions
                        .iter()
                        .filter(|v| v.starts_with(prefix))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            tracing::debug!(module = %self.module_path(), "version list answered from cache registry");
            return Ok(version::sort_versions(tags));
        }
        self.next.versions(ctx, prefix).await
    }

    async fn stat(&self, ctx: &RequestContext, rev: &str) -> Result<RevInfo> {
        if version::is_valid(rev) {
            ctx.check()?;
            if let Ok(data) = self.store.get(&self.rel_path(rev, REVINFO_NAME)) {
                tracing::debug!(module = %self.module_path(), rev, "revision info found in cache");
                let info: RevInfo = serde_json::from_slice(&data)
                    .map_err(ProxyError::Json)
                    .context("invalid cached revision info")?;
                return Ok(info);
            }
        }

        let info = self.next.stat(ctx, rev).await?;
        let encoded = serde_json::to_vec(&info)
            .map_err(ProxyError::Json)
            .context("encoding revision info for cache")?;
        // branch stats land under their resolved version
        if let Err(err) = self.store.set(&self.rel_path(&info.version, REVINFO_NAME), &encoded) {
            tracing::warn!(module = %self.module_path(), error = %err, "failed to cache revision info");
        }
        Ok(info)
    }

    async fn go_mod(&self, ctx: &RequestContext, ver: &str) -> Result<Vec<u8>> {
        ctx.check()?;
        let key = self.rel_path(ver, GOMOD_NAME);
        if let Ok(data) = self.store.get(&key) {
            tracing::debug!(module = %self.module_path(), ver, "go.mod found in cache");
            return Ok(data);
        }

        let data = self
            .next
            .go_mod(ctx, ver)
            .await
            .context("aposteriori go.mod delegation")?;
        if let Err(err) = self.store.set(&key, &data) {
            tracing::warn!(module = %self.module_path(), error = %err, "failed to cache go.mod");
        }
        Ok(data)
    }

    async fn zip(&self, ctx: &RequestContext, ver: &str) -> Result<ZipReader> {
        ctx.check()?;
        let key = self.rel_path(ver, ZIP_NAME);
        if let Ok(data) = self.store.get(&key) {
            tracing::debug!(module = %self.module_path(), ver, "source archive found in cache");
            return Ok(Box::new(Cursor::new(data)) as ZipReader);
        }

        let upstream = self
            .next
            .zip(ctx, ver)
            .await
            .context("aposteriori source delegation")?;
        Ok(Box::new(CachingReader::new(
            upstream,
            key,
            self.store.clone(),
            self.registry.clone(),
            self.module_path().to_string(),
            ver.to_string(),
        )) as ZipReader)
    }
}
