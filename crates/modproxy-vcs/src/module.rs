//! VCS module handle.
//!
//! Toolchain operations do not notice cancellation, so every call runs on a
//! helper task publishing into a one-shot channel while the request task
//! races that channel against its context. On cancellation the helper is
//! abandoned; its eventual result has a buffered slot waiting and is simply
//! dropped.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use modproxy_core::error::{ProxyError, Result, ResultExt};
use modproxy_core::{Module, RequestContext, RevInfo, ZipReader};

use crate::repo::Repo;

pub struct VcsModule {
    repo: Arc<Repo>,
}

impl VcsModule {
    pub fn new(repo: Arc<Repo>) -> Self {
        Self { repo }
    }
}

async fn race<T>(ctx: &RequestContext, rx: oneshot::Receiver<Result<T>>) -> Result<T> {
    tokio::select! {
        () = ctx.cancelled() => Err(ProxyError::Cancelled),
        res = rx => match res {
            Ok(res) => res,
            Err(_) => Err(ProxyError::Io(std::io::Error::other(
                "helper task exited without a result",
            ))),
        },
    }
}

#[async_trait]
impl Module for VcsModule {
    fn module_path(&self) -> &str {
        self.repo.module_path()
    }

    async fn versions(&self, ctx: &RequestContext, prefix: &str) -> Result<Vec<String>> {
        ctx.check()?;
        let repo = self.repo.clone();
        let prefix = prefix.to_string();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let mut res = repo.versions(&prefix).await;
            if let Ok(tags) = &res {
                if tags.is_empty() {
                    // untagged module: latest resolution stands in
                    res = repo.latest().await.map(|info| vec![info.version]);
                }
            }
            let _ = tx.send(res);
        });
        race(ctx, rx).await.context("vcs getting versions")
    }

    async fn stat(&self, ctx: &RequestContext, rev: &str) -> Result<RevInfo> {
        ctx.check()?;
        let repo = self.repo.clone();
        let rev = rev.to_string();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = tx.send(repo.stat(&rev).await);
        });
        race(ctx, rx).await.context("vcs getting stat")
    }

    async fn go_mod(&self, ctx: &RequestContext, version: &str) -> Result<Vec<u8>> {
        ctx.check()?;
        let repo = self.repo.clone();
        let version = version.to_string();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = tx.send(repo.go_mod(&version).await);
        });
        race(ctx, rx).await.context("vcs getting go.mod")
    }

    async fn zip(&self, ctx: &RequestContext, version: &str) -> Result<ZipReader> {
        ctx.check()?;
        let repo = self.repo.clone();
        let version = version.to_string();
        let (tx, rx) = oneshot::channel::<Result<ZipReader>>();
        tokio::spawn(async move {
            let res = async {
                let dir = tempfile::Builder::new()
                    .prefix(".downloads")
                    .tempdir()
                    .map_err(ProxyError::Io)
                    .context("vcs creating staging directory for source archive")?;
                let staged = repo
                    .zip(&version, dir.path())
                    .await
                    .context("vcs getting source archive")?;
                let file = tokio::fs::File::open(&staged)
                    .await
                    .map_err(ProxyError::Io)
                    .context("vcs opening staged source archive")?;
                // the staging directory is removed when `dir` drops; the
                // open descriptor keeps the file readable
                Ok(Box::new(file) as ZipReader)
            }
            .await;
            let _ = tx.send(res);
        });
        race(ctx, rx).await.context("vcs getting source archive")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancelled_context_short_circuits() {
        let module = VcsModule::new(Arc::new(Repo::new("example.com/u/m", "/nonexistent")));
        let ctx = RequestContext::new();
        ctx.cancel();

        assert!(module.versions(&ctx, "").await.unwrap_err().is_cancelled());
        assert!(module.stat(&ctx, "v1.0.0").await.unwrap_err().is_cancelled());
        assert!(
            module
                .go_mod(&ctx, "v1.0.0")
                .await
                .unwrap_err()
                .is_cancelled()
        );
        assert!(module.zip(&ctx, "v1.0.0").await.err().unwrap().is_cancelled());
    }

    #[tokio::test]
    async fn test_race_prefers_result_when_not_cancelled() {
        let ctx = RequestContext::new();
        let (tx, rx) = oneshot::channel();
        tx.send(Ok(5)).ok();
        assert_eq!(race(&ctx, rx).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_race_reports_dead_helper() {
        let ctx = RequestContext::new();
        let (tx, rx) = oneshot::channel::<Result<()>>();
        drop(tx);
        let err = race(&ctx, rx).await.unwrap_err();
        assert!(!err.is_cancelled());
    }
}
