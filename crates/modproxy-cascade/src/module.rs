//! Cascade module handle: every operation is one GET against the upstream
//! proxy, with the zip payload streamed through untouched.

use async_trait::async_trait;
use futures::TryStreamExt;
use tokio_util::io::StreamReader;

use modproxy_core::error::{ProxyError, Result, ResultExt};
use modproxy_core::{BasicAuth, Module, RequestContext, RevInfo, ZipReader};

pub struct CascadeModule {
    module_path: String,
    /// Case-encoded module path, ready for upstream URLs.
    request_path: String,
    upstream: String,
    client: reqwest::Client,
    basic_auth: Option<BasicAuth>,
}

impl CascadeModule {
    pub(crate) fn new(
        module_path: String,
        request_path: String,
        upstream: String,
        client: reqwest::Client,
        basic_auth: Option<BasicAuth>,
    ) -> Self {
        Self {
            module_path,
            request_path,
            upstream,
            client,
            basic_auth,
        }
    }

    async fn make_request(&self, url: String) -> Result<reqwest::Response> {
        tracing::debug!(url = %url, "cascade request");
        let mut req = self.client.get(&url);
        if let Some(auth) = &self.basic_auth {
            req = req.basic_auth(&auth.user, Some(&auth.password));
        }
        let resp = req
            .send()
            .await
            .map_err(ProxyError::upstream)
            .with_context(|| format!("cascade requesting {url}"))?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProxyError::UpstreamStatus {
                status: status.as_u16(),
                body,
            }
            .wrap(format!("cascade requesting {url}")));
        }
        Ok(resp)
    }

    fn op_url(&self, op: &str) -> String {
        format!("{}/{}/@v/{op}", self.upstream, self.request_path)
    }
}

#[async_trait]
impl Module for CascadeModule {
    fn module_path(&self) -> &str {
        &self.module_path
    }

    async fn versions(&self, ctx: &RequestContext, _prefix: &str) -> Result<Vec<String>> {
        ctx.guard(async {
            let resp = self.make_request(self.op_url("list")).await?;
            let body = resp
                .text()
                .await
                .map_err(ProxyError::upstream)
                .context("cascade reading version list")?;
            Ok(body
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(ToString::to_string)
                .collect())
        })
        .await
    }

    async fn stat(&self, ctx: &RequestContext, rev: &str) -> Result<RevInfo> {
        ctx.guard(async {
            let resp = self.make_request(self.op_url(&format!("{rev}.info"))).await?;
            resp.json::<RevInfo>()
                .await
                .map_err(ProxyError::upstream)
                .with_context(|| format!("cascade decoding revision info for {}", self.module_path))
        })
        .await
    }

    async fn go_mod(&self, ctx: &RequestContext, version: &str) -> Result<Vec<u8>> {
        ctx.guard(async {
            let resp = self
                .make_request(self.op_url(&format!("{version}.mod")))
                .await?;
            let data = resp
                .bytes()
                .await
                .map_err(ProxyError::upstream)
                .with_context(|| format!("cascade reading go.mod of {}", self.module_path))?;
            Ok(data.to_vec())
        })
        .await
    }

    async fn zip(&self, ctx: &RequestContext, version: &str) -> Result<ZipReader> {
        ctx.guard(async {
            let resp = self
                .make_request(self.op_url(&format!("{version}.zip")))
                .await?;
            let stream = resp.bytes_stream().map_err(std::io::Error::other);
            Ok(Box::new(StreamReader::new(Box::pin(stream))) as ZipReader)
        })
        .await
    }
}
