//! One repository handle per module path, backed by the `go` toolchain.
//!
//! Every invocation runs inside the configured cache directory with
//! `GOPATH` pointing at it, so downloaded sources land under
//! `<cache-dir>/pkg/mod/cache/...`. An internal lock serializes toolchain
//! runs for the same module; the toolchain locks the module cache for
//! cross-module concurrency itself.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::process::Command;

use modproxy_core::error::{ProxyError, Result};
use modproxy_core::{RevInfo, version};

pub struct Repo {
    module_path: String,
    root: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

/// `go mod download -json` record.
#[derive(Debug, Deserialize)]
pub(crate) struct DownloadInfo {
    #[serde(rename = "Version", default)]
    pub version: String,
    #[serde(rename = "Time", default)]
    pub time: String,
    #[serde(rename = "GoMod", default)]
    pub go_mod: String,
    #[serde(rename = "Zip", default)]
    pub zip: String,
    #[serde(rename = "Error", default)]
    pub error: String,
}

/// `go list -m -json` record.
#[derive(Debug, Deserialize)]
struct ListInfo {
    #[serde(rename = "Version", default)]
    version: String,
    #[serde(rename = "Time", default)]
    time: String,
}

impl Repo {
    pub fn new(module_path: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            module_path: module_path.into(),
            root: root.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn module_path(&self) -> &str {
        &self.module_path
    }

    async fn run_go(&self, args: &[&str]) -> Result<Vec<u8>> {
        let _guard = self.lock.lock().await;
        tracing::debug!(module = %self.module_path, ?args, "running go toolchain");
        let output = Command::new("go")
            .args(args)
            .current_dir(&self.root)
            .env("GOPATH", &self.root)
            .env("GO111MODULE", "on")
            .env("GOFLAGS", "-mod=mod")
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ProxyError::upstream(std::io::Error::other(format!(
                "go {} failed: {stderr}",
                args.first().copied().unwrap_or_default()
            ))));
        }
        Ok(output.stdout)
    }

    /// Tagged versions of the module starting with `prefix`.
    pub async fn versions(&self, prefix: &str) -> Result<Vec<String>> {
        let out = self
            .run_go(&["list", "-m", "-versions", self.module_path.as_str()])
            .await?;
        Ok(parse_versions_output(&out, prefix))
    }

    /// Revision info of the `@latest` resolution.
    pub async fn latest(&self) -> Result<RevInfo> {
        let target = format!("{}@latest", self.module_path);
        let out = self.run_go(&["list", "-m", "-json", target.as_str()]).await?;
        let info: ListInfo = serde_json::from_slice(&out)?;
        if info.version.is_empty() {
            return Err(ProxyError::NotFound(format!(
                "latest version of {}",
                self.module_path
            )));
        }
        Ok(RevInfo {
            version: info.version,
            time: info.time,
            ..RevInfo::default()
        })
    }

    async fn download(&self, rev: &str) -> Result<DownloadInfo> {
        let target = format!("{}@{rev}", self.module_path);
        let out = self
            .run_go(&["mod", "download", "-json", target.as_str()])
            .await?;
        let info: DownloadInfo = serde_json::from_slice(&out)?;
        if !info.error.is_empty() {
            return Err(ProxyError::NotFound(format!(
                "revision {rev} of {}: {}",
                self.module_path, info.error
            )));
        }
        Ok(info)
    }

    /// Revision info for an arbitrary rev (version, branch, commit).
    pub async fn stat(&self, rev: &str) -> Result<RevInfo> {
        let info = self.download(rev).await?;
        Ok(RevInfo {
            version: info.version,
            time: info.time,
            ..RevInfo::default()
        })
    }

    /// The go.mod payload recorded for `version`.
    pub async fn go_mod(&self, version: &str) -> Result<Vec<u8>> {
        let info = self.download(version).await?;
        if info.go_mod.is_empty() {
            return Err(ProxyError::NotFound(format!(
                "go.mod of {}@{version}",
                self.module_path
            )));
        }
        Ok(tokio::fs::read(&info.go_mod).await?)
    }

    /// Stages the module zip for `version` under `dest` and returns its path.
    pub async fn zip(&self, version: &str, dest: &Path) -> Result<PathBuf> {
        let info = self.download(version).await?;
        if info.zip.is_empty() {
            return Err(ProxyError::NotFound(format!(
                "source archive of {}@{version}",
                self.module_path
            )));
        }
        let staged = dest.join("src.zip");
        tokio::fs::copy(&info.zip, &staged).await?;
        Ok(staged)
    }
}

/// Parses `go list -m -versions` output: `<module> v1 v2 ...`.
fn parse_versions_output(out: &[u8], prefix: &str) -> Vec<String> {
    let text = String::from_utf8_lossy(out);
    let versions: Vec<String> = text
        .split_whitespace()
        .skip(1)
        .filter(|v| v.starts_with(prefix))
        .map(ToString::to_string)
        .collect();
    version::sort_versions(versions)
}
