//! VCS plugin: one repository handle per module path.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use modproxy_core::error::{ProxyError, Result, ResultExt};
use modproxy_core::{Module, ModuleRequest, Plugin};

use crate::module::VcsModule;
use crate::repo::Repo;

pub struct VcsPlugin {
    root: PathBuf,
    repos: Mutex<HashMap<String, Arc<Repo>>>,
}

impl VcsPlugin {
    /// Prepares `cache_dir` as the toolchain workspace. Fails when the
    /// directory cannot be created or is not a directory; the toolchain
    /// needs a module context, so a scratch go.mod is written once.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let root = cache_dir.into();
        std::fs::create_dir_all(&root)
            .map_err(ProxyError::Io)
            .with_context(|| format!("vcs creating directory `{}`", root.display()))?;
        let meta = std::fs::metadata(&root)?;
        if !meta.is_dir() {
            return Err(ProxyError::BadRequest(format!(
                "vcs cache path `{}` is not a directory",
                root.display()
            )));
        }

        let scratch = root.join("go.mod");
        if !scratch.exists() {
            std::fs::write(&scratch, "module modproxy.scratch\n")
                .map_err(ProxyError::Io)
                .context("vcs writing scratch go.mod")?;
        }

        Ok(Self {
            root,
            repos: Mutex::new(HashMap::new()),
        })
    }

    fn repo_for(&self, path: &str) -> Arc<Repo> {
        let mut repos = self.repos.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        repos
            .entry(path.to_string())
            .or_insert_with(|| Arc::new(Repo::new(path, &self.root)))
            .clone()
    }
}

#[async_trait]
impl Plugin for VcsPlugin {
    async fn module_for(&self, request: &ModuleRequest) -> Result<Box<dyn Module>> {
        let repo = self.repo_for(&request.module_path);
        Ok(Box::new(VcsModule::new(repo)))
    }

    fn name(&self) -> String {
        "legacy".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cache");
        let _plugin = VcsPlugin::new(&root).unwrap();
        assert!(root.is_dir());
        assert!(root.join("go.mod").exists());
    }

    #[test]
    fn test_init_rejects_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();
        assert!(VcsPlugin::new(&file).is_err());
    }

    #[test]
    fn test_repo_handles_are_reused() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = VcsPlugin::new(dir.path()).unwrap();
        let a = plugin.repo_for("example.com/u/m");
        let b = plugin.repo_for("example.com/u/m");
        let c = plugin.repo_for("example.com/u/other");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn test_module_for_exposes_path() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = VcsPlugin::new(dir.path()).unwrap();
        let module = plugin
            .module_for(&ModuleRequest::new("example.com/u/m"))
            .await
            .unwrap();
        assert_eq!(module.module_path(), "example.com/u/m");
        assert_eq!(plugin.name(), "legacy");
    }
}
