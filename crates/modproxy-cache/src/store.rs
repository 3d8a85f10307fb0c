//! File store capability the cache writes through.

use std::path::{Component, Path, PathBuf};

use modproxy_core::error::{ProxyError, Result, ResultExt};

/// Scoped blob store keyed by relative slash paths.
pub trait FileStore: Send + Sync {
    /// Stored bytes for `name`; `NotFound` on a miss.
    fn get(&self, name: &str) -> Result<Vec<u8>>;

    /// Stores `data` under `name`, replacing any previous content.
    fn set(&self, name: &str, data: &[u8]) -> Result<()>;
}

/// Directory-backed store. Writes go through a sibling temp file and a
/// rename so a crash never leaves a half-written cache entry.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(ProxyError::Io)
            .with_context(|| format!("creating cache directory `{}`", root.display()))?;
        Ok(Self { root })
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let rel = Path::new(name);
        let sane = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !sane || name.is_empty() {
            return Err(ProxyError::BadRequest(format!(
                "unsafe cache key `{name}`"
            )));
        }
        Ok(self.root.join(rel))
    }
}

impl FileStore for FsStore {
    fn get(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.resolve(name)?;
        match std::fs::read(&path) {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(ProxyError::NotFound(format!("cache entry {name}")))
            }
            Err(err) => Err(ProxyError::Io(err)),
        }
    }

    fn set(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(name)?;
        let parent = path
            .parent()
            .ok_or_else(|| ProxyError::BadRequest(format!("unsafe cache key `{name}`")))?;
        std::fs::create_dir_all(parent)
            .map_err(ProxyError::Io)
            .with_context(|| format!("creating cache subdirectory for {name}"))?;

        let tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(ProxyError::Io)
            .context("creating cache temp file")?;
        std::fs::write(tmp.path(), data)
            .map_err(ProxyError::Io)
            .with_context(|| format!("writing cache entry {name}"))?;
        tmp.persist(&path)
            .map_err(|e| ProxyError::Io(e.error))
            .with_context(|| format!("committing cache entry {name}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path()).unwrap();
        store
            .set("example.com/m/v1.0.0/go.mod", b"module example.com/m\n")
            .unwrap();
        assert_eq!(
            store.get("example.com/m/v1.0.0/go.mod").unwrap(),
            b"module example.com/m\n"
        );
    }

    #[test]
    fn test_miss_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path()).unwrap();
        assert!(store.get("absent/key").unwrap_err().is_not_found());
    }

    #[test]
    fn test_overwrite_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path()).unwrap();
        store.set("k/v", b"one").unwrap();
        store.set("k/v", b"two").unwrap();
        assert_eq!(store.get("k/v").unwrap(), b"two");
    }

    #[test]
    fn test_traversal_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path()).unwrap();
        assert!(store.get("../escape").is_err());
        assert!(store.set("/abs/path", b"x").is_err());
        assert!(store.set("", b"x").is_err());
    }
}
