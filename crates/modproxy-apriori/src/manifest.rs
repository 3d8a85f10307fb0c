//! On-disk manifest: everything this back-end will ever serve, declared up
//! front as `module path → version → (rev info, go.mod path, zip path)`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use modproxy_core::error::{ProxyError, Result, ResultExt};
use modproxy_core::RevInfo;

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleInfo {
    #[serde(rename = "RevInfo")]
    pub rev_info: RevInfo,
    #[serde(rename = "GoModPath")]
    pub go_mod_path: String,
    #[serde(rename = "ArchivePath")]
    pub archive_path: String,
}

pub type Mapping = HashMap<String, HashMap<String, ModuleInfo>>;

/// Loads and validates a manifest file. Every referenced file must exist
/// and every entry's declared version must equal its map key; violations
/// abort initialization.
pub fn load(path: &Path) -> Result<Mapping> {
    let data = std::fs::read(path)
        .map_err(ProxyError::Io)
        .with_context(|| format!("reading apriori manifest `{}`", path.display()))?;
    let mapping: Mapping = serde_json::from_slice(&data)
        .map_err(ProxyError::Json)
        .with_context(|| format!("decoding apriori manifest `{}`", path.display()))?;

    for (module, versions) in &mapping {
        for (version, info) in versions {
            if &info.rev_info.version != version {
                return Err(ProxyError::BadRequest(format!(
                    "apriori entry {module}@{version} declares version {}",
                    info.rev_info.version
                )));
            }
            for file in [&info.go_mod_path, &info.archive_path] {
                if !Path::new(file).is_file() {
                    return Err(ProxyError::BadRequest(format!(
                        "apriori entry {module}@{version} references missing file `{file}`"
                    )));
                }
            }
        }
    }

    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> String {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_load_valid_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let gomod = write_file(dir.path(), "m.mod", b"module example.com/m\n");
        let zip = write_file(dir.path(), "m.zip", b"zipbytes");
        let manifest = write_file(
            dir.path(),
            "manifest.json",
            format!(
                r#"{{"example.com/m":{{"v1.0.0":{{"RevInfo":{{"Version":"v1.0.0","Time":"2023-01-01T00:00:00Z"}},"GoModPath":"{gomod}","ArchivePath":"{zip}"}}}}}}"#
            )
            .as_bytes(),
        );

        let mapping = load(Path::new(&manifest)).unwrap();
        assert_eq!(mapping.len(), 1);
        assert!(mapping["example.com/m"].contains_key("v1.0.0"));
    }

    #[test]
    fn test_load_rejects_version_key_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let gomod = write_file(dir.path(), "m.mod", b"module example.com/m\n");
        let zip = write_file(dir.path(), "m.zip", b"zipbytes");
        let manifest = write_file(
            dir.path(),
            "manifest.json",
            format!(
                r#"{{"example.com/m":{{"v1.0.0":{{"RevInfo":{{"Version":"v2.0.0","Time":"t"}},"GoModPath":"{gomod}","ArchivePath":"{zip}"}}}}}}"#
            )
            .as_bytes(),
        );

        assert!(load(Path::new(&manifest)).is_err());
    }

    #[test]
    fn test_load_rejects_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_file(
            dir.path(),
            "manifest.json",
            br#"{"example.com/m":{"v1.0.0":{"RevInfo":{"Version":"v1.0.0","Time":"t"},"GoModPath":"/missing.mod","ArchivePath":"/missing.zip"}}}"#,
        );

        assert!(load(Path::new(&manifest)).is_err());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_file(dir.path(), "manifest.json", b"not json");
        assert!(load(Path::new(&manifest)).is_err());
    }
}
