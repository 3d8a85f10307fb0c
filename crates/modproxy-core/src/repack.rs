//! Archive repacking.
//!
//! Code-hosting archives keep everything under a `<project-slug>-<sha>/`
//! top directory; the module protocol wants `<module>[/vN]@<version>/`.
//! The repacker rewrites entry names and leaves entry bytes and attributes
//! untouched.

use std::io::Cursor;

use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{ProxyError, Result, ResultExt};
use crate::version;

/// Entry-name rewriter plus the zip transformation built on it.
pub struct Repacker {
    prefix: String,
}

impl Repacker {
    /// Repacker for a code-hosting archive of `module_full_path` at
    /// `version`. `/vN` is appended iff the version's major is ≥ 2 and the
    /// module path does not already carry it.
    pub fn new(module_full_path: &str, ver: &str) -> Result<Self> {
        let path = module_full_path.trim_matches('/');
        if path.is_empty() {
            return Err(ProxyError::BadRequest("empty module path".into()));
        }
        let major = version::major(ver);
        let prefix = if major >= 2 && !path.ends_with(&format!("/v{major}")) {
            format!("{path}/v{major}@{ver}")
        } else {
            format!("{path}@{ver}")
        };
        Ok(Self { prefix })
    }

    /// Strips the first path segment, preserving a trailing slash.
    pub fn relativer(&self, path: &str) -> Result<String> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Err(ProxyError::BadRequest(format!("wrong archive path `{path}`")));
        }
        let mut rel = match trimmed.split_once('/') {
            Some((_, rest)) => rest.to_string(),
            None => String::new(),
        };
        if path.ends_with('/') && !rel.ends_with('/') {
            rel.push('/');
        }
        Ok(rel)
    }

    /// Joins a relative path onto the module@version prefix.
    pub fn destinator(&self, rel: &str) -> String {
        format!("{}/{}", self.prefix, rel.trim_start_matches('/'))
    }

    /// Rewrites a whole archive: every entry renamed through
    /// [`Self::relativer`] + [`Self::destinator`], directories re-created,
    /// file bytes copied verbatim, archive comment preserved.
    pub fn repack(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut src = ZipArchive::new(Cursor::new(data))
            .map_err(ProxyError::upstream)
            .context("reading source archive")?;

        let mut dst = ZipWriter::new(Cursor::new(Vec::new()));
        dst.set_raw_comment(src.comment().to_vec().into_boxed_slice());

        for i in 0..src.len() {
            let entry = src
                .by_index_raw(i)
                .map_err(ProxyError::upstream)
                .context("reading archive entry")?;
            let rel = self.relativer(entry.name())?;
            let name = self.destinator(&rel);

            if entry.is_dir() {
                drop(entry);
                dst.add_directory(name.trim_end_matches('/'), SimpleFileOptions::default())
                    .map_err(ProxyError::upstream)
                    .context("recreating archive directory")?;
            } else {
                dst.raw_copy_file_rename(entry, name)
                    .map_err(ProxyError::upstream)
                    .context("copying archive entry")?;
            }
        }

        let cursor = dst
            .finish()
            .map_err(ProxyError::upstream)
            .context("finishing repacked archive")?;
        Ok(cursor.into_inner())
    }
}
