//! Per-request GitLab module handle.
//!
//! Tag queries run against the unversioned project path first and fall back
//! to the full path, so `gitlab.com/u/m/v2` finds the `u/m` project. When a
//! revision has no matching semver tag, a pseudo-version is synthesized
//! from the commit history.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::io::Cursor;

use async_trait::async_trait;

use modproxy_core::error::{ProxyError, Result, ResultExt};
use modproxy_core::{Module, Repacker, RequestContext, RevInfo, ZipReader, gomod, version};

use crate::client::Client;
use crate::types::{Commit, Tag};

pub struct GitlabModule {
    client: Client,
    /// Module path as requested, `/vN` suffix included.
    full_path: String,
    /// `full_path` without its host segment; what GitLab knows the project as.
    path: String,
    /// `path` without the `/vN` tail.
    path_unversioned: String,
    /// Expected major version from the `/vN` suffix, 0 when absent.
    major: i32,
}

impl GitlabModule {
    pub fn new(
        client: Client,
        full_path: String,
        path: String,
        path_unversioned: String,
        major: i32,
    ) -> Self {
        Self {
            client,
            full_path,
            path,
            path_unversioned,
            major,
        }
    }

    async fn tags_with_fallback(&self) -> Result<Vec<Tag>> {
        match self.client.tags(&self.path_unversioned).await {
            Ok(tags) => Ok(tags),
            Err(err) => {
                if self.path_unversioned == self.path {
                    return Err(err.into());
                }
                tracing::warn!(
                    unversioned = %self.path_unversioned,
                    path = %self.path,
                    error = %err,
                    "tag query failed for unversioned path, retrying with full path"
                );
                self.client.tags(&self.path).await.map_err(Into::into)
            }
        }
    }

    async fn commits_with_fallback(&self, ref_name: &str) -> Result<Vec<Commit>> {
        match self.client.commits(&self.path_unversioned, ref_name).await {
            Ok(commits) => Ok(commits),
            Err(err) => {
                if self.path_unversioned == self.path {
                    return Err(err.into());
                }
                self.client
                    .commits(&self.path, ref_name)
                    .await
                    .map_err(Into::into)
            }
        }
    }

    async fn versions_for(&self, prefix: &str, project: &str) -> Result<Vec<String>> {
        let tags = self
            .client
            .tags(project)
            .await
            .map_err(ProxyError::from)
            .context("gitlab getting repository tags")?;

        let names: Vec<String> = tags
            .into_iter()
            .filter(|t| version::is_valid(&t.name) && t.name.starts_with(prefix))
            .map(|t| t.name)
            .collect();
        if !names.is_empty() {
            return Ok(version::sort_versions(names));
        }

        // tagless repository: a single pseudo-version stands for master
        match self.pseudo_stat("master").await {
            Ok(info) => Ok(vec![info.version]),
            Err(err) => {
                tracing::warn!(error = %err, "getting revision info for master");
                Err(ProxyError::NotFound(format!(
                    "semver tags in repository {project}"
                )))
            }
        }
    }

    async fn stat_rev(&self, rev: &str) -> Result<RevInfo> {
        if version::is_valid(rev) {
            self.stat_version(rev).await
        } else {
            // branch or bare commit id
            self.pseudo_stat(rev).await
        }
    }

    async fn stat_version(&self, rev: &str) -> Result<RevInfo> {
        // a pseudo-version points at a commit, not a tag
        if let Some(sha) = version::pseudo_sha(rev) {
            if let Ok(mut res) = self.pseudo_stat(sha).await {
                if version::compare(rev, &res.version) == Ordering::Greater {
                    res.version = rev.to_string();
                }
                return Ok(res);
            }
        }

        let tags = self
            .tags_with_fallback()
            .await
            .context("gitlab getting repository tags")?;
        for tag in tags {
            if tag.name == rev {
                return Ok(RevInfo {
                    version: tag.name,
                    time: tag.commit.created_at,
                    name: tag.commit.id,
                    short: tag.commit.short_id,
                });
            }
        }

        Err(ProxyError::NotFound(format!(
            "revision {rev} of {}",
            self.path
        )))
    }

    async fn pseudo_stat(&self, rev: &str) -> Result<RevInfo> {
        let commits = self
            .commits_with_fallback(rev)
            .await
            .with_context(|| format!("getting commits for `{rev}`"))?;
        if commits.is_empty() {
            return Err(ProxyError::NotFound(format!("commits for revision {rev}")));
        }
        let commit_ids: HashSet<&str> = commits.iter().map(|c| c.id.as_str()).collect();

        let tags = self
            .tags_with_fallback()
            .await
            .context("getting repository tags")?;
        let mut max_ver = "v0.0.0".to_string();
        for tag in &tags {
            if !commit_ids.contains(tag.commit.id.as_str()) {
                continue;
            }
            if !version::is_valid(&tag.name) {
                continue;
            }
            max_ver = version::max_version(&max_ver, &tag.name).to_string();
        }

        let base = if version::major(&max_ver) < self.major {
            format!("v{}.0.0-", self.major)
        } else {
            // max_ver is always valid here
            let (major, minor, patch) = version::major_minor_patch(&max_ver).unwrap_or((0, 0, 0));
            format!("v{major}.{minor}.{}-0.", patch + 1)
        };

        let head = &commits[0];
        let moment = utc_moment(&head.created_at)?;
        Ok(RevInfo {
            version: version::build_pseudo(&base, &moment, &head.short_id),
            time: head.created_at.clone(),
            name: head.id.clone(),
            short: head.short_id.clone(),
        })
    }

    async fn fetch_go_mod(&self, ver: &str) -> Result<Vec<u8>> {
        if let Some(sha) = version::pseudo_sha(ver) {
            if let Ok(data) = self.client.file(&self.path_unversioned, "go.mod", sha).await {
                return Ok(data);
            }
            if let Ok(data) = self.client.file(&self.path, "go.mod", sha).await {
                return Ok(data);
            }
        }
        match self.client.file(&self.path_unversioned, "go.mod", ver).await {
            Ok(data) => Ok(data),
            Err(_) => self
                .client
                .file(&self.path, "go.mod", ver)
                .await
                .map_err(Into::into),
        }
    }

    async fn fetch_zip(&self, revision: &str, ver: &str) -> Result<ZipReader> {
        let project = match self.client.project_info(&self.path_unversioned).await {
            Ok(p) => p,
            Err(err) => {
                if self.path_unversioned == self.path {
                    return Err(ProxyError::from(err)
                        .wrap(format!("gitlab getting project {} info", self.path)));
                }
                self.client
                    .project_info(&self.path)
                    .await
                    .map_err(ProxyError::from)
                    .with_context(|| format!("gitlab getting project {} info", self.path))?
            }
        };

        let archive = self
            .client
            .archive(project.id, revision)
            .await
            .map_err(ProxyError::from)
            .context("gitlab reading source archive")?;

        let repacker =
            Repacker::new(&self.full_path, ver).context("initiating gitlab archive repacker")?;
        let data = repacker.repack(&archive).context("gitlab repacking source archive")?;
        Ok(Box::new(Cursor::new(data)) as ZipReader)
    }
}

fn utc_moment(rfc3339: &str) -> Result<String> {
    let parsed = chrono::DateTime::parse_from_rfc3339(rfc3339)
        .map_err(ProxyError::upstream)
        .context("parsing commit time")?;
    Ok(parsed
        .with_timezone(&chrono::Utc)
        .format("%Y%m%d%H%M%S")
        .to_string())
}

#[async_trait]
impl Module for GitlabModule {
    fn module_path(&self) -> &str {
        &self.full_path
    }

    async fn versions(&self, ctx: &RequestContext, prefix: &str) -> Result<Vec<String>> {
        ctx.guard(async {
            match self.versions_for(prefix, &self.path_unversioned).await {
                Ok(tags) => Ok(tags),
                Err(err) => {
                    if self.path_unversioned == self.path {
                        return Err(err);
                    }
                    tracing::warn!(
                        unversioned = %self.path_unversioned,
                        path = %self.path,
                        error = %err,
                        "version list failed for unversioned path, retrying with full path"
                    );
                    self.versions_for(prefix, &self.path).await
                }
            }
        })
        .await
    }

    async fn stat(&self, ctx: &RequestContext, rev: &str) -> Result<RevInfo> {
        ctx.guard(async {
            let res = self.stat_rev(rev).await?;
            let found = version::major(&res.version);
            if found >= 2 && found < self.major {
                return Err(ProxyError::VersionMismatch {
                    expected: self.major,
                    found,
                });
            }
            Ok(res)
        })
        .await
    }

    async fn go_mod(&self, ctx: &RequestContext, ver: &str) -> Result<Vec<u8>> {
        ctx.guard(async {
            let data = match self.fetch_go_mod(ver).await {
                Ok(data) => data,
                Err(err) if err.is_not_found() => {
                    return Ok(format!("module {}\n", self.full_path).into_bytes());
                }
                Err(err) => return Err(err.wrap("gitlab getting go.mod")),
            };

            let parsed = gomod::parse(&data).context("gitlab parsing repository go.mod")?;
            if parsed.name != self.full_path {
                return Err(ProxyError::ModulePathMismatch {
                    declared: parsed.name,
                    requested: self.full_path.clone(),
                });
            }
            Ok(data)
        })
        .await
    }

    async fn zip(&self, ctx: &RequestContext, ver: &str) -> Result<ZipReader> {
        ctx.guard(async {
            if let Some(sha) = version::pseudo_sha(ver) {
                if let Ok(reader) = self.fetch_zip(sha, ver).await {
                    return Ok(reader);
                }
            }
            self.fetch_zip(ver, ver).await
        })
        .await
    }
}
