//! Thin GitLab REST client covering the handful of repository reads the
//! proxy needs: tags, commits, one raw file, project info and the archive.

use crate::error::{GitlabError, Result};
use crate::types::{Commit, Project, Tag};

/// Per-request client bound to one API root and one (optional) token.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl Client {
    /// `base_url` is the API root, e.g. `https://gitlab.com/api/v4`.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn get(&self, url: String, what: &str) -> Result<reqwest::Response> {
        tracing::debug!(url = %url, "gitlab request");
        let mut req = self.http.get(&url);
        if let Some(token) = &self.token {
            req = req.header("PRIVATE-TOKEN", token);
        }
        let resp = req.send().await.map_err(|source| GitlabError::Http {
            url: url.clone(),
            source,
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(GitlabError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GitlabError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    fn project_url(&self, project: &str) -> String {
        format!("{}/projects/{}", self.base_url, urlencoding::encode(project))
    }

    /// All repository tags of `project` (a `namespace/name` path).
    pub async fn tags(&self, project: &str) -> Result<Vec<Tag>> {
        let url = format!("{}/repository/tags?per_page=100", self.project_url(project));
        let resp = self.get(url, &format!("tags of {project}")).await?;
        resp.json()
            .await
            .map_err(|source| GitlabError::ApiResponse { source })
    }

    /// Commit history reachable from `ref_name`.
    pub async fn commits(&self, project: &str, ref_name: &str) -> Result<Vec<Commit>> {
        let url = format!(
            "{}/repository/commits?ref_name={}&per_page=100",
            self.project_url(project),
            urlencoding::encode(ref_name)
        );
        let resp = self
            .get(url, &format!("commits of {project}@{ref_name}"))
            .await?;
        resp.json()
            .await
            .map_err(|source| GitlabError::ApiResponse { source })
    }

    /// Raw file content at `reference`.
    pub async fn file(&self, project: &str, file_path: &str, reference: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/repository/files/{}/raw?ref={}",
            self.project_url(project),
            urlencoding::encode(file_path),
            urlencoding::encode(reference)
        );
        let resp = self
            .get(url, &format!("{file_path} of {project}@{reference}"))
            .await?;
        let data = resp
            .bytes()
            .await
            .map_err(|source| GitlabError::ApiResponse { source })?;
        Ok(data.to_vec())
    }

    /// Project metadata; the proxy only needs the numeric id.
    pub async fn project_info(&self, project: &str) -> Result<Project> {
        let url = self.project_url(project);
        let resp = self.get(url, &format!("project {project}")).await?;
        resp.json()
            .await
            .map_err(|source| GitlabError::ApiResponse { source })
    }

    /// Zip archive of the repository at `reference`, fully buffered.
    pub async fn archive(&self, project_id: u64, reference: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/projects/{}/repository/archive.zip?sha={}",
            self.base_url,
            project_id,
            urlencoding::encode(reference)
        );
        let resp = self
            .get(url, &format!("archive of project {project_id}@{reference}"))
            .await?;
        let data = resp
            .bytes()
            .await
            .map_err(|source| GitlabError::ApiResponse { source })?;
        Ok(data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tags_parses_payload() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/projects/user%2Fm/repository/tags")
            .match_query(mockito::Matcher::Any)
            .with_body(
                r#"[{"name":"v0.1.0","commit":{"id":"a1","short_id":"a1","created_at":"2023-01-01T00:00:00Z"}}]"#,
            )
            .create_async()
            .await;

        let client = Client::new(server.url(), None);
        let tags = client.tags("user/m").await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "v0.1.0");
    }

    #[tokio::test]
    async fn test_missing_project_maps_to_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/projects/user%2Fmissing/repository/tags")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let client = Client::new(server.url(), None);
        let err = client.tags("user/missing").await.unwrap_err();
        assert!(matches!(err, GitlabError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_error_status_carries_body() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/projects/user%2Fm/repository/tags")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = Client::new(server.url(), None);
        let err = client.tags("user/m").await.unwrap_err();
        match err {
            GitlabError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[tokio::test]
    async fn test_token_header_is_sent() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/projects/user%2Fm")
            .match_header("PRIVATE-TOKEN", "secret")
            .with_body(r#"{"id":7}"#)
            .create_async()
            .await;

        let client = Client::new(server.url(), Some("secret".into()));
        let project = client.project_info("user/m").await.unwrap();
        assert_eq!(project.id, 7);
    }
}
