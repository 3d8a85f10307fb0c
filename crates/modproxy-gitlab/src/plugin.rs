//! GitLab plugin: builds per-request module handles.

use async_trait::async_trait;

use modproxy_core::error::Result;
use modproxy_core::{Module, ModuleRequest, Plugin};

use crate::client::Client;
use crate::error::GitlabError;
use crate::module::GitlabModule;

enum Auth {
    /// Public projects only.
    Anonymous,
    /// One service token for everything.
    Token(String),
    /// Token arrives as the basic-auth user of each request.
    FromRequest,
}

pub struct GitlabPlugin {
    api_url: String,
    auth: Auth,
}

impl GitlabPlugin {
    /// Anonymous access to `api_url` (e.g. `https://gitlab.com/api/v4`).
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            auth: Auth::Anonymous,
        }
    }

    /// Fixed-token access.
    pub fn with_token(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            auth: Auth::Token(token.into()),
        }
    }

    /// Token taken from each request's basic-auth user.
    pub fn with_request_auth(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            auth: Auth::FromRequest,
        }
    }
}

/// The project path GitLab knows: the module path without its host segment.
fn gitlab_path(full_path: &str) -> &str {
    match full_path.split_once('/') {
        Some((_, rest)) => rest,
        None => full_path,
    }
}

/// `vN` with N ≥ 2; smaller suffixes are ordinary path segments.
fn is_major_segment(s: &str) -> Option<i32> {
    let digits = s.strip_prefix('v')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: i32 = digits.parse().ok()?;
    (n >= 2).then_some(n)
}

fn split_major(path: &str) -> (String, i32) {
    if let Some((head, tail)) = path.rsplit_once('/') {
        if let Some(n) = is_major_segment(tail) {
            return (head.to_string(), n);
        }
    }
    (path.to_string(), 0)
}

#[async_trait]
impl Plugin for GitlabPlugin {
    async fn module_for(&self, request: &ModuleRequest) -> Result<Box<dyn Module>> {
        let token = match &self.auth {
            Auth::Anonymous => None,
            Auth::Token(token) => Some(token.clone()),
            Auth::FromRequest => {
                let auth = request
                    .basic_auth
                    .as_ref()
                    .filter(|a| !a.user.is_empty())
                    .ok_or(GitlabError::AuthRequired)?;
                Some(auth.user.clone())
            }
        };

        let full_path = request.module_path.clone();
        let path = gitlab_path(&full_path).to_string();
        let (path_unversioned, major) = split_major(&path);

        Ok(Box::new(GitlabModule::new(
            Client::new(&self.api_url, token),
            full_path,
            path,
            path_unversioned,
            major,
        )))
    }

    fn name(&self) -> String {
        "gitlab".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modproxy_core::BasicAuth;

    #[test]
    fn test_gitlab_path_strips_host() {
        assert_eq!(gitlab_path("gitlab.com/user/mod"), "user/mod");
        assert_eq!(gitlab_path("gitlab.com/user/mod/v3"), "user/mod/v3");
        assert_eq!(gitlab_path("nohost"), "nohost");
    }

    #[test]
    fn test_split_major() {
        assert_eq!(split_major("user/mod/v2"), ("user/mod".into(), 2));
        assert_eq!(split_major("user/mod/v10"), ("user/mod".into(), 10));
        assert_eq!(split_major("user/mod"), ("user/mod".into(), 0));
        // v1 and v0 are plain segments
        assert_eq!(split_major("user/mod/v1"), ("user/mod/v1".into(), 0));
        assert_eq!(split_major("user/v2x"), ("user/v2x".into(), 0));
        assert_eq!(split_major("v2"), ("v2".into(), 0));
    }

    #[tokio::test]
    async fn test_request_auth_required() {
        let plugin = GitlabPlugin::with_request_auth("https://gitlab.example/api/v4");
        let err = plugin
            .module_for(&ModuleRequest::new("gitlab.example/u/m"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("authorization"));
    }

    #[tokio::test]
    async fn test_request_auth_accepts_credentials() {
        let plugin = GitlabPlugin::with_request_auth("https://gitlab.example/api/v4");
        let mut request = ModuleRequest::new("gitlab.example/u/m/v2");
        request.basic_auth = Some(BasicAuth {
            user: "token-value".into(),
            password: String::new(),
        });
        let module = plugin.module_for(&request).await.unwrap();
        assert_eq!(module.module_path(), "gitlab.example/u/m/v2");
    }
}
