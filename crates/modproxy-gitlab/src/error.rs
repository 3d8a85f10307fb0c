//! Errors specific to the GitLab back-end.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitlabError {
    #[error("gitlab authorization info required")]
    AuthRequired,

    #[error("gitlab request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("gitlab responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid gitlab API payload: {source}")]
    ApiResponse {
        #[source]
        source: reqwest::Error,
    },
}

pub type Result<T> = std::result::Result<T, GitlabError>;

impl From<GitlabError> for modproxy_core::ProxyError {
    fn from(err: GitlabError) -> Self {
        match err {
            GitlabError::AuthRequired => Self::BadRequest(err.to_string()),
            GitlabError::NotFound(what) => Self::NotFound(what),
            GitlabError::Status { status, body } => Self::UpstreamStatus { status, body },
            GitlabError::Http { source, .. } | GitlabError::ApiResponse { source } => {
                Self::upstream(source)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modproxy_core::ProxyError;

    #[test]
    fn test_not_found_conversion() {
        let err: ProxyError = GitlabError::NotFound("project user/m".into()).into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_status_conversion() {
        let err: ProxyError = GitlabError::Status {
            status: 503,
            body: "try later".into(),
        }
        .into();
        assert!(matches!(err, ProxyError::UpstreamStatus { status: 503, .. }));
    }
}
