//! Errors shared by the proxy front-end and every back-end.
//!
//! `ProxyError::Context` forms a wrap-chain: each layer boundary adds one
//! short message, and `Display` prints the whole chain down to the root
//! cause, newest message first.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("module path {declared} declared in go.mod differs from requested {requested}")]
    ModulePathMismatch { declared: String, requested: String },

    #[error("resolved major version v{found} conflicts with v{expected} from module path")]
    VersionMismatch { expected: i32, found: i32 },

    #[error("upstream response status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("upstream request failed: {source}")]
    Upstream {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("route mask `{0}` is already taken")]
    RouteConflict(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{message}: {source}")]
    Context {
        message: String,
        #[source]
        source: Box<ProxyError>,
    },
}

pub type Result<T> = std::result::Result<T, ProxyError>;

impl ProxyError {
    /// Wraps an arbitrary upstream failure.
    pub fn upstream<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Upstream {
            source: Box::new(err),
        }
    }

    /// Follows the context chain down to the originating error.
    pub fn root_cause(&self) -> &Self {
        let mut cur = self;
        while let Self::Context { source, .. } = cur {
            cur = source.as_ref();
        }
        cur
    }

    /// True when the root cause reports a missing entity.
    pub fn is_not_found(&self) -> bool {
        matches!(self.root_cause(), Self::NotFound(_))
    }

    /// True when the root cause is a cancelled request context.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root_cause(), Self::Cancelled)
    }

    /// Adds one context message on top of the chain.
    pub fn wrap(self, message: impl Into<String>) -> Self {
        Self::Context {
            message: message.into(),
            source: Box::new(self),
        }
    }
}

/// Context helpers for `Result<T, ProxyError>`.
pub trait ResultExt<T> {
    fn context(self, message: impl Into<String>) -> Result<T>;
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.wrap(message))
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.wrap(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_display_order() {
        let err = ProxyError::NotFound("version v0.4.0".into())
            .wrap("gitlab getting stat")
            .wrap("aposteriori delegation");
        assert_eq!(
            err.to_string(),
            "aposteriori delegation: gitlab getting stat: version v0.4.0 not found"
        );
    }

    #[test]
    fn test_root_cause_unwraps_whole_chain() {
        let err = ProxyError::Cancelled.wrap("vcs getting versions").wrap("outer");
        assert!(matches!(err.root_cause(), ProxyError::Cancelled));
        assert!(err.is_cancelled());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found_survives_wrapping() {
        let err = ProxyError::NotFound("go.mod".into()).wrap("gitlab getting go.mod");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_context_helper_on_results() {
        let res: Result<()> = Err(ProxyError::BadRequest("no /@v/ segment".into()));
        let err = res.context("parsing request").unwrap_err();
        assert_eq!(
            err.to_string(),
            "parsing request: bad request: no /@v/ segment"
        );

        let res: Result<()> = Err(ProxyError::NotFound("module".into()));
        let err = res.with_context(|| format!("looking up {}", "m")).unwrap_err();
        assert_eq!(err.to_string(), "looking up m: module not found");
    }

    #[test]
    fn test_source_chain_matches_display() {
        let err = ProxyError::NotFound("tag".into()).wrap("inner");
        let src = std::error::Error::source(&err).expect("context must expose a source");
        assert_eq!(src.to_string(), "tag not found");
    }
}
