//! Per-request cancellation context.
//!
//! Every back-end operation takes a [`RequestContext`] and must return
//! [`ProxyError::Cancelled`] once it is cancelled, instead of finishing the
//! upstream call. Server shutdown cancels a parent token, which cancels all
//! per-request children.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{ProxyError, Result};

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
}

impl RequestContext {
    /// Fresh, independent context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context driven by an existing token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Child context cancelled together with this one.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the context is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Fails fast when already cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ProxyError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Races `fut` against cancellation.
    pub async fn guard<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;
        tokio::select! {
            () = self.token.cancelled() => Err(ProxyError::Cancelled),
            res = fut => res,
        }
    }
}
