//! Protocol front-end: URL → route → back-end operation → HTTP response.
//!
//! Module paths contain slashes, so the whole prefix hangs off a fallback
//! handler instead of route templates. Every failure is a plain-text 400
//! with the wrap-chain in the body; the same chain goes to the error log.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use base64::Engine;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use modproxy_core::error::{ProxyError, Result};
use modproxy_core::router::Router as PluginRouter;
use modproxy_core::{
    BasicAuth, Module, ModuleRequest, RequestContext, Suffix, parse_url_path, version,
};

pub struct AppState {
    /// Leading URL segment in front of the module protocol, e.g. `/goproxy`.
    pub prefix: String,
    pub router: Arc<PluginRouter>,
    /// Parent of every per-request cancellation token.
    pub shutdown: CancellationToken,
}

/// Assembles the HTTP application.
pub fn app(state: AppState) -> axum::Router {
    axum::Router::new()
        .fallback(handle)
        .with_state(Arc::new(state))
}

async fn handle(State(state): State<Arc<AppState>>, req: Request) -> Response {
    let url_path = req.uri().path().to_string();
    let span = tracing::info_span!(
        "request",
        id = %fingerprint(&url_path),
        url = %url_path,
    );
    serve(state, req, url_path).instrument(span).await
}

async fn serve(state: Arc<AppState>, req: Request, url_path: String) -> Response {
    let info = match parse_url_path(&url_path, &state.prefix) {
        Ok(info) => info,
        Err(err) => {
            tracing::error!(prefix = %state.prefix, error = %err, "wrong request");
            return error_response(&err);
        }
    };

    let Some(plugin) = state.router.lookup(&info.module_path) else {
        tracing::error!(module = %info.module_path, "no proxy handlers registered");
        return error_response(&ProxyError::BadRequest(format!(
            "no proxy handlers registered for {}",
            info.module_path
        )));
    };

    let module_request = ModuleRequest {
        module_path: info.module_path.clone(),
        basic_auth: basic_auth_from(&req),
    };
    let module = match plugin.module_for(&module_request).await {
        Ok(module) => module,
        Err(err) => {
            tracing::error!(plugin = %plugin.name(), error = %err, "failed to get a module from plugin");
            return error_response(&err);
        }
    };

    let ctx = RequestContext::with_token(state.shutdown.child_token());
    let response = dispatch(&ctx, module.as_ref(), &info.suffix).await;

    if let Err(err) = plugin.leave(module.as_ref()) {
        tracing::warn!(plugin = %plugin.name(), error = %err, "plugin leave hook failed");
    }

    match response {
        Ok(resp) => resp,
        Err(err) if err.is_cancelled() => {
            tracing::info!(module = %info.module_path, "request cancelled");
            StatusCode::BAD_REQUEST.into_response()
        }
        Err(err) => {
            tracing::error!(module = %info.module_path, error = %err, "request failed");
            error_response(&err)
        }
    }
}

async fn dispatch(ctx: &RequestContext, module: &dyn Module, suffix: &Suffix) -> Result<Response> {
    match suffix {
        Suffix::List => {
            tracing::debug!("version list requested");
            let versions = module.versions(ctx, "").await?;
            Ok(text_response(versions.join("\n")))
        }
        Suffix::Latest => {
            tracing::debug!("latest version requested");
            let target = match module.versions(ctx, "").await {
                Ok(versions) => latest_of(&versions),
                Err(err) if err.is_cancelled() => return Err(err),
                Err(err) => {
                    tracing::warn!(error = %err, "version list failed, statting master");
                    None
                }
            };
            let info = module
                .stat(ctx, target.as_deref().unwrap_or("master"))
                .await?;
            json_response(&info)
        }
        Suffix::Versioned { version, ext } => match ext.as_str() {
            "info" => {
                tracing::debug!(version, "version info requested");
                let info = module.stat(ctx, version).await?;
                json_response(&info)
            }
            "mod" => {
                tracing::debug!(version, "go.mod requested");
                let data = module.go_mod(ctx, version).await?;
                Ok(text_response(data))
            }
            "zip" => {
                tracing::debug!(version, "zip archive requested");
                let reader = module.zip(ctx, version).await?;
                // the stream drops (and thereby closes) the reader on
                // success and on abort alike
                let body = Body::from_stream(ReaderStream::new(reader));
                Ok((
                    [(header::CONTENT_TYPE, "application/zip")],
                    body,
                )
                    .into_response())
            }
            other => Err(ProxyError::BadRequest(format!(
                "unsupported operation suffix {other}"
            ))),
        },
    }
}

/// Max semver-valid entry of `versions`, if any.
fn latest_of(versions: &[String]) -> Option<String> {
    versions
        .iter()
        .filter(|v| version::is_valid(v))
        .max_by(|a, b| version::compare(a, b))
        .cloned()
}

fn text_response(body: impl Into<Body>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body.into(),
    )
        .into_response()
}

fn json_response<T: serde::Serialize>(value: &T) -> Result<Response> {
    let body = serde_json::to_vec(value)?;
    Ok((
        [(header::CONTENT_TYPE, "application/json")],
        Body::from(body),
    )
        .into_response())
}

fn error_response(err: &ProxyError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        err.to_string(),
    )
        .into_response()
}

fn basic_auth_from(req: &Request) -> Option<BasicAuth> {
    let header = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some(BasicAuth {
        user: user.to_string(),
        password: password.to_string(),
    })
}

/// Short id tying log lines of one request together.
fn fingerprint(url_path: &str) -> String {
    let mut hasher = DefaultHasher::new();
    url_path.hash(&mut hasher);
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos()
        .hash(&mut hasher);
    format!("{:08x}", hasher.finish() as u32)
}
