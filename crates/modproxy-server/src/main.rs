use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use modproxy_apriori::AprioriPlugin;
use modproxy_cache::{AposterioriPlugin, FsStore};
use modproxy_cascade::CascadePlugin;
use modproxy_core::{ChoicePlugin, Plugin, Router};
use modproxy_gitlab::GitlabPlugin;
use modproxy_server::middleware::{AppState, app};
use modproxy_vcs::VcsPlugin;

const DRAIN_WINDOW: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "modproxy", about = "Go module download proxy")]
struct Args {
    /// Go modules cache directory
    #[arg(long = "cache-dir")]
    cache_dir: Option<PathBuf>,

    /// GitLab API root to serve gitlab modules from, e.g. https://gitlab.com/api/v4
    #[arg(long = "gitlab-api-url")]
    gitlab_api_url: Option<String>,

    /// Another module proxy to forward to instead of the local toolchain
    #[arg(long = "cascade-url")]
    cascade_url: Option<String>,

    /// Manifest of statically served (module, version) pairs
    #[arg(long = "apriori-manifest")]
    apriori_manifest: Option<PathBuf>,

    /// Directory for the write-through response cache
    #[arg(long = "proxy-cache-dir")]
    proxy_cache_dir: Option<PathBuf>,

    /// Service listen address
    #[arg(long, default_value = "0.0.0.0:8081")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let Some(cache_dir) = args.cache_dir.clone() else {
        eprintln!("--cache-dir must be set");
        return ExitCode::FAILURE;
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(args, cache_dir).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "exiting");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, cache_dir: PathBuf) -> modproxy_core::Result<()> {
    let mut router = Router::new();
    let mut plugins: Vec<Arc<dyn Plugin>> = Vec::new();

    // default route: local toolchain, unless an upstream proxy is preferred
    let mut root: Arc<dyn Plugin> = if let Some(upstream) = &args.cascade_url {
        Arc::new(CascadePlugin::new(upstream))
    } else {
        Arc::new(VcsPlugin::new(&cache_dir)?)
    };

    if let Some(manifest) = &args.apriori_manifest {
        let apriori: Arc<dyn Plugin> = Arc::new(AprioriPlugin::new(manifest)?);
        root = Arc::new(ChoicePlugin::new(vec![apriori, root]));
    }

    if let Some(dir) = &args.proxy_cache_dir {
        root = Arc::new(AposterioriPlugin::new(root, Arc::new(FsStore::new(dir)?)));
    }

    router.add_route("", root.clone())?;
    plugins.push(root);

    if let Some(api_url) = &args.gitlab_api_url {
        let gitlab: Arc<dyn Plugin> = Arc::new(GitlabPlugin::with_request_auth(api_url));
        router.add_route("gitlab", gitlab.clone())?;
        plugins.push(gitlab);
    }

    let shutdown = CancellationToken::new();
    let drain = CancellationToken::new();
    let state = AppState {
        prefix: String::new(),
        router: Arc::new(router),
        shutdown: shutdown.clone(),
    };

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    tracing::info!(listen = %args.listen, "start listening");

    let server = axum::serve(listener, app(state)).with_graceful_shutdown({
        let drain = drain.clone();
        async move { drain.cancelled().await }
    });
    let mut server = Box::pin(std::future::IntoFuture::into_future(server));

    tokio::select! {
        res = &mut server => res?,
        () = shutdown_signal() => {
            tracing::info!("signal received, draining connections");
            drain.cancel();
            if tokio::time::timeout(DRAIN_WINDOW, &mut server).await.is_err() {
                tracing::warn!("drain window expired, aborting in-flight requests");
                shutdown.cancel();
            }
        }
    }

    for plugin in plugins {
        if let Err(err) = plugin.close().await {
            tracing::warn!(plugin = %plugin.name(), error = %err, "plugin close failed");
        }
    }
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };
    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
