// devpulse server binary.
// Wires config, caches, the GitHub client and the stats facade into the HTTP router.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use devpulse::cache::{CacheStore, DiskSlot};
use devpulse::clock::{Clock, SystemClock};
use devpulse::config::Config;
use devpulse::github::GitHubClient;
use devpulse::proxy::ProxyFetcher;
use devpulse::server::{AppState, create_router};
use devpulse::stats::StatsFacade;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("devpulse=info,tower_http=info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(config.log_json);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let client = GitHubClient::new(
        &config.api_base,
        config.token.as_deref(),
        config.request_timeout(),
    )
    .context("failed to build GitHub client")?;
    let proxy = ProxyFetcher::new(client, CacheStore::new(config.cache(), clock.clone()))
        .into_shared();

    let disk = config.stats_path().map(|path| {
        tracing::info!(path = %path.display(), "persisting stats record");
        DiskSlot::new(path, config.cache().ttl, clock.clone())
    });
    let facade = StatsFacade::new(
        proxy.clone(),
        CacheStore::new(config.cache(), clock.clone()),
        disk,
        clock,
        config.facade(),
    );

    let app = create_router(AppState::new(proxy, facade));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {addr}"))?;
    tracing::info!(
        %addr,
        username = %config.username,
        authenticated = config.token.is_some(),
        "devpulse listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("devpulse shut down cleanly");
    Ok(())
}
