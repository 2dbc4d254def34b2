use std::sync::Arc;

use miette::{IntoDiagnostic, Result, WrapErr};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod intents;
mod proxy;
mod routes;
mod rpc;
mod webhook;

use config::ServerConfig;
use intents::IntentTable;
use proxy::ProxyAdapter;
use routes::{app, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let intents = match &config.intents_path {
        Some(path) => IntentTable::load(path)?,
        None => IntentTable::builtin(),
    };
    tracing::info!(
        intents = intents.len(),
        fallback = %intents.fallback().text,
        "intent table loaded"
    );

    if config.webhook_secret.is_none() {
        tracing::warn!("WEBHOOK_SECRET is not set, the webhook accepts every caller");
    }

    let state = AppState {
        proxy: Arc::new(ProxyAdapter::from_config(nlu::Config::from_env())),
        intents: Arc::new(intents),
        webhook_secret: config.webhook_secret.as_deref().map(Arc::from),
        suggestions: Arc::new(config.suggestions.clone()),
    };

    let listener = tokio::net::TcpListener::bind(config.addr())
        .await
        .into_diagnostic()
        .wrap_err_with(|| format!("could not bind {}", config.addr()))?;
    tracing::info!(
        addr = %config.addr(),
        nlu_configured = state.proxy.is_configured(),
        "listening"
    );

    axum::serve(listener, app(state, config.static_dir.as_deref()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()
        .wrap_err("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "could not listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
