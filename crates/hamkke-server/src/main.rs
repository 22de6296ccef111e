mod config;
mod error;
mod model;
mod prompt;
mod server;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use genai_common::gemini::GeminiClient;
use server::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting hamkke-gage server");

    let config = Config::from_env()?;
    info!(
        addr = %config.bind_addr(),
        static_dir = %config.static_dir.display(),
        model = %config.gemini.model,
        base_url = %config.gemini.base_url,
        "configuration loaded"
    );

    let gemini = GeminiClient::new(config.gemini.clone())?;
    if gemini.has_api_key() {
        info!("gemini api key detected, AI features available");
    } else {
        warn!("GEMINI_API_KEY not set, AI endpoints will answer with fallback responses");
    }

    let addr = config.bind_addr();
    let app = server::build_router(AppState {
        generator: Arc::new(gemini),
        config: Arc::new(config),
    });

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "함께가게 server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM. A handler that cannot be installed never
/// resolves, leaving the other one in charge.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }
}
