mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use bookshop_api::auth::{AppState, AppStateInner, SessionConfig};
use bookshop_store::Bookshop;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookshop=debug,tower_http=debug".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            eprintln!("       Fix your .env file and restart.");
            std::process::exit(1);
        }
    };

    let shop = Bookshop::open(&config.store())?;

    let state: AppState = Arc::new(AppStateInner {
        shop,
        session: SessionConfig {
            secret: config.session_secret.clone(),
            secure_cookies: config.secure_cookies,
            ttl: config.session_ttl,
        },
    });

    // Browsers send the SameSite=Strict cookie only same-origin; other
    // clients authenticate with a Bearer header.
    let cors = CorsLayer::permissive();

    let app = bookshop_api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    info!("Bookshop server listening on {}", config.addr);
    info!("Data directory: {}", config.data_dir.display());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
