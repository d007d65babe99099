use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

use benbot_server::config::Settings;
use benbot_server::logging::init_logger;
use benbot_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logger(&settings.logging)?;

    info!("🚀 Starting BenBot server...");
    info!(
        "✅ Configuration loaded (environment={}, model={}, llm configured={})",
        settings.server.environment,
        settings.llm.model,
        settings.llm.is_configured()
    );

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));
    let cleanup_every = Duration::from_secs(settings.session.cleanup_interval_seconds.max(1));

    let state = Arc::new(AppState::from_settings(settings));
    state.session_store.spawn_cleanup(cleanup_every);
    info!("✅ Session cleanup every {:?}", cleanup_every);

    let app = benbot_server::build_router(state);

    info!("🎯 Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    info!("Shutdown signal received, draining connections");
}
