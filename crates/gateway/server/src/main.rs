//! Push Gateway - dispatches generic push requests to APNs and FCM workers.

use axum::Router;
use color_eyre::eyre::WrapErr as _;
use push_gateway::{Config, Registry, push_router};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("push-gateway starting");

    let path = Config::config_path();
    let config = Config::load(&path)
        .wrap_err_with(|| format!("failed to load config from {}", path.display()))?;

    let registry = Registry::from_config(&config).wrap_err("failed to start workers")?;
    if registry.is_empty() {
        tracing::warn!("no workers configured, every push will be rejected");
    }

    let app = Router::new()
        .merge(push_router(registry.clone()))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.listen;
    tracing::info!(addr = %addr, workers = registry.len(), "listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err("failed to bind")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("server error")?;

    tracing::info!("draining workers");
    registry.shutdown(config.server.shutdown_grace()).await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
