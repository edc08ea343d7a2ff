use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use projector_bridge::{api, config::Config, platform::Platform};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env (ignore error if file absent; env vars may be set externally)
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    // RUST_LOG wins; otherwise PROJECTOR_DEBUG picks the default level.
    let default_level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    debug!(
        ip_address = %config.ip_address,
        referer = %config.referer,
        timeout_ms = config.request_timeout.as_millis() as u64,
        polling_interval_ms = config.polling_interval.as_millis() as u64,
        digest_auth = config.digest_auth.is_some(),
        "Configuration loaded"
    );

    let addr = format!("{}:{}", config.server_host, config.server_port);

    let mut platform = Platform::new(config).await?;
    let (accessory, _) = platform.discover_devices().await?;
    info!(name = %accessory.information().name, "Accessory ready");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, api::router(accessory))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
