use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use ilo_exporter::app;
use ilo_exporter::cli::Args;
use ilo_exporter::state::AppState;
use ilo_exporter::tls::{self, TlsListener};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install default CryptoProvider: {e:?}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(args.log_level.parse()?))
        .init();

    let config = args.load_config()?;
    config.validate()?;
    let config = Arc::new(config);

    let state = AppState::new(Arc::clone(&config));
    let app = app::build_http_app(state);
    let listener = tokio::net::TcpListener::bind(&config.web.listen_address)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", config.web.listen_address, e))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.web.listen_address,
        metrics_path = %config.web.metrics_path,
        max_concurrent_requests = config.api.max_concurrent_requests,
        tls = config.tls.enabled,
        "Exporter started"
    );

    let result = if config.tls.enabled {
        let acceptor = tls::acceptor(&config.tls)?;
        axum::serve(TlsListener::new(listener, acceptor)?, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    } else {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "HTTP server error");
        return Err(e.into());
    }

    tracing::info!("Exporter stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down gracefully");
}
