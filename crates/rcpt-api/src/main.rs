//! # rcpt-api: Binary Entry Point
//!
//! Reads configuration from the environment, bootstraps the receipt
//! service and serves it until the process is stopped.

use rcpt_api::config::{LogFormat, ServiceConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::from_env()?;

    // Initialize structured tracing.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    tracing::debug!(?config, "configuration loaded");

    let state = rcpt_api::bootstrap::bootstrap(&config).await.map_err(|e| {
        tracing::error!("Bootstrap failed: {e}");
        e
    })?;

    if let Some(every) = config.reconcile_interval {
        tracing::info!(
            interval_secs = every.as_secs(),
            batch = config.reconcile_batch,
            "reconciliation sweep enabled"
        );
        let _sweeper = rcpt_api::bootstrap::spawn_reconciler(
            state.service.clone(),
            every,
            config.reconcile_batch,
        );
    }

    let app = rcpt_api::app(state);

    tracing::info!("receipt service listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
