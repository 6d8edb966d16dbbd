use metersync::api::HttpDashboardApi;
use metersync::config::AppConfig;
use metersync::error::Result;
use metersync::sync::RefreshOrchestrator;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config);

    let api = Arc::new(HttpDashboardApi::new(&config.api)?);
    let orchestrator = RefreshOrchestrator::new(api, &config.refresh);

    orchestrator.start();
    info!(
        base_url = %config.api.base_url,
        summary_interval_secs = config.refresh.summary_interval_secs,
        chart_interval_secs = config.refresh.chart_interval_secs,
        "sync coordinator running, press Ctrl+C to stop"
    );

    shutdown_signal().await;

    orchestrator.stop();
    info!("shutdown complete");
    Ok(())
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},metersync=debug", config.logging.level)));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
