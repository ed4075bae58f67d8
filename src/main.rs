mod adapters;
mod application;
mod config;
mod domain;
mod interface;
mod ports;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adapters::{DockerAdapter, MemoryRegistry, RenderOptions};
use application::CollectionScheduler;
use config::Config;
use domain::SampleOptions;
use interface::http::create_router;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load configuration; invalid values abort before anything starts
    let config = Config::from_env()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "container_state_exporter={level},tower_http={level}",
                    level = config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting container-state-exporter v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {:?}", config);

    // Connects on the first cycle; an unreachable daemon only skips cycles
    let docker = DockerAdapter::new(config.runtime_target.clone(), config.runtime_timeout);

    let registry = Arc::new(MemoryRegistry::new(RenderOptions::new(
        &config.metrics_prefix,
        !config.disable_default_metrics,
    )));

    let scheduler = CollectionScheduler::new(
        Arc::new(docker),
        registry.clone(),
        SampleOptions::new(config.metrics_prefix.clone(), config.include_labels),
        config.include_stopped,
        config.scrape_interval,
    );

    // Create HTTP server
    let app = create_router(registry);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", addr, e))?;

    let collector = scheduler.spawn();

    info!("Exporter listening on {}", addr);
    if config.disable_default_metrics {
        info!("Default process metrics disabled");
    } else {
        info!("Including default process metrics");
    }
    if config.include_labels {
        info!("Container labels included in metrics (cAdvisor style)");
    }

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    collector.abort();
    served?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
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
    info!("Signal received, shutting down");
}
