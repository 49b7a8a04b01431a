//! Thumbnail worker binary.

use std::sync::Arc;

use anyhow::Context;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mthumb_client::{BackendClient, BackendConfig, HttpJobStore, HttpModelFetcher};
use mthumb_media::FfmpegEncoder;
use mthumb_queue::{NotificationConfig, ReconnectingChannel, RedisEventSource};
use mthumb_render::{RenderSettings, SceneLoaderRegistry, SoftwareRenderer};
use mthumb_worker::health::{self, HealthState};
use mthumb_worker::metrics::init_metrics;
use mthumb_worker::{JobProcessor, PipelineDeps, WorkerConfig, WorkerPool};

#[tokio::main]
async fn main() {
    // A provider may already be installed by a dependency; either way TLS works.
    let _ = rustls::crypto::ring::default_provider().install_default();

    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting mthumb-worker");

    if let Err(e) = run().await {
        error!("Worker failed: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mthumb=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn run() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env().context("invalid worker configuration")?;
    config.validate().context("invalid worker configuration")?;
    info!("Worker config: {:?}", config);

    let health_addr = config.health_socket_addr()?;
    let shutdown_timeout = config.shutdown_timeout;

    let metrics = match init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics disabled: {}", e);
            None
        }
    };

    let backend = BackendClient::new(BackendConfig::from_env()?)
        .context("failed to create backend client")?;
    let engine = Arc::new(SoftwareRenderer::new(RenderSettings::from(&config.orbit)));
    let deps = PipelineDeps {
        job_store: Arc::new(HttpJobStore::new(backend.clone())),
        fetcher: Arc::new(HttpModelFetcher::new(backend)),
        loaders: Arc::new(SceneLoaderRegistry::with_defaults()),
        engine,
        encoder: Arc::new(FfmpegEncoder::new().with_timeout(config.stage_timeout.as_secs())),
    };

    let pool = Arc::new(WorkerPool::new(config.max_concurrent_jobs));
    let mut processor = JobProcessor::new(config, pool, deps)?;

    let notify_config =
        NotificationConfig::from_env().context("invalid notification configuration")?;
    match RedisEventSource::new(&notify_config) {
        Ok(source) => {
            info!(channel = source.channel(), "Listening for job notifications");
            processor = processor.with_notifications(
                Arc::new(ReconnectingChannel::new(source)),
                notify_config.buffer,
            );
        }
        // Polling alone still drains the queue.
        Err(e) => warn!(error = %e, "Notification channel unavailable, polling only"),
    }

    let processor = Arc::new(processor);
    let triggers = processor.start();

    let (server_shutdown_tx, server_shutdown_rx) = watch::channel(false);
    let server = tokio::spawn(health::serve(
        health_addr,
        HealthState::new(processor.clone(), metrics),
        server_shutdown_rx,
    ));

    wait_for_signal().await?;

    processor.shutdown(shutdown_timeout).await;
    if let Err(e) = triggers.await {
        warn!(error = %e, "Trigger loop ended abnormally");
    }

    server_shutdown_tx.send_replace(true);
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Health server error"),
        Err(e) => warn!(error = %e, "Health server task failed"),
    }

    info!("Worker shutdown complete");
    Ok(())
}

async fn wait_for_signal() -> anyhow::Result<()> {
    let mut sigterm = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
        _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
    }
    Ok(())
}
