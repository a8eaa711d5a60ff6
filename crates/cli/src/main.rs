use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use prometheus::{Encoder, TextEncoder};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use batchfetch_core::{
    load_config, metrics, validate_config, BatchEngine, ConversionLimiter, FfmpegTranscoder,
    HttpFetcher, LocalTransport, Notifier, PoolDeps, ResultSink, SanitizedConfig, Transcoder,
    Transport, WorkerPool,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Determine config path
    let config_path = std::env::var("BATCHFETCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("batchfetch.toml"));

    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(false);
            return Err(e).with_context(|| format!("Failed to load config from {:?}", config_path));
        }
    };

    init_tracing(config.logging.json);
    info!(version = VERSION, "Starting batchfetch");
    info!("Loaded configuration from {:?}", config_path);

    validate_config(&config).context("Configuration validation failed")?;
    info!(config = ?SanitizedConfig::from(&config), "Configuration validated");

    tokio::fs::create_dir_all(&config.pool.work_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create working directory {:?}",
                config.pool.work_dir
            )
        })?;

    let transport: Arc<dyn Transport> = Arc::new(
        LocalTransport::from_config(&config.transport)
            .await
            .context("Failed to open batch source")?,
    );

    let fetcher = HttpFetcher::new(config.fetch.clone()).context("Failed to build HTTP client")?;

    let limiter = ConversionLimiter::new(config.transcode.max_parallel);
    info!(max_parallel = limiter.capacity(), "Conversion limiter ready");
    let transcoder = FfmpegTranscoder::new(config.transcode.clone(), limiter);
    if let Err(e) = transcoder.validate().await {
        warn!("Stream jobs will fail: {}", e);
    }

    let deps = PoolDeps {
        fetcher: Arc::new(fetcher),
        transcoder: Arc::new(transcoder),
        notifier: Arc::new(Notifier::new(Arc::clone(&transport), &config.notifier)),
        sink: Arc::new(ResultSink::new(
            Arc::clone(&transport),
            config.delivery.enable_fallback,
        )),
    };
    let pool = WorkerPool::start(&config, deps);
    let engine = BatchEngine::new(transport, pool);

    let report = engine.run_until(shutdown_signal()).await;

    let status = engine.pool().status().await;
    info!(
        batches = report.batches,
        jobs = report.jobs,
        status = %serde_json::to_string(&status).unwrap_or_default(),
        "Finished"
    );

    if config.logging.metrics_on_exit {
        log_metrics()?;
    }

    Ok(())
}

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,hyper=warn,reqwest=warn".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Logs the text exposition of every core metric.
fn log_metrics() -> Result<()> {
    let registry = metrics::registry().context("Failed to register metrics")?;
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    info!("Metrics:\n{}", String::from_utf8_lossy(&buffer));
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
    info!("Shutdown signal received, draining queued jobs");
}
