//! Application entry point for the sensor analysis service.
//!
//! This binary orchestrates the full startup sequence for the analysis API,
//! including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Resolving the threshold bands and the notification sink
//! - Spawning the background analysis worker and its work queue
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//! - Binding the Axum HTTP server and serving until shutdown
//!
//! # Environment Variables
//! - `BIND_ADDR` (optional) – listen address (default: `0.0.0.0:8080`)
//! - `ANALYSIS_WORKERS` (optional) – analysis pool size (default: available parallelism)
//! - `THRESHOLDS_PATH` (optional) – JSON threshold override file
//! - `NOTIFY_WEBHOOK_URL` (optional) – webhook notifications are POSTed to
//! - `ANALYSIS_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `ANALYSIS_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! On SIGINT the server stops accepting connections, the batch in flight is
//! cancelled and its job marked failed, and the worker drains before exit.

use std::{env, io::IsTerminal};

use anyhow::Result;
use axum::Router;
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use sensor_analysis::{config, jobs::JobStore, notify, pipeline, routes};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let thresholds = cfg.load_thresholds()?;
    let sink = notify::from_config(&cfg);
    let store = JobStore::new();
    let shutdown = CancellationToken::new();

    let (queue, worker) = pipeline::spawn_worker(
        store.clone(),
        thresholds,
        cfg.workers,
        sink,
        shutdown.clone(),
    );

    // Build app from routes gateway (EMBP)
    let app: Router = routes::router(store, queue);

    tracing::info!("Listening on {}", cfg.bind_addr);

    let listener = tokio::net::TcpListener::bind(cfg.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    // Server is down; wait for the worker to finish failing over the batch
    // in flight before the process exits.
    worker.await?;

    Ok(())
}

/// Wait for SIGINT, then cancel the pipeline token. Completing this future
/// also tells Axum to begin its graceful shutdown.
async fn shutdown_signal(shutdown: CancellationToken) {
    // ---
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    } else {
        tracing::info!("Shutdown signal received, stopping");
    }
    shutdown.cancel();
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `ANALYSIS_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by the `ANALYSIS_LOG_LEVEL` env var
///
/// This should be called once at application startup before any logging
/// or tracing macros are invoked. It installs the subscriber globally
/// for the lifetime of the process.
fn init_tracing() {
    // ---
    let span_events = match env::var("ANALYSIS_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to ANALYSIS_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("ANALYSIS_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},hyper=info,reqwest=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
