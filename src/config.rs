//! Configuration loader for the sensor analysis service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.

use std::env;
use std::net::SocketAddr;

use anyhow::{anyhow, Context, Result};

use crate::thresholds::ThresholdConfig;

/// Parse an optional environment variable with a default value.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,

    /// Worker-pool size for per-reading analysis within a batch.
    pub workers: usize,

    /// Optional path to a JSON file overriding the stock threshold bands.
    pub thresholds_path: Option<String>,

    /// Optional webhook URL notifications are POSTed to; log-only when unset.
    pub webhook_url: Option<String>,
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `BIND_ADDR` – listen address (default: `0.0.0.0:8080`)
/// - `ANALYSIS_WORKERS` – analysis pool size (default: available parallelism)
/// - `THRESHOLDS_PATH` – threshold override file (default: stock bands)
/// - `NOTIFY_WEBHOOK_URL` – notification webhook (default: log only)
///
/// Returns an error if any variable is present but unparsable.
pub fn load_from_env() -> Result<Config> {
    // ---
    let bind_addr = parse_env!("BIND_ADDR", SocketAddr, SocketAddr::from(([0, 0, 0, 0], 8080)));
    let workers = parse_env!("ANALYSIS_WORKERS", usize, default_workers());
    let thresholds_path = env::var("THRESHOLDS_PATH").ok();
    let webhook_url = env::var("NOTIFY_WEBHOOK_URL").ok();

    Ok(Config {
        bind_addr,
        workers,
        thresholds_path,
        webhook_url,
    })
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Config {
    /// Resolve the threshold configuration: the stock bands, or the JSON
    /// override file when `THRESHOLDS_PATH` is set.
    pub fn load_thresholds(&self) -> Result<ThresholdConfig> {
        // ---
        match &self.thresholds_path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read thresholds file '{path}'"))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse thresholds file '{path}'"))
            }
            None => Ok(ThresholdConfig::default()),
        }
    }

    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the webhook URL path, which commonly embeds a secret token,
    /// while showing all configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        let masked_webhook = match &self.webhook_url {
            Some(url) => match url.split_once("://") {
                Some((scheme, rest)) => {
                    let host = rest.split('/').next().unwrap_or(rest);
                    format!("{scheme}://{host}/****")
                }
                None => "****".to_string(),
            },
            None => "(log only)".to_string(),
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  BIND_ADDR          : {}", self.bind_addr);
        tracing::info!("  ANALYSIS_WORKERS   : {}", self.workers);
        tracing::info!(
            "  THRESHOLDS_PATH    : {}",
            self.thresholds_path.as_deref().unwrap_or("(stock thresholds)")
        );
        tracing::info!("  NOTIFY_WEBHOOK_URL : {}", masked_webhook);
    }
}
