//! Outbound notification delivery.
//!
//! Notifications are best-effort: the pipeline publishes each one as it is
//! produced, logs delivery failures, and never lets a sink error fail the
//! job. Every emitted notification is also recorded on the job summary
//! regardless of delivery outcome.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::config::Config;
use crate::models::NotificationMessage;

// ---

/// A delivery channel for analysis notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    async fn publish(&self, message: &NotificationMessage) -> Result<()>;
}

/// POSTs each notification as a JSON body to a fixed URL.
pub struct WebhookSink {
    url: String,
    client: reqwest::Client,
}

impl WebhookSink {
    // ---
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    // ---
    fn name(&self) -> &str {
        "webhook"
    }

    async fn publish(&self, message: &NotificationMessage) -> Result<()> {
        // ---
        self.client
            .post(&self.url)
            .json(message)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Fallback sink when no webhook is configured: notifications only show up
/// in the service log.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    // ---
    fn name(&self) -> &str {
        "log"
    }

    async fn publish(&self, message: &NotificationMessage) -> Result<()> {
        // ---
        info!(
            sensor_id = %message.sensor_id,
            timestamp = %message.timestamp,
            reason = ?message.reason,
            "Notification emitted"
        );
        Ok(())
    }
}

/// In-process sink that retains everything published to it. Handy for local
/// runs and assertions in tests.
#[derive(Default)]
pub struct MemorySink {
    messages: Mutex<Vec<NotificationMessage>>,
}

impl MemorySink {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every message published so far.
    pub fn drain(&self) -> Vec<NotificationMessage> {
        std::mem::take(&mut *self.messages.lock().unwrap())
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    // ---
    fn name(&self) -> &str {
        "memory"
    }

    async fn publish(&self, message: &NotificationMessage) -> Result<()> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Pick the sink for this deployment: webhook when a URL is configured,
/// otherwise log-only.
pub fn from_config(config: &Config) -> Arc<dyn NotificationSink> {
    // ---
    match &config.webhook_url {
        Some(url) => Arc::new(WebhookSink::new(url)),
        None => Arc::new(LogSink),
    }
}
