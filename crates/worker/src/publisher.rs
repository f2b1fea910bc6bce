//! Publishing report text back to chat channels.

use async_trait::async_trait;
use chatlog_core::{Error, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use url::Url;

/// Sends a message to a chat channel.
#[async_trait]
pub trait ChatPublisher: Send + Sync {
    async fn say(&self, channel: &str, message: &str) -> Result<()>;
}

/// Writes messages to the log only.
#[derive(Debug, Default, Clone)]
pub struct LogPublisher;

#[async_trait]
impl ChatPublisher for LogPublisher {
    async fn say(&self, channel: &str, message: &str) -> Result<()> {
        info!(channel = %channel, message = %message, "Chat message");
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookMessage<'a> {
    channel: &'a str,
    message: &'a str,
}

/// POSTs `{"channel", "message"}` JSON to a relay that speaks the chat
/// protocol.
#[derive(Debug, Clone)]
pub struct WebhookPublisher {
    client: reqwest::Client,
    url: Url,
}

impl WebhookPublisher {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| Error::config(format!("invalid webhook url '{}': {}", url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "webhook url must be http or https, got '{}'",
                url.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl ChatPublisher for WebhookPublisher {
    async fn say(&self, channel: &str, message: &str) -> Result<()> {
        self.client
            .post(self.url.clone())
            .json(&WebhookMessage { channel, message })
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| Error::publish(format!("webhook to {} failed: {}", self.url, e)))?;
        Ok(())
    }
}

/// Webhook publisher when a URL is configured, log publisher otherwise.
pub fn build_publisher(webhook_url: Option<&str>) -> Result<Arc<dyn ChatPublisher>> {
    match webhook_url.map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => {
            let publisher = WebhookPublisher::new(url)?;
            info!(url = %publisher.url(), "Publishing reports via webhook");
            Ok(Arc::new(publisher))
        }
        None => {
            info!("No webhook configured, reports are logged only");
            Ok(Arc::new(LogPublisher))
        }
    }
}
