//! Outbound notification channel
//!
//! Slack incoming-webhook delivery behind the `NotificationChannel` seam;
//! tests substitute a recording fake.

use rankwatch_common::{Error, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const POST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "rankwatch/0.1.0 (https://github.com/rankwatch/rankwatch)";

/// Fire-and-forget structured message delivery
pub trait NotificationChannel: Send + Sync {
    async fn post(&self, payload: &Value) -> Result<()>;
}

impl<C: NotificationChannel> NotificationChannel for std::sync::Arc<C> {
    async fn post(&self, payload: &Value) -> Result<()> {
        (**self).post(payload).await
    }
}

/// Slack incoming webhook
pub struct SlackWebhook {
    http_client: reqwest::Client,
    webhook_url: String,
}

impl SlackWebhook {
    pub fn new(webhook_url: String) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(POST_TIMEOUT)
            .build()
            .map_err(|e| Error::Provider(e.to_string()))?;

        Ok(Self {
            http_client,
            webhook_url,
        })
    }
}

impl NotificationChannel for SlackWebhook {
    async fn post(&self, payload: &Value) -> Result<()> {
        debug!("Posting digest to Slack webhook");

        let response = self
            .http_client
            .post(&self.webhook_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout("webhook post timed out".to_string())
                } else {
                    Error::Provider(format!("webhook post failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "webhook returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        Ok(())
    }
}

/// Channel used when no webhook is configured; logs and discards
pub struct NullChannel;

impl NotificationChannel for NullChannel {
    async fn post(&self, _payload: &Value) -> Result<()> {
        debug!("No notification channel configured, discarding digest");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_creation() {
        assert!(SlackWebhook::new("https://hooks.slack.com/services/T/B/x".to_string()).is_ok());
    }

    #[tokio::test]
    async fn null_channel_accepts_anything() {
        let channel = NullChannel;
        assert!(channel.post(&serde_json::json!({"blocks": []})).await.is_ok());
    }
}
