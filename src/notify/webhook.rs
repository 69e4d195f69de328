use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::app::{GradewatchError, Result};
use crate::notify::Notifier;

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Posts each notification as JSON to a mail relay or chat webhook.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<()> {
        debug!(to = %address, "Posting notification to webhook");
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookMessage {
                to: address,
                subject,
                body,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GradewatchError::Notify(format!(
                "Webhook returned HTTP {}",
                status.as_u16()
            )));
        }
        Ok(())
    }
}
