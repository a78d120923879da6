use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info};

use super::{EmailMessage, EmailSender};

/// Hands messages to a mail relay by POSTing them as JSON.
pub struct HttpEmailSender {
    client: reqwest::Client,
    webhook_url: String,
}

impl HttpEmailSender {
    pub fn new(webhook_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!("Sending email to {} via {}", message.to, self.webhook_url);

        let response = self
            .client
            .post(&self.webhook_url)
            .json(message)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("HTTP request failed: {}", e))?;

        if !response.status().is_success() {
            error!("Email webhook answered {}", response.status());
            return Err(anyhow::anyhow!(
                "email webhook failed with status: {}",
                response.status()
            ));
        }

        Ok(())
    }
}
