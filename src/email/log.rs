use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::{EmailMessage, EmailSender};

/// Sender used when no relay is configured. Messages are logged and dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(to = %message.to, subject = %message.subject, "Email not delivered, logging only");
        Ok(())
    }
}

/// Keeps every message it is handed so tests can inspect them.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingEmailSender {
    sent: std::sync::Mutex<Vec<EmailMessage>>,
}

#[cfg(test)]
impl RecordingEmailSender {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}
