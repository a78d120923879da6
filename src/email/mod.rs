use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod http;
pub mod log;
pub mod service;

pub use self::http::HttpEmailSender;
pub use self::log::LogEmailSender;
#[cfg(test)]
pub use self::log::RecordingEmailSender;
pub use self::service::EmailService;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}
