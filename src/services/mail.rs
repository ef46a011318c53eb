// src/services/mail.rs

use std::sync::Arc;

use crate::config::Config;

mod smtp;
pub mod templates;

pub use smtp::SmtpMailClient;

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body_html: Option<String>,
    pub body_text: Option<String>,
}

/// Delivery is best-effort: callers log the error and carry on.
#[async_trait::async_trait]
pub trait MailClient: Send + Sync {
    async fn send(&self, message: EmailMessage) -> anyhow::Result<()>;
    fn is_configured(&self) -> bool;
}

pub type DynMailClient = Arc<dyn MailClient>;

/// SMTP when `SMTP_HOST` is set, otherwise a client that only logs.
pub fn create_mail_client(config: &Config) -> anyhow::Result<DynMailClient> {
    match &config.smtp {
        Some(smtp) => {
            let client = SmtpMailClient::new(smtp, &config.email_from)?;
            tracing::info!("SMTP mail client configured for {}", smtp.host);
            Ok(Arc::new(client))
        }
        None => {
            tracing::warn!("SMTP_HOST not set; outgoing mail will only be logged");
            Ok(Arc::new(LogMailClient))
        }
    }
}

pub struct LogMailClient;

#[async_trait::async_trait]
impl MailClient for LogMailClient {
    async fn send(&self, message: EmailMessage) -> anyhow::Result<()> {
        tracing::info!(to = %message.to, subject = %message.subject, "Mail not sent (no SMTP configured)");
        Ok(())
    }

    fn is_configured(&self) -> bool {
        false
    }
}

/// Sends and reports whether it actually went out; failures are logged, never returned.
pub async fn deliver(client: &DynMailClient, message: EmailMessage) -> bool {
    let to = message.to.clone();
    match client.send(message).await {
        Ok(()) => client.is_configured(),
        Err(e) => {
            tracing::error!("Failed to send mail to {}: {:?}", to, e);
            false
        }
    }
}
