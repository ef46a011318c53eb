// src/services/mail/smtp.rs

use anyhow::{anyhow, Context};
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{EmailMessage, MailClient};
use crate::config::SmtpConfig;

pub struct SmtpMailClient {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailClient {
    pub fn new(smtp: &SmtpConfig, from: &str) -> anyhow::Result<Self> {
        let creds = Credentials::new(smtp.username.clone(), smtp.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
            .with_context(|| format!("Failed to create SMTP transport for {}", smtp.host))?
            .port(smtp.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from: from.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl MailClient for SmtpMailClient {
    async fn send(&self, message: EmailMessage) -> anyhow::Result<()> {
        let builder = Message::builder()
            .from(self.from.parse().map_err(|e| anyhow!("Invalid from address: {}", e))?)
            .to(message.to.parse().map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(&message.subject);

        let email = match (message.body_html, message.body_text) {
            (Some(html), Some(text)) => builder.multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_PLAIN).body(text))
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_HTML).body(html)),
            )?,
            (Some(html), None) => builder.header(ContentType::TEXT_HTML).body(html)?,
            (None, Some(text)) => builder.header(ContentType::TEXT_PLAIN).body(text)?,
            (None, None) => return Err(anyhow!("Email must have either an HTML or a text body")),
        };

        self.transport
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email via SMTP: {}", e))?;

        Ok(())
    }

    fn is_configured(&self) -> bool {
        true
    }
}
