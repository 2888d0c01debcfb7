use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox}, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::debug;

use super::Mailer;
use crate::config::SmtpConfig;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let creds = Credentials::new(cfg.username.clone(), cfg.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
            .with_context(|| format!("smtp relay {}", cfg.host))?
            .credentials(creds)
            .build();
        Ok(Self {
            transport,
            from_email: cfg.from_email.clone(),
        })
    }
}

fn build_message(from: &str, to: &str, subject: &str, body: &str) -> anyhow::Result<Message> {
    let message = Message::builder()
        .from(from.parse::<Mailbox>().with_context(|| format!("invalid from address {from:?}"))?)
        .to(to.parse::<Mailbox>().with_context(|| format!("invalid recipient {to:?}"))?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .context("build email")?;
    Ok(message)
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let message = build_message(&self.from_email, to, subject, body)?;
        self.transport.send(message).await.context("smtp send")?;
        debug!(%to, "email sent");
        Ok(())
    }
}
