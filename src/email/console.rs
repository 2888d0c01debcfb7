use async_trait::async_trait;
use tracing::info;

use super::Mailer;

/// Development sender: writes the message to the log instead of mailing it.
#[derive(Debug, Default, Clone)]
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        info!(%to, %subject, %body, "email (console delivery)");
        Ok(())
    }
}
