use async_trait::async_trait;
use tracing::{debug, info};

use super::compose::OutgoingEmail;

/// Outbound mail seam. Delivery failures are reported per message.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct TracingMailer;

#[async_trait]
impl Mailer for TracingMailer {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        info!(to = %email.to, from = %email.from, subject = %email.subject, "digest email");
        debug!(body = %email.body);
        Ok(())
    }
}
