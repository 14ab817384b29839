use std::time::Duration;

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::Mailbox,
    transport::smtp::authentication::Credentials,
};

use crate::error::{AppError, AppResult};

const BROADCAST_DELAY_MS: u64 = 500;

pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    pub fn new(
        smtp_host: &str,
        username: &str,
        password: &str,
        from: &str,
    ) -> anyhow::Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)?
            .timeout(Some(Duration::from_secs(15)));
        if !username.is_empty() {
            builder = builder.credentials(Credentials::new(
                username.to_string(),
                password.to_string(),
            ));
        }
        let from = from
            .parse::<Mailbox>()
            .map_err(|e| anyhow::anyhow!("invalid MAIL_FROM: {e}"))?;
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| AppError::BadRequest(format!("Invalid recipient address: {e}")))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("mail build failed: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Upstream(format!("smtp send: {e}")))?;
        Ok(())
    }

    /// Fire-and-forget broadcast: the caller gets the intended recipient count
    /// immediately while sends proceed in a detached task with a fixed delay
    /// between messages. Per-recipient failures are tallied and logged only.
    pub fn broadcast(
        self: std::sync::Arc<Self>,
        recipients: Vec<String>,
        subject: String,
        body: String,
    ) -> usize {
        let count = recipients.len();
        tokio::spawn(async move {
            let mut sent = 0usize;
            let mut failed = 0usize;
            for recipient in recipients {
                match self.send(&recipient, &subject, &body).await {
                    Ok(()) => sent += 1,
                    Err(err) => {
                        failed += 1;
                        tracing::warn!(recipient = %recipient, error = %err, "broadcast send failed");
                    }
                }
                tokio::time::sleep(Duration::from_millis(BROADCAST_DELAY_MS)).await;
            }
            tracing::info!(sent, failed, "broadcast finished");
        });
        count
    }
}
