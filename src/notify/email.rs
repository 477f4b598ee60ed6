use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::instrument;

use super::error::{NotifyError, NotifyResult};
use super::{DirectChannel, DirectMessage};
use crate::config::EmailConfig;

/// SMTP channel over implicit TLS, one fixed recipient.
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailChannel {
    pub fn new(config: &EmailConfig) -> NotifyResult<Self> {
        let (Some(username), Some(password)) = (&config.username, &config.password) else {
            return Err(NotifyError::InvalidConfig(String::from(
                "SMTP username and password are required",
            )));
        };
        let Some(to) = &config.to else {
            return Err(NotifyError::InvalidConfig(String::from(
                "email recipient is required",
            )));
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
            .credentials(Credentials::new(username.clone(), password.clone()))
            .port(config.smtp_port)
            .build();

        Ok(Self {
            transport,
            from: config.from.parse()?,
            to: to.parse()?,
        })
    }

    pub fn recipient(&self) -> &Mailbox {
        &self.to
    }

    fn build_message(&self, message: &DirectMessage) -> NotifyResult<Message> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(&message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())?;
        Ok(email)
    }
}

#[async_trait]
impl DirectChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    #[instrument(skip_all, fields(to = %self.to))]
    async fn send(&self, message: &DirectMessage) -> NotifyResult<()> {
        let email = self.build_message(message)?;
        self.transport.send(email).await?;
        Ok(())
    }
}
