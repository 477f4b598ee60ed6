//! Notification channels
//!
//! Two channel shapes feed the [`NotificationDispatcher`]:
//!
//! - [`BroadcastChannel`]: one message fanned out to a recipient list, one
//!   outbound call per recipient (Telegram)
//! - [`DirectChannel`]: one structured message to one fixed recipient
//!   (email, WhatsApp/SMS)
//!
//! Channels only report the outcome of a single call. Isolation between
//! recipients and channels, timeouts and success accounting live in the
//! dispatcher.

pub mod dispatcher;
pub mod email;
pub mod error;
pub mod telegram;
pub mod twilio;

use async_trait::async_trait;

pub use dispatcher::{DeliveryReport, DispatcherBuilder, NotificationDispatcher};
pub use email::EmailChannel;
pub use error::{NotifyError, NotifyResult};
pub use telegram::TelegramChannel;
pub use twilio::TwilioChannel;

/// Payload for single-recipient channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectMessage {
    pub subject: String,
    pub body: String,
}

impl DirectMessage {
    pub fn new(subject: impl ToString, body: impl ToString) -> Self {
        Self {
            subject: subject.to_string(),
            body: body.to_string(),
        }
    }
}

#[async_trait]
pub trait BroadcastChannel: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver `text` to a single recipient.
    async fn send_to(&self, recipient: &str, text: &str) -> NotifyResult<()>;
}

#[async_trait]
pub trait DirectChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, message: &DirectMessage) -> NotifyResult<()>;
}
