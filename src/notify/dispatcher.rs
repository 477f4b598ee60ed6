//! Fan-out of alerts across every configured channel
//!
//! Every outbound call is bounded by the configured send timeout and every
//! failure is logged and absorbed. A send operation reports success when at
//! least one delivery went through.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use super::error::{NotifyError, NotifyResult};
use super::{
    BroadcastChannel, DirectChannel, DirectMessage, EmailChannel, TelegramChannel, TwilioChannel,
};
use crate::Outcome;
use crate::alerts::Alert;
use crate::config::ChannelsConfig;

/// Outcome of one broadcast across all recipients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub attempted: usize,
}

impl DeliveryReport {
    pub fn any_delivered(&self) -> bool {
        self.delivered > 0
    }
}

pub struct NotificationDispatcher {
    broadcast: Option<Box<dyn BroadcastChannel>>,
    recipients: Vec<String>,
    email: Option<Box<dyn DirectChannel>>,
    messaging: Option<Box<dyn DirectChannel>>,
    booking_url: Option<String>,
    send_timeout: Duration,
}

pub struct DispatcherBuilder {
    broadcast: Option<Box<dyn BroadcastChannel>>,
    recipients: Vec<String>,
    email: Option<Box<dyn DirectChannel>>,
    messaging: Option<Box<dyn DirectChannel>>,
    booking_url: Option<String>,
    send_timeout: Duration,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            broadcast: None,
            recipients: Vec::new(),
            email: None,
            messaging: None,
            booking_url: None,
            send_timeout: Duration::from_secs(15),
        }
    }

    pub fn broadcast(
        mut self,
        channel: impl BroadcastChannel + 'static,
        recipients: Vec<String>,
    ) -> Self {
        self.broadcast = Some(Box::new(channel));
        self.recipients = recipients;
        self
    }

    pub fn email(mut self, channel: impl DirectChannel + 'static) -> Self {
        self.email = Some(Box::new(channel));
        self
    }

    pub fn messaging(mut self, channel: impl DirectChannel + 'static) -> Self {
        self.messaging = Some(Box::new(channel));
        self
    }

    pub fn booking_url(mut self, url: Option<String>) -> Self {
        self.booking_url = url;
        self
    }

    pub fn send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn build(self) -> NotificationDispatcher {
        NotificationDispatcher {
            broadcast: self.broadcast,
            recipients: self.recipients,
            email: self.email,
            messaging: self.messaging,
            booking_url: self.booking_url,
            send_timeout: self.send_timeout,
        }
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationDispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Build every channel whose configuration is complete. Incomplete
    /// channels are skipped with a warning so the monitor can still run.
    pub fn from_config(
        channels: &ChannelsConfig,
        booking_url: Option<String>,
        send_timeout: Duration,
    ) -> Self {
        let mut builder = Self::builder()
            .booking_url(booking_url)
            .send_timeout(send_timeout);

        if let Some(telegram) = &channels.telegram {
            match &telegram.bot_token {
                Some(token) if !telegram.chat_ids.is_empty() => {
                    info!(
                        "telegram configured for {} chats",
                        telegram.chat_ids.len()
                    );
                    builder = builder.broadcast(
                        TelegramChannel::new(token, &telegram.api_base),
                        telegram.chat_ids.clone(),
                    );
                }
                Some(_) => warn!("telegram has no chat ids, channel disabled"),
                None => warn!("telegram has no bot token, channel disabled"),
            }
        }

        if let Some(email) = &channels.email {
            match EmailChannel::new(email) {
                Ok(channel) => {
                    info!("email configured for {}", channel.recipient());
                    builder = builder.email(channel);
                }
                Err(e) => warn!("email channel disabled: {e}"),
            }
        }

        if let Some(whatsapp) = &channels.whatsapp {
            match TwilioChannel::new(whatsapp) {
                Ok(channel) => {
                    info!(
                        "{} configured for {}",
                        channel.name(),
                        crate::util::mask(channel.recipient())
                    );
                    builder = builder.messaging(channel);
                }
                Err(e) => warn!("messaging channel disabled: {e}"),
            }
        }

        builder.build()
    }

    pub fn has_channels(&self) -> bool {
        self.broadcast.is_some() || self.email.is_some() || self.messaging.is_some()
    }

    pub fn channel_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if let Some(channel) = &self.broadcast {
            names.push(channel.name().to_string());
        }
        if let Some(channel) = &self.email {
            names.push(channel.name().to_string());
        }
        if let Some(channel) = &self.messaging {
            names.push(channel.name().to_string());
        }
        names
    }

    async fn bounded<F>(&self, send: F) -> NotifyResult<()>
    where
        F: Future<Output = NotifyResult<()>>,
    {
        match timeout(self.send_timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout(self.send_timeout)),
        }
    }

    /// Send `text` to every broadcast recipient, one call each.
    #[instrument(skip_all)]
    pub async fn broadcast(&self, text: &str) -> DeliveryReport {
        let Some(channel) = &self.broadcast else {
            return DeliveryReport::default();
        };

        let mut report = DeliveryReport::default();
        for recipient in &self.recipients {
            report.attempted += 1;
            match self.bounded(channel.send_to(recipient, text)).await {
                Ok(()) => {
                    report.delivered += 1;
                    debug!("{} message delivered to {recipient}", channel.name());
                }
                Err(e) => error!("{} message to {recipient} failed: {e}", channel.name()),
            }
        }

        if report.attempted > 0 {
            info!(
                "{} message delivered to {}/{} recipients",
                channel.name(),
                report.delivered,
                report.attempted
            );
        }
        report
    }

    async fn deliver_direct(
        &self,
        channel: Option<&dyn DirectChannel>,
        message: &DirectMessage,
    ) -> bool {
        let Some(channel) = channel else {
            return false;
        };

        match self.bounded(channel.send(message)).await {
            Ok(()) => {
                info!("{} message delivered", channel.name());
                true
            }
            Err(e) => {
                error!("{} message failed: {e}", channel.name());
                false
            }
        }
    }

    /// Availability goes everywhere: broadcast, email and messaging.
    #[instrument(skip_all, fields(slots = outcome.available_slots))]
    pub async fn send_availability_alert(&self, outcome: &Outcome) -> bool {
        let alert = Alert::availability(outcome, self.booking_url.as_deref());
        let text = alert.render();
        let message = DirectMessage::new(alert.title(), &text);

        let broadcast = self.broadcast(&text).await.any_delivered();
        let email = self.deliver_direct(self.email.as_deref(), &message).await;
        let messaging = self
            .deliver_direct(self.messaging.as_deref(), &message)
            .await;

        let delivered = broadcast || email || messaging;
        if !delivered {
            warn!("availability alert could not be delivered on any channel");
        }
        delivered
    }

    /// Broadcast plus an email copy.
    #[instrument(skip_all, fields(kind = alert.kind()))]
    pub async fn send_critical_alert(&self, alert: &Alert) -> bool {
        let text = alert.render();
        let broadcast = self.broadcast(&text).await.any_delivered();
        let email = self
            .deliver_direct(
                self.email.as_deref(),
                &DirectMessage::new(alert.title(), &text),
            )
            .await;
        broadcast || email
    }

    pub async fn send_hourly_summary(&self, text: &str) -> bool {
        let alert = Alert::HourlySummary {
            text: text.to_string(),
        };
        self.broadcast(&alert.render()).await.any_delivered()
    }

    /// Start and stop notices, broadcast only.
    pub async fn send_notice(&self, alert: &Alert) -> bool {
        self.broadcast(&alert.render()).await.any_delivered()
    }

    /// One message per configured channel, reporting each result by name.
    pub async fn send_test_message(&self, text: &str) -> Vec<(String, bool)> {
        let mut results = Vec::new();
        if let Some(channel) = &self.broadcast {
            let report = self.broadcast(text).await;
            results.push((channel.name().to_string(), report.any_delivered()));
        }

        let message = DirectMessage::new("🧪 Test message", text);
        if let Some(channel) = self.email.as_deref() {
            let delivered = self.deliver_direct(Some(channel), &message).await;
            results.push((channel.name().to_string(), delivered));
        }
        if let Some(channel) = self.messaging.as_deref() {
            let delivered = self.deliver_direct(Some(channel), &message).await;
            results.push((channel.name().to_string(), delivered));
        }
        results
    }
}
