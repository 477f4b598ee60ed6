use async_trait::async_trait;
use reqwest::Client;
use tracing::instrument;

use super::error::{NotifyError, NotifyResult};
use super::{DirectChannel, DirectMessage};
use crate::config::TwilioConfig;

/// Longest body the Messages API accepts
const MAX_BODY_CHARS: usize = 1600;

/// WhatsApp or SMS through the Twilio Messages API.
#[derive(Debug, Clone)]
pub struct TwilioChannel {
    client: Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    from: String,
    to: String,
    whatsapp: bool,
}

impl TwilioChannel {
    pub fn new(config: &TwilioConfig) -> NotifyResult<Self> {
        let (Some(account_sid), Some(auth_token)) = (&config.account_sid, &config.auth_token)
        else {
            return Err(NotifyError::InvalidConfig(String::from(
                "Twilio account SID and auth token are required",
            )));
        };

        Ok(Self {
            client: Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            account_sid: account_sid.clone(),
            auth_token: auth_token.clone(),
            from: config.from.clone(),
            to: config.to.clone(),
            whatsapp: config.whatsapp,
        })
    }

    pub fn recipient(&self) -> &str {
        &self.to
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        )
    }

    fn address(&self, number: &str) -> String {
        if self.whatsapp {
            format!("whatsapp:{number}")
        } else {
            number.to_string()
        }
    }
}

fn compose_body(message: &DirectMessage) -> String {
    format!("{}\n\n{}", message.subject, message.body)
        .chars()
        .take(MAX_BODY_CHARS)
        .collect()
}

#[async_trait]
impl DirectChannel for TwilioChannel {
    fn name(&self) -> &str {
        if self.whatsapp { "whatsapp" } else { "sms" }
    }

    #[instrument(skip_all, fields(channel = self.name()))]
    async fn send(&self, message: &DirectMessage) -> NotifyResult<()> {
        let form = [
            ("From", self.address(&self.from)),
            ("To", self.address(&self.to)),
            ("Body", compose_body(message)),
        ];

        let response = self
            .client
            .post(self.endpoint())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
