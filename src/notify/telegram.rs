use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::error::{NotifyError, NotifyResult};
use super::BroadcastChannel;

#[derive(Debug, Clone, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct Update {
    message: Option<UpdateMessage>,
}

#[derive(Debug, Deserialize)]
struct UpdateMessage {
    chat: Chat,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
    #[serde(rename = "type", default)]
    kind: String,
    title: Option<String>,
    username: Option<String>,
    first_name: Option<String>,
}

/// A chat that has talked to the bot recently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSummary {
    pub id: i64,
    pub kind: String,
    pub name: String,
}

/// Telegram Bot API channel. Plain text only, no parse mode.
#[derive(Debug, Clone)]
pub struct TelegramChannel {
    client: Client,
    api_base: String,
    token: String,
}

impl TelegramChannel {
    pub fn new(token: impl ToString, api_base: impl ToString) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.to_string().trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Chats found in the bot's pending updates, in first-seen order.
    #[instrument(skip(self))]
    pub async fn discover_chats(&self) -> NotifyResult<Vec<ChatSummary>> {
        let response = self.client.get(self.endpoint("getUpdates")).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let updates: UpdatesResponse = response.json().await?;
        let mut chats: Vec<ChatSummary> = Vec::new();
        for chat in updates
            .result
            .into_iter()
            .filter_map(|update| update.message)
            .map(|message| message.chat)
        {
            if chats.iter().any(|known| known.id == chat.id) {
                continue;
            }
            let name = chat
                .title
                .or(chat.username.map(|u| format!("@{u}")))
                .or(chat.first_name)
                .unwrap_or_default();
            chats.push(ChatSummary {
                id: chat.id,
                kind: chat.kind,
                name,
            });
        }

        debug!("found {} chats in pending updates", chats.len());
        Ok(chats)
    }
}

#[async_trait]
impl BroadcastChannel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    #[instrument(skip(self, text))]
    async fn send_to(&self, recipient: &str, text: &str) -> NotifyResult<()> {
        let payload = SendMessage {
            chat_id: recipient,
            text,
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(self.endpoint("sendMessage"))
            .json(&payload)
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
