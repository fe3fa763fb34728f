//! MyTeam bot channel — sends the announcement to a chat and pins it.
//!
//! Uses the plain Bot API over HTTP: `self/get` once when connecting,
//! then `messages/sendText` and `messages/pinMessage` per announcement.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use dutybot_core::error::{DutyBotError, Result};
use dutybot_core::{MyTeamConfig, NotifyChannel};

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(flatten)]
    result: T,
}

/// Bot identity returned by `self/get`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotInfo {
    #[serde(rename = "userId", default)]
    pub user_id: String,
    #[serde(default)]
    pub nick: String,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    #[serde(rename = "msgId", default)]
    msg_id: String,
}

pub struct MyTeamChannel {
    client: reqwest::Client,
    api_url: String,
    token: String,
    chat_id: String,
    bot: BotInfo,
}

impl MyTeamChannel {
    /// Create the client and check the token against the bot API.
    pub async fn connect(config: &MyTeamConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DutyBotError::Http(format!("could not create myteam client: {e}")))?;

        let mut channel = Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            chat_id: config.chat_id.clone(),
            bot: BotInfo {
                user_id: String::new(),
                nick: String::new(),
            },
        };

        channel.bot = channel
            .call::<BotInfo>("self/get", &[])
            .await
            .map_err(|e| DutyBotError::channel(format!("could not create myteam bot: {e}")))?;
        tracing::info!("💬 myteam: connected to bot '{}'", channel.bot.nick);

        Ok(channel)
    }

    pub fn bot(&self) -> &BotInfo {
        &self.bot
    }

    /// Send a text message to the configured chat, returning its id.
    pub async fn send_text(&self, text: &str) -> Result<String> {
        let sent: SentMessage = self
            .call("messages/sendText", &[("chatId", self.chat_id.as_str()), ("text", text)])
            .await?;
        Ok(sent.msg_id)
    }

    pub async fn pin(&self, msg_id: &str) -> Result<()> {
        self.call::<serde_json::Value>(
            "messages/pinMessage",
            &[("chatId", self.chat_id.as_str()), ("msgId", msg_id)],
        )
        .await?;
        Ok(())
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: &[(&str, &str)]) -> Result<T> {
        let response = self
            .client
            .get(format!("{}/{}", self.api_url, method))
            .query(&[("token", self.token.as_str())])
            .query(params)
            .send()
            .await
            .map_err(|e| DutyBotError::Http(format!("myteam {method}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DutyBotError::Http(format!("myteam {method}: HTTP {status}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| DutyBotError::Http(format!("myteam {method}: {e}")))?;
        let body: ApiResponse<T> = serde_json::from_str(&text)?;

        if !body.ok {
            return Err(DutyBotError::channel(format!(
                "myteam {method}: {}",
                body.description.unwrap_or_else(|| "request failed".into())
            )));
        }
        Ok(body.result)
    }
}

#[async_trait]
impl NotifyChannel for MyTeamChannel {
    fn name(&self) -> &str {
        "myteam"
    }

    async fn send(&self, text: &str) -> Result<()> {
        let msg_id = self.send_text(text).await.map_err(|e| {
            DutyBotError::channel(format!("could not send message to chat '{}': {e}", self.chat_id))
        })?;

        // A message that is sent but not pinned still counts as delivered.
        if let Err(e) = self.pin(&msg_id).await {
            tracing::error!("myteam: could not pin message in chat '{}': {e}", self.chat_id);
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
