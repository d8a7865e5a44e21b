use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use super::registry::RecipientId;

/// Delivers one text message to one recipient.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, recipient: RecipientId, text: &str) -> Result<()>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Sends through the Telegram Bot API `sendMessage` method.
pub struct TelegramSender {
    http: Client,
    api_url: String,
    bot_token: String,
}

impl TelegramSender {
    pub fn new(api_url: &str, bot_token: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(TelegramSender {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
        })
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, recipient: RecipientId, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.bot_token);
        let body = serde_json::json!({
            "chat_id": recipient,
            "text": text,
        });

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Telegram request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Telegram sendMessage error {}: {}", status, body);
        }
        debug!("Delivered message to chat {}", recipient);
        Ok(())
    }
}

/// Dry-run sender: logs the message instead of delivering it.
pub struct LogSender;

#[async_trait]
impl MessageSender for LogSender {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, recipient: RecipientId, text: &str) -> Result<()> {
        info!("[dry-run] to {}: {}", recipient, text.replace('\n', " | "));
        Ok(())
    }
}
