use crate::config::{self, TelegramConfig};
use crate::provider::HttpFetcher;
use anyhow::{Context, Result, bail};

/// Posts the run summary to a Telegram chat
pub struct TelegramNotifier {
    fetcher: HttpFetcher,
    config: TelegramConfig,
    api_url: String,
}

impl TelegramNotifier {
    pub fn new(fetcher: HttpFetcher, config: TelegramConfig) -> Self {
        Self {
            fetcher,
            config,
            api_url: config::TELEGRAM_API_URL.to_string(),
        }
    }

    pub async fn send(&self, text: &str) -> Result<()> {
        let url = config::telegram_send_url(&self.api_url, &self.config.token);
        let res = self
            .fetcher
            .client()
            .post(&url)
            .form(&[("chat_id", self.config.chat_id.as_str()), ("text", text)])
            .send()
            .await
            .context("Failed to send notification")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            bail!("Notification rejected {}: {}", status, preview);
        }

        tracing::info!(chat = %self.config.chat_id, "notification sent");
        Ok(())
    }
}
