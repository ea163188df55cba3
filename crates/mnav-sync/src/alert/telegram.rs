//! Telegram Bot API alerts.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{Alert, AlertError, AlertTransport};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
/// Bot API hard limit on message text length.
const MAX_MESSAGE_CHARS: usize = 4096;

/// Bot token and target chat.
#[derive(Clone)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
}

impl std::fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl TelegramSettings {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Point requests at a different API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Read `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID`. Returns the first missing name.
    pub fn from_env() -> Result<Self, &'static str> {
        let get = |name: &'static str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or(name)
        };
        Ok(Self::new(get("TELEGRAM_BOT_TOKEN")?, get("TELEGRAM_CHAT_ID")?))
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
    disable_web_page_preview: bool,
}

/// Pushes alerts to a chat through `sendMessage`.
pub struct TelegramTransport {
    settings: TelegramSettings,
    client: reqwest::Client,
}

impl TelegramTransport {
    pub fn new(settings: TelegramSettings) -> Result<Self, AlertError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.settings.api_base.trim_end_matches('/'),
            self.settings.bot_token
        )
    }
}

/// Subject line, blank line, body; cut to the Bot API limit.
fn message_text(alert: &Alert) -> String {
    let text = format!("{}\n\n{}", alert.subject, alert.body);
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text;
    }
    let mut cut: String = text.chars().take(MAX_MESSAGE_CHARS - 1).collect();
    cut.push('…');
    cut
}

#[async_trait]
impl AlertTransport for TelegramTransport {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, alert: &Alert) -> Result<(), AlertError> {
        let payload = SendMessage {
            chat_id: &self.settings.chat_id,
            text: message_text(alert),
            disable_web_page_preview: true,
        };

        let resp = self.client.post(self.endpoint()).json(&payload).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AlertError::Rejected {
                service: "telegram",
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_text_is_truncated() {
        let alert = Alert::new("subject", "x".repeat(5000));
        let text = message_text(&alert);
        assert_eq!(text.chars().count(), MAX_MESSAGE_CHARS);
        assert!(text.ends_with('…'));
        assert!(text.starts_with("subject\n\n"));
    }

    #[test]
    fn test_endpoint_embeds_token() {
        let transport = TelegramTransport::new(
            TelegramSettings::new("123:abc", "42").with_api_base("http://localhost:9000/"),
        )
        .unwrap();
        assert_eq!(transport.endpoint(), "http://localhost:9000/bot123:abc/sendMessage");
    }

    #[test]
    fn test_new_reports_client_setup_as_result() {
        let built: Result<TelegramTransport, AlertError> =
            TelegramTransport::new(TelegramSettings::new("123:abc", "42"));
        let transport = built.expect("client builds with default TLS");
        assert_eq!(transport.name(), "telegram");
        assert_eq!(transport.settings.api_base, DEFAULT_API_BASE);
    }
}
