use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::alerts::domain::notifier::{Notifier, NotifyError, NullNotifier};
use crate::events::domain::frame_alerts::AlertKind;
use crate::shared::constants::{
    NOTIFY_TIMEOUT_SECS, TELEGRAM_API_BASE, TELEGRAM_CHAT_ENV, TELEGRAM_TOKEN_ENV,
};

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Sends alert text to a Telegram chat through the Bot API.
pub struct TelegramNotifier {
    client: reqwest::blocking::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str) -> Result<Self, NotifyError> {
        Self::with_api_base(TELEGRAM_API_BASE, bot_token, chat_id)
    }

    pub fn with_api_base(
        api_base: &str,
        bot_token: &str,
        chat_id: &str,
    ) -> Result<Self, NotifyError> {
        if bot_token.is_empty() {
            return Err(NotifyError::MissingCredentials(TELEGRAM_TOKEN_ENV));
        }
        if chat_id.is_empty() {
            return Err(NotifyError::MissingCredentials(TELEGRAM_CHAT_ENV));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(NOTIFY_TIMEOUT_SECS))
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{bot_token}/sendMessage",
                api_base.trim_end_matches('/')
            ),
            chat_id: chat_id.to_string(),
        })
    }

    /// Reads credentials from `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID`.
    pub fn from_env() -> Result<Self, NotifyError> {
        let token = std::env::var(TELEGRAM_TOKEN_ENV)
            .map_err(|_| NotifyError::MissingCredentials(TELEGRAM_TOKEN_ENV))?;
        let chat_id = std::env::var(TELEGRAM_CHAT_ENV)
            .map_err(|_| NotifyError::MissingCredentials(TELEGRAM_CHAT_ENV))?;
        Self::new(token.trim(), chat_id.trim())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Notifier for TelegramNotifier {
    fn notify(&self, kind: AlertKind, message: &str) -> Result<(), NotifyError> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: message,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }
        log::debug!("Sent {kind} alert to Telegram");
        Ok(())
    }
}

/// Telegram notifier from the environment, or a no-op notifier (logged
/// once) when credentials are missing.
pub fn notifier_from_env() -> Arc<dyn Notifier> {
    match TelegramNotifier::from_env() {
        Ok(notifier) => {
            log::info!("Telegram notifications enabled");
            Arc::new(notifier)
        }
        Err(e) => {
            log::warn!("Telegram notifications disabled ({e}); alerts will only be displayed");
            Arc::new(NullNotifier)
        }
    }
}
