//! Telegram Bot API notifier.
//!
//! [`TelegramNotifier`] posts to `sendMessage` and `createForumTopic` on a
//! single configured forum chat. Each call is bounded by the configured
//! timeout. Failed calls are not retried here.

use std::time::Duration;

use async_trait::async_trait;
use musicclub_core::types::ThreadId;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::notifier::{Channel, Notifier, NotifyError};

/// Default Bot API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Default timeout of a single Bot API call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Connection settings for the Bot API.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Numeric chat id (`-100...`) or `@channelname`.
    pub chat_id: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl TelegramConfig {
    /// Both the token and the chat id are set.
    pub fn is_complete(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Envelope every Bot API method answers with.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<i64>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForumTopic {
    message_thread_id: ThreadId,
}

// ---------------------------------------------------------------------------
// TelegramNotifier
// ---------------------------------------------------------------------------

/// Sends club notifications through the Telegram Bot API.
pub struct TelegramNotifier {
    client: reqwest::Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    /// Build a notifier with a pre-configured HTTP client.
    pub fn new(config: TelegramConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Chat id as JSON: numeric ids go out as numbers, `@names` as strings.
    fn chat_id_value(&self) -> serde_json::Value {
        let chat_id = self.config.chat_id.trim();
        match chat_id.parse::<i64>() {
            Ok(id) => serde_json::Value::from(id),
            Err(_) => serde_json::Value::from(chat_id),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token
        )
    }

    /// POST a Bot API method and unwrap its response envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &serde_json::Value,
    ) -> Result<Option<T>, NotifyError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(payload)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_request_error)?;

        match serde_json::from_slice::<ApiResponse<T>>(&body) {
            Ok(envelope) if envelope.ok && status.is_success() => Ok(envelope.result),
            Ok(envelope) => Err(NotifyError::Api {
                code: envelope.error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                description: envelope.description.unwrap_or_default(),
            }),
            Err(_) => Err(NotifyError::HttpStatus(status.as_u16())),
        }
    }
}

/// Strip the URL (it embeds the bot token) and classify timeouts.
fn map_request_error(err: reqwest::Error) -> NotifyError {
    if err.is_timeout() {
        NotifyError::Timeout
    } else {
        NotifyError::Request(err.without_url())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, channel: Channel, text: &str) -> Result<(), NotifyError> {
        let mut payload = serde_json::json!({
            "chat_id": self.chat_id_value(),
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        if let Some(thread_id) = channel.thread_id() {
            payload["message_thread_id"] = serde_json::Value::from(thread_id);
        }

        self.call::<serde_json::Value>("sendMessage", &payload).await?;
        Ok(())
    }

    async fn create_thread(&self, title: &str) -> Result<ThreadId, NotifyError> {
        let payload = serde_json::json!({
            "chat_id": self.chat_id_value(),
            "name": title,
        });

        let topic = self
            .call::<ForumTopic>("createForumTopic", &payload)
            .await?
            .ok_or(NotifyError::MissingResult)?;
        if topic.message_thread_id <= 0 {
            return Err(NotifyError::MissingResult);
        }
        Ok(topic.message_thread_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
