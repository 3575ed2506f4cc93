//! Minimal Telegram Bot API client: `sendMessage` and `getUpdates`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::features::reminders::MessageChannel;

const SEND_TIMEOUT: Duration = Duration::from_secs(15);
/// Extra time on top of the long-poll timeout before the request is abandoned
const POLL_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    /// `<api_url>/bot<token>`; never logged
    base_url: String,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
        timeout: Duration,
    ) -> Result<T> {
        let response = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            // the URL carries the bot token
            .map_err(|e| anyhow::anyhow!("Telegram {method} request failed: {}", e.without_url()))?;

        let status = response.status();
        let parsed: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Invalid Telegram {method} response: {}", e.without_url()))?;

        if !parsed.ok {
            anyhow::bail!(
                "Telegram {method} failed ({status}): {}",
                parsed.description.unwrap_or_else(|| "no description".to_string())
            );
        }
        parsed
            .result
            .with_context(|| format!("Telegram {method} response has no result"))
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                json!({ "chat_id": chat_id, "text": text }),
                SEND_TIMEOUT,
            )
            .await?;
        Ok(())
    }

    /// Long-poll for new messages. `offset` is one past the last handled
    /// update id.
    pub async fn get_updates(&self, offset: Option<i64>, timeout: Duration) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": timeout.as_secs(),
                "allowed_updates": ["message"],
            }),
            timeout + POLL_GRACE,
        )
        .await
    }
}

#[async_trait]
impl MessageChannel for TelegramClient {
    async fn send(&self, recipient_id: i64, text: &str) -> Result<()> {
        self.send_message(recipient_id, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get_updates_response() {
        let raw = r#"{
            "ok": true,
            "result": [
                {
                    "update_id": 815,
                    "message": {
                        "message_id": 12,
                        "from": {"id": 14567832, "is_bot": false, "first_name": "Max", "language_code": "en"},
                        "chat": {"id": 14567832, "type": "private", "first_name": "Max"},
                        "date": 1700000000,
                        "text": "/start"
                    }
                },
                {"update_id": 816, "edited_message": {"message_id": 12}}
            ]
        }"#;

        let parsed: ApiResponse<Vec<Update>> = serde_json::from_str(raw).unwrap();
        assert!(parsed.ok);
        let updates = parsed.result.unwrap();
        assert_eq!(updates.len(), 2);

        let message = updates[0].message.as_ref().unwrap();
        assert_eq!(message.chat.id, 14567832);
        assert_eq!(message.from.as_ref().unwrap().id, 14567832);
        assert_eq!(message.text.as_deref(), Some("/start"));
        assert!(updates[1].message.is_none());
    }

    #[test]
    fn test_parse_error_response() {
        let raw = r#"{"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}"#;
        let parsed: ApiResponse<serde_json::Value> = serde_json::from_str(raw).unwrap();

        assert!(!parsed.ok);
        assert!(parsed.result.is_none());
        assert_eq!(parsed.description.as_deref(), Some("Bad Request: chat not found"));
    }

    #[test]
    fn test_base_url_strips_trailing_slash() {
        let client = TelegramClient::new("http://localhost:8081/", "123:abc");
        assert_eq!(client.base_url, "http://localhost:8081/bot123:abc");
    }
}
