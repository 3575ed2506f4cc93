//! Telegram bot front end: greets users and links accounts from the
//! connection code they send.

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;

use super::client::{TelegramClient, Update};
use crate::core::LinkError;
use crate::features::accounts::AccountLinker;

const RETRY_DELAY: Duration = Duration::from_secs(5);

pub const ALREADY_CONNECTED: &str = "You have already connected your account to Telegram!";
pub const GREETING: &str =
    "Hi! I'm your bot, ready to help you with your habits. To get started, send me your connection code!";
pub const LINK_SUCCEEDED: &str = "Your account has been successfully linked to Telegram!";
pub const LINK_FAILED: &str = "An error occurred while linking your account. \
     Please check the connection code and try again.";

pub struct TelegramBot {
    client: Arc<TelegramClient>,
    linker: AccountLinker,
    poll_timeout: Duration,
}

impl TelegramBot {
    pub fn new(client: Arc<TelegramClient>, linker: AccountLinker, poll_timeout: Duration) -> Self {
        Self {
            client,
            linker,
            poll_timeout,
        }
    }

    /// Long-poll for updates forever
    pub async fn run(self) {
        info!("🤖 Telegram bot polling for updates");
        let mut offset: Option<i64> = None;

        loop {
            match self.client.get_updates(offset, self.poll_timeout).await {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        self.handle_update(update).await;
                    }
                }
                Err(e) => {
                    warn!("Failed to fetch Telegram updates: {e:#}");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    async fn handle_update(&self, update: Update) {
        let Some(message) = update.message else {
            return;
        };
        let (Some(from), Some(text)) = (message.from, message.text) else {
            return;
        };
        if from.is_bot {
            return;
        }

        debug!("Message from Telegram user {}", from.id);
        let reply = match self.reply_for(from.id, &text).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Failed to handle message from Telegram user {}: {e}", from.id);
                LINK_FAILED
            }
        };

        if let Err(e) = self.client.send_message(message.chat.id, reply).await {
            warn!("Failed to reply to chat {}: {e:#}", message.chat.id);
        }
    }

    /// Pick the reply for a message. `/start` checks the link status (a
    /// deep-link payload after it is treated as a connection code); any
    /// other text is a connection code.
    pub async fn reply_for(&self, telegram_id: i64, text: &str) -> Result<&'static str, LinkError> {
        let text = text.trim();

        let code = match text.strip_prefix("/start") {
            Some(payload) if payload.is_empty() || payload.starts_with(' ') => {
                let payload = payload.trim();
                if payload.is_empty() {
                    return Ok(if self.linker.is_connected(telegram_id).await? {
                        ALREADY_CONNECTED
                    } else {
                        GREETING
                    });
                }
                payload
            }
            _ => text,
        };

        match self.linker.confirm(code, telegram_id).await {
            Ok(_) => Ok(LINK_SUCCEEDED),
            Err(LinkError::UnknownCode) => Ok(LINK_FAILED),
            Err(e) => Err(e),
        }
    }
}
