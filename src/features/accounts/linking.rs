//! Registration and Telegram account linking.

use log::{info, warn};
use uuid::Uuid;

use super::User;
use crate::core::LinkError;
use crate::database::Database;

#[derive(Clone)]
pub struct AccountLinker {
    database: Database,
}

impl AccountLinker {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Create a user with a fresh connection code to hand to the bot
    pub async fn register(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, LinkError> {
        let email = email.trim().to_lowercase();
        if self.database.email_exists(&email).await? {
            return Err(LinkError::EmailTaken(email));
        }

        let code = Uuid::new_v4().simple().to_string();
        let user = self
            .database
            .create_user(&email, first_name, last_name, Some(&code))
            .await?;

        info!("👤 Registered user {} ({})", user.id, user.email);
        Ok(user)
    }

    /// Link the user holding `code` to the Telegram account `telegram_id`
    pub async fn confirm(&self, code: &str, telegram_id: i64) -> Result<User, LinkError> {
        let code = code.trim();
        let Some(user) = self.database.get_user_by_connection_code(code).await? else {
            warn!("Unknown connection code received from Telegram user {telegram_id}");
            return Err(LinkError::UnknownCode);
        };

        self.database
            .link_telegram_account(user.id, telegram_id)
            .await?;
        info!("🔗 Linked user {} to Telegram id {telegram_id}", user.id);

        Ok(User {
            connection_code: None,
            tg_id: Some(telegram_id),
            is_connected_to_tg: true,
            ..user
        })
    }

    /// Whether a connected user already uses this Telegram id
    pub async fn is_connected(&self, telegram_id: i64) -> Result<bool, LinkError> {
        Ok(self
            .database
            .get_user_by_tg_id(telegram_id)
            .await?
            .is_some_and(|user| user.is_connected_to_tg))
    }
}
