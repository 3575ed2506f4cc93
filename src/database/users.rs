//! User directory queries: registration, Telegram linking, recipients.

use anyhow::Result;
use sqlite::{State, Statement};

use super::{flag, last_insert_id, Database};
use crate::features::accounts::{Recipient, User};

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, connection_code, tg_id, is_connected_to_tg";

fn read_user(statement: &Statement<'_>) -> Result<User> {
    Ok(User {
        id: statement.read::<i64, _>("id")?,
        email: statement.read::<String, _>("email")?,
        first_name: statement.read::<String, _>("first_name")?,
        last_name: statement.read::<String, _>("last_name")?,
        connection_code: statement.read::<Option<String>, _>("connection_code")?,
        tg_id: statement.read::<Option<i64>, _>("tg_id")?,
        is_connected_to_tg: statement.read::<i64, _>("is_connected_to_tg")? != 0,
    })
}

impl Database {
    pub async fn create_user(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        connection_code: Option<&str>,
    ) -> Result<User> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(
            "INSERT INTO users (email, first_name, last_name, connection_code) VALUES (?, ?, ?, ?)",
        )?;
        statement.bind((1, email))?;
        statement.bind((2, first_name))?;
        statement.bind((3, last_name))?;
        statement.bind((4, connection_code))?;
        statement.next()?;
        drop(statement);

        Ok(User {
            id: last_insert_id(&conn)?,
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            connection_code: connection_code.map(str::to_string),
            tg_id: None,
            is_connected_to_tg: false,
        })
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let conn = self.connection.lock().await;
        let mut statement =
            conn.prepare(format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))?;
        statement.bind((1, user_id))?;
        if let State::Row = statement.next()? {
            return Ok(Some(read_user(&statement)?));
        }
        Ok(None)
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare("SELECT 1 FROM users WHERE email = ? LIMIT 1")?;
        statement.bind((1, email))?;
        Ok(matches!(statement.next()?, State::Row))
    }

    pub async fn get_user_by_connection_code(&self, code: &str) -> Result<Option<User>> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(format!(
            "SELECT {USER_COLUMNS} FROM users WHERE connection_code = ? LIMIT 1"
        ))?;
        statement.bind((1, code))?;
        if let State::Row = statement.next()? {
            return Ok(Some(read_user(&statement)?));
        }
        Ok(None)
    }

    pub async fn get_user_by_tg_id(&self, tg_id: i64) -> Result<Option<User>> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(format!(
            "SELECT {USER_COLUMNS} FROM users WHERE tg_id = ? ORDER BY id LIMIT 1"
        ))?;
        statement.bind((1, tg_id))?;
        if let State::Row = statement.next()? {
            return Ok(Some(read_user(&statement)?));
        }
        Ok(None)
    }

    /// Store the Telegram id, clear the connection code, mark connected
    pub async fn link_telegram_account(&self, user_id: i64, tg_id: i64) -> Result<()> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(
            "UPDATE users SET tg_id = ?, connection_code = NULL, is_connected_to_tg = ? WHERE id = ?",
        )?;
        statement.bind((1, tg_id))?;
        statement.bind((2, flag(true)))?;
        statement.bind((3, user_id))?;
        statement.next()?;
        Ok(())
    }

    /// Resolve a habit owner to the identity reminders are delivered to
    pub async fn recipient_for(&self, user_id: i64) -> Result<Option<Recipient>> {
        let conn = self.connection.lock().await;
        let mut statement =
            conn.prepare("SELECT tg_id, is_connected_to_tg FROM users WHERE id = ?")?;
        statement.bind((1, user_id))?;
        if let State::Row = statement.next()? {
            let tg_id = statement.read::<Option<i64>, _>("tg_id")?;
            let connected = statement.read::<i64, _>("is_connected_to_tg")? != 0;
            return Ok(tg_id.map(|tg_id| Recipient { tg_id, connected }));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_fetch_user() {
        let db = Database::in_memory().unwrap();
        let user = db
            .create_user("ivan@example.com", "Ivan", "Ivanov", Some("abc123"))
            .await
            .unwrap();

        let fetched = db.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(fetched, user);
        assert!(db.email_exists("ivan@example.com").await.unwrap());
        assert!(!db.email_exists("max@example.com").await.unwrap());
        assert_eq!(
            db.get_user_by_connection_code("abc123").await.unwrap().map(|u| u.id),
            Some(user.id)
        );
    }

    #[tokio::test]
    async fn test_link_and_resolve_recipient() {
        let db = Database::in_memory().unwrap();
        let user = db
            .create_user("ivan@example.com", "Ivan", "Ivanov", Some("abc123"))
            .await
            .unwrap();
        assert_eq!(db.recipient_for(user.id).await.unwrap(), None);

        db.link_telegram_account(user.id, 1234567890).await.unwrap();

        let linked = db.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(linked.connection_code, None);
        assert_eq!(linked.tg_id, Some(1234567890));
        assert!(linked.is_connected_to_tg);
        assert_eq!(
            db.recipient_for(user.id).await.unwrap(),
            Some(Recipient {
                tg_id: 1234567890,
                connected: true
            })
        );
        assert_eq!(
            db.get_user_by_tg_id(1234567890).await.unwrap().map(|u| u.id),
            Some(user.id)
        );
        assert!(db.get_user_by_connection_code("abc123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = Database::in_memory().unwrap();
        db.create_user("a@example.com", "A", "A", None).await.unwrap();
        assert!(db.create_user("a@example.com", "B", "B", None).await.is_err());
    }
}
