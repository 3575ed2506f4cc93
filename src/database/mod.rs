//! # SQLite persistence
//!
//! A single connection behind an async mutex, shared by the habit service,
//! the reminder registry, account linking and the dispatcher.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

mod habits;
mod reminders;
mod users;

use anyhow::{Context, Result};
use log::info;
use sqlite::Connection;
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        first_name TEXT NOT NULL DEFAULT '',
        last_name TEXT NOT NULL DEFAULT '',
        connection_code TEXT,
        tg_id INTEGER,
        is_connected_to_tg INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_users_connection_code ON users(connection_code);
    CREATE INDEX IF NOT EXISTS idx_users_tg_id ON users(tg_id);

    CREATE TABLE IF NOT EXISTS habits (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        place TEXT NOT NULL,
        time TEXT NOT NULL,
        action TEXT NOT NULL,
        is_pleasant INTEGER NOT NULL,
        related_habit_id INTEGER REFERENCES habits(id) ON DELETE SET NULL,
        periodicity INTEGER NOT NULL DEFAULT 1,
        reward TEXT,
        time_for_action INTEGER NOT NULL,
        is_public INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_habits_user ON habits(user_id);
    CREATE UNIQUE INDEX IF NOT EXISTS idx_habits_user_action ON habits(user_id, action);

    CREATE TABLE IF NOT EXISTS scheduled_reminders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        task TEXT NOT NULL,
        args TEXT NOT NULL DEFAULT '[]',
        minute TEXT NOT NULL,
        hour TEXT NOT NULL,
        day_of_month TEXT NOT NULL,
        month_of_year TEXT NOT NULL,
        day_of_week TEXT NOT NULL,
        enabled INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        last_run_at TEXT,
        total_run_count INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_scheduled_reminders_name ON scheduled_reminders(name);
";

#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and make sure the schema exists
    pub async fn new(db_path: &str) -> Result<Self> {
        let connection = sqlite::open(db_path)
            .with_context(|| format!("Failed to open database at {db_path}"))?;
        let database = Self::from_connection(connection)?;
        info!("💾 Database ready at {db_path}");
        Ok(database)
    }

    /// Fresh private in-memory database
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(sqlite::open(":memory:")?)
    }

    fn from_connection(connection: Connection) -> Result<Self> {
        connection.execute("PRAGMA foreign_keys = ON;")?;
        connection
            .execute(SCHEMA)
            .context("Failed to initialise database schema")?;
        Ok(Database {
            connection: Arc::new(Mutex::new(connection)),
        })
    }
}

/// Row id of the most recent insert on this connection
fn last_insert_id(conn: &Connection) -> Result<i64> {
    let mut statement = conn.prepare("SELECT last_insert_rowid()")?;
    statement.next()?;
    Ok(statement.read::<i64, _>(0)?)
}

fn flag(value: bool) -> i64 {
    i64::from(value)
}
