//! # Feature: Accounts
//!
//! User records and linking a user to a Telegram chat through a one-time
//! connection code issued at registration.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod linking;

pub use linking::AccountLinker;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Present until the user confirms it through the bot
    pub connection_code: Option<String>,
    pub tg_id: Option<i64>,
    pub is_connected_to_tg: bool,
}

/// Where reminders for a user are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recipient {
    pub tg_id: i64,
    pub connected: bool,
}
