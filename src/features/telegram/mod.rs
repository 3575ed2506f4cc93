//! # Feature: Telegram
//!
//! Bot API client used to deliver reminders, and the polling bot that links
//! user accounts.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod bot;
pub mod client;

pub use bot::TelegramBot;
pub use client::TelegramClient;
