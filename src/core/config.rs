//! # Configuration
//!
//! Environment-driven settings for the bot, scheduler and database.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::{Context, Result};
use chrono::FixedOffset;
use std::time::Duration;

use crate::features::reminders::ScheduleMode;

pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_DATABASE_PATH: &str = "habits.db";
const DEFAULT_TICK_SECONDS: u64 = 20;
/// Longest tick that still visits every wall-clock minute despite timer drift
const MAX_TICK_SECONDS: u64 = 30;
const DEFAULT_POLL_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub telegram_api_url: String,
    pub database_path: String,
    pub log_level: String,
    pub schedule_mode: ScheduleMode,
    pub scheduler_tick: Duration,
    pub utc_offset: FixedOffset,
    pub poll_timeout: Duration,
}

impl Config {
    /// Build the configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let telegram_bot_token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .context("TELEGRAM_BOT_TOKEN must be set")?;

        let telegram_api_url = lookup("TELEGRAM_API_URL")
            .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let database_path =
            lookup("DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());
        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let schedule_mode = match lookup("REMINDER_SCHEDULE_MODE") {
            Some(raw) => raw
                .parse::<ScheduleMode>()
                .map_err(|e| anyhow::anyhow!("Invalid REMINDER_SCHEDULE_MODE: {e}"))?,
            None => ScheduleMode::Daily,
        };

        let tick_seconds = parse_number(&lookup, "SCHEDULER_TICK_SECONDS", DEFAULT_TICK_SECONDS)?;
        if tick_seconds == 0 || tick_seconds > MAX_TICK_SECONDS {
            anyhow::bail!(
                "SCHEDULER_TICK_SECONDS must be between 1 and {MAX_TICK_SECONDS}, got {tick_seconds}"
            );
        }

        let offset_minutes: i32 = parse_number(&lookup, "REMINDER_UTC_OFFSET_MINUTES", 0)?;
        let utc_offset = FixedOffset::east_opt(offset_minutes * 60).with_context(|| {
            format!("REMINDER_UTC_OFFSET_MINUTES out of range: {offset_minutes}")
        })?;

        let poll_timeout = parse_number(
            &lookup,
            "TELEGRAM_POLL_TIMEOUT_SECONDS",
            DEFAULT_POLL_TIMEOUT_SECONDS,
        )?;

        Ok(Config {
            telegram_bot_token,
            telegram_api_url,
            database_path,
            log_level,
            schedule_mode,
            scheduler_tick: Duration::from_secs(tick_seconds),
            utc_offset,
            poll_timeout: Duration::from_secs(poll_timeout),
        })
    }
}

fn parse_number<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid {key} '{raw}': {e}")),
        None => Ok(default),
    }
}
