//! # Features
//!
//! Feature modules of the habit reminder bot, plus the version registry the
//! binary reports at startup.

pub mod accounts;
pub mod habits;
pub mod reminders;
pub mod telegram;

pub use accounts::{AccountLinker, Recipient, User};
pub use habits::{Habit, HabitDraft, HabitPatch, HabitService};
pub use reminders::{
    HabitLifecycleHooks, MessageChannel, NotificationDispatcher, ReminderRegistry,
    ReminderScheduler, ScheduleMode,
};
pub use telegram::{TelegramBot, TelegramClient};

/// Version and toggle metadata for one feature module
#[derive(Debug, Clone, Copy)]
pub struct FeatureInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub version: &'static str,
    pub toggleable: bool,
}

pub fn get_bot_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Keep in sync with the module headers
pub fn get_features() -> Vec<FeatureInfo> {
    vec![
        FeatureInfo {
            id: "accounts",
            name: "Accounts",
            version: "1.0.0",
            toggleable: false,
        },
        FeatureInfo {
            id: "habits",
            name: "Habits",
            version: "1.0.0",
            toggleable: false,
        },
        FeatureInfo {
            id: "reminders",
            name: "Reminders",
            version: "1.1.0",
            toggleable: true,
        },
        FeatureInfo {
            id: "telegram",
            name: "Telegram",
            version: "1.0.0",
            toggleable: false,
        },
    ]
}
