// Core layer - configuration and domain errors
pub mod core;

// Features layer - habits, reminders, accounts, telegram
pub mod features;

// Infrastructure
pub mod database;

// Re-export core config for convenience
pub use core::Config;

pub use database::Database;

pub use features::{
    // Accounts
    AccountLinker, Recipient, User,
    // Habits
    Habit, HabitDraft, HabitPatch, HabitService,
    // Reminders
    HabitLifecycleHooks, MessageChannel, NotificationDispatcher, ReminderRegistry,
    ReminderScheduler, ScheduleMode,
    // Telegram
    TelegramBot, TelegramClient,
};
