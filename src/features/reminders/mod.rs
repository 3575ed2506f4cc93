//! # Feature: Reminders
//!
//! Habit reminder scheduling: compiles a habit's time and periodicity into a
//! recurrence rule, keeps one registered reminder per habit in a durable
//! keyed store, and delivers rendered reminder messages when rules match.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.1.0: Accelerated schedule mode for observing reminders during testing
//! - 1.0.0: Initial release with registry, dispatcher and runner

pub mod dispatcher;
pub mod hooks;
pub mod registry;
pub mod schedule;
pub mod scheduler;
pub mod store;

pub use dispatcher::{render_message, Delivery, MessageChannel, NotificationDispatcher};
pub use hooks::HabitLifecycleHooks;
pub use registry::{reminder_name, ReminderRegistry, SEND_REMINDER_TASK};
pub use schedule::{compile, compile_accelerated, CronField, RecurrenceRule, ScheduleMode};
pub use scheduler::ReminderScheduler;
pub use store::{MemoryReminderStore, NewReminder, ReminderStore, ScheduledReminder};
