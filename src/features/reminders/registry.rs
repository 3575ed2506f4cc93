//! Reminder registry: one recurring task per habit, addressed by name.

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, info};
use std::sync::Arc;

use super::schedule::ScheduleMode;
use super::store::{NewReminder, ReminderStore, ScheduledReminder};
use crate::features::habits::Habit;

/// Task name the runner maps to the notification dispatcher
pub const SEND_REMINDER_TASK: &str = "habits.send_reminder";

/// Deterministic registry name for a habit's reminder
pub fn reminder_name(habit_id: i64) -> String {
    format!("reminder_for_habit_{habit_id}")
}

#[derive(Clone)]
pub struct ReminderRegistry {
    store: Arc<dyn ReminderStore>,
    mode: ScheduleMode,
}

impl ReminderRegistry {
    pub fn new(store: Arc<dyn ReminderStore>, mode: ScheduleMode) -> Self {
        Self { store, mode }
    }

    pub fn mode(&self) -> ScheduleMode {
        self.mode
    }

    /// Register a reminder for the habit.
    ///
    /// Does not look for an existing entry: calling this twice for the same
    /// habit leaves two reminders behind. Use [`ReminderRegistry::update`]
    /// to replace one.
    pub async fn create(&self, habit: &Habit) -> Result<ScheduledReminder> {
        let rule = self.mode.compile(habit.time, habit.periodicity);
        let reminder = self
            .store
            .insert_reminder(NewReminder {
                name: reminder_name(habit.id),
                task: SEND_REMINDER_TASK.to_string(),
                args: vec![habit.id],
                rule,
            })
            .await?;

        info!(
            "⏰ Registered {} ({}) for habit {}",
            reminder.name, reminder.rule, habit.id
        );
        Ok(reminder)
    }

    /// Remove every reminder registered for the habit. Returns the number
    /// removed; zero is not an error.
    pub async fn delete(&self, habit_id: i64) -> Result<usize> {
        let name = reminder_name(habit_id);
        let removed = self.store.delete_reminders_by_name(&name).await?;
        if removed > 0 {
            info!("🗑️ Removed {removed} reminder(s) named {name}");
        } else {
            debug!("No reminder named {name} to remove");
        }
        Ok(removed)
    }

    /// Replace the habit's reminder with one compiled from its current state.
    /// Between the two steps the habit briefly has no reminder.
    pub async fn update(&self, habit: &Habit) -> Result<ScheduledReminder> {
        self.delete(habit.id).await?;
        self.create(habit).await
    }

    pub async fn reminders_for(&self, habit_id: i64) -> Result<Vec<ScheduledReminder>> {
        self.store.reminders_by_name(&reminder_name(habit_id)).await
    }

    pub async fn all(&self) -> Result<Vec<ScheduledReminder>> {
        self.store.all_reminders().await
    }

    /// Enabled reminders whose rule matches the wall-clock minute `at`
    pub async fn due(&self, at: &NaiveDateTime) -> Result<Vec<ScheduledReminder>> {
        let reminders = self.store.all_reminders().await?;
        Ok(reminders
            .into_iter()
            .filter(|reminder| reminder.enabled && reminder.rule.matches(at))
            .collect())
    }

    pub async fn record_run(&self, reminder: &ScheduledReminder, at: DateTime<Utc>) -> Result<()> {
        self.store.record_reminder_run(reminder.id, at).await
    }
}
