//! Recurring-task runner for registered reminders.
//!
//! Wakes up on a fixed tick, evaluates each wall-clock minute once, and fires
//! every due reminder as its own detached task. A failing fire only affects
//! itself.

use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike, Utc};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::dispatcher::{Delivery, NotificationDispatcher};
use super::registry::{ReminderRegistry, SEND_REMINDER_TASK};
use crate::core::DispatchError;

pub struct ReminderScheduler {
    registry: ReminderRegistry,
    dispatcher: Arc<NotificationDispatcher>,
    tick: Duration,
    utc_offset: FixedOffset,
}

impl ReminderScheduler {
    pub fn new(
        registry: ReminderRegistry,
        dispatcher: Arc<NotificationDispatcher>,
        tick: Duration,
        utc_offset: FixedOffset,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            tick,
            utc_offset,
        }
    }

    /// Run forever
    pub async fn run(self) {
        info!(
            "⏰ Reminder scheduler started (tick {:?}, mode {}, UTC offset {})",
            self.tick,
            self.registry.mode().as_str(),
            self.utc_offset
        );

        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_minute: Option<NaiveDateTime> = None;

        loop {
            interval.tick().await;

            let now = Utc::now();
            let minute = wall_clock_minute(now, self.utc_offset);
            if last_minute == Some(minute) {
                continue;
            }
            last_minute = Some(minute);

            if let Err(e) = self.dispatch_due(&minute, now).await {
                error!("Failed to evaluate reminders for {minute}: {e:#}");
            }
        }
    }

    /// Fire every reminder due at `minute`. Returns the handles of the
    /// spawned deliveries; the loop in [`ReminderScheduler::run`] drops them.
    pub async fn dispatch_due(
        &self,
        minute: &NaiveDateTime,
        now: DateTime<Utc>,
    ) -> Result<Vec<JoinHandle<()>>> {
        let due = self.registry.due(minute).await?;
        let mut handles = Vec::with_capacity(due.len());

        for reminder in due {
            if reminder.task != SEND_REMINDER_TASK {
                warn!(
                    "Skipping reminder {} with unknown task '{}'",
                    reminder.name, reminder.task
                );
                continue;
            }
            let Some(habit_id) = reminder.habit_id() else {
                warn!(
                    "Skipping reminder {} with malformed args {:?}",
                    reminder.name, reminder.args
                );
                continue;
            };

            if let Err(e) = self.registry.record_run(&reminder, now).await {
                warn!("Failed to record run of {}: {e:#}", reminder.name);
            }

            let dispatcher = self.dispatcher.clone();
            handles.push(tokio::spawn(async move {
                match dispatcher.fire(habit_id).await {
                    Ok(Delivery::Sent { .. }) | Ok(Delivery::NoRecipient) => {}
                    Ok(Delivery::Failed { reason, .. }) => {
                        warn!("Reminder for habit {habit_id} dropped: {reason}");
                    }
                    Err(DispatchError::HabitNotFound(id)) => {
                        warn!("Reminder fired for habit {id}, which no longer exists");
                    }
                    Err(e) => error!("Reminder for habit {habit_id} failed: {e}"),
                }
            }));
        }

        if !handles.is_empty() {
            info!("Fired {} reminder(s) for {minute}", handles.len());
        }
        Ok(handles)
    }
}

/// `now` in the configured offset, truncated to the minute
fn wall_clock_minute(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDateTime {
    let local = now.with_timezone(&offset).naive_local();
    local
        .date()
        .and_hms_opt(local.hour(), local.minute(), 0)
        .unwrap_or(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::features::habits::HabitDraft;
    use crate::features::reminders::dispatcher::tests::RecordingChannel;
    use crate::features::reminders::{ReminderStore, ScheduleMode};
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    fn draft(action: &str, hour: u32) -> HabitDraft {
        HabitDraft {
            place: "Work".to_string(),
            time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            action: action.to_string(),
            is_pleasant: false,
            related_habit_id: None,
            periodicity: 1,
            reward: Some("Candy".to_string()),
            time_for_action: 60,
            is_public: false,
        }
    }

    async fn setup() -> (Database, ReminderRegistry, Arc<RecordingChannel>, ReminderScheduler, i64) {
        let db = Database::in_memory().unwrap();
        let user = db.create_user("ivan@example.com", "Ivan", "Ivanov", None).await.unwrap();
        db.link_telegram_account(user.id, 555).await.unwrap();

        let registry = ReminderRegistry::new(Arc::new(db.clone()), ScheduleMode::Daily);
        let channel = Arc::new(RecordingChannel::default());
        let dispatcher = Arc::new(NotificationDispatcher::new(db.clone(), channel.clone()));
        let scheduler = ReminderScheduler::new(
            registry.clone(),
            dispatcher,
            Duration::from_secs(20),
            FixedOffset::east_opt(0).unwrap(),
        );
        (db, registry, channel, scheduler, user.id)
    }

    fn nine_am() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_wall_clock_minute_applies_offset() {
        let now = Utc.with_ymd_and_hms(2024, 4, 15, 6, 30, 42).unwrap();
        let minute = wall_clock_minute(now, FixedOffset::east_opt(3 * 3600).unwrap());
        assert_eq!(
            minute,
            NaiveDate::from_ymd_opt(2024, 4, 15)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_due_reminders_are_fired() {
        let (db, registry, channel, scheduler, user_id) = setup().await;
        let due = db.insert_habit(user_id, &draft("Morning coffee", 9)).await.unwrap();
        let later = db.insert_habit(user_id, &draft("Lunch walk", 13)).await.unwrap();
        registry.create(&due).await.unwrap();
        registry.create(&later).await.unwrap();

        let handles = scheduler.dispatch_due(&nine_am(), Utc::now()).await.unwrap();
        assert_eq!(handles.len(), 1);
        for handle in handles {
            handle.await.unwrap();
        }

        let sent = channel.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 555);
        assert!(sent[0].1.starts_with("⏰ Time to perform the habit: Morning coffee"));

        let reminders = db.reminders_by_name(&format!("reminder_for_habit_{}", due.id)).await.unwrap();
        assert_eq!(reminders[0].total_run_count, 1);
    }

    #[tokio::test]
    async fn test_missing_habit_does_not_stop_others() {
        let (db, registry, channel, scheduler, user_id) = setup().await;
        let kept = db.insert_habit(user_id, &draft("Morning coffee", 9)).await.unwrap();
        let gone = db.insert_habit(user_id, &draft("Stretch", 9)).await.unwrap();
        registry.create(&kept).await.unwrap();
        registry.create(&gone).await.unwrap();
        // habit removed without going through the hooks
        db.delete_habit(gone.id).await.unwrap();

        let handles = scheduler.dispatch_due(&nine_am(), Utc::now()).await.unwrap();
        assert_eq!(handles.len(), 2);
        for handle in handles {
            assert!(handle.await.is_ok());
        }

        assert_eq!(channel.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_task_is_skipped() {
        let (db, _registry, channel, scheduler, _) = setup().await;
        db.insert_reminder(crate::features::reminders::NewReminder {
            name: "cleanup".to_string(),
            task: "maintenance.cleanup".to_string(),
            args: vec![],
            rule: crate::features::reminders::compile_accelerated(1),
        })
        .await
        .unwrap();

        let handles = scheduler.dispatch_due(&nine_am(), Utc::now()).await.unwrap();
        assert!(handles.is_empty());
        assert!(channel.sent.lock().await.is_empty());
    }
}
