//! Durable backend for the reminder registry.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlite::{State, Statement};

use super::{flag, last_insert_id, Database};
use crate::features::reminders::{
    CronField, NewReminder, RecurrenceRule, ReminderStore, ScheduledReminder,
};

const REMINDER_COLUMNS: &str = "id, name, task, args, minute, hour, day_of_month, month_of_year, \
     day_of_week, enabled, created_at, last_run_at, total_run_count";

fn read_field(statement: &Statement<'_>, column: &str) -> Result<CronField> {
    let raw = statement.read::<String, _>(column)?;
    raw.parse::<CronField>()
        .map_err(|e| anyhow::anyhow!("Invalid stored cron field {column}: {e}"))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid stored timestamp '{raw}'"))?
        .with_timezone(&Utc))
}

fn read_reminder(statement: &Statement<'_>) -> Result<ScheduledReminder> {
    let raw_args = statement.read::<String, _>("args")?;
    let args: Vec<i64> = serde_json::from_str(&raw_args)
        .with_context(|| format!("Invalid stored reminder args '{raw_args}'"))?;

    let last_run_at = match statement.read::<Option<String>, _>("last_run_at")? {
        Some(raw) => Some(parse_timestamp(&raw)?),
        None => None,
    };

    Ok(ScheduledReminder {
        id: statement.read::<i64, _>("id")?,
        name: statement.read::<String, _>("name")?,
        task: statement.read::<String, _>("task")?,
        args,
        rule: RecurrenceRule {
            minute: read_field(statement, "minute")?,
            hour: read_field(statement, "hour")?,
            day_of_month: read_field(statement, "day_of_month")?,
            month_of_year: read_field(statement, "month_of_year")?,
            day_of_week: read_field(statement, "day_of_week")?,
        },
        enabled: statement.read::<i64, _>("enabled")? != 0,
        created_at: parse_timestamp(&statement.read::<String, _>("created_at")?)?,
        last_run_at,
        total_run_count: statement.read::<i64, _>("total_run_count")?,
    })
}

fn collect_reminders(statement: &mut Statement<'_>) -> Result<Vec<ScheduledReminder>> {
    let mut reminders = Vec::new();
    while let State::Row = statement.next()? {
        reminders.push(read_reminder(statement)?);
    }
    Ok(reminders)
}

#[async_trait]
impl ReminderStore for Database {
    async fn insert_reminder(&self, reminder: NewReminder) -> Result<ScheduledReminder> {
        let created_at = Utc::now();
        let args = serde_json::to_string(&reminder.args)?;
        let rule = reminder.rule;

        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(
            "INSERT INTO scheduled_reminders (name, task, args, minute, hour, day_of_month, \
             month_of_year, day_of_week, enabled, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )?;
        statement.bind((1, reminder.name.as_str()))?;
        statement.bind((2, reminder.task.as_str()))?;
        statement.bind((3, args.as_str()))?;
        statement.bind((4, rule.minute.to_string().as_str()))?;
        statement.bind((5, rule.hour.to_string().as_str()))?;
        statement.bind((6, rule.day_of_month.to_string().as_str()))?;
        statement.bind((7, rule.month_of_year.to_string().as_str()))?;
        statement.bind((8, rule.day_of_week.to_string().as_str()))?;
        statement.bind((9, flag(true)))?;
        statement.bind((10, created_at.to_rfc3339().as_str()))?;
        statement.next()?;
        drop(statement);

        Ok(ScheduledReminder {
            id: last_insert_id(&conn)?,
            name: reminder.name,
            task: reminder.task,
            args: reminder.args,
            rule,
            enabled: true,
            created_at,
            last_run_at: None,
            total_run_count: 0,
        })
    }

    async fn delete_reminders_by_name(&self, name: &str) -> Result<usize> {
        let conn = self.connection.lock().await;

        let mut count = conn.prepare("SELECT COUNT(*) FROM scheduled_reminders WHERE name = ?")?;
        count.bind((1, name))?;
        count.next()?;
        let existing = count.read::<i64, _>(0)?;
        drop(count);

        if existing == 0 {
            return Ok(0);
        }

        let mut statement = conn.prepare("DELETE FROM scheduled_reminders WHERE name = ?")?;
        statement.bind((1, name))?;
        statement.next()?;
        Ok(usize::try_from(existing)?)
    }

    async fn reminders_by_name(&self, name: &str) -> Result<Vec<ScheduledReminder>> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(format!(
            "SELECT {REMINDER_COLUMNS} FROM scheduled_reminders WHERE name = ? ORDER BY id"
        ))?;
        statement.bind((1, name))?;
        collect_reminders(&mut statement)
    }

    async fn all_reminders(&self) -> Result<Vec<ScheduledReminder>> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(format!(
            "SELECT {REMINDER_COLUMNS} FROM scheduled_reminders ORDER BY id"
        ))?;
        collect_reminders(&mut statement)
    }

    async fn record_reminder_run(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(
            "UPDATE scheduled_reminders SET last_run_at = ?, total_run_count = total_run_count + 1 \
             WHERE id = ?",
        )?;
        statement.bind((1, at.to_rfc3339().as_str()))?;
        statement.bind((2, id))?;
        statement.next()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reminders::{compile, reminder_name, ReminderRegistry, ScheduleMode};
    use chrono::NaiveTime;
    use std::sync::Arc;

    fn new_reminder(habit_id: i64) -> NewReminder {
        NewReminder {
            name: reminder_name(habit_id),
            task: "habits.send_reminder".to_string(),
            args: vec![habit_id],
            rule: compile(NaiveTime::from_hms_opt(9, 0, 0).unwrap(), 2),
        }
    }

    #[tokio::test]
    async fn test_reminder_rows_round_trip() {
        let db = Database::in_memory().unwrap();
        let stored = db.insert_reminder(new_reminder(3)).await.unwrap();

        let loaded = db.reminders_by_name("reminder_for_habit_3").await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, stored.id);
        assert_eq!(loaded[0].args, vec![3]);
        assert_eq!(loaded[0].rule.to_string(), "0 9 */2 * *");
        assert!(loaded[0].enabled);
        assert_eq!(loaded[0].total_run_count, 0);
    }

    #[tokio::test]
    async fn test_delete_by_name_counts_rows() {
        let db = Database::in_memory().unwrap();
        db.insert_reminder(new_reminder(3)).await.unwrap();
        db.insert_reminder(new_reminder(3)).await.unwrap();
        db.insert_reminder(new_reminder(4)).await.unwrap();

        assert_eq!(db.delete_reminders_by_name("reminder_for_habit_3").await.unwrap(), 2);
        assert_eq!(db.delete_reminders_by_name("reminder_for_habit_3").await.unwrap(), 0);
        assert_eq!(db.all_reminders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_record_run_updates_bookkeeping() {
        let db = Database::in_memory().unwrap();
        let stored = db.insert_reminder(new_reminder(3)).await.unwrap();
        let at = Utc::now();

        db.record_reminder_run(stored.id, at).await.unwrap();

        let loaded = &db.all_reminders().await.unwrap()[0];
        assert_eq!(loaded.total_run_count, 1);
        assert_eq!(
            loaded.last_run_at.map(|t| t.timestamp()),
            Some(at.timestamp())
        );
    }

    #[tokio::test]
    async fn test_registry_entries_survive_reopen() {
        let path = std::env::temp_dir().join(format!(
            "habit-reminders-{}.db",
            uuid::Uuid::new_v4().simple()
        ));
        let path_str = path.to_string_lossy().to_string();

        {
            let db = Database::new(&path_str).await.unwrap();
            let user = db.create_user("a@example.com", "A", "A", None).await.unwrap();
            let habit = db
                .insert_habit(
                    user.id,
                    &crate::features::habits::HabitDraft {
                        place: "Home".to_string(),
                        time: NaiveTime::from_hms_opt(8, 15, 0).unwrap(),
                        action: "Stretch".to_string(),
                        is_pleasant: false,
                        related_habit_id: None,
                        periodicity: 1,
                        reward: None,
                        time_for_action: 60,
                        is_public: false,
                    },
                )
                .await
                .unwrap();
            let registry = ReminderRegistry::new(Arc::new(db.clone()), ScheduleMode::Daily);
            registry.create(&habit).await.unwrap();
        }

        let reopened = Database::new(&path_str).await.unwrap();
        let reminders = reopened.all_reminders().await.unwrap();
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].rule.to_string(), "15 8 */1 * *");

        drop(reopened);
        let _ = std::fs::remove_file(&path);
    }
}
