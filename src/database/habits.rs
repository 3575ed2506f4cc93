//! Habit table queries.

use anyhow::{Context, Result};
use chrono::NaiveTime;
use sqlite::{State, Statement};

use super::{flag, last_insert_id, Database};
use crate::features::habits::{Habit, HabitDraft};

const HABIT_COLUMNS: &str = "id, user_id, place, time, action, is_pleasant, related_habit_id, \
     periodicity, reward, time_for_action, is_public";

const TIME_FORMAT: &str = "%H:%M:%S";

fn read_habit(statement: &Statement<'_>) -> Result<Habit> {
    let raw_time = statement.read::<String, _>("time")?;
    let time = NaiveTime::parse_from_str(&raw_time, TIME_FORMAT)
        .with_context(|| format!("Invalid stored habit time '{raw_time}'"))?;

    Ok(Habit {
        id: statement.read::<i64, _>("id")?,
        user_id: statement.read::<i64, _>("user_id")?,
        place: statement.read::<String, _>("place")?,
        time,
        action: statement.read::<String, _>("action")?,
        is_pleasant: statement.read::<i64, _>("is_pleasant")? != 0,
        related_habit_id: statement.read::<Option<i64>, _>("related_habit_id")?,
        periodicity: u8::try_from(statement.read::<i64, _>("periodicity")?)
            .context("Stored periodicity out of range")?,
        reward: statement.read::<Option<String>, _>("reward")?,
        time_for_action: u32::try_from(statement.read::<i64, _>("time_for_action")?)
            .context("Stored time_for_action out of range")?,
        is_public: statement.read::<i64, _>("is_public")? != 0,
    })
}

fn collect_habits(statement: &mut Statement<'_>) -> Result<Vec<Habit>> {
    let mut habits = Vec::new();
    while let State::Row = statement.next()? {
        habits.push(read_habit(statement)?);
    }
    Ok(habits)
}

/// Bind the draft's fields to parameters 1..=9, in column order
fn bind_draft(statement: &mut Statement<'_>, draft: &HabitDraft) -> Result<()> {
    let time = draft.time.format(TIME_FORMAT).to_string();
    statement.bind((1, draft.place.as_str()))?;
    statement.bind((2, time.as_str()))?;
    statement.bind((3, draft.action.as_str()))?;
    statement.bind((4, flag(draft.is_pleasant)))?;
    statement.bind((5, draft.related_habit_id))?;
    statement.bind((6, i64::from(draft.periodicity)))?;
    statement.bind((7, draft.reward.as_deref()))?;
    statement.bind((8, i64::from(draft.time_for_action)))?;
    statement.bind((9, flag(draft.is_public)))?;
    Ok(())
}

impl Database {
    pub async fn insert_habit(&self, user_id: i64, draft: &HabitDraft) -> Result<Habit> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(
            "INSERT INTO habits (place, time, action, is_pleasant, related_habit_id, periodicity, \
             reward, time_for_action, is_public, user_id) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )?;
        bind_draft(&mut statement, draft)?;
        statement.bind((10, user_id))?;
        statement.next()?;
        drop(statement);

        let id = last_insert_id(&conn)?;
        Ok(Habit {
            id,
            user_id,
            place: draft.place.clone(),
            time: draft.time,
            action: draft.action.clone(),
            is_pleasant: draft.is_pleasant,
            related_habit_id: draft.related_habit_id,
            periodicity: draft.periodicity,
            reward: draft.reward.clone(),
            time_for_action: draft.time_for_action,
            is_public: draft.is_public,
        })
    }

    /// Overwrite every writable field. Returns the stored habit, or None if
    /// the id does not exist.
    pub async fn update_habit(&self, habit_id: i64, draft: &HabitDraft) -> Result<Option<Habit>> {
        {
            let conn = self.connection.lock().await;
            let mut statement = conn.prepare(
                "UPDATE habits SET place = ?, time = ?, action = ?, is_pleasant = ?, \
                 related_habit_id = ?, periodicity = ?, reward = ?, time_for_action = ?, \
                 is_public = ? WHERE id = ?",
            )?;
            bind_draft(&mut statement, draft)?;
            statement.bind((10, habit_id))?;
            statement.next()?;
        }
        self.get_habit(habit_id).await
    }

    /// Delete a habit. Habits that referenced it lose their related habit.
    pub async fn delete_habit(&self, habit_id: i64) -> Result<bool> {
        let conn = self.connection.lock().await;

        let mut exists = conn.prepare("SELECT 1 FROM habits WHERE id = ?")?;
        exists.bind((1, habit_id))?;
        if let State::Done = exists.next()? {
            return Ok(false);
        }
        drop(exists);

        let mut unlink = conn.prepare("UPDATE habits SET related_habit_id = NULL WHERE related_habit_id = ?")?;
        unlink.bind((1, habit_id))?;
        unlink.next()?;
        drop(unlink);

        let mut statement = conn.prepare("DELETE FROM habits WHERE id = ?")?;
        statement.bind((1, habit_id))?;
        statement.next()?;
        Ok(true)
    }

    pub async fn get_habit(&self, habit_id: i64) -> Result<Option<Habit>> {
        let conn = self.connection.lock().await;
        let mut statement =
            conn.prepare(format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?"))?;
        statement.bind((1, habit_id))?;
        if let State::Row = statement.next()? {
            return Ok(Some(read_habit(&statement)?));
        }
        Ok(None)
    }

    pub async fn get_user_habits(&self, user_id: i64) -> Result<Vec<Habit>> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(format!(
            "SELECT {HABIT_COLUMNS} FROM habits WHERE user_id = ? ORDER BY id"
        ))?;
        statement.bind((1, user_id))?;
        collect_habits(&mut statement)
    }

    pub async fn get_public_habits(&self) -> Result<Vec<Habit>> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(format!(
            "SELECT {HABIT_COLUMNS} FROM habits WHERE is_public = 1 ORDER BY id"
        ))?;
        collect_habits(&mut statement)
    }

    pub async fn get_all_habits(&self) -> Result<Vec<Habit>> {
        let conn = self.connection.lock().await;
        let mut statement =
            conn.prepare(format!("SELECT {HABIT_COLUMNS} FROM habits ORDER BY id"))?;
        collect_habits(&mut statement)
    }

    /// Whether the user has a habit with this action, other than `exclude_id`
    pub async fn habit_action_exists(
        &self,
        user_id: i64,
        action: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(
            "SELECT 1 FROM habits WHERE user_id = ? AND action = ? AND id != ? LIMIT 1",
        )?;
        statement.bind((1, user_id))?;
        statement.bind((2, action))?;
        statement.bind((3, exclude_id.unwrap_or(-1)))?;
        Ok(matches!(statement.next()?, State::Row))
    }

    /// Whether any other habit uses this one as its related habit
    pub async fn habit_is_referenced(&self, habit_id: i64) -> Result<bool> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(
            "SELECT 1 FROM habits WHERE related_habit_id = ? AND id != ? LIMIT 1",
        )?;
        statement.bind((1, habit_id))?;
        statement.bind((2, habit_id))?;
        Ok(matches!(statement.next()?, State::Row))
    }
}
