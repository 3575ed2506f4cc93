//! Habit CRUD with validation and reminder synchronisation.
//!
//! Every successful mutation runs the matching lifecycle hook before
//! returning, so the reminder registry always reflects the latest committed
//! habit. Mutations of one habit are serialised through a per-habit lock.

use dashmap::DashMap;
use log::{error, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::model::{Habit, HabitDraft, HabitPatch};
use super::validation::{validate_draft, RelatedLookup};
use crate::core::{HabitError, ValidationError};
use crate::database::Database;
use crate::features::reminders::{reminder_name, HabitLifecycleHooks, SEND_REMINDER_TASK};

/// Outcome of [`HabitService::resync_reminders`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResyncReport {
    /// Habits whose reminder was (re)registered
    pub reregistered: usize,
    /// Reminder names removed because their habit no longer exists
    pub orphans_removed: usize,
}

#[derive(Clone)]
pub struct HabitService {
    database: Database,
    hooks: HabitLifecycleHooks,
    locks: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

impl HabitService {
    pub fn new(database: Database, hooks: HabitLifecycleHooks) -> Self {
        Self {
            database,
            hooks,
            locks: Arc::new(DashMap::new()),
        }
    }

    fn lock_for(&self, habit_id: i64) -> Arc<Mutex<()>> {
        self.locks.entry(habit_id).or_default().clone()
    }

    /// The habit, if it exists and belongs to `user_id`
    async fn owned(&self, user_id: i64, habit_id: i64) -> Result<Habit, HabitError> {
        match self.database.get_habit(habit_id).await? {
            Some(habit) if habit.user_id == user_id => Ok(habit),
            _ => Err(HabitError::NotFound(habit_id)),
        }
    }

    async fn check(
        &self,
        user_id: i64,
        draft: &HabitDraft,
        habit_id: Option<i64>,
    ) -> Result<(), HabitError> {
        let related = match draft.related_habit_id {
            Some(related_id) => self.database.get_habit(related_id).await?,
            None => None,
        };
        let lookup = match (draft.related_habit_id, related.as_ref()) {
            (None, _) => RelatedLookup::None,
            (Some(_), Some(found)) => RelatedLookup::Found(found),
            (Some(id), None) => RelatedLookup::Missing(id),
        };
        let action_taken = self
            .database
            .habit_action_exists(user_id, &draft.action, habit_id)
            .await?;

        validate_draft(draft, habit_id, lookup, action_taken)?;

        if let Some(habit_id) = habit_id {
            if !draft.is_pleasant && self.database.habit_is_referenced(habit_id).await? {
                return Err(ValidationError::StillReferenced(habit_id).into());
            }
        }
        Ok(())
    }

    /// Turn a failed habit write into a duplicate-action rejection when the
    /// unique `(user_id, action)` index is what refused it
    async fn write_error(
        &self,
        user_id: i64,
        draft: &HabitDraft,
        habit_id: Option<i64>,
        e: anyhow::Error,
    ) -> HabitError {
        match self
            .database
            .habit_action_exists(user_id, &draft.action, habit_id)
            .await
        {
            Ok(true) => ValidationError::DuplicateAction(draft.action.clone()).into(),
            _ => HabitError::Storage(e),
        }
    }

    /// Put a reminder back after a failed replacement left the habit with none
    async fn restore_reminder(&self, habit: &Habit) {
        let registry = self.hooks.registry();
        match registry.reminders_for(habit.id).await {
            Ok(existing) if existing.is_empty() => match registry.create(habit).await {
                Ok(_) => warn!("Re-registered reminder for habit {} after failed update", habit.id),
                Err(e) => error!(
                    "Habit {} has no reminder until the next resync: {e:#}",
                    habit.id
                ),
            },
            Ok(_) => {}
            Err(e) => error!(
                "Could not check reminders of habit {}, the next resync will repair them: {e:#}",
                habit.id
            ),
        }
    }

    pub async fn create(&self, user_id: i64, draft: HabitDraft) -> Result<Habit, HabitError> {
        let draft = normalize(draft);
        self.check(user_id, &draft, None).await?;

        let habit = match self.database.insert_habit(user_id, &draft).await {
            Ok(habit) => habit,
            Err(e) => return Err(self.write_error(user_id, &draft, None, e).await),
        };

        if let Err(e) = self.hooks.on_created(&habit).await {
            error!("Failed to register reminder for habit {}: {e:#}", habit.id);
            if let Err(cleanup) = self.database.delete_habit(habit.id).await {
                error!("Failed to roll back habit {}: {cleanup:#}", habit.id);
            }
            return Err(HabitError::Storage(e));
        }

        info!("✅ Created habit {} for user {user_id}", habit.id);
        Ok(habit)
    }

    /// Replace every writable field of the habit
    pub async fn update(
        &self,
        user_id: i64,
        habit_id: i64,
        draft: HabitDraft,
    ) -> Result<Habit, HabitError> {
        let lock = self.lock_for(habit_id);
        let _guard = lock.lock().await;

        self.owned(user_id, habit_id).await?;
        self.save(user_id, habit_id, draft).await
    }

    /// Change only the fields present in `patch`. The merged habit is
    /// validated as a whole.
    pub async fn partial_update(
        &self,
        user_id: i64,
        habit_id: i64,
        patch: HabitPatch,
    ) -> Result<Habit, HabitError> {
        let lock = self.lock_for(habit_id);
        let _guard = lock.lock().await;

        let existing = self.owned(user_id, habit_id).await?;
        let draft = patch.apply_to(existing.to_draft());
        self.save(user_id, habit_id, draft).await
    }

    async fn save(
        &self,
        user_id: i64,
        habit_id: i64,
        draft: HabitDraft,
    ) -> Result<Habit, HabitError> {
        let draft = normalize(draft);
        self.check(user_id, &draft, Some(habit_id)).await?;

        let updated = match self.database.update_habit(habit_id, &draft).await {
            Ok(Some(updated)) => updated,
            Ok(None) => return Err(HabitError::NotFound(habit_id)),
            Err(e) => return Err(self.write_error(user_id, &draft, Some(habit_id), e).await),
        };

        if let Err(e) = self.hooks.on_updated(&updated).await {
            error!("Failed to replace reminder for habit {habit_id}: {e:#}");
            self.restore_reminder(&updated).await;
            return Err(HabitError::Storage(e));
        }
        info!("✏️ Updated habit {habit_id}");
        Ok(updated)
    }

    pub async fn delete(&self, user_id: i64, habit_id: i64) -> Result<(), HabitError> {
        let lock = self.lock_for(habit_id);
        let _guard = lock.lock().await;

        self.owned(user_id, habit_id).await?;
        self.hooks.on_deleted(habit_id).await?;
        self.database.delete_habit(habit_id).await?;
        self.locks.remove(&habit_id);

        info!("🗑️ Deleted habit {habit_id}");
        Ok(())
    }

    pub async fn get(&self, user_id: i64, habit_id: i64) -> Result<Habit, HabitError> {
        self.owned(user_id, habit_id).await
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Habit>, HabitError> {
        Ok(self.database.get_user_habits(user_id).await?)
    }

    pub async fn list_public(&self) -> Result<Vec<Habit>, HabitError> {
        Ok(self.database.get_public_habits().await?)
    }

    /// Bring the registry back to exactly one up-to-date reminder per habit.
    ///
    /// Meant for startup, before habit mutations are served: removes
    /// reminders of habits that no longer exist and re-registers habits with
    /// no reminder, several reminders, or a rule that no longer matches the
    /// configured schedule mode.
    pub async fn resync_reminders(&self) -> Result<ResyncReport, HabitError> {
        let registry = self.hooks.registry();
        let habits = self.database.get_all_habits().await?;
        let reminders = registry.all().await?;

        let mut by_name: HashMap<&str, Vec<_>> = HashMap::new();
        for reminder in &reminders {
            by_name.entry(reminder.name.as_str()).or_default().push(reminder);
        }

        let mut report = ResyncReport::default();

        let live: HashSet<i64> = habits.iter().map(|h| h.id).collect();
        let mut orphaned: Vec<i64> = reminders
            .iter()
            .filter(|r| r.task == SEND_REMINDER_TASK)
            .filter_map(|r| r.habit_id())
            .filter(|id| !live.contains(id))
            .collect();
        orphaned.sort_unstable();
        orphaned.dedup();
        for habit_id in orphaned {
            warn!("Removing reminder for deleted habit {habit_id}");
            registry.delete(habit_id).await?;
            report.orphans_removed += 1;
        }

        for habit in &habits {
            let name = reminder_name(habit.id);
            let expected = registry.mode().compile(habit.time, habit.periodicity);
            let in_sync = match by_name.get(name.as_str()) {
                Some(entries) => entries.len() == 1 && entries[0].rule == expected,
                None => false,
            };
            if !in_sync {
                registry.update(habit).await?;
                report.reregistered += 1;
            }
        }

        if report != ResyncReport::default() {
            info!(
                "🔄 Reminder resync: {} re-registered, {} orphan(s) removed",
                report.reregistered, report.orphans_removed
            );
        }
        Ok(report)
    }
}

/// Treat a blank reward as no reward
fn normalize(mut draft: HabitDraft) -> HabitDraft {
    if draft.reward.as_deref().is_some_and(|r| r.trim().is_empty()) {
        draft.reward = None;
    }
    draft
}
