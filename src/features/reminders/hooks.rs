//! Habit lifecycle hooks: keep the reminder registry in step with habit
//! create/update/delete.

use anyhow::Result;
use log::debug;

use super::registry::ReminderRegistry;
use super::store::ScheduledReminder;
use crate::features::habits::Habit;

#[derive(Clone)]
pub struct HabitLifecycleHooks {
    registry: ReminderRegistry,
}

impl HabitLifecycleHooks {
    pub fn new(registry: ReminderRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ReminderRegistry {
        &self.registry
    }

    /// Call once, after the habit has been persisted
    pub async fn on_created(&self, habit: &Habit) -> Result<ScheduledReminder> {
        debug!("Habit {} created, registering reminder", habit.id);
        self.registry.create(habit).await
    }

    /// Call with the committed post-update habit; never after a rejected update
    pub async fn on_updated(&self, habit: &Habit) -> Result<ScheduledReminder> {
        debug!("Habit {} updated, replacing reminder", habit.id);
        self.registry.update(habit).await
    }

    /// Call before the habit row is deleted
    pub async fn on_deleted(&self, habit_id: i64) -> Result<usize> {
        debug!("Habit {habit_id} deleted, removing reminder");
        self.registry.delete(habit_id).await
    }
}
