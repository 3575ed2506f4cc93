//! Keyed storage for scheduled reminders.
//!
//! Entries are addressed by their deterministic name; names are not unique
//! at this level, the registry decides how many entries a name should have.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

use super::schedule::RecurrenceRule;

/// A durable recurring-task registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledReminder {
    pub id: i64,
    pub name: String,
    /// Callback the runner invokes when the rule matches
    pub task: String,
    /// Callback arguments; the habit id for reminder tasks
    pub args: Vec<i64>,
    pub rule: RecurrenceRule,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub total_run_count: i64,
}

impl ScheduledReminder {
    pub fn habit_id(&self) -> Option<i64> {
        match self.args.as_slice() {
            [habit_id] => Some(*habit_id),
            _ => None,
        }
    }
}

/// Fields supplied when registering a reminder
#[derive(Debug, Clone)]
pub struct NewReminder {
    pub name: String,
    pub task: String,
    pub args: Vec<i64>,
    pub rule: RecurrenceRule,
}

#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn insert_reminder(&self, reminder: NewReminder) -> Result<ScheduledReminder>;

    /// Remove every entry with this name, returning how many were removed
    async fn delete_reminders_by_name(&self, name: &str) -> Result<usize>;

    async fn reminders_by_name(&self, name: &str) -> Result<Vec<ScheduledReminder>>;

    async fn all_reminders(&self) -> Result<Vec<ScheduledReminder>>;

    async fn record_reminder_run(&self, id: i64, at: DateTime<Utc>) -> Result<()>;
}

/// Process-local store, for tests and runs that do not need durability
#[derive(Default)]
pub struct MemoryReminderStore {
    entries: DashMap<i64, ScheduledReminder>,
    next_id: AtomicI64,
}

impl MemoryReminderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ReminderStore for MemoryReminderStore {
    async fn insert_reminder(&self, reminder: NewReminder) -> Result<ScheduledReminder> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let stored = ScheduledReminder {
            id,
            name: reminder.name,
            task: reminder.task,
            args: reminder.args,
            rule: reminder.rule,
            enabled: true,
            created_at: Utc::now(),
            last_run_at: None,
            total_run_count: 0,
        };
        self.entries.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete_reminders_by_name(&self, name: &str) -> Result<usize> {
        let before = self.entries.len();
        self.entries.retain(|_, reminder| reminder.name != name);
        Ok(before - self.entries.len())
    }

    async fn reminders_by_name(&self, name: &str) -> Result<Vec<ScheduledReminder>> {
        let mut found: Vec<ScheduledReminder> = self
            .entries
            .iter()
            .filter(|entry| entry.name == name)
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by_key(|r| r.id);
        Ok(found)
    }

    async fn all_reminders(&self) -> Result<Vec<ScheduledReminder>> {
        let mut all: Vec<ScheduledReminder> =
            self.entries.iter().map(|entry| entry.value().clone()).collect();
        all.sort_by_key(|r| r.id);
        Ok(all)
    }

    async fn record_reminder_run(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        if let Some(mut entry) = self.entries.get_mut(&id) {
            entry.last_run_at = Some(at);
            entry.total_run_count += 1;
        }
        Ok(())
    }
}
