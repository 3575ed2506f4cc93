//! Habit records and the payloads used to create and change them.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

pub const MAX_TEXT_LEN: usize = 200;
pub const MAX_PERIODICITY_DAYS: u8 = 7;
pub const MAX_TIME_FOR_ACTION_SECS: u32 = 120;

/// A stored habit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: i64,
    pub user_id: i64,
    pub place: String,
    pub time: NaiveTime,
    pub action: String,
    pub is_pleasant: bool,
    pub related_habit_id: Option<i64>,
    /// Days between reminders, 1..=7
    pub periodicity: u8,
    pub reward: Option<String>,
    /// Seconds needed to perform the action, 1..=120
    pub time_for_action: u32,
    pub is_public: bool,
}

impl Habit {
    /// The writable fields of this habit, as a draft
    pub fn to_draft(&self) -> HabitDraft {
        HabitDraft {
            place: self.place.clone(),
            time: self.time,
            action: self.action.clone(),
            is_pleasant: self.is_pleasant,
            related_habit_id: self.related_habit_id,
            periodicity: self.periodicity,
            reward: self.reward.clone(),
            time_for_action: self.time_for_action,
            is_public: self.is_public,
        }
    }
}

/// Full set of writable habit fields, used for create and full update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitDraft {
    pub place: String,
    pub time: NaiveTime,
    pub action: String,
    pub is_pleasant: bool,
    #[serde(default)]
    pub related_habit_id: Option<i64>,
    #[serde(default = "default_periodicity")]
    pub periodicity: u8,
    #[serde(default)]
    pub reward: Option<String>,
    pub time_for_action: u32,
    #[serde(default)]
    pub is_public: bool,
}

fn default_periodicity() -> u8 {
    1
}

/// Partial update. `None` leaves a field untouched; the nested options on
/// `related_habit_id` and `reward` allow clearing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HabitPatch {
    pub place: Option<String>,
    pub time: Option<NaiveTime>,
    pub action: Option<String>,
    pub is_pleasant: Option<bool>,
    pub related_habit_id: Option<Option<i64>>,
    pub periodicity: Option<u8>,
    pub reward: Option<Option<String>>,
    pub time_for_action: Option<u32>,
    pub is_public: Option<bool>,
}

impl HabitPatch {
    /// Apply the patch on top of an existing draft
    pub fn apply_to(self, mut draft: HabitDraft) -> HabitDraft {
        if let Some(place) = self.place {
            draft.place = place;
        }
        if let Some(time) = self.time {
            draft.time = time;
        }
        if let Some(action) = self.action {
            draft.action = action;
        }
        if let Some(is_pleasant) = self.is_pleasant {
            draft.is_pleasant = is_pleasant;
        }
        if let Some(related) = self.related_habit_id {
            draft.related_habit_id = related;
        }
        if let Some(periodicity) = self.periodicity {
            draft.periodicity = periodicity;
        }
        if let Some(reward) = self.reward {
            draft.reward = reward;
        }
        if let Some(time_for_action) = self.time_for_action {
            draft.time_for_action = time_for_action;
        }
        if let Some(is_public) = self.is_public {
            draft.is_public = is_public;
        }
        draft
    }
}
