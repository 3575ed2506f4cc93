//! Schedule compiler: habit time + periodicity to a cron-style recurrence rule.
//!
//! The day-of-month step is calendar based. `*/3` fires on the 1st, 4th,
//! 7th ... of every month and restarts on the 1st of the next one, so the
//! gap across a month boundary can be shorter than the periodicity and it is
//! not anchored to the day the habit was created.

use chrono::{Datelike, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One field of a recurrence rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CronField {
    /// `*`
    Any,
    /// A single value, e.g. `9`
    At(u32),
    /// `*/N`, counted from the first value of the field's range
    Every(u32),
}

impl CronField {
    fn matches(&self, value: u32, first: u32) -> bool {
        match *self {
            CronField::Any => true,
            CronField::At(expected) => value == expected,
            CronField::Every(step) => step > 0 && value >= first && (value - first) % step == 0,
        }
    }
}

impl fmt::Display for CronField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CronField::Any => write!(f, "*"),
            CronField::At(value) => write!(f, "{value}"),
            CronField::Every(step) => write!(f, "*/{step}"),
        }
    }
}

impl FromStr for CronField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "*" {
            return Ok(CronField::Any);
        }
        if let Some(step) = s.strip_prefix("*/") {
            return match step.parse::<u32>() {
                Ok(0) | Err(_) => Err(format!("invalid step in cron field '{s}'")),
                Ok(step) => Ok(CronField::Every(step)),
            };
        }
        s.parse::<u32>()
            .map(CronField::At)
            .map_err(|_| format!("invalid cron field '{s}'"))
    }
}

/// Calendar/time pattern describing when a reminder fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub minute: CronField,
    pub hour: CronField,
    pub day_of_month: CronField,
    pub month_of_year: CronField,
    pub day_of_week: CronField,
}

impl RecurrenceRule {
    /// Whether the rule fires during the minute containing `at`
    pub fn matches<T: Datelike + Timelike>(&self, at: &T) -> bool {
        self.minute.matches(at.minute(), 0)
            && self.hour.matches(at.hour(), 0)
            && self.day_of_month.matches(at.day(), 1)
            && self.month_of_year.matches(at.month(), 1)
            && self.day_of_week.matches(at.weekday().num_days_from_sunday(), 0)
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.minute, self.hour, self.day_of_month, self.month_of_year, self.day_of_week
        )
    }
}

impl FromStr for RecurrenceRule {
    type Err = String;

    /// Parse the five-field `"m h dom mon dow"` form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(format!("expected 5 cron fields, got {}", fields.len()));
        }
        Ok(RecurrenceRule {
            minute: fields[0].parse()?,
            hour: fields[1].parse()?,
            day_of_month: fields[2].parse()?,
            month_of_year: fields[3].parse()?,
            day_of_week: fields[4].parse()?,
        })
    }
}

/// Fixed clock time, gated to every `periodicity`-th day of the month
pub fn compile(time: NaiveTime, periodicity: u8) -> RecurrenceRule {
    RecurrenceRule {
        minute: CronField::At(time.minute()),
        hour: CronField::At(time.hour()),
        day_of_month: CronField::Every(u32::from(periodicity)),
        month_of_year: CronField::Any,
        day_of_week: CronField::Any,
    }
}

/// Every `periodicity` minutes, for watching reminders arrive during testing
pub fn compile_accelerated(periodicity: u8) -> RecurrenceRule {
    RecurrenceRule {
        minute: CronField::Every(u32::from(periodicity)),
        hour: CronField::Any,
        day_of_month: CronField::Any,
        month_of_year: CronField::Any,
        day_of_week: CronField::Any,
    }
}

/// Which compiler the registry uses when registering reminders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScheduleMode {
    #[default]
    Daily,
    Accelerated,
}

impl ScheduleMode {
    pub fn compile(&self, time: NaiveTime, periodicity: u8) -> RecurrenceRule {
        match self {
            ScheduleMode::Daily => compile(time, periodicity),
            ScheduleMode::Accelerated => compile_accelerated(periodicity),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleMode::Daily => "daily",
            ScheduleMode::Accelerated => "accelerated",
        }
    }
}

impl FromStr for ScheduleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "production" => Ok(ScheduleMode::Daily),
            "accelerated" | "test" => Ok(ScheduleMode::Accelerated),
            other => Err(format!("unknown schedule mode '{other}'")),
        }
    }
}
