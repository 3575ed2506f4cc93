//! Domain error types shared by the habit, reminder and account features.

use thiserror::Error;

/// A habit payload that breaks one of the habit invariants.
///
/// Raised before anything is written, so a rejected request never touches
/// the reminder registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("a habit cannot have both a related habit and a reward")]
    RewardWithRelatedHabit,

    #[error("time for action must be between 1 and {max} seconds, got {actual}")]
    TimeForActionOutOfRange { actual: u32, max: u32 },

    #[error("a pleasant habit cannot have a reward or a related habit")]
    PleasantHabitWithExtras,

    #[error("periodicity must be between 1 and {max} days, got {actual}")]
    PeriodicityOutOfRange { actual: u8, max: u8 },

    #[error("related habit {0} does not exist")]
    RelatedHabitMissing(i64),

    #[error("only pleasant habits can be used as a related habit (habit {0} is not pleasant)")]
    RelatedHabitNotPleasant(i64),

    #[error("a habit cannot be related to itself")]
    RelatedHabitIsSelf,

    #[error("habit {0} is the related habit of another habit and must stay pleasant")]
    StillReferenced(i64),

    #[error("you already have a habit with the action '{0}'")]
    DuplicateAction(String),

    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("{field} must be at most {max} characters")]
    FieldTooLong { field: &'static str, max: usize },
}

#[derive(Debug, Error)]
pub enum HabitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("habit {0} not found")]
    NotFound(i64),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("habit {0} not found")]
    HabitNotFound(i64),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("no user has this connection code")]
    UnknownCode,

    #[error("a user with email {0} already exists")]
    EmailTaken(String),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}
