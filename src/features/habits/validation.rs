//! Invariant checks for habit payloads.
//!
//! The checks that need storage (related habit lookup, duplicate action) are
//! resolved by the caller and passed in, so everything here stays pure.

use crate::core::ValidationError;

use super::model::{
    Habit, HabitDraft, MAX_PERIODICITY_DAYS, MAX_TEXT_LEN, MAX_TIME_FOR_ACTION_SECS,
};

/// What the caller found when it looked up the draft's related habit
#[derive(Debug, Clone, Copy)]
pub enum RelatedLookup<'a> {
    /// The draft has no related habit
    None,
    Found(&'a Habit),
    Missing(i64),
}

/// Validate a create/update payload.
///
/// `habit_id` is the id of the habit being updated (None on create);
/// `action_taken` tells whether another habit of the same user already uses
/// the draft's action.
pub fn validate_draft(
    draft: &HabitDraft,
    habit_id: Option<i64>,
    related: RelatedLookup<'_>,
    action_taken: bool,
) -> Result<(), ValidationError> {
    check_text("place", &draft.place)?;
    check_text("action", &draft.action)?;
    if let Some(reward) = &draft.reward {
        if reward.chars().count() > MAX_TEXT_LEN {
            return Err(ValidationError::FieldTooLong {
                field: "reward",
                max: MAX_TEXT_LEN,
            });
        }
    }

    match related {
        RelatedLookup::None => {}
        RelatedLookup::Missing(id) => return Err(ValidationError::RelatedHabitMissing(id)),
        RelatedLookup::Found(related) => {
            if habit_id == Some(related.id) {
                return Err(ValidationError::RelatedHabitIsSelf);
            }
            if !related.is_pleasant {
                return Err(ValidationError::RelatedHabitNotPleasant(related.id));
            }
        }
    }

    let has_reward = draft.reward.as_deref().is_some_and(|r| !r.is_empty());
    let has_related = draft.related_habit_id.is_some();

    if has_reward && has_related {
        return Err(ValidationError::RewardWithRelatedHabit);
    }

    if draft.time_for_action == 0 || draft.time_for_action > MAX_TIME_FOR_ACTION_SECS {
        return Err(ValidationError::TimeForActionOutOfRange {
            actual: draft.time_for_action,
            max: MAX_TIME_FOR_ACTION_SECS,
        });
    }

    if draft.is_pleasant && (has_reward || has_related) {
        return Err(ValidationError::PleasantHabitWithExtras);
    }

    if draft.periodicity == 0 || draft.periodicity > MAX_PERIODICITY_DAYS {
        return Err(ValidationError::PeriodicityOutOfRange {
            actual: draft.periodicity,
            max: MAX_PERIODICITY_DAYS,
        });
    }

    if action_taken {
        return Err(ValidationError::DuplicateAction(draft.action.clone()));
    }

    Ok(())
}

fn check_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::FieldTooLong {
            field,
            max: MAX_TEXT_LEN,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn draft() -> HabitDraft {
        HabitDraft {
            place: "Work".to_string(),
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            action: "Clean spam".to_string(),
            is_pleasant: false,
            related_habit_id: None,
            periodicity: 1,
            reward: None,
            time_for_action: 60,
            is_public: true,
        }
    }

    fn pleasant(id: i64) -> Habit {
        Habit {
            id,
            user_id: 1,
            place: "Work".to_string(),
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            action: "Morning coffee".to_string(),
            is_pleasant: true,
            related_habit_id: None,
            periodicity: 1,
            reward: None,
            time_for_action: 120,
            is_public: false,
        }
    }

    #[test]
    fn test_valid_draft_passes() {
        assert_eq!(validate_draft(&draft(), None, RelatedLookup::None, false), Ok(()));

        let related = pleasant(7);
        let mut with_related = draft();
        with_related.related_habit_id = Some(7);
        assert_eq!(
            validate_draft(&with_related, None, RelatedLookup::Found(&related), false),
            Ok(())
        );
    }

    #[test]
    fn test_reward_and_related_habit_conflict() {
        let related = pleasant(7);
        let mut d = draft();
        d.reward = Some("Candy".to_string());
        d.related_habit_id = Some(7);

        assert_eq!(
            validate_draft(&d, None, RelatedLookup::Found(&related), false),
            Err(ValidationError::RewardWithRelatedHabit)
        );
    }

    #[test]
    fn test_time_for_action_bounds() {
        let mut d = draft();
        d.time_for_action = 121;
        assert!(matches!(
            validate_draft(&d, None, RelatedLookup::None, false),
            Err(ValidationError::TimeForActionOutOfRange { actual: 121, .. })
        ));

        d.time_for_action = 0;
        assert!(validate_draft(&d, None, RelatedLookup::None, false).is_err());

        d.time_for_action = 120;
        assert!(validate_draft(&d, None, RelatedLookup::None, false).is_ok());
    }

    #[test]
    fn test_pleasant_habit_cannot_have_extras() {
        let mut d = draft();
        d.is_pleasant = true;
        d.reward = Some("Candy".to_string());
        assert_eq!(
            validate_draft(&d, None, RelatedLookup::None, false),
            Err(ValidationError::PleasantHabitWithExtras)
        );

        let related = pleasant(7);
        let mut d = draft();
        d.is_pleasant = true;
        d.related_habit_id = Some(7);
        assert_eq!(
            validate_draft(&d, None, RelatedLookup::Found(&related), false),
            Err(ValidationError::PleasantHabitWithExtras)
        );
    }

    #[test]
    fn test_periodicity_bounds() {
        let mut d = draft();
        d.periodicity = 8;
        assert!(matches!(
            validate_draft(&d, None, RelatedLookup::None, false),
            Err(ValidationError::PeriodicityOutOfRange { actual: 8, .. })
        ));

        d.periodicity = 0;
        assert!(validate_draft(&d, None, RelatedLookup::None, false).is_err());

        d.periodicity = 7;
        assert!(validate_draft(&d, None, RelatedLookup::None, false).is_ok());
    }

    #[test]
    fn test_related_habit_must_be_pleasant() {
        let mut not_pleasant = pleasant(4);
        not_pleasant.is_pleasant = false;
        let mut d = draft();
        d.related_habit_id = Some(4);

        assert_eq!(
            validate_draft(&d, None, RelatedLookup::Found(&not_pleasant), false),
            Err(ValidationError::RelatedHabitNotPleasant(4))
        );
        assert_eq!(
            validate_draft(&d, None, RelatedLookup::Missing(4), false),
            Err(ValidationError::RelatedHabitMissing(4))
        );
    }

    #[test]
    fn test_related_habit_cannot_be_self() {
        let itself = pleasant(5);
        let mut d = draft();
        d.related_habit_id = Some(5);

        assert_eq!(
            validate_draft(&d, Some(5), RelatedLookup::Found(&itself), false),
            Err(ValidationError::RelatedHabitIsSelf)
        );
    }

    #[test]
    fn test_duplicate_action_rejected() {
        assert_eq!(
            validate_draft(&draft(), None, RelatedLookup::None, true),
            Err(ValidationError::DuplicateAction("Clean spam".to_string()))
        );
    }

    #[test]
    fn test_text_fields_checked() {
        let mut d = draft();
        d.place = "   ".to_string();
        assert_eq!(
            validate_draft(&d, None, RelatedLookup::None, false),
            Err(ValidationError::EmptyField { field: "place" })
        );

        let mut d = draft();
        d.action = "x".repeat(201);
        assert!(matches!(
            validate_draft(&d, None, RelatedLookup::None, false),
            Err(ValidationError::FieldTooLong { field: "action", .. })
        ));
    }
}
