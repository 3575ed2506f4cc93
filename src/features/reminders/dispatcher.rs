//! Notification dispatcher: renders a habit's reminder and hands it to the
//! messaging channel. Holds no state of its own; the habit is read at fire
//! time so edits made after registration are reflected.

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::sync::Arc;

use crate::core::DispatchError;
use crate::database::Database;
use crate::features::habits::Habit;

/// One-shot, best-effort delivery to an external chat identity
#[async_trait]
pub trait MessageChannel: Send + Sync {
    async fn send(&self, recipient_id: i64, text: &str) -> Result<()>;
}

/// What happened to a reminder that was fired
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent { recipient_id: i64 },
    /// The owner has no connected Telegram account
    NoRecipient,
    /// The channel rejected the message; it is not retried
    Failed { recipient_id: i64, reason: String },
}

/// Render the reminder text. The related-habit line and the reward line are
/// mutually exclusive because the habit invariants forbid having both.
pub fn render_message(habit: &Habit, related: Option<&Habit>) -> String {
    let mut message = format!(
        "⏰ Time to perform the habit: {}\n📍 {}\n",
        habit.action, habit.place
    );

    if let Some(related) = related {
        message.push_str(&format!(
            "After this you will be able to {} 🙂\n",
            related.action
        ));
    }

    if let Some(reward) = habit.reward.as_deref().filter(|r| !r.is_empty()) {
        message.push_str(&format!(" 🎁 Your reward: {reward}"));
    }

    message.trim_end_matches('\n').to_string()
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    database: Database,
    channel: Arc<dyn MessageChannel>,
}

impl NotificationDispatcher {
    pub fn new(database: Database, channel: Arc<dyn MessageChannel>) -> Self {
        Self { database, channel }
    }

    /// Deliver the reminder for `habit_id`.
    ///
    /// A missing habit is reported as [`DispatchError::HabitNotFound`];
    /// channel failures are logged and returned as [`Delivery::Failed`].
    pub async fn fire(&self, habit_id: i64) -> Result<Delivery, DispatchError> {
        let Some(habit) = self.database.get_habit(habit_id).await? else {
            warn!("Reminder fired for missing habit {habit_id}");
            return Err(DispatchError::HabitNotFound(habit_id));
        };

        let related = match habit.related_habit_id {
            Some(related_id) => self.database.get_habit(related_id).await?,
            None => None,
        };

        let recipient = match self.database.recipient_for(habit.user_id).await? {
            Some(recipient) if recipient.connected => recipient,
            _ => {
                warn!(
                    "User {} has no connected Telegram account, skipping reminder for habit {habit_id}",
                    habit.user_id
                );
                return Ok(Delivery::NoRecipient);
            }
        };

        let message = render_message(&habit, related.as_ref());
        debug!("Sending reminder for habit {habit_id} to {}", recipient.tg_id);

        match self.channel.send(recipient.tg_id, &message).await {
            Ok(()) => {
                info!("📨 Reminder for habit {habit_id} sent to {}", recipient.tg_id);
                Ok(Delivery::Sent {
                    recipient_id: recipient.tg_id,
                })
            }
            Err(e) => {
                error!(
                    "Failed to deliver reminder for habit {habit_id} to {}: {e:#}",
                    recipient.tg_id
                );
                Ok(Delivery::Failed {
                    recipient_id: recipient.tg_id,
                    reason: format!("{e:#}"),
                })
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::features::habits::HabitDraft;
    use chrono::NaiveTime;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Mutex;

    /// Channel that records every message instead of sending it
    #[derive(Default)]
    pub(crate) struct RecordingChannel {
        pub sent: Mutex<Vec<(i64, String)>>,
        pub fail: AtomicBool,
    }

    #[async_trait]
    impl MessageChannel for RecordingChannel {
        async fn send(&self, recipient_id: i64, text: &str) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("chat not found");
            }
            self.sent.lock().await.push((recipient_id, text.to_string()));
            Ok(())
        }
    }

    fn habit(action: &str, place: &str, reward: Option<&str>) -> Habit {
        Habit {
            id: 1,
            user_id: 1,
            place: place.to_string(),
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            action: action.to_string(),
            is_pleasant: false,
            related_habit_id: None,
            periodicity: 1,
            reward: reward.map(str::to_string),
            time_for_action: 60,
            is_public: false,
        }
    }

    fn draft(action: &str, reward: Option<&str>) -> HabitDraft {
        HabitDraft {
            place: "Work".to_string(),
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            action: action.to_string(),
            is_pleasant: false,
            related_habit_id: None,
            periodicity: 1,
            reward: reward.map(str::to_string),
            time_for_action: 60,
            is_public: false,
        }
    }

    #[test]
    fn test_render_with_reward() {
        let message = render_message(&habit("Morning coffee", "Work", Some("Candy")), None);
        assert_eq!(
            message,
            "⏰ Time to perform the habit: Morning coffee\n📍 Work\n 🎁 Your reward: Candy"
        );
    }

    #[test]
    fn test_render_with_related_habit() {
        let related = habit("Eat a cookie", "Kitchen", None);
        let message = render_message(&habit("Check mail", "Work", None), Some(&related));
        assert_eq!(
            message,
            "⏰ Time to perform the habit: Check mail\n📍 Work\nAfter this you will be able to Eat a cookie 🙂"
        );
    }

    #[test]
    fn test_render_plain() {
        let message = render_message(&habit("Walk", "Park", None), None);
        assert_eq!(message, "⏰ Time to perform the habit: Walk\n📍 Park");
    }

    async fn setup(connected: bool) -> (Database, Arc<RecordingChannel>, NotificationDispatcher, i64) {
        let db = Database::in_memory().unwrap();
        let user = db
            .create_user("ivan@example.com", "Ivan", "Ivanov", Some("code"))
            .await
            .unwrap();
        if connected {
            db.link_telegram_account(user.id, 1234567890).await.unwrap();
        }
        let channel = Arc::new(RecordingChannel::default());
        let dispatcher = NotificationDispatcher::new(db.clone(), channel.clone());
        (db, channel, dispatcher, user.id)
    }

    #[tokio::test]
    async fn test_fire_sends_rendered_message() {
        let (db, channel, dispatcher, user_id) = setup(true).await;
        let habit = db.insert_habit(user_id, &draft("Morning coffee", Some("Candy"))).await.unwrap();

        let delivery = dispatcher.fire(habit.id).await.unwrap();

        assert_eq!(delivery, Delivery::Sent { recipient_id: 1234567890 });
        let sent = channel.sent.lock().await;
        assert_eq!(
            sent.as_slice(),
            &[(
                1234567890_i64,
                "⏰ Time to perform the habit: Morning coffee\n📍 Work\n 🎁 Your reward: Candy"
                    .to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_fire_includes_related_habit_action() {
        let (db, channel, dispatcher, user_id) = setup(true).await;
        let mut pleasant = draft("Eat a cookie", None);
        pleasant.is_pleasant = true;
        let pleasant = db.insert_habit(user_id, &pleasant).await.unwrap();
        let mut linked = draft("Check mail", None);
        linked.related_habit_id = Some(pleasant.id);
        let linked = db.insert_habit(user_id, &linked).await.unwrap();

        dispatcher.fire(linked.id).await.unwrap();

        let sent = channel.sent.lock().await;
        assert!(sent[0].1.contains("After this you will be able to Eat a cookie 🙂"));
        assert!(!sent[0].1.contains("reward"));
    }

    #[tokio::test]
    async fn test_fire_missing_habit_is_not_found() {
        let (_db, channel, dispatcher, _) = setup(true).await;

        let result = dispatcher.fire(404).await;

        assert!(matches!(result, Err(DispatchError::HabitNotFound(404))));
        assert!(channel.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_fire_without_connected_account() {
        let (db, channel, dispatcher, user_id) = setup(false).await;
        let habit = db.insert_habit(user_id, &draft("Walk", None)).await.unwrap();

        assert_eq!(dispatcher.fire(habit.id).await.unwrap(), Delivery::NoRecipient);
        assert!(channel.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_channel_failure_is_swallowed() {
        let (db, channel, dispatcher, user_id) = setup(true).await;
        channel.fail.store(true, Ordering::SeqCst);
        let habit = db.insert_habit(user_id, &draft("Walk", None)).await.unwrap();

        let delivery = dispatcher.fire(habit.id).await.unwrap();

        assert!(matches!(
            delivery,
            Delivery::Failed { recipient_id: 1234567890, .. }
        ));
    }
}
