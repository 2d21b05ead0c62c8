//! Unlock notifications for the chat client's celebration modal.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::{AyanfeError, Result};
use crate::metrics::MetricsCollector;
use crate::models::{Achievement, Badge};

/// Payload emitted when a user completes an achievement
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AchievementUnlocked {
    /// Recipient
    pub user_id: i64,
    /// Completed achievement
    pub achievement: Achievement,
    /// Badge it grants
    pub badge: Badge,
    /// Completion time
    pub completed_at: DateTime<Utc>,
    /// False when the user already owned the badge
    pub badge_newly_earned: bool,
}

/// Delivers unlock notifications
///
/// Delivery is best effort. The tracker logs a returned error and moves on.
#[cfg_attr(test, mockall::automock)]
pub trait AchievementNotifier: Send + Sync {
    /// Deliver one notification
    fn notify(&self, event: &AchievementUnlocked) -> Result<()>;
}

/// Fan-out over a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<AchievementUnlocked>,
    metrics: MetricsCollector,
}

impl BroadcastNotifier {
    /// Channel buffering `capacity` events per receiver
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            metrics: MetricsCollector,
        }
    }

    /// New listener; sees events sent after this call
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AchievementUnlocked> {
        self.sender.subscribe()
    }
}

impl AchievementNotifier for BroadcastNotifier {
    fn notify(&self, event: &AchievementUnlocked) -> Result<()> {
        match self.sender.send(event.clone()) {
            Ok(receivers) => {
                debug!(
                    user_id = event.user_id,
                    achievement = %event.achievement.name,
                    receivers,
                    "Sent unlock notification"
                );
                Ok(())
            },
            Err(_) => {
                warn!(
                    user_id = event.user_id,
                    achievement = %event.achievement.name,
                    "No listeners for unlock notification"
                );
                self.metrics.record_notification_dropped();
                Err(AyanfeError::Notification("no active listeners".to_string()))
            },
        }
    }
}

/// Discards every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl AchievementNotifier for NullNotifier {
    fn notify(&self, _event: &AchievementUnlocked) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AchievementConditions, AchievementType, BadgeLevel};

    fn unlocked() -> AchievementUnlocked {
        AchievementUnlocked {
            user_id: 7,
            achievement: Achievement {
                id: 1,
                name: "First Steps".to_string(),
                description: "Send a message".to_string(),
                badge_id: 1,
                achievement_type: AchievementType::MessageCount,
                required_count: 1,
                conditions: AchievementConditions::default(),
                is_secret: false,
            },
            badge: Badge {
                id: 1,
                name: "First Words".to_string(),
                description: "Said hello".to_string(),
                icon: "💬".to_string(),
                image_url: None,
                category: "chat".to_string(),
                level: BadgeLevel::Bronze,
                points: 10,
            },
            completed_at: Utc::now(),
            badge_newly_earned: true,
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscriber() {
        let notifier = BroadcastNotifier::new(4);
        let mut rx = notifier.subscribe();

        notifier.notify(&unlocked()).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.user_id, 7);
        assert_eq!(received.badge.name, "First Words");
    }

    #[test]
    fn test_broadcast_without_listeners_errors() {
        let notifier = BroadcastNotifier::new(4);
        assert!(matches!(
            notifier.notify(&unlocked()),
            Err(AyanfeError::Notification(_))
        ));
    }

    #[test]
    fn test_payload_serializes_camel_case() {
        let json = serde_json::to_value(unlocked()).unwrap();
        assert_eq!(json["userId"], 7);
        assert_eq!(json["badgeNewlyEarned"], true);
        assert_eq!(json["achievement"]["type"], "message_count");
    }
}
