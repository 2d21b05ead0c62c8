//! Chat activity glue: stores what a user did, then lets the tracker react.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::classifier::ContentClassifier;
use crate::db::Database;
use crate::error::{AyanfeError, Result};
use crate::logging::OperationTimer;
use crate::metrics::MetricsCollector;
use crate::models::{
    AchievementView, ActivityEvent, ActivityKind, Badge, Message, NewMessage, ParsedContent, User, UserBadge,
};
use crate::tracker::{AchievementTracker, TrackerReport};
use crate::validation::InputValidator;

/// A stored message with its rendering decision
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RenderedMessage {
    /// Stored row
    pub message: Message,
    /// How to render it
    pub parsed: ParsedContent,
}

/// An owned badge with its definition
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EarnedBadge {
    /// Ownership row
    pub owned: UserBadge,
    /// Badge definition
    pub badge: Badge,
}

fn invalid(err: &anyhow::Error) -> AyanfeError {
    AyanfeError::InvalidInput(err.to_string())
}

/// Entry point for chat handlers
pub struct ChatService {
    db: Database,
    classifier: ContentClassifier,
    tracker: AchievementTracker,
    metrics: MetricsCollector,
}

impl ChatService {
    /// Create a service over an opened store
    pub fn new(db: Database, classifier: ContentClassifier, tracker: AchievementTracker) -> Self {
        Self {
            db,
            classifier,
            tracker,
            metrics: MetricsCollector,
        }
    }

    /// Underlying store
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }

    /// Register a new user
    pub fn register_user(&self, username: &str) -> Result<User> {
        InputValidator::validate_username(username).map_err(|e| invalid(&e))?;
        self.db.create_user(username)
    }

    /// Look a user up by name
    pub fn find_user(&self, username: &str) -> Result<User> {
        self.db
            .get_user_by_name(username)?
            .ok_or_else(|| AyanfeError::UserNotFound(username.to_string()))
    }

    fn require_user(&self, user_id: i64) -> Result<()> {
        match self.db.get_user(user_id)? {
            Some(_) => Ok(()),
            None => Err(AyanfeError::UserNotFound(user_id.to_string())),
        }
    }

    /// Store a user message and track it
    #[instrument(skip(self, content))]
    pub fn post_message(
        &self,
        user_id: i64,
        content: &str,
        at: DateTime<FixedOffset>,
    ) -> Result<(Message, TrackerReport)> {
        InputValidator::validate_message_content(content).map_err(|e| invalid(&e))?;
        self.require_user(user_id)?;

        let message = self.db.add_message(NewMessage {
            user_id,
            content: content.to_string(),
            timestamp: at.with_timezone(&Utc),
            is_bot: false,
        })?;
        let total_messages = self.db.count_user_messages(user_id)?;
        debug!(message_id = message.id, total_messages, "Stored user message");

        let report = self.track(user_id, ActivityKind::MessageSent { total_messages }, at);
        Ok((message, report))
    }

    /// Store a bot reply. Bot turns do not count towards achievements.
    pub fn post_bot_reply(&self, user_id: i64, content: &str, at: DateTime<FixedOffset>) -> Result<Message> {
        InputValidator::validate_message_content(content).map_err(|e| invalid(&e))?;
        self.require_user(user_id)?;

        self.db.add_message(NewMessage {
            user_id,
            content: content.to_string(),
            timestamp: at.with_timezone(&Utc),
            is_bot: true,
        })
    }

    /// Record a slash command
    pub fn use_command(&self, user_id: i64, command: &str, at: DateTime<FixedOffset>) -> Result<TrackerReport> {
        InputValidator::validate_command(command).map_err(|e| invalid(&e))?;
        self.require_user(user_id)?;

        let distinct_commands = self.db.record_command(user_id, command, at.with_timezone(&Utc))?;
        Ok(self.track(user_id, ActivityKind::CommandUsed { distinct_commands }, at))
    }

    /// Record a login on the user's local calendar day
    pub fn log_in(&self, user_id: i64, at: DateTime<FixedOffset>) -> Result<TrackerReport> {
        self.require_user(user_id)?;

        let streak_days = self.db.record_login(user_id, at.date_naive())?;
        Ok(self.track(user_id, ActivityKind::LoggedIn { streak_days }, at))
    }

    /// Record a proxied third-party API call
    pub fn record_api_call(
        &self,
        user_id: i64,
        category: &str,
        endpoint: &str,
        at: DateTime<FixedOffset>,
    ) -> Result<TrackerReport> {
        InputValidator::validate_api_category(category).map_err(|e| invalid(&e))?;
        self.require_user(user_id)?;

        let (category_calls, total_calls) =
            self.db
                .record_api_usage(user_id, category, endpoint, at.with_timezone(&Utc))?;
        Ok(self.track(
            user_id,
            ActivityKind::ApiUsed {
                category: category.to_string(),
                category_calls,
                total_calls,
            },
            at,
        ))
    }

    /// Record an emoji reaction, optionally on a stored message
    pub fn react_with_emoji(
        &self,
        user_id: i64,
        message_id: Option<i64>,
        emoji: &str,
        at: DateTime<FixedOffset>,
    ) -> Result<TrackerReport> {
        InputValidator::validate_emoji(emoji).map_err(|e| invalid(&e))?;
        self.require_user(user_id)?;

        let distinct_emojis = self
            .db
            .record_emoji_reaction(user_id, message_id, emoji, at.with_timezone(&Utc))?;
        Ok(self.track(user_id, ActivityKind::EmojiReacted { distinct_emojis }, at))
    }

    fn track(&self, user_id: i64, kind: ActivityKind, occurred_at: DateTime<FixedOffset>) -> TrackerReport {
        self.tracker.process(&ActivityEvent {
            user_id,
            kind,
            occurred_at,
        })
    }

    /// A user's conversation, classified for display
    pub fn render_history(&self, user_id: i64, limit: Option<usize>) -> Result<Vec<RenderedMessage>> {
        let timer = OperationTimer::new("render_history");
        let messages = self.db.get_messages(user_id, limit)?;

        let rendered = messages
            .into_iter()
            .map(|message| {
                let parsed = self.classifier.classify(&message.content);
                self.metrics.record_classification(parsed.kind);
                RenderedMessage { message, parsed }
            })
            .collect();

        timer.finish();
        Ok(rendered)
    }

    /// Achievements the user may see, with progress
    pub fn achievements_for(&self, user_id: i64) -> Result<Vec<AchievementView>> {
        self.db.list_achievements_for_user(user_id)
    }

    /// Badges the user owns
    pub fn badges_for(&self, user_id: i64) -> Result<Vec<EarnedBadge>> {
        let owned = self.db.get_user_badges(user_id)?;
        let mut earned = Vec::with_capacity(owned.len());

        for row in owned {
            let badge = match self.tracker.catalog().badge(row.badge_id) {
                Some(badge) => badge.clone(),
                None => self
                    .db
                    .get_badge(row.badge_id)?
                    .ok_or(AyanfeError::BadgeNotFound(row.badge_id))?,
            };
            earned.push(EarnedBadge { owned: row, badge });
        }

        Ok(earned)
    }

    /// Show or hide an owned badge on the user's profile
    pub fn set_badge_displayed(&self, user_id: i64, badge_id: i64, displayed: bool) -> Result<()> {
        if self.db.set_badge_displayed(user_id, badge_id, displayed)? {
            Ok(())
        } else {
            Err(AyanfeError::BadgeNotFound(badge_id))
        }
    }
}
