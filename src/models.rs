//! Data models for chat history, content rendering and gamification
//!
//! This module contains all data structures used throughout the application,
//! including messages, parsed content, badges, achievements and progress rows.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A registered chat user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Database primary key
    pub id: i64,
    /// Unique login name
    pub username: String,
    /// When the account was created
    pub created_at: DateTime<Utc>,
}

/// A single chat turn, written by the user or by the bot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Database primary key
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Opaque content, possibly carrying an embedded media payload
    pub content: String,
    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,
    /// True for bot replies
    pub is_bot: bool,
}

/// Data for creating a new message
#[derive(Debug, Clone)]
pub struct NewMessage {
    /// Owning user
    pub user_id: i64,
    /// Message content
    pub content: String,
    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,
    /// True for bot replies
    pub is_bot: bool,
}

/// How a chat client should render a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Plain text
    Text,
    /// Inline image
    Image,
    /// Audio player
    Audio,
    /// Video player
    Video,
    /// Hyperlink preview
    Link,
    /// Rendered markdown
    Markdown,
    /// Trusted raw markup
    Html,
}

impl ContentKind {
    /// Stable lowercase name, used for metric labels
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Link => "link",
            Self::Markdown => "markdown",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata extracted alongside a renderable payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetadata {
    /// Media title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Audio artist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    /// Video source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Image alt text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    /// Search query that produced the media
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Set when a video URL is trusted for direct embedding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_embedded: Option<bool>,
}

/// Result of classifying a message for rendering. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedContent {
    /// Rendering kind
    #[serde(rename = "type")]
    pub kind: ContentKind,
    /// The renderable payload: URL, data URI or text
    pub content: String,
    /// Extracted metadata, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ContentMetadata>,
}

impl ParsedContent {
    /// Content without metadata
    #[must_use]
    pub fn plain(kind: ContentKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            metadata: None,
        }
    }

    /// Content with metadata
    #[must_use]
    pub fn with_metadata(kind: ContentKind, content: impl Into<String>, metadata: ContentMetadata) -> Self {
        Self {
            kind,
            content: content.into(),
            metadata: Some(metadata),
        }
    }
}

/// Badge tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub enum BadgeLevel {
    /// Level 1
    Bronze,
    /// Level 2
    Gold,
    /// Level 3
    Diamond,
}

impl TryFrom<u8> for BadgeLevel {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            1 => Ok(Self::Bronze),
            2 => Ok(Self::Gold),
            3 => Ok(Self::Diamond),
            other => Err(format!("badge level must be 1-3, got {other}")),
        }
    }
}

impl From<BadgeLevel> for u8 {
    fn from(level: BadgeLevel) -> Self {
        match level {
            BadgeLevel::Bronze => 1,
            BadgeLevel::Gold => 2,
            BadgeLevel::Diamond => 3,
        }
    }
}

/// A collectible badge
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    /// Primary key
    pub id: i64,
    /// Unique display name
    pub name: String,
    /// What the badge is for
    pub description: String,
    /// Emoji or icon name
    pub icon: String,
    /// Optional artwork
    #[serde(default)]
    pub image_url: Option<String>,
    /// Grouping used by the badge gallery
    pub category: String,
    /// Tier
    pub level: BadgeLevel,
    /// Score awarded
    #[serde(default)]
    pub points: i64,
}

/// Activity category an achievement listens to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AchievementType {
    /// Total messages sent
    MessageCount,
    /// Distinct commands used
    UniqueCommands,
    /// Consecutive login days
    LoginStreak,
    /// Third-party API calls
    ApiUsage,
    /// Distinct emojis reacted with
    EmojiReactions,
    /// Activity inside a local-clock window
    TimeOfDay,
    /// Type not understood by this build; never evaluated
    #[serde(other)]
    Unsupported,
}

impl AchievementType {
    /// Column value
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MessageCount => "message_count",
            Self::UniqueCommands => "unique_commands",
            Self::LoginStreak => "login_streak",
            Self::ApiUsage => "api_usage",
            Self::EmojiReactions => "emoji_reactions",
            Self::TimeOfDay => "time_of_day",
            Self::Unsupported => "unsupported",
        }
    }

    /// Counting types accumulate towards `required_count`
    #[must_use]
    pub const fn is_counting(&self) -> bool {
        matches!(
            self,
            Self::MessageCount | Self::UniqueCommands | Self::LoginStreak | Self::ApiUsage | Self::EmojiReactions
        )
    }
}

impl From<&str> for AchievementType {
    fn from(value: &str) -> Self {
        match value {
            "message_count" => Self::MessageCount,
            "unique_commands" => Self::UniqueCommands,
            "login_streak" => Self::LoginStreak,
            "api_usage" => Self::ApiUsage,
            "emoji_reactions" => Self::EmojiReactions,
            "time_of_day" => Self::TimeOfDay,
            _ => Self::Unsupported,
        }
    }
}

impl fmt::Display for AchievementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific achievement conditions
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AchievementConditions {
    /// First hour of a `time_of_day` window (inclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_hour: Option<u32>,
    /// Last hour of a `time_of_day` window (exclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_hour: Option<u32>,
    /// API category an `api_usage` achievement is restricted to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Conditions this build does not interpret
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// An achievement definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    /// Primary key
    pub id: i64,
    /// Unique display name
    pub name: String,
    /// What to do to earn it
    pub description: String,
    /// Badge granted on completion
    pub badge_id: i64,
    /// Activity category
    #[serde(rename = "type")]
    pub achievement_type: AchievementType,
    /// Threshold for counting types
    pub required_count: i64,
    /// Type-specific conditions
    #[serde(default)]
    pub conditions: AchievementConditions,
    /// Hidden from listings until completed
    #[serde(default)]
    pub is_secret: bool,
}

/// Lifecycle of a (user, achievement) pair. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProgressState {
    /// No qualifying activity yet
    NotStarted,
    /// Some progress, not complete
    InProgress,
    /// Terminal
    Completed,
}

/// Progress row for one (user, achievement) pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserAchievementProgress {
    /// Primary key, `None` until first persisted
    pub id: Option<i64>,
    /// User
    pub user_id: i64,
    /// Achievement
    pub achievement_id: i64,
    /// Percentage, 0-100
    pub progress: i64,
    /// Latest measured count
    pub current_count: i64,
    /// Terminal completion flag
    pub completed: bool,
    /// When the achievement was completed
    pub completed_at: Option<DateTime<Utc>>,
    /// Last write
    pub last_updated: DateTime<Utc>,
    /// Free-form details
    pub metadata: serde_json::Value,
}

impl UserAchievementProgress {
    /// A zero record for a pair with no stored row
    #[must_use]
    pub fn fresh(user_id: i64, achievement_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            user_id,
            achievement_id,
            progress: 0,
            current_count: 0,
            completed: false,
            completed_at: None,
            last_updated: now,
            metadata: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> ProgressState {
        if self.completed {
            ProgressState::Completed
        } else if self.current_count > 0 || self.progress > 0 {
            ProgressState::InProgress
        } else {
            ProgressState::NotStarted
        }
    }
}

/// A badge owned by a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserBadge {
    /// Primary key
    pub id: i64,
    /// Owner
    pub user_id: i64,
    /// Badge
    pub badge_id: i64,
    /// When it was earned
    pub earned_at: DateTime<Utc>,
    /// Shown on the user's profile
    pub displayed: bool,
    /// Informational progress for multi-step badges
    pub progress: i64,
    /// Informational step count for multi-step badges
    pub completed_steps: i64,
}

/// An achievement as listed for a user
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AchievementView {
    /// Definition
    pub achievement: Achievement,
    /// The user's progress, if any
    pub progress: Option<UserAchievementProgress>,
}

/// Number of API calls in one category
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ApiUsageStat {
    /// API category (chat, image, lyrics, ...)
    pub category: String,
    /// Calls made
    pub calls: i64,
}

/// What happened, with the measurement derived from stored activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityKind {
    /// The user sent a chat message
    MessageSent {
        /// User's total messages, including this one
        total_messages: i64,
    },
    /// The user ran a command
    CommandUsed {
        /// Distinct commands ever used
        distinct_commands: i64,
    },
    /// The user logged in
    LoggedIn {
        /// Consecutive days ending today
        streak_days: i64,
    },
    /// The user called a third-party API
    ApiUsed {
        /// Category of this call
        category: String,
        /// Calls in that category
        category_calls: i64,
        /// Calls across all categories
        total_calls: i64,
    },
    /// The user reacted to a message
    EmojiReacted {
        /// Distinct emojis ever used
        distinct_emojis: i64,
    },
}

/// An activity event fed to the achievement tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEvent {
    /// Acting user
    pub user_id: i64,
    /// What happened
    pub kind: ActivityKind,
    /// When, in the user's local clock
    pub occurred_at: DateTime<FixedOffset>,
}
