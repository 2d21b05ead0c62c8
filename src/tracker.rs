//! Achievement progress tracking.
//!
//! [`evaluate`] is the pure per-achievement state machine. [`AchievementTracker`]
//! feeds it activity events, persists the result through [`Database::update_progress`]
//! and announces completions.

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use tracing::{debug, error, info, instrument, warn};

use crate::catalog::{has_usable_window, Catalog};
use crate::db::Database;
use crate::metrics::MetricsCollector;
use crate::models::{
    Achievement, AchievementType, ActivityEvent, ActivityKind, ProgressState, UserAchievementProgress,
};
use crate::notify::{AchievementNotifier, AchievementUnlocked};

/// Value an event contributes to one achievement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measurement {
    /// Running total for counting types
    Count(i64),
    /// Local hour the event happened in, for `time_of_day`
    HourOfDay(u32),
}

/// What an evaluation did to a progress row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing to write
    Unchanged,
    /// Count or percentage moved forward
    Advanced,
    /// Threshold crossed for the first time
    Completed,
}

/// Result of evaluating one measurement against one progress row
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Kind of change
    pub transition: Transition,
    /// Row to store; equal to the input when unchanged
    pub next: UserAchievementProgress,
}

impl Evaluation {
    fn unchanged(current: &UserAchievementProgress) -> Self {
        Self {
            transition: Transition::Unchanged,
            next: current.clone(),
        }
    }
}

/// Percentage of `required` reached by `count`, capped at 100
#[must_use]
pub fn percent(count: i64, required: i64) -> i64 {
    let required = required.max(1);
    (count.max(0).saturating_mul(100) / required).min(100)
}

/// Half-open `[start, end)` hour window; `start > end` wraps past midnight
#[must_use]
pub const fn in_window(hour: u32, start: u32, end: u32) -> bool {
    if start < end {
        start <= hour && hour < end
    } else if start > end {
        hour >= start || hour < end
    } else {
        false
    }
}

/// Apply a measurement to a progress row
///
/// Completed rows never change. Counting types keep the highest count seen.
#[must_use]
pub fn evaluate(
    current: &UserAchievementProgress,
    achievement: &Achievement,
    measurement: Measurement,
    at: DateTime<Utc>,
) -> Evaluation {
    if current.state() == ProgressState::Completed {
        return Evaluation::unchanged(current);
    }

    match (achievement.achievement_type, measurement) {
        (kind, Measurement::Count(measured)) if kind.is_counting() => {
            let count = current.current_count.max(measured);
            let progress = current.progress.max(percent(count, achievement.required_count));
            let completed = count >= achievement.required_count;

            if !completed && count == current.current_count && progress == current.progress {
                return Evaluation::unchanged(current);
            }

            let mut next = current.clone();
            next.current_count = count;
            next.progress = if completed { 100 } else { progress };
            next.last_updated = at;
            let transition = if completed {
                next.completed = true;
                next.completed_at = Some(at);
                Transition::Completed
            } else {
                Transition::Advanced
            };
            Evaluation { transition, next }
        },
        (AchievementType::TimeOfDay, Measurement::HourOfDay(hour)) => {
            let conditions = &achievement.conditions;
            let (Some(start), Some(end)) = (conditions.start_hour, conditions.end_hour) else {
                return Evaluation::unchanged(current);
            };
            if !has_usable_window(achievement) || !in_window(hour, start, end) {
                return Evaluation::unchanged(current);
            }

            let mut next = current.clone();
            next.current_count = 1;
            next.progress = 100;
            next.completed = true;
            next.completed_at = Some(at);
            next.last_updated = at;
            Evaluation {
                transition: Transition::Completed,
                next,
            }
        },
        _ => Evaluation::unchanged(current),
    }
}

impl ActivityKind {
    /// Measurement this event contributes to `achievement`, if it is relevant
    #[must_use]
    pub fn measurement_for(&self, achievement: &Achievement, local_hour: u32) -> Option<Measurement> {
        match (self, achievement.achievement_type) {
            (Self::MessageSent { total_messages }, AchievementType::MessageCount) => {
                Some(Measurement::Count(*total_messages))
            },
            (Self::MessageSent { .. }, AchievementType::TimeOfDay) => Some(Measurement::HourOfDay(local_hour)),
            (Self::CommandUsed { distinct_commands }, AchievementType::UniqueCommands) => {
                Some(Measurement::Count(*distinct_commands))
            },
            (Self::LoggedIn { streak_days }, AchievementType::LoginStreak) => Some(Measurement::Count(*streak_days)),
            (
                Self::ApiUsed {
                    category,
                    category_calls,
                    total_calls,
                },
                AchievementType::ApiUsage,
            ) => match achievement.conditions.category.as_deref() {
                Some(wanted) if wanted == category => Some(Measurement::Count(*category_calls)),
                Some(_) => None,
                None => Some(Measurement::Count(*total_calls)),
            },
            (Self::EmojiReacted { distinct_emojis }, AchievementType::EmojiReactions) => {
                Some(Measurement::Count(*distinct_emojis))
            },
            _ => None,
        }
    }

    /// Achievement types this event can move
    #[must_use]
    pub const fn achievement_types(&self) -> &'static [AchievementType] {
        match self {
            Self::MessageSent { .. } => &[AchievementType::MessageCount, AchievementType::TimeOfDay],
            Self::CommandUsed { .. } => &[AchievementType::UniqueCommands],
            Self::LoggedIn { .. } => &[AchievementType::LoginStreak],
            Self::ApiUsed { .. } => &[AchievementType::ApiUsage],
            Self::EmojiReacted { .. } => &[AchievementType::EmojiReactions],
        }
    }

    /// Short name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MessageSent { .. } => "message_sent",
            Self::CommandUsed { .. } => "command_used",
            Self::LoggedIn { .. } => "logged_in",
            Self::ApiUsed { .. } => "api_used",
            Self::EmojiReacted { .. } => "emoji_reacted",
        }
    }
}

/// What one event did across the catalog
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerReport {
    /// Rows that moved forward without completing
    pub advanced: Vec<UserAchievementProgress>,
    /// Completions from this event
    pub unlocked: Vec<AchievementUnlocked>,
    /// Achievements skipped as invalid
    pub skipped: Vec<i64>,
    /// Achievements whose row could not be stored
    pub failed: Vec<i64>,
}

impl TrackerReport {
    /// True when the event changed nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.advanced.is_empty() && self.unlocked.is_empty()
    }
}

/// Evaluates activity events against the catalog and persists progress
#[derive(Clone)]
pub struct AchievementTracker {
    catalog: Arc<Catalog>,
    db: Database,
    notifier: Arc<dyn AchievementNotifier>,
    metrics: MetricsCollector,
}

impl AchievementTracker {
    /// Tracker over `catalog`, storing in `db` and announcing through `notifier`
    pub fn new(catalog: Arc<Catalog>, db: Database, notifier: Arc<dyn AchievementNotifier>) -> Self {
        Self {
            catalog,
            db,
            notifier,
            metrics: MetricsCollector,
        }
    }

    /// The catalog being tracked
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Evaluate every achievement the event is relevant to
    ///
    /// Failures are per achievement: they are logged and reported, and the
    /// remaining achievements are still processed.
    #[instrument(skip(self, event), fields(user_id = event.user_id, event = event.kind.name()))]
    pub fn process(&self, event: &ActivityEvent) -> TrackerReport {
        let mut report = TrackerReport::default();
        let at = event.occurred_at.with_timezone(&Utc);
        let local_hour = event.occurred_at.hour();

        let relevant = event
            .kind
            .achievement_types()
            .iter()
            .flat_map(|kind| self.catalog.achievements_of(*kind));

        for achievement in relevant {
            let Some(measurement) = event.kind.measurement_for(achievement, local_hour) else {
                continue;
            };

            let Some(badge) = self.catalog.badge(achievement.badge_id) else {
                warn!(
                    achievement_id = achievement.id,
                    badge_id = achievement.badge_id,
                    "Skipping achievement with unknown badge"
                );
                self.metrics.record_skipped("unknown_badge");
                report.skipped.push(achievement.id);
                continue;
            };

            if !self.catalog.is_evaluable(achievement) {
                warn!(achievement_id = achievement.id, "Skipping achievement with invalid hour window");
                self.metrics.record_skipped("invalid_window");
                report.skipped.push(achievement.id);
                continue;
            }

            let update = match self
                .db
                .update_progress(event.user_id, achievement, |current| {
                    evaluate(current, achievement, measurement, at)
                }) {
                Ok(update) => update,
                Err(e) => {
                    error!(achievement_id = achievement.id, error = %e, "Failed to update achievement progress");
                    self.metrics.record_progress_failure();
                    report.failed.push(achievement.id);
                    continue;
                },
            };

            match update.transition {
                Transition::Unchanged => {},
                Transition::Advanced => {
                    debug!(
                        achievement_id = achievement.id,
                        count = update.progress.current_count,
                        progress = update.progress.progress,
                        "Achievement progress advanced"
                    );
                    self.metrics.record_progress_update(achievement.achievement_type);
                    report.advanced.push(update.progress);
                },
                Transition::Completed => {
                    self.metrics.record_progress_update(achievement.achievement_type);
                    self.metrics.record_completion(achievement.achievement_type);
                    info!(achievement = %achievement.name, badge = %badge.name, "Achievement unlocked");

                    let unlocked = AchievementUnlocked {
                        user_id: event.user_id,
                        achievement: achievement.clone(),
                        badge: badge.clone(),
                        completed_at: update.progress.completed_at.unwrap_or(at),
                        badge_newly_earned: update.badge.is_some(),
                    };
                    if let Err(e) = self.notifier.notify(&unlocked) {
                        warn!(achievement_id = achievement.id, error = %e, "Unlock notification not delivered");
                    }
                    report.unlocked.push(unlocked);
                },
            }
        }

        report
    }
}
