use anyhow::Result;
use metrics::{counter, histogram};
use std::time::Duration;

use crate::models::{AchievementType, ContentKind};

/// Messages classified, labelled by kind
pub const MESSAGES_CLASSIFIED_TOTAL: &str = "ayanfe_messages_classified_total";
/// Progress rows written
pub const PROGRESS_UPDATES_TOTAL: &str = "ayanfe_achievement_progress_updates_total";
/// Achievements completed, labelled by type
pub const ACHIEVEMENTS_COMPLETED_TOTAL: &str = "ayanfe_achievements_completed_total";
/// Achievements skipped during evaluation, labelled by reason
pub const ACHIEVEMENTS_SKIPPED_TOTAL: &str = "ayanfe_achievements_skipped_total";
/// Progress rows that failed to persist
pub const PROGRESS_FAILURES_TOTAL: &str = "ayanfe_achievement_progress_failures_total";
/// Unlock notifications nobody received
pub const NOTIFICATIONS_DROPPED_TOTAL: &str = "ayanfe_notifications_dropped_total";
/// Database operation latency
pub const DB_OPERATION_DURATION: &str = "ayanfe_db_operation_duration_seconds";
/// Errors, labelled by type
pub const ERRORS_TOTAL: &str = "ayanfe_errors_total";

/// Metrics collection and management
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsCollector;

impl MetricsCollector {
    /// Initialize metrics collection
    ///
    /// Installs the no-op recorder; binaries that export metrics install
    /// their own recorder instead.
    pub fn init() -> Result<()> {
        metrics::set_global_recorder(metrics::NoopRecorder)
            .map_err(|e| anyhow::anyhow!("Failed to initialize metrics recorder: {}", e))?;

        Ok(())
    }

    /// Record a classified message
    pub fn record_classification(&self, kind: ContentKind) {
        counter!(MESSAGES_CLASSIFIED_TOTAL, "kind" => kind.as_str()).increment(1);
    }

    /// Record a persisted progress update
    pub fn record_progress_update(&self, achievement_type: AchievementType) {
        counter!(PROGRESS_UPDATES_TOTAL, "type" => achievement_type.as_str()).increment(1);
    }

    /// Record a completed achievement
    pub fn record_completion(&self, achievement_type: AchievementType) {
        counter!(ACHIEVEMENTS_COMPLETED_TOTAL, "type" => achievement_type.as_str()).increment(1);
    }

    /// Record an achievement skipped during evaluation
    pub fn record_skipped(&self, reason: &'static str) {
        counter!(ACHIEVEMENTS_SKIPPED_TOTAL, "reason" => reason).increment(1);
    }

    /// Record a progress row that failed to persist
    pub fn record_progress_failure(&self) {
        counter!(PROGRESS_FAILURES_TOTAL).increment(1);
        self.record_error("database", "update_progress");
    }

    /// Record an unlock notification that was not delivered
    pub fn record_notification_dropped(&self) {
        counter!(NOTIFICATIONS_DROPPED_TOTAL).increment(1);
    }

    /// Record database operation metrics
    pub fn record_db_operation(&self, operation: &'static str, duration: Duration, success: bool) {
        let status = if success { "success" } else { "error" };
        histogram!(DB_OPERATION_DURATION, "operation" => operation, "status" => status).record(duration.as_secs_f64());

        if !success {
            self.record_error("database", operation);
        }
    }

    /// Record error metrics
    pub fn record_error(&self, error_type: &'static str, operation: &'static str) {
        counter!(ERRORS_TOTAL, "type" => error_type, "operation" => operation).increment(1);
    }
}

/// Performance timing wrapper for metrics
pub struct MetricsTimer {
    collector: MetricsCollector,
    operation: &'static str,
    start: std::time::Instant,
}

impl MetricsTimer {
    /// Start timing `operation`
    #[must_use]
    pub fn new(collector: MetricsCollector, operation: &'static str) -> Self {
        Self {
            collector,
            operation,
            start: std::time::Instant::now(),
        }
    }

    /// Stop timing and record the outcome
    pub fn finish(self, success: bool) {
        let duration = self.start.elapsed();
        self.collector.record_db_operation(self.operation, duration, success);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_harmless() {
        let collector = MetricsCollector;
        collector.record_classification(ContentKind::Audio);
        collector.record_completion(AchievementType::MessageCount);
        collector.record_skipped("unknown_badge");
        MetricsTimer::new(collector, "select").finish(true);
    }
}
