//! Unit tests for metrics.rs module

use std::time::Duration;

use ayanfe_core::metrics::{MetricsCollector, MetricsTimer};
use ayanfe_core::models::{AchievementType, ContentKind};

#[test]
fn test_metrics_initialization() {
    // The global recorder can only be installed once per process
    let _ = MetricsCollector::init();
    assert!(MetricsCollector::init().is_err());
}

#[test]
fn test_record_db_operation() {
    let collector = MetricsCollector;
    collector.record_db_operation("select", Duration::from_millis(100), true);
    collector.record_db_operation("select", Duration::from_millis(100), false);
}

#[test]
fn test_record_tracking_events() {
    let collector = MetricsCollector::default();
    collector.record_classification(ContentKind::Markdown);
    collector.record_progress_update(AchievementType::LoginStreak);
    collector.record_completion(AchievementType::TimeOfDay);
    collector.record_skipped("unknown_badge");
    collector.record_progress_failure();
    collector.record_notification_dropped();
}

#[test]
fn test_metrics_timer() {
    let timer = MetricsTimer::new(MetricsCollector, "update_progress");
    std::thread::sleep(Duration::from_millis(1));
    timer.finish(true);
}
