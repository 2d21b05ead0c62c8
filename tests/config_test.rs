//! Unit tests for config.rs module

use ayanfe_core::config::AppConfig;

#[test]
fn test_default_config_values() {
    let config = AppConfig::default();

    assert_eq!(config.database.url, "sqlite:data/ayanfe.db");
    assert_eq!(config.database.max_connections, 8);
    assert_eq!(config.database.connection_timeout_secs, 30);
}

#[test]
fn test_default_logging_config() {
    let config = AppConfig::default();

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.file_path, None);
    assert_eq!(config.logging.format, "text");
}

#[test]
fn test_default_achievements_config() {
    let config = AppConfig::default();

    assert_eq!(config.achievements.catalog_path, None);
    assert_eq!(config.achievements.notification_capacity, 64);
    assert_eq!(config.classifier.markdown_length_threshold, 200);
}

#[test]
fn test_config_validation_success() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validation_non_sqlite_url() {
    let mut config = AppConfig::default();
    config.database.url = "postgres://localhost/ayanfe".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_zero_connection_timeout() {
    let mut config = AppConfig::default();
    config.database.connection_timeout_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_invalid_log_level() {
    let mut config = AppConfig::default();
    config.logging.level = "invalid".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_valid_log_levels() {
    let valid_levels = vec!["trace", "debug", "info", "warn", "error"];
    for level in valid_levels {
        let mut config = AppConfig::default();
        config.logging.level = level.to_string();
        assert!(config.validate().is_ok(), "Failed for level: {}", level);
    }
}

#[test]
fn test_config_validation_invalid_log_format() {
    let mut config = AppConfig::default();
    config.logging.format = "xml".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_zero_markdown_threshold() {
    let mut config = AppConfig::default();
    config.classifier.markdown_length_threshold = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_zero_notification_capacity() {
    let mut config = AppConfig::default();
    config.achievements.notification_capacity = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_serialization_roundtrip() {
    let config = AppConfig::default();
    let json = serde_json::to_string(&config).unwrap();
    let back: AppConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back.database.url, config.database.url);
    assert_eq!(back.achievements.notification_capacity, 64);
}
