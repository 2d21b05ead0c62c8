//! Unit tests for validation.rs module

use ayanfe_core::validation::{InputValidator, MAX_MESSAGE_BYTES};

#[test]
fn test_validate_username_valid() {
    assert!(InputValidator::validate_username("ada_lovelace").is_ok());
    assert!(InputValidator::validate_username("dj.k-2").is_ok());
}

#[test]
fn test_validate_username_empty() {
    assert!(InputValidator::validate_username("").is_err());
    assert!(InputValidator::validate_username("   ").is_err());
}

#[test]
fn test_validate_username_too_long() {
    assert!(InputValidator::validate_username(&"a".repeat(33)).is_err());
    assert!(InputValidator::validate_username(&"a".repeat(32)).is_ok());
}

#[test]
fn test_validate_username_with_space() {
    assert!(InputValidator::validate_username("ada lovelace").is_err());
}

#[test]
fn test_validate_message_content() {
    assert!(InputValidator::validate_message_content("hello").is_ok());
    assert!(InputValidator::validate_message_content(r#"{"audioData":"data:audio/mp3;base64,AA=="}"#).is_ok());
    assert!(InputValidator::validate_message_content("").is_err());
    assert!(InputValidator::validate_message_content("\n\t").is_err());
    assert!(InputValidator::validate_message_content("a\0b").is_err());
}

#[test]
fn test_validate_message_content_size_limit() {
    assert!(InputValidator::validate_message_content(&"x".repeat(MAX_MESSAGE_BYTES)).is_ok());
    assert!(InputValidator::validate_message_content(&"x".repeat(MAX_MESSAGE_BYTES + 1)).is_err());
}

#[test]
fn test_validate_command() {
    assert!(InputValidator::validate_command("/lyrics").is_ok());
    assert!(InputValidator::validate_command("/img2").is_ok());
    assert!(InputValidator::validate_command("lyrics").is_err());
    assert!(InputValidator::validate_command("/").is_err());
    assert!(InputValidator::validate_command("/two words").is_err());
}

#[test]
fn test_validate_emoji() {
    assert!(InputValidator::validate_emoji("🔥").is_ok());
    assert!(InputValidator::validate_emoji("👍🏽").is_ok());
    assert!(InputValidator::validate_emoji("👨‍👩‍👧").is_ok());
    assert!(InputValidator::validate_emoji("").is_err());
    assert!(InputValidator::validate_emoji("ok").is_err());
}

#[test]
fn test_validate_api_category() {
    assert!(InputValidator::validate_api_category("image").is_ok());
    assert!(InputValidator::validate_api_category("lyrics").is_ok());
    assert!(InputValidator::validate_api_category("weather").is_err());
}

#[test]
fn test_validate_hour_window() {
    assert!(InputValidator::validate_hour_window(0, 4).is_ok());
    assert!(InputValidator::validate_hour_window(20, 24).is_ok());
    assert!(InputValidator::validate_hour_window(23, 1).is_ok());
    assert!(InputValidator::validate_hour_window(4, 4).is_err());
    assert!(InputValidator::validate_hour_window(0, 25).is_err());
}

#[test]
fn test_validate_database_url() {
    assert!(InputValidator::validate_database_url("sqlite:data/ayanfe.db").is_ok());
    assert!(InputValidator::validate_database_url("sqlite://:memory:").is_ok());
    assert!(InputValidator::validate_database_url("").is_err());
    assert!(InputValidator::validate_database_url("mysql://host/db").is_err());
}
