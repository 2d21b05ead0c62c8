use anyhow::{anyhow, Result};

/// Longest message body accepted, in bytes
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024;

/// API categories the chat proxies to
pub const API_CATEGORIES: [&str; 7] = ["chat", "image", "lyrics", "quote", "roast", "translate", "music"];

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate a username
    pub fn validate_username(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(anyhow!("Username cannot be empty"));
        }

        if name.chars().count() > 32 {
            return Err(anyhow!("Username too long (max 32 characters)"));
        }

        if !name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Err(anyhow!("Username may only contain letters, digits, '.', '-' and '_'"));
        }

        Ok(())
    }

    /// Validate message content
    pub fn validate_message_content(content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(anyhow!("Message cannot be empty"));
        }

        if content.len() > MAX_MESSAGE_BYTES {
            return Err(anyhow!("Message too long (max {MAX_MESSAGE_BYTES} bytes)"));
        }

        if content.contains('\0') {
            return Err(anyhow!("Message contains invalid characters"));
        }

        Ok(())
    }

    /// Validate a slash command such as `/lyrics`
    pub fn validate_command(command: &str) -> Result<()> {
        let Some(name) = command.strip_prefix('/') else {
            return Err(anyhow!("Command must start with '/'"));
        };

        if name.is_empty() || name.len() > 32 {
            return Err(anyhow!("Command name must be 1-32 characters"));
        }

        if !name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
            return Err(anyhow!("Command name may only contain a-z, 0-9 and '_'"));
        }

        Ok(())
    }

    /// Validate an emoji reaction token
    pub fn validate_emoji(emoji: &str) -> Result<()> {
        if emoji.trim().is_empty() {
            return Err(anyhow!("Emoji cannot be empty"));
        }

        // One grapheme may span several code points (skin tones, ZWJ sequences)
        if emoji.chars().count() > 16 {
            return Err(anyhow!("Emoji too long"));
        }

        if emoji.chars().any(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || c.is_control()) {
            return Err(anyhow!("Not an emoji: {emoji}"));
        }

        Ok(())
    }

    /// Validate an API category
    pub fn validate_api_category(category: &str) -> Result<()> {
        if !API_CATEGORIES.contains(&category) {
            return Err(anyhow!(
                "Unknown API category: {category}. Must be one of: {API_CATEGORIES:?}"
            ));
        }

        Ok(())
    }

    /// Validate a `[start, end)` local-hour window
    pub fn validate_hour_window(start: u32, end: u32) -> Result<()> {
        if start > 23 {
            return Err(anyhow!("Start hour must be 0-23, got {start}"));
        }

        if end > 24 {
            return Err(anyhow!("End hour must be 0-24, got {end}"));
        }

        if start == end {
            return Err(anyhow!("Hour window [{start}, {end}) is empty"));
        }

        Ok(())
    }

    /// Validate database URL
    pub fn validate_database_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(anyhow!("Database URL cannot be empty"));
        }

        if !url.starts_with("sqlite:") {
            return Err(anyhow!("Only SQLite databases are supported"));
        }

        if url.len() > 1000 {
            return Err(anyhow!("Database URL too long"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands() {
        assert!(InputValidator::validate_command("/lyrics").is_ok());
        assert!(InputValidator::validate_command("lyrics").is_err());
        assert!(InputValidator::validate_command("/").is_err());
        assert!(InputValidator::validate_command("/Roast").is_err());
    }

    #[test]
    fn test_hour_window() {
        assert!(InputValidator::validate_hour_window(0, 4).is_ok());
        assert!(InputValidator::validate_hour_window(22, 2).is_ok());
        assert!(InputValidator::validate_hour_window(3, 3).is_err());
        assert!(InputValidator::validate_hour_window(24, 2).is_err());
    }
}
