//! Database schema definitions
//!
//! This module provides constants for table and column names used with rusqlite.

/// Users table schema
pub mod users {
    /// Table name
    pub const TABLE: &str = "users";
    /// Primary key column
    pub const ID: &str = "id";
    /// Unique login name column
    pub const USERNAME: &str = "username";
    /// Account creation timestamp column
    pub const CREATED_AT: &str = "created_at";
}

/// Messages table schema
pub mod messages {
    /// Table name
    pub const TABLE: &str = "messages";
    /// Primary key column
    pub const ID: &str = "id";
    /// Owning user column
    pub const USER_ID: &str = "user_id";
    /// Message content column
    pub const CONTENT: &str = "content";
    /// Message timestamp column
    pub const TIMESTAMP: &str = "timestamp";
    /// Flag indicating a bot reply
    pub const IS_BOT: &str = "is_bot";
}

/// Badges table schema
pub mod badges {
    /// Table name
    pub const TABLE: &str = "badges";
    /// Primary key column
    pub const ID: &str = "id";
    /// Unique name column
    pub const NAME: &str = "name";
    /// Description column
    pub const DESCRIPTION: &str = "description";
    /// Icon column
    pub const ICON: &str = "icon";
    /// Artwork URL column
    pub const IMAGE_URL: &str = "image_url";
    /// Category column
    pub const CATEGORY: &str = "category";
    /// Tier column (1-3)
    pub const LEVEL: &str = "level";
    /// Points column
    pub const POINTS: &str = "points";
}

/// Achievements table schema
pub mod achievements {
    /// Table name
    pub const TABLE: &str = "achievements";
    /// Primary key column
    pub const ID: &str = "id";
    /// Unique name column
    pub const NAME: &str = "name";
    /// Description column
    pub const DESCRIPTION: &str = "description";
    /// Owning badge column
    pub const BADGE_ID: &str = "badge_id";
    /// Activity type column
    pub const TYPE: &str = "type";
    /// Threshold column
    pub const REQUIRED_COUNT: &str = "required_count";
    /// JSON conditions column
    pub const CONDITIONS: &str = "conditions";
    /// Secret flag column
    pub const IS_SECRET: &str = "is_secret";
}

/// Per-user achievement progress table schema
pub mod user_achievement_progress {
    /// Table name
    pub const TABLE: &str = "user_achievement_progress";
    /// Primary key column
    pub const ID: &str = "id";
    /// User column
    pub const USER_ID: &str = "user_id";
    /// Achievement column
    pub const ACHIEVEMENT_ID: &str = "achievement_id";
    /// Percentage column
    pub const PROGRESS: &str = "progress";
    /// Measured count column
    pub const CURRENT_COUNT: &str = "current_count";
    /// Completion flag column
    pub const COMPLETED: &str = "completed";
    /// Completion timestamp column
    pub const COMPLETED_AT: &str = "completed_at";
    /// Last write timestamp column
    pub const LAST_UPDATED: &str = "last_updated";
    /// JSON metadata column
    pub const METADATA: &str = "metadata";
}

/// Earned badges table schema
pub mod user_badges {
    /// Table name
    pub const TABLE: &str = "user_badges";
    /// Primary key column
    pub const ID: &str = "id";
    /// Owner column
    pub const USER_ID: &str = "user_id";
    /// Badge column
    pub const BADGE_ID: &str = "badge_id";
    /// Earned timestamp column
    pub const EARNED_AT: &str = "earned_at";
    /// Profile display flag column
    pub const DISPLAYED: &str = "displayed";
    /// Informational progress column
    pub const PROGRESS: &str = "progress";
    /// Informational step count column
    pub const COMPLETED_STEPS: &str = "completed_steps";
}

/// Command usage ledger schema
pub mod command_usage {
    /// Table name
    pub const TABLE: &str = "command_usage";
    /// User column
    pub const USER_ID: &str = "user_id";
    /// Command name column
    pub const COMMAND: &str = "command";
    /// Usage timestamp column
    pub const USED_AT: &str = "used_at";
}

/// Emoji reaction ledger schema
pub mod emoji_reactions {
    /// Table name
    pub const TABLE: &str = "emoji_reactions";
    /// User column
    pub const USER_ID: &str = "user_id";
    /// Reacted-to message column
    pub const MESSAGE_ID: &str = "message_id";
    /// Emoji column
    pub const EMOJI: &str = "emoji";
    /// Reaction timestamp column
    pub const REACTED_AT: &str = "reacted_at";
}

/// Login day ledger schema
pub mod user_logins {
    /// Table name
    pub const TABLE: &str = "user_logins";
    /// User column
    pub const USER_ID: &str = "user_id";
    /// Local calendar day column (YYYY-MM-DD)
    pub const LOGIN_DATE: &str = "login_date";
}

/// API usage ledger schema
pub mod api_usage {
    /// Table name
    pub const TABLE: &str = "api_usage";
    /// User column
    pub const USER_ID: &str = "user_id";
    /// API category column
    pub const CATEGORY: &str = "category";
    /// Endpoint column
    pub const ENDPOINT: &str = "endpoint";
    /// Usage timestamp column
    pub const USED_AT: &str = "used_at";
}
