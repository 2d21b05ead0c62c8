use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::DatabaseConfig;
use crate::error::{AyanfeError, Result};
use crate::metrics::{MetricsCollector, MetricsTimer};
use crate::models::{
    Achievement, AchievementConditions, AchievementType, AchievementView, ApiUsageStat, Badge, BadgeLevel, Message,
    NewMessage, User, UserAchievementProgress, UserBadge,
};
use crate::schema::{
    achievements, api_usage, badges, command_usage, emoji_reactions, messages, user_achievement_progress,
    user_badges, user_logins, users,
};
use crate::tracker::{Evaluation, Transition};

// Type alias for the database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

const DEFAULT_POOL_SIZE: u32 = 8;
const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const MIGRATIONS: [(&str, &str); 3] = [
    (
        "create_tables",
        include_str!("../migrations/2026-10-01-000000_create_tables/up.sql"),
    ),
    (
        "add_achievements",
        include_str!("../migrations/2026-10-01-000001_add_achievements/up.sql"),
    ),
    (
        "add_activity_ledgers",
        include_str!("../migrations/2026-10-01-000002_add_activity_ledgers/up.sql"),
    ),
];

/// Outcome of a transactional progress update
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// What the evaluation decided
    pub transition: Transition,
    /// The row as stored after the update
    pub progress: UserAchievementProgress,
    /// Badge row created by this update, if the user did not already own it
    pub badge: Option<UserBadge>,
}

/// Counts from a catalog seed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Badges upserted
    pub badges: usize,
    /// Achievements upserted
    pub achievements: usize,
    /// Achievements left out (unknown badge, unsupported type or bad hour window)
    pub skipped: usize,
}

/// Database manager for handling connections and operations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    metrics: MetricsCollector,
}

impl Database {
    /// Open (creating if needed) the database at a `sqlite:` URL or plain path
    pub fn new(database_url: &str) -> Result<Self> {
        Self::open(database_url, DEFAULT_POOL_SIZE, DEFAULT_CONNECTION_TIMEOUT)
    }

    /// Open the database described by the configuration
    pub fn from_config(config: &DatabaseConfig, database_url: &str) -> Result<Self> {
        Self::open(
            database_url,
            config.max_connections,
            Duration::from_secs(config.connection_timeout_secs),
        )
    }

    /// Private in-memory database on a single pooled connection
    pub fn open_in_memory() -> Result<Self> {
        Self::build(SqliteConnectionManager::memory(), 1, DEFAULT_CONNECTION_TIMEOUT)
    }

    fn open(database_url: &str, max_connections: u32, timeout: Duration) -> Result<Self> {
        let path = database_url
            .strip_prefix("sqlite://")
            .or_else(|| database_url.strip_prefix("sqlite:"))
            .unwrap_or(database_url);

        if path == ":memory:" {
            return Self::open_in_memory();
        }

        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        info!(path, "Opening database");
        Self::build(SqliteConnectionManager::file(path), max_connections, timeout)
    }

    fn build(manager: SqliteConnectionManager, max_connections: u32, timeout: Duration) -> Result<Self> {
        let manager = manager.with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            // In-memory databases answer "memory" and stay that way
            let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(max_connections)
            .connection_timeout(timeout)
            .build(manager)?;

        let conn = pool.get()?;
        Self::run_migrations(&conn)?;

        Ok(Self {
            pool,
            metrics: MetricsCollector,
        })
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        for (name, sql) in MIGRATIONS {
            conn.execute_batch(sql)?;
            debug!(migration = name, "Applied migration");
        }
        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    // ---- users ----

    /// Create a user
    pub fn create_user(&self, username: &str) -> Result<User> {
        let conn = self.get_connection()?;
        let created_at = Utc::now();

        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}) VALUES (?1, ?2)",
                users::TABLE,
                users::USERNAME,
                users::CREATED_AT
            ),
            params![username, created_at],
        )?;

        Ok(User {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            created_at,
        })
    }

    /// Get a user by id
    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let conn = self.get_connection()?;
        let user = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?1", users::TABLE, users::ID),
                params![user_id],
                Self::map_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Get a user by name
    pub fn get_user_by_name(&self, username: &str) -> Result<Option<User>> {
        let conn = self.get_connection()?;
        let user = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?1", users::TABLE, users::USERNAME),
                params![username],
                Self::map_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Delete a user and, by cascade, everything they own
    pub fn delete_user(&self, user_id: i64) -> Result<bool> {
        let conn = self.get_connection()?;
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE {} = ?1", users::TABLE, users::ID),
            params![user_id],
        )?;
        if deleted > 0 {
            info!(user_id, "Deleted user");
        }
        Ok(deleted > 0)
    }

    // ---- messages ----

    /// Store a chat turn. Messages are never updated afterwards.
    pub fn add_message(&self, new_message: NewMessage) -> Result<Message> {
        let timer = MetricsTimer::new(self.metrics, "add_message");
        let result = self.insert_message(new_message);
        timer.finish(result.is_ok());
        result
    }

    fn insert_message(&self, new_message: NewMessage) -> Result<Message> {
        let conn = self.get_connection()?;

        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4)",
                messages::TABLE,
                messages::USER_ID,
                messages::CONTENT,
                messages::TIMESTAMP,
                messages::IS_BOT
            ),
            params![
                new_message.user_id,
                new_message.content,
                new_message.timestamp,
                new_message.is_bot
            ],
        )?;

        Ok(Message {
            id: conn.last_insert_rowid(),
            user_id: new_message.user_id,
            content: new_message.content,
            timestamp: new_message.timestamp,
            is_bot: new_message.is_bot,
        })
    }

    /// A user's conversation, oldest first; `limit` keeps the most recent turns
    pub fn get_messages(&self, user_id: i64, limit: Option<usize>) -> Result<Vec<Message>> {
        let conn = self.get_connection()?;
        let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));

        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM (SELECT * FROM {table} WHERE {user} = ?1 ORDER BY {ts} DESC, {id} DESC LIMIT ?2)
             ORDER BY {ts} ASC, {id} ASC",
            table = messages::TABLE,
            user = messages::USER_ID,
            ts = messages::TIMESTAMP,
            id = messages::ID,
        ))?;
        let rows = stmt.query_map(params![user_id, limit], Self::map_message)?;

        let mut results = Vec::new();
        for message in rows {
            results.push(message?);
        }
        Ok(results)
    }

    /// Messages the user wrote (bot replies excluded)
    pub fn count_user_messages(&self, user_id: i64) -> Result<i64> {
        let conn = self.get_connection()?;
        let count = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ?1 AND {} = 0",
                messages::TABLE,
                messages::USER_ID,
                messages::IS_BOT
            ),
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ---- catalog ----

    /// Upsert every badge and evaluable achievement in the catalog
    pub fn seed_catalog(&self, catalog: &Catalog) -> Result<SeedSummary> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;
        let mut summary = SeedSummary::default();

        for badge in catalog.badges() {
            tx.execute(
                &format!(
                    "INSERT INTO {t} ({id}, {name}, {desc}, {icon}, {img}, {cat}, {lvl}, {pts})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT({id}) DO UPDATE SET
                        {name} = excluded.{name}, {desc} = excluded.{desc}, {icon} = excluded.{icon},
                        {img} = excluded.{img}, {cat} = excluded.{cat}, {lvl} = excluded.{lvl},
                        {pts} = excluded.{pts}",
                    t = badges::TABLE,
                    id = badges::ID,
                    name = badges::NAME,
                    desc = badges::DESCRIPTION,
                    icon = badges::ICON,
                    img = badges::IMAGE_URL,
                    cat = badges::CATEGORY,
                    lvl = badges::LEVEL,
                    pts = badges::POINTS,
                ),
                params![
                    badge.id,
                    badge.name,
                    badge.description,
                    badge.icon,
                    badge.image_url,
                    badge.category,
                    u8::from(badge.level),
                    badge.points
                ],
            )?;
            summary.badges += 1;
        }

        for achievement in catalog.achievements() {
            if !catalog.is_evaluable(achievement) {
                warn!(achievement = %achievement.name, "Not seeding achievement");
                summary.skipped += 1;
                continue;
            }

            let conditions = serde_json::to_string(&achievement.conditions)?;
            tx.execute(
                &format!(
                    "INSERT INTO {t} ({id}, {name}, {desc}, {badge}, {ty}, {req}, {cond}, {secret})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT({id}) DO UPDATE SET
                        {name} = excluded.{name}, {desc} = excluded.{desc}, {badge} = excluded.{badge},
                        {ty} = excluded.{ty}, {req} = excluded.{req}, {cond} = excluded.{cond},
                        {secret} = excluded.{secret}",
                    t = achievements::TABLE,
                    id = achievements::ID,
                    name = achievements::NAME,
                    desc = achievements::DESCRIPTION,
                    badge = achievements::BADGE_ID,
                    ty = achievements::TYPE,
                    req = achievements::REQUIRED_COUNT,
                    cond = achievements::CONDITIONS,
                    secret = achievements::IS_SECRET,
                ),
                params![
                    achievement.id,
                    achievement.name,
                    achievement.description,
                    achievement.badge_id,
                    achievement.achievement_type.as_str(),
                    achievement.required_count,
                    conditions,
                    achievement.is_secret
                ],
            )?;
            summary.achievements += 1;
        }

        tx.commit()?;
        info!(
            badges = summary.badges,
            achievements = summary.achievements,
            skipped = summary.skipped,
            "Seeded achievement catalog"
        );
        Ok(summary)
    }

    /// Get a badge by id
    pub fn get_badge(&self, badge_id: i64) -> Result<Option<Badge>> {
        let conn = self.get_connection()?;
        let badge = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?1", badges::TABLE, badges::ID),
                params![badge_id],
                Self::map_badge,
            )
            .optional()?;
        Ok(badge)
    }

    /// Get an achievement by id
    pub fn get_achievement(&self, achievement_id: i64) -> Result<Option<Achievement>> {
        let conn = self.get_connection()?;
        let achievement = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?1", achievements::TABLE, achievements::ID),
                params![achievement_id],
                |row| Self::map_achievement(row, 0),
            )
            .optional()?;
        Ok(achievement)
    }

    // ---- progress ----

    /// Stored progress for a (user, achievement) pair
    pub fn get_progress(&self, user_id: i64, achievement_id: i64) -> Result<Option<UserAchievementProgress>> {
        let conn = self.get_connection()?;
        Ok(Self::select_progress(&conn, user_id, achievement_id)?)
    }

    /// Read, evaluate and write one progress row under a write lock
    ///
    /// The transaction is opened `IMMEDIATE`, so concurrent updates for the
    /// same pair are serialized. On completion the achievement's badge is
    /// granted in the same transaction unless the user already owns it.
    pub fn update_progress<F>(
        &self,
        user_id: i64,
        achievement: &Achievement,
        evaluate: F,
    ) -> Result<ProgressUpdate>
    where
        F: FnOnce(&UserAchievementProgress) -> Evaluation,
    {
        let timer = MetricsTimer::new(self.metrics, "update_progress");
        let result = self.apply_progress(user_id, achievement, evaluate);
        timer.finish(result.is_ok());
        result
    }

    fn apply_progress<F>(&self, user_id: i64, achievement: &Achievement, evaluate: F) -> Result<ProgressUpdate>
    where
        F: FnOnce(&UserAchievementProgress) -> Evaluation,
    {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = Self::select_progress(&tx, user_id, achievement.id)?
            .unwrap_or_else(|| UserAchievementProgress::fresh(user_id, achievement.id, Utc::now()));

        let Evaluation { transition, next } = evaluate(&current);
        if transition == Transition::Unchanged {
            tx.commit()?;
            return Ok(ProgressUpdate {
                transition,
                progress: current,
                badge: None,
            });
        }

        let metadata = next.metadata.to_string();
        tx.execute(
            &format!(
                "INSERT INTO {t} ({user}, {ach}, {progress}, {count}, {done}, {done_at}, {updated}, {meta})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT({user}, {ach}) DO UPDATE SET
                    {progress} = excluded.{progress}, {count} = excluded.{count}, {done} = excluded.{done},
                    {done_at} = excluded.{done_at}, {updated} = excluded.{updated}, {meta} = excluded.{meta}
                 WHERE {t}.{done} = 0",
                t = user_achievement_progress::TABLE,
                user = user_achievement_progress::USER_ID,
                ach = user_achievement_progress::ACHIEVEMENT_ID,
                progress = user_achievement_progress::PROGRESS,
                count = user_achievement_progress::CURRENT_COUNT,
                done = user_achievement_progress::COMPLETED,
                done_at = user_achievement_progress::COMPLETED_AT,
                updated = user_achievement_progress::LAST_UPDATED,
                meta = user_achievement_progress::METADATA,
            ),
            params![
                user_id,
                achievement.id,
                next.progress,
                next.current_count,
                next.completed,
                next.completed_at,
                next.last_updated,
                metadata
            ],
        )?;

        let badge = if transition == Transition::Completed {
            let earned_at = next.completed_at.unwrap_or(next.last_updated);
            Self::grant_badge(&tx, user_id, achievement.badge_id, earned_at)?
        } else {
            None
        };

        let stored = Self::select_progress(&tx, user_id, achievement.id)?
            .ok_or(AyanfeError::AchievementNotFound(achievement.id))?;
        tx.commit()?;

        Ok(ProgressUpdate {
            transition,
            progress: stored,
            badge,
        })
    }

    fn select_progress(
        conn: &Connection,
        user_id: i64,
        achievement_id: i64,
    ) -> rusqlite::Result<Option<UserAchievementProgress>> {
        conn.query_row(
            &format!(
                "SELECT {id}, {user}, {ach}, {progress}, {count}, {done}, {done_at}, {updated}, {meta}
                 FROM {t} WHERE {user} = ?1 AND {ach} = ?2",
                t = user_achievement_progress::TABLE,
                id = user_achievement_progress::ID,
                user = user_achievement_progress::USER_ID,
                ach = user_achievement_progress::ACHIEVEMENT_ID,
                progress = user_achievement_progress::PROGRESS,
                count = user_achievement_progress::CURRENT_COUNT,
                done = user_achievement_progress::COMPLETED,
                done_at = user_achievement_progress::COMPLETED_AT,
                updated = user_achievement_progress::LAST_UPDATED,
                meta = user_achievement_progress::METADATA,
            ),
            params![user_id, achievement_id],
            |row| Self::map_progress(row, 0),
        )
        .optional()
    }

    /// Insert the badge row if absent; returns it only when newly created
    fn grant_badge(
        conn: &Connection,
        user_id: i64,
        badge_id: i64,
        earned_at: DateTime<Utc>,
    ) -> Result<Option<UserBadge>> {
        let inserted = conn.execute(
            &format!(
                "INSERT INTO {t} ({user}, {badge}, {earned}, {shown}, {progress}, {steps})
                 VALUES (?1, ?2, ?3, 1, 100, 1)
                 ON CONFLICT({user}, {badge}) DO NOTHING",
                t = user_badges::TABLE,
                user = user_badges::USER_ID,
                badge = user_badges::BADGE_ID,
                earned = user_badges::EARNED_AT,
                shown = user_badges::DISPLAYED,
                progress = user_badges::PROGRESS,
                steps = user_badges::COMPLETED_STEPS,
            ),
            params![user_id, badge_id, earned_at],
        )?;

        if inserted == 0 {
            debug!(user_id, badge_id, "Badge already owned");
            return Ok(None);
        }

        Ok(Some(UserBadge {
            id: conn.last_insert_rowid(),
            user_id,
            badge_id,
            earned_at,
            displayed: true,
            progress: 100,
            completed_steps: 1,
        }))
    }

    /// Achievements visible to a user, with their progress
    ///
    /// Secret achievements appear only once the user has completed them.
    pub fn list_achievements_for_user(&self, user_id: i64) -> Result<Vec<AchievementView>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT a.{a_id}, a.{a_name}, a.{a_desc}, a.{a_badge}, a.{a_type}, a.{a_req}, a.{a_cond}, a.{a_secret},
                    p.{p_id}, p.{p_user}, p.{p_ach}, p.{p_progress}, p.{p_count}, p.{p_done}, p.{p_done_at},
                    p.{p_updated}, p.{p_meta}
             FROM {a_t} a
             LEFT JOIN {p_t} p ON p.{p_ach} = a.{a_id} AND p.{p_user} = ?1
             WHERE a.{a_secret} = 0 OR p.{p_done} = 1
             ORDER BY a.{a_id}",
            a_t = achievements::TABLE,
            a_id = achievements::ID,
            a_name = achievements::NAME,
            a_desc = achievements::DESCRIPTION,
            a_badge = achievements::BADGE_ID,
            a_type = achievements::TYPE,
            a_req = achievements::REQUIRED_COUNT,
            a_cond = achievements::CONDITIONS,
            a_secret = achievements::IS_SECRET,
            p_t = user_achievement_progress::TABLE,
            p_id = user_achievement_progress::ID,
            p_user = user_achievement_progress::USER_ID,
            p_ach = user_achievement_progress::ACHIEVEMENT_ID,
            p_progress = user_achievement_progress::PROGRESS,
            p_count = user_achievement_progress::CURRENT_COUNT,
            p_done = user_achievement_progress::COMPLETED,
            p_done_at = user_achievement_progress::COMPLETED_AT,
            p_updated = user_achievement_progress::LAST_UPDATED,
            p_meta = user_achievement_progress::METADATA,
        ))?;

        let rows = stmt.query_map(params![user_id], |row| {
            let achievement = Self::map_achievement(row, 0)?;
            let progress_id: Option<i64> = row.get(8)?;
            let progress = match progress_id {
                Some(_) => Some(Self::map_progress(row, 8)?),
                None => None,
            };
            Ok(AchievementView { achievement, progress })
        })?;

        let mut results = Vec::new();
        for view in rows {
            results.push(view?);
        }
        Ok(results)
    }

    // ---- badges ----

    /// Badges a user owns, oldest first
    pub fn get_user_badges(&self, user_id: i64) -> Result<Vec<UserBadge>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ?1 ORDER BY {} ASC, {} ASC",
            user_badges::TABLE,
            user_badges::USER_ID,
            user_badges::EARNED_AT,
            user_badges::ID
        ))?;
        let rows = stmt.query_map(params![user_id], Self::map_user_badge)?;

        let mut results = Vec::new();
        for badge in rows {
            results.push(badge?);
        }
        Ok(results)
    }

    /// Show or hide an owned badge. Returns false if the user does not own it.
    pub fn set_badge_displayed(&self, user_id: i64, badge_id: i64, displayed: bool) -> Result<bool> {
        let conn = self.get_connection()?;
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET {} = ?3 WHERE {} = ?1 AND {} = ?2",
                user_badges::TABLE,
                user_badges::DISPLAYED,
                user_badges::USER_ID,
                user_badges::BADGE_ID
            ),
            params![user_id, badge_id, displayed],
        )?;
        Ok(updated > 0)
    }

    // ---- activity ledgers ----

    /// Log a command use; returns the number of distinct commands the user has used
    pub fn record_command(&self, user_id: i64, command: &str, used_at: DateTime<Utc>) -> Result<i64> {
        let conn = self.get_connection()?;
        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}) VALUES (?1, ?2, ?3)",
                command_usage::TABLE,
                command_usage::USER_ID,
                command_usage::COMMAND,
                command_usage::USED_AT
            ),
            params![user_id, command, used_at],
        )?;

        let distinct = conn.query_row(
            &format!(
                "SELECT COUNT(DISTINCT {}) FROM {} WHERE {} = ?1",
                command_usage::COMMAND,
                command_usage::TABLE,
                command_usage::USER_ID
            ),
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(distinct)
    }

    /// Log an emoji reaction; returns the number of distinct emojis the user has used
    pub fn record_emoji_reaction(
        &self,
        user_id: i64,
        message_id: Option<i64>,
        emoji: &str,
        reacted_at: DateTime<Utc>,
    ) -> Result<i64> {
        let conn = self.get_connection()?;
        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4)",
                emoji_reactions::TABLE,
                emoji_reactions::USER_ID,
                emoji_reactions::MESSAGE_ID,
                emoji_reactions::EMOJI,
                emoji_reactions::REACTED_AT
            ),
            params![user_id, message_id, emoji, reacted_at],
        )?;

        let distinct = conn.query_row(
            &format!(
                "SELECT COUNT(DISTINCT {}) FROM {} WHERE {} = ?1",
                emoji_reactions::EMOJI,
                emoji_reactions::TABLE,
                emoji_reactions::USER_ID
            ),
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(distinct)
    }

    /// Log a login day; returns the consecutive-day streak ending on `day`
    pub fn record_login(&self, user_id: i64, day: NaiveDate) -> Result<i64> {
        let conn = self.get_connection()?;
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} ({}, {}) VALUES (?1, ?2)",
                user_logins::TABLE,
                user_logins::USER_ID,
                user_logins::LOGIN_DATE
            ),
            params![user_id, day],
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {date} FROM {t} WHERE {user} = ?1 AND {date} <= ?2 ORDER BY {date} DESC",
            t = user_logins::TABLE,
            user = user_logins::USER_ID,
            date = user_logins::LOGIN_DATE,
        ))?;
        let days = stmt.query_map(params![user_id, day], |row| row.get::<_, NaiveDate>(0))?;

        let mut streak = 0;
        let mut expected = Some(day);
        for login_day in days {
            let login_day = login_day?;
            if Some(login_day) != expected {
                break;
            }
            streak += 1;
            expected = login_day.pred_opt();
        }
        Ok(streak)
    }

    /// Log an API call; returns (calls in this category, calls overall)
    pub fn record_api_usage(
        &self,
        user_id: i64,
        category: &str,
        endpoint: &str,
        used_at: DateTime<Utc>,
    ) -> Result<(i64, i64)> {
        let conn = self.get_connection()?;
        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4)",
                api_usage::TABLE,
                api_usage::USER_ID,
                api_usage::CATEGORY,
                api_usage::ENDPOINT,
                api_usage::USED_AT
            ),
            params![user_id, category, endpoint, used_at],
        )?;

        let counts = conn.query_row(
            &format!(
                "SELECT COALESCE(SUM({cat} = ?2), 0), COUNT(*) FROM {t} WHERE {user} = ?1",
                t = api_usage::TABLE,
                cat = api_usage::CATEGORY,
                user = api_usage::USER_ID,
            ),
            params![user_id, category],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(counts)
    }

    /// API calls per category for a user, busiest first
    pub fn api_usage_stats(&self, user_id: i64) -> Result<Vec<ApiUsageStat>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {cat}, COUNT(*) AS calls FROM {t} WHERE {user} = ?1 GROUP BY {cat} ORDER BY calls DESC, {cat} ASC",
            t = api_usage::TABLE,
            cat = api_usage::CATEGORY,
            user = api_usage::USER_ID,
        ))?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(ApiUsageStat {
                category: row.get(0)?,
                calls: row.get(1)?,
            })
        })?;

        let mut results = Vec::new();
        for stat in rows {
            results.push(stat?);
        }
        Ok(results)
    }

    // ---- row mapping ----

    fn map_user(row: &Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(users::ID)?,
            username: row.get(users::USERNAME)?,
            created_at: row.get(users::CREATED_AT)?,
        })
    }

    fn map_message(row: &Row) -> rusqlite::Result<Message> {
        Ok(Message {
            id: row.get(messages::ID)?,
            user_id: row.get(messages::USER_ID)?,
            content: row.get(messages::CONTENT)?,
            timestamp: row.get(messages::TIMESTAMP)?,
            is_bot: row.get(messages::IS_BOT)?,
        })
    }

    fn map_badge(row: &Row) -> rusqlite::Result<Badge> {
        let level: u8 = row.get(badges::LEVEL)?;
        let level = BadgeLevel::try_from(level).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, e.into())
        })?;

        Ok(Badge {
            id: row.get(badges::ID)?,
            name: row.get(badges::NAME)?,
            description: row.get(badges::DESCRIPTION)?,
            icon: row.get(badges::ICON)?,
            image_url: row.get(badges::IMAGE_URL)?,
            category: row.get(badges::CATEGORY)?,
            level,
            points: row.get(badges::POINTS)?,
        })
    }

    /// Achievement columns in table order, starting at `offset`
    fn map_achievement(row: &Row, offset: usize) -> rusqlite::Result<Achievement> {
        let type_name: String = row.get(offset + 4)?;
        let conditions_json: String = row.get(offset + 6)?;
        let conditions: AchievementConditions = serde_json::from_str(&conditions_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(offset + 6, Type::Text, Box::new(e)))?;

        Ok(Achievement {
            id: row.get(offset)?,
            name: row.get(offset + 1)?,
            description: row.get(offset + 2)?,
            badge_id: row.get(offset + 3)?,
            achievement_type: AchievementType::from(type_name.as_str()),
            required_count: row.get(offset + 5)?,
            conditions,
            is_secret: row.get(offset + 7)?,
        })
    }

    /// Progress columns in table order, starting at `offset`
    fn map_progress(row: &Row, offset: usize) -> rusqlite::Result<UserAchievementProgress> {
        let metadata_json: String = row.get(offset + 8)?;
        let metadata = serde_json::from_str(&metadata_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(offset + 8, Type::Text, Box::new(e)))?;

        Ok(UserAchievementProgress {
            id: row.get(offset)?,
            user_id: row.get(offset + 1)?,
            achievement_id: row.get(offset + 2)?,
            progress: row.get(offset + 3)?,
            current_count: row.get(offset + 4)?,
            completed: row.get(offset + 5)?,
            completed_at: row.get(offset + 6)?,
            last_updated: row.get(offset + 7)?,
            metadata,
        })
    }

    fn map_user_badge(row: &Row) -> rusqlite::Result<UserBadge> {
        Ok(UserBadge {
            id: row.get(user_badges::ID)?,
            user_id: row.get(user_badges::USER_ID)?,
            badge_id: row.get(user_badges::BADGE_ID)?,
            earned_at: row.get(user_badges::EARNED_AT)?,
            displayed: row.get(user_badges::DISPLAYED)?,
            progress: row.get(user_badges::PROGRESS)?,
            completed_steps: row.get(user_badges::COMPLETED_STEPS)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_streak_counts_consecutive_days() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("ada").unwrap();
        let day = |d| NaiveDate::from_ymd_opt(2026, 3, d).unwrap();

        assert_eq!(db.record_login(user.id, day(1)).unwrap(), 1);
        assert_eq!(db.record_login(user.id, day(2)).unwrap(), 2);
        assert_eq!(db.record_login(user.id, day(2)).unwrap(), 2);
        assert_eq!(db.record_login(user.id, day(3)).unwrap(), 3);
        assert_eq!(db.record_login(user.id, day(5)).unwrap(), 1);
        assert_eq!(db.record_login(user.id, day(6)).unwrap(), 2);
    }

    #[test]
    fn test_api_usage_counts() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("ada").unwrap();
        let now = Utc::now();

        assert_eq!(db.record_api_usage(user.id, "image", "/api/image", now).unwrap(), (1, 1));
        assert_eq!(db.record_api_usage(user.id, "chat", "/api/chat", now).unwrap(), (1, 2));
        assert_eq!(db.record_api_usage(user.id, "image", "/api/image", now).unwrap(), (2, 3));

        let stats = db.api_usage_stats(user.id).unwrap();
        assert_eq!(stats[0], ApiUsageStat { category: "image".to_string(), calls: 2 });
        assert_eq!(stats[1], ApiUsageStat { category: "chat".to_string(), calls: 1 });
    }

    #[test]
    fn test_distinct_ledgers() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("ada").unwrap();
        let now = Utc::now();

        assert_eq!(db.record_command(user.id, "/lyrics", now).unwrap(), 1);
        assert_eq!(db.record_command(user.id, "/lyrics", now).unwrap(), 1);
        assert_eq!(db.record_command(user.id, "/roast", now).unwrap(), 2);

        assert_eq!(db.record_emoji_reaction(user.id, None, "🔥", now).unwrap(), 1);
        assert_eq!(db.record_emoji_reaction(user.id, None, "🔥", now).unwrap(), 1);
        assert_eq!(db.record_emoji_reaction(user.id, None, "😂", now).unwrap(), 2);
    }

    #[test]
    fn test_message_history_limit_keeps_latest() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("ada").unwrap();
        let start = Utc::now();

        for i in 0..5 {
            db.add_message(NewMessage {
                user_id: user.id,
                content: format!("m{i}"),
                timestamp: start + chrono::Duration::seconds(i),
                is_bot: i % 2 == 1,
            })
            .unwrap();
        }

        let latest: Vec<String> = db
            .get_messages(user.id, Some(2))
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(latest, vec!["m3", "m4"]);
        assert_eq!(db.get_messages(user.id, None).unwrap().len(), 5);
        assert_eq!(db.count_user_messages(user.id).unwrap(), 3);
    }
}
