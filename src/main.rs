use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use ayanfe_core::catalog::Catalog;
use ayanfe_core::classifier::ContentClassifier;
use ayanfe_core::config::AppConfig;
use ayanfe_core::db::{Database, SeedSummary};
use ayanfe_core::logging::init_logging;
use ayanfe_core::metrics::MetricsCollector;
use ayanfe_core::notify::BroadcastNotifier;
use ayanfe_core::service::ChatService;
use ayanfe_core::tracker::{AchievementTracker, TrackerReport};
use ayanfe_core::validation::InputValidator;
use chrono::{DateTime, FixedOffset, Local};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL, overriding configuration
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the badge and achievement catalog into the database
    Seed,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Post a chat message
    Send {
        /// Username
        #[arg(short, long)]
        user: String,

        /// Message content
        message: String,

        /// Store as a bot reply
        #[arg(long)]
        bot: bool,

        /// Local time of the event (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// Record a slash command
    Command {
        /// Username
        #[arg(short, long)]
        user: String,

        /// Command, e.g. /lyrics
        name: String,

        /// Local time of the event (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// Record a login
    Login {
        /// Username
        #[arg(short, long)]
        user: String,

        /// Local time of the event (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// Record a third-party API call
    Api {
        /// Username
        #[arg(short, long)]
        user: String,

        /// API category (chat, image, lyrics, ...)
        category: String,

        /// Endpoint that was called
        #[arg(short, long, default_value = "/api")]
        endpoint: String,

        /// Local time of the event (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// Record an emoji reaction
    React {
        /// Username
        #[arg(short, long)]
        user: String,

        /// Emoji
        emoji: String,

        /// Message reacted to
        #[arg(short, long)]
        message_id: Option<i64>,

        /// Local time of the event (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// Show how a piece of content would render
    Classify {
        /// Raw message content
        content: String,
    },
    /// Show a user's conversation
    History {
        /// Username
        #[arg(short, long)]
        user: String,

        /// Only the most recent N messages
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List achievements visible to a user
    Achievements {
        /// Username
        #[arg(short, long)]
        user: String,
    },
    /// List badges a user owns
    Badges {
        /// Username
        #[arg(short, long)]
        user: String,
    },
    /// Show or hide an owned badge
    DisplayBadge {
        /// Username
        #[arg(short, long)]
        user: String,

        /// Badge id
        badge_id: i64,

        /// Hide instead of show
        #[arg(long)]
        hide: bool,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Register a user
    Create {
        /// Username
        name: String,
    },
    /// Delete a user and all their data
    Delete {
        /// Username
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    let log_file = config.logging.file_path.as_ref().map(PathBuf::from);
    let _guard = init_logging(
        Some(&config.get_log_level()),
        log_file.as_deref(),
        &config.logging.format,
    )?;

    if let Err(e) = MetricsCollector::init() {
        warn!("Metrics recorder not installed: {e}");
    }

    let classifier = ContentClassifier::with_markdown_threshold(config.classifier.markdown_length_threshold)?;

    if let Commands::Classify { content } = &cli.command {
        let parsed = classifier.classify(content);
        println!("{}", serde_json::to_string_pretty(&parsed)?);
        return Ok(());
    }

    let database_url = cli.database.clone().unwrap_or_else(|| config.get_database_url());
    InputValidator::validate_database_url(&database_url)?;
    let db = Database::from_config(&config.database, &database_url)
        .with_context(|| format!("Failed to open database {database_url}"))?;

    let catalog = Catalog::load(config.achievements.catalog_path.as_deref().map(Path::new))?;
    let seeded = db.seed_catalog(&catalog)?;

    let notifier = BroadcastNotifier::new(config.achievements.notification_capacity);
    let mut unlocks = notifier.subscribe();
    let listener = tokio::spawn(async move {
        loop {
            match unlocks.recv().await {
                Ok(event) => println!(
                    "🎉 Achievement unlocked: {} {} ({})",
                    event.badge.icon, event.achievement.name, event.badge.name
                ),
                Err(RecvError::Lagged(missed)) => warn!(missed, "Unlock listener fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let tracker = AchievementTracker::new(Arc::new(catalog), db.clone(), Arc::new(notifier));
    let service = ChatService::new(db, classifier, tracker);

    info!("Starting ayanfe");
    let result = run(&cli.command, &service, seeded);

    // Closes the notification channel so the listener drains and exits
    drop(service);
    listener.await.context("Unlock listener panicked")?;

    result
}

fn run(command: &Commands, service: &ChatService, seeded: SeedSummary) -> Result<()> {
    match command {
        Commands::Seed => {
            println!(
                "Seeded {} badges and {} achievements ({} skipped)",
                seeded.badges, seeded.achievements, seeded.skipped
            );
        },
        Commands::User { action } => match action {
            UserAction::Create { name } => {
                let user = service.register_user(name)?;
                println!("Created user {} (id {})", user.username, user.id);
            },
            UserAction::Delete { name } => {
                let user = service.find_user(name)?;
                service.database().delete_user(user.id)?;
                println!("Deleted user {}", user.username);
            },
        },
        Commands::Send { user, message, bot, at } => {
            let user = service.find_user(user)?;
            let at = parse_event_time(at.as_deref())?;
            if *bot {
                let stored = service.post_bot_reply(user.id, message, at)?;
                println!("Stored bot reply {}", stored.id);
            } else {
                let (stored, report) = service.post_message(user.id, message, at)?;
                println!("Stored message {}", stored.id);
                print_report(&report);
            }
        },
        Commands::Command { user, name, at } => {
            let user = service.find_user(user)?;
            let report = service.use_command(user.id, name, parse_event_time(at.as_deref())?)?;
            print_report(&report);
        },
        Commands::Login { user, at } => {
            let user = service.find_user(user)?;
            let report = service.log_in(user.id, parse_event_time(at.as_deref())?)?;
            print_report(&report);
        },
        Commands::Api {
            user,
            category,
            endpoint,
            at,
        } => {
            let user = service.find_user(user)?;
            let report = service.record_api_call(user.id, category, endpoint, parse_event_time(at.as_deref())?)?;
            print_report(&report);
            for stat in service.database().api_usage_stats(user.id)? {
                println!("  {:<10} {}", stat.category, stat.calls);
            }
        },
        Commands::React {
            user,
            emoji,
            message_id,
            at,
        } => {
            let user = service.find_user(user)?;
            let report = service.react_with_emoji(user.id, *message_id, emoji, parse_event_time(at.as_deref())?)?;
            print_report(&report);
        },
        Commands::Classify { .. } => {},
        Commands::History { user, limit, json } => {
            let user = service.find_user(user)?;
            let history = service.render_history(user.id, *limit)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else {
                for entry in history {
                    let who = if entry.message.is_bot { "ayanfe" } else { user.username.as_str() };
                    println!(
                        "[{}] {who} ({}): {}",
                        entry.message.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        entry.parsed.kind,
                        entry.parsed.content
                    );
                }
            }
        },
        Commands::Achievements { user } => {
            let user = service.find_user(user)?;
            for view in service.achievements_for(user.id)? {
                let a = &view.achievement;
                let (progress, count, done) = view
                    .progress
                    .as_ref()
                    .map_or((0, 0, false), |p| (p.progress, p.current_count, p.completed));
                println!(
                    "{} {:<20} {:>3}%  {}/{}  {}",
                    if done { "✔" } else { " " },
                    a.name,
                    progress,
                    count,
                    a.required_count,
                    a.description
                );
            }
        },
        Commands::Badges { user } => {
            let user = service.find_user(user)?;
            for earned in service.badges_for(user.id)? {
                println!(
                    "{} {} ({:?}, {} pts) earned {}{}",
                    earned.badge.icon,
                    earned.badge.name,
                    earned.badge.level,
                    earned.badge.points,
                    earned.owned.earned_at.format("%Y-%m-%d"),
                    if earned.owned.displayed { "" } else { " [hidden]" }
                );
            }
        },
        Commands::DisplayBadge { user, badge_id, hide } => {
            let user = service.find_user(user)?;
            service.set_badge_displayed(user.id, *badge_id, !*hide)?;
            println!("Badge {badge_id} {}", if *hide { "hidden" } else { "displayed" });
        },
    }

    Ok(())
}

/// Parse an RFC 3339 timestamp, keeping its offset as the user's local clock
fn parse_event_time(at: Option<&str>) -> Result<DateTime<FixedOffset>> {
    at.map_or_else(
        || Ok(Local::now().fixed_offset()),
        |s| DateTime::parse_from_rfc3339(s).with_context(|| format!("Invalid timestamp: {s}")),
    )
}

fn print_report(report: &TrackerReport) {
    debug!(
        advanced = report.advanced.len(),
        unlocked = report.unlocked.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "Tracker report"
    );
    for progress in &report.advanced {
        println!(
            "  progress: achievement {} at {}% ({})",
            progress.achievement_id, progress.progress, progress.current_count
        );
    }
    if !report.failed.is_empty() {
        warn!(failed = ?report.failed, "Some achievements could not be updated");
    }
}
