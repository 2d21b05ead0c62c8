use ayanfe_core::catalog::Catalog;
use ayanfe_core::db::Database;
use ayanfe_core::models::NewMessage;
use ayanfe_core::tracker::{Evaluation, Transition};
use chrono::Utc;
use tempfile::TempDir;

fn temp_database() -> (TempDir, Database) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite://{}", db_path.display());
    let db = Database::new(&db_url).expect("Failed to create database");
    (temp_dir, db)
}

fn seeded() -> (TempDir, Database) {
    let (dir, db) = temp_database();
    db.seed_catalog(&Catalog::builtin().unwrap()).expect("Failed to seed catalog");
    (dir, db)
}

#[test]
fn test_database_creation_and_initialization() {
    let (_dir, db) = temp_database();
    let _conn = db.get_connection().expect("Failed to get database connection");
}

#[test]
fn test_reopen_keeps_data() {
    let temp_dir = TempDir::new().unwrap();
    let db_url = format!("sqlite:{}", temp_dir.path().join("nested/dir/test.db").display());

    let db = Database::new(&db_url).unwrap();
    db.create_user("ada").unwrap();
    drop(db);

    let db = Database::new(&db_url).unwrap();
    assert!(db.get_user_by_name("ada").unwrap().is_some());
}

#[test]
fn test_user_management() {
    let (_dir, db) = temp_database();

    let user = db.create_user("ada").expect("Failed to create user");
    assert_eq!(db.get_user(user.id).unwrap().unwrap().username, "ada");
    assert!(db.create_user("ada").is_err(), "usernames are unique");
    assert!(db.get_user_by_name("grace").unwrap().is_none());
}

#[test]
fn test_seed_is_idempotent() {
    let (_dir, db) = temp_database();
    let catalog = Catalog::builtin().unwrap();

    let first = db.seed_catalog(&catalog).unwrap();
    let second = db.seed_catalog(&catalog).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.skipped, 0);

    let badge = db.get_badge(11).unwrap().unwrap();
    assert_eq!(badge.name, "Night Owl");
    let achievement = db.get_achievement(11).unwrap().unwrap();
    assert!(achievement.is_secret);
    assert_eq!(achievement.conditions.start_hour, Some(0));
    assert_eq!(achievement.conditions.end_hour, Some(4));
}

#[test]
fn test_secret_achievements_hidden_until_completed() {
    let (_dir, db) = seeded();
    let user = db.create_user("ada").unwrap();
    let secret = db.get_achievement(11).unwrap().unwrap();

    let visible: Vec<i64> = db
        .list_achievements_for_user(user.id)
        .unwrap()
        .iter()
        .map(|v| v.achievement.id)
        .collect();
    assert!(!visible.contains(&11));
    assert!(!visible.contains(&12));
    assert!(visible.contains(&1));

    let now = Utc::now();
    let update = db
        .update_progress(user.id, &secret, |current| {
            let mut next = current.clone();
            next.current_count = 1;
            next.progress = 100;
            next.completed = true;
            next.completed_at = Some(now);
            next.last_updated = now;
            Evaluation {
                transition: Transition::Completed,
                next,
            }
        })
        .unwrap();
    assert!(update.badge.is_some());

    let views = db.list_achievements_for_user(user.id).unwrap();
    let night = views.iter().find(|v| v.achievement.id == 11).expect("completed secret is listed");
    assert!(night.progress.as_ref().unwrap().completed);
    assert!(!views.iter().any(|v| v.achievement.id == 12));

    // Another user still cannot see it
    let other = db.create_user("grace").unwrap();
    assert!(!db
        .list_achievements_for_user(other.id)
        .unwrap()
        .iter()
        .any(|v| v.achievement.id == 11));
}

#[test]
fn test_completed_row_is_not_overwritten() {
    let (_dir, db) = seeded();
    let user = db.create_user("ada").unwrap();
    let first = db.get_achievement(1).unwrap().unwrap();
    let now = Utc::now();

    let complete = |current: &ayanfe_core::models::UserAchievementProgress| {
        let mut next = current.clone();
        next.current_count = 1;
        next.progress = 100;
        next.completed = true;
        next.completed_at = Some(now);
        Evaluation {
            transition: Transition::Completed,
            next,
        }
    };
    let granted = db.update_progress(user.id, &first, complete).unwrap();
    assert!(granted.badge.is_some());

    // Even a buggy evaluation cannot regress a completed row or duplicate the badge
    let again = db
        .update_progress(user.id, &first, |current| {
            let mut next = current.clone();
            next.current_count = 0;
            next.progress = 0;
            next.completed = false;
            Evaluation {
                transition: Transition::Completed,
                next,
            }
        })
        .unwrap();
    assert!(again.badge.is_none());
    assert!(again.progress.completed);
    assert_eq!(again.progress.current_count, 1);
    assert_eq!(db.get_user_badges(user.id).unwrap().len(), 1);
}

#[test]
fn test_badge_display_toggle() {
    let (_dir, db) = seeded();
    let user = db.create_user("ada").unwrap();
    assert!(!db.set_badge_displayed(user.id, 1, false).unwrap());

    let first = db.get_achievement(1).unwrap().unwrap();
    let now = Utc::now();
    db.update_progress(user.id, &first, |current| {
        let mut next = current.clone();
        next.current_count = 1;
        next.progress = 100;
        next.completed = true;
        next.completed_at = Some(now);
        Evaluation {
            transition: Transition::Completed,
            next,
        }
    })
    .unwrap();

    let badges = db.get_user_badges(user.id).unwrap();
    assert!(badges[0].displayed);
    assert_eq!(badges[0].earned_at.timestamp(), now.timestamp());

    assert!(db.set_badge_displayed(user.id, 1, false).unwrap());
    let badges = db.get_user_badges(user.id).unwrap();
    assert!(!badges[0].displayed);
    assert_eq!(badges.len(), 1, "hiding does not remove ownership");
}

#[test]
fn test_delete_user_cascades() {
    let (_dir, db) = seeded();
    let user = db.create_user("ada").unwrap();
    let now = Utc::now();

    let message = db
        .add_message(NewMessage {
            user_id: user.id,
            content: "hello".to_string(),
            timestamp: now,
            is_bot: false,
        })
        .unwrap();
    db.record_command(user.id, "/lyrics", now).unwrap();
    db.record_emoji_reaction(user.id, Some(message.id), "🔥", now).unwrap();
    db.record_api_usage(user.id, "image", "/api/image", now).unwrap();

    assert!(db.delete_user(user.id).unwrap());
    assert!(!db.delete_user(user.id).unwrap());

    assert!(db.get_messages(user.id, None).unwrap().is_empty());
    assert!(db.api_usage_stats(user.id).unwrap().is_empty());
    assert!(db.get_user_badges(user.id).unwrap().is_empty());

    // Catalog rows are not owned by users
    assert!(db.get_badge(1).unwrap().is_some());
}
