//! Badge and achievement definitions.
//!
//! The catalog is static configuration: parsed once at startup (the built-in
//! YAML or a file named in the configuration), seeded into the database, and
//! handed to the tracker explicitly.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

use crate::error::{AyanfeError, Result};
use crate::models::{Achievement, AchievementType, Badge};
use crate::validation::InputValidator;

const DEFAULT_CATALOG: &str = include_str!("../catalog/default.yaml");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    badges: Vec<Badge>,
    #[serde(default)]
    achievements: Vec<Achievement>,
}

/// Problems found in an otherwise loadable catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogIssue {
    /// Achievement references a badge that is not defined
    UnknownBadge {
        /// Achievement id
        achievement_id: i64,
        /// Missing badge id
        badge_id: i64,
    },
    /// Achievement type is not understood
    UnsupportedType {
        /// Achievement id
        achievement_id: i64,
    },
    /// `time_of_day` achievement without a usable hour window
    MissingHourWindow {
        /// Achievement id
        achievement_id: i64,
    },
}

/// Loaded badge and achievement definitions
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    badges: HashMap<i64, Badge>,
    achievements: Vec<Achievement>,
}

impl Catalog {
    /// Parse the catalog built into the binary
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(DEFAULT_CATALOG)
    }

    /// Parse a catalog file
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let catalog = Self::from_yaml(&text)?;
        info!(path = %path.display(), "Loaded achievement catalog");
        Ok(catalog)
    }

    /// Load from `path` if given, otherwise the built-in catalog
    pub fn load(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(Self::builtin, Self::from_path)
    }

    /// Parse catalog YAML
    ///
    /// Duplicate ids or names and non-positive thresholds are rejected.
    /// Dangling badge references are kept and reported by [`Catalog::issues`];
    /// the tracker skips those achievements.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(text)?;
        Self::from_parts(file.badges, file.achievements)
    }

    /// Build a catalog from already-parsed definitions
    pub fn from_parts(badges: Vec<Badge>, achievements: Vec<Achievement>) -> Result<Self> {
        let mut badge_map = HashMap::with_capacity(badges.len());
        let mut badge_names = HashSet::new();
        for badge in badges {
            if !badge_names.insert(badge.name.clone()) {
                return Err(AyanfeError::InvalidConfig(format!("duplicate badge name: {}", badge.name)));
            }
            if let Some(previous) = badge_map.insert(badge.id, badge) {
                return Err(AyanfeError::InvalidConfig(format!("duplicate badge id: {}", previous.id)));
            }
        }

        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for achievement in &achievements {
            if !ids.insert(achievement.id) {
                return Err(AyanfeError::InvalidConfig(format!("duplicate achievement id: {}", achievement.id)));
            }
            if !names.insert(achievement.name.as_str()) {
                return Err(AyanfeError::InvalidConfig(format!(
                    "duplicate achievement name: {}",
                    achievement.name
                )));
            }
            if achievement.required_count < 1 {
                return Err(AyanfeError::InvalidConfig(format!(
                    "achievement {} has required_count {}",
                    achievement.id, achievement.required_count
                )));
            }
        }

        let catalog = Self {
            badges: badge_map,
            achievements,
        };
        for issue in catalog.issues() {
            warn!(?issue, "Catalog entry will be skipped");
        }
        Ok(catalog)
    }

    /// Badge by id
    #[must_use]
    pub fn badge(&self, id: i64) -> Option<&Badge> {
        self.badges.get(&id)
    }

    /// All badges, ordered by id
    #[must_use]
    pub fn badges(&self) -> Vec<&Badge> {
        let mut badges: Vec<&Badge> = self.badges.values().collect();
        badges.sort_by_key(|b| b.id);
        badges
    }

    /// All achievements in catalog order
    #[must_use]
    pub fn achievements(&self) -> &[Achievement] {
        &self.achievements
    }

    /// Achievements listening to `achievement_type`
    pub fn achievements_of(&self, achievement_type: AchievementType) -> impl Iterator<Item = &Achievement> {
        self.achievements
            .iter()
            .filter(move |a| a.achievement_type == achievement_type)
    }

    /// Entries the tracker will refuse to evaluate
    #[must_use]
    pub fn issues(&self) -> Vec<CatalogIssue> {
        self.achievements.iter().flat_map(|a| self.issues_for(a)).collect()
    }

    /// True when `achievement` can be seeded and tracked
    #[must_use]
    pub fn is_evaluable(&self, achievement: &Achievement) -> bool {
        self.issues_for(achievement).is_empty()
    }

    fn issues_for(&self, achievement: &Achievement) -> Vec<CatalogIssue> {
        let mut issues = Vec::new();
        if !self.badges.contains_key(&achievement.badge_id) {
            issues.push(CatalogIssue::UnknownBadge {
                achievement_id: achievement.id,
                badge_id: achievement.badge_id,
            });
        }
        match achievement.achievement_type {
            AchievementType::Unsupported => issues.push(CatalogIssue::UnsupportedType {
                achievement_id: achievement.id,
            }),
            AchievementType::TimeOfDay if !has_usable_window(achievement) => {
                issues.push(CatalogIssue::MissingHourWindow {
                    achievement_id: achievement.id,
                });
            },
            _ => {},
        }
        issues
    }
}

/// Both bounds present and accepted by the hour-window check
#[must_use]
pub fn has_usable_window(achievement: &Achievement) -> bool {
    match (achievement.conditions.start_hour, achievement.conditions.end_hour) {
        (Some(start), Some(end)) => InputValidator::validate_hour_window(start, end).is_ok(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_clean() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.issues().is_empty());
        assert!(!catalog.achievements().is_empty());
        for achievement in catalog.achievements() {
            assert!(catalog.badge(achievement.badge_id).is_some());
        }
    }

    #[test]
    fn test_builtin_has_secret_time_window() {
        let catalog = Catalog::builtin().unwrap();
        let night = catalog
            .achievements_of(AchievementType::TimeOfDay)
            .find(|a| a.conditions.start_hour == Some(0))
            .unwrap();
        assert!(night.is_secret);
        assert_eq!(night.conditions.end_hour, Some(4));
    }

    #[test]
    fn test_unknown_badge_is_reported_not_rejected() {
        let yaml = r#"
badges: []
achievements:
  - id: 1
    name: Orphan
    description: no badge
    badgeId: 99
    type: message_count
    requiredCount: 3
"#;
        let catalog = Catalog::from_yaml(yaml).unwrap();
        assert_eq!(
            catalog.issues(),
            vec![CatalogIssue::UnknownBadge {
                achievement_id: 1,
                badge_id: 99
            }]
        );
    }

    #[test]
    fn test_out_of_range_window_is_not_evaluable() {
        let yaml = r#"
badges:
  - id: 1
    name: Late
    description: d
    icon: x
    category: c
    level: 1
achievements:
  - id: 1
    name: Past Midnight
    description: d
    badgeId: 1
    type: time_of_day
    requiredCount: 1
    conditions:
      startHour: 22
      endHour: 30
  - id: 2
    name: Never
    description: d
    badgeId: 1
    type: time_of_day
    requiredCount: 1
    conditions:
      startHour: 5
      endHour: 5
"#;
        let catalog = Catalog::from_yaml(yaml).unwrap();
        assert_eq!(
            catalog.issues(),
            vec![
                CatalogIssue::MissingHourWindow { achievement_id: 1 },
                CatalogIssue::MissingHourWindow { achievement_id: 2 },
            ]
        );
        assert!(catalog.achievements().iter().all(|a| !catalog.is_evaluable(a)));
    }

    #[test]
    fn test_unknown_type_parses_as_unsupported() {
        let yaml = r#"
badges:
  - id: 1
    name: B
    description: d
    icon: x
    category: c
    level: 1
achievements:
  - id: 1
    name: Future
    description: d
    badgeId: 1
    type: voice_minutes
    requiredCount: 3
"#;
        let catalog = Catalog::from_yaml(yaml).unwrap();
        assert_eq!(catalog.achievements()[0].achievement_type, AchievementType::Unsupported);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let yaml = r#"
badges:
  - { id: 1, name: A, description: d, icon: x, category: c, level: 1 }
  - { id: 1, name: B, description: d, icon: x, category: c, level: 2 }
"#;
        assert!(Catalog::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_bad_level_rejected() {
        let yaml = r#"
badges:
  - { id: 1, name: A, description: d, icon: x, category: c, level: 4 }
"#;
        assert!(Catalog::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_zero_required_count_rejected() {
        let yaml = r#"
badges:
  - { id: 1, name: A, description: d, icon: x, category: c, level: 1 }
achievements:
  - { id: 1, name: Z, description: d, badgeId: 1, type: message_count, requiredCount: 0 }
"#;
        assert!(Catalog::from_yaml(yaml).is_err());
    }
}
