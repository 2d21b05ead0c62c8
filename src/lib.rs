//! Ayanfe Core - Chat Rendering and Achievements
//!
//! The decision logic behind the Ayanfe AI chat: deciding how stored chat
//! messages render, and turning user activity into achievement progress and
//! badges.
//!
//! # Features
//!
//! - Classify message content (text, markdown, image, audio, video, html)
//! - Persist chat history, activity ledgers and progress in SQLite
//! - Track counting and time-of-day achievements with serialized updates
//! - Broadcast unlock notifications
//! - Configurable catalog, logging and storage

/// Badge and achievement catalog
pub mod catalog;
/// Message content classification
pub mod classifier;
/// Configuration management
pub mod config;
/// Database operations and connection pooling
pub mod db;
/// Error types
pub mod error;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Unlock notifications
pub mod notify;
/// Database schema definitions
pub mod schema;
/// Activity service
pub mod service;
/// Achievement progress tracking
pub mod tracker;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use catalog::Catalog;
pub use classifier::ContentClassifier;
pub use db::Database;
pub use error::{AyanfeError, Result};
pub use models::{Achievement, ActivityEvent, ActivityKind, Badge, ContentKind, Message, ParsedContent};
pub use notify::{AchievementNotifier, AchievementUnlocked, BroadcastNotifier};
pub use service::ChatService;
pub use tracker::{AchievementTracker, TrackerReport};
