//! # Storage Layer
//!
//! Persistence for the shelter lifecycle: one SQLite database per project
//! plus a JSONL notification outbox.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Animals, adoption and foster requests | SQLite | `.shelter/shelter.db` |
//! | Notifications | JSONL (one JSON per line) | `.shelter/notifications.jsonl` |
//! | Config | TOML | `.shelter/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`Store`] writes run in `BEGIN IMMEDIATE` transactions; other
//!   connections wait up to `busy_timeout_ms` for the lock
//! - [`OutboxNotifier`] uses file locking (`fs2`) for concurrent appends
//! - [`ProjectionCache`] is behind `RwLock`s and shared across threads
//!
//! ## Project Structure
//!
//! ```text
//! .shelter/
//! ├── shelter.db            # Record store
//! ├── notifications.jsonl   # Notification outbox
//! ├── config.toml           # Project configuration
//! └── .gitignore            # Ignores database and outbox
//! ```
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for accessing a shelter project
//! - [`Store`] / [`Records`] - Record store and its query operations
//! - [`Config`] - Project and global configuration

mod config;
mod filter;
mod outbox;
mod project;
mod projection;
mod store;

pub use config::{
    Config, ConfigError, GlobalConfig, NotificationConfig, OutputFormat, ProjectConfig,
    PROJECT_DIR,
};
pub use filter::{AdoptionFilter, AdoptionOrder, AnimalFilter, Direction, FosterFilter, FosterOrder};
pub use outbox::OutboxNotifier;
pub use project::{Project, ProjectError};
pub use projection::ProjectionCache;
pub use store::{Records, Store, StoreError, StoreResult};
