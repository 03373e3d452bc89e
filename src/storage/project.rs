//! Project management
//!
//! Handles project initialization and provides access to the record store
//! and the notification outbox.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::config::PROJECT_DIR;
use super::{Config, OutboxNotifier, Store};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a shelter project. Run 'shelter init' first.")]
    NotInProject,
}

/// A shelter project directory
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(PROJECT_DIR).is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path. Safe to run twice.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let shelter_dir = root.join(PROJECT_DIR);

        fs::create_dir_all(&shelter_dir).with_context(|| {
            format!("Failed to create .shelter directory: {}", shelter_dir.display())
        })?;

        // Create default config
        let config_path = shelter_dir.join("config.toml");
        if !config_path.exists() {
            let default_config = r#"# Shelter lifecycle configuration

# Database file inside .shelter/
database = "shelter.db"

# Milliseconds a writer waits for the database lock
busy_timeout_ms = 5000

# Tracing filter used when RUST_LOG is unset
log_filter = "warn"

[notifications]
enabled = true
outbox = "notifications.jsonl"
"#;
            fs::write(&config_path, default_config)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        // Create .gitignore for .shelter
        let gitignore_path = shelter_dir.join(".gitignore");
        if !gitignore_path.exists() {
            let gitignore = r#"# Database and its WAL files
*.db
*.db-wal
*.db-shm

# Notification outbox (drained by the delivery process)
*.jsonl
"#;
            fs::write(&gitignore_path, gitignore).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        let project = Self::open(root)?;
        // Creates the schema up front
        project.store()?;
        tracing::debug!(root = %project.root.display(), "project initialized");

        Ok(project)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .shelter directory path
    pub fn shelter_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the database file path
    pub fn database_path(&self) -> PathBuf {
        self.shelter_dir().join(&self.config.project.database)
    }

    /// Returns the notification outbox path
    pub fn outbox_path(&self) -> PathBuf {
        self.shelter_dir()
            .join(&self.config.project.notifications.outbox)
    }

    /// Opens the record store for this project
    pub fn store(&self) -> Result<Store> {
        let path = self.database_path();
        Store::open(&path, self.config.project.busy_timeout())
            .with_context(|| format!("Failed to open database: {}", path.display()))
    }

    /// Returns the outbox if notifications are enabled
    pub fn outbox(&self) -> Option<OutboxNotifier> {
        self.config
            .project
            .notifications
            .enabled
            .then(|| OutboxNotifier::new(self.outbox_path()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ShelterId;
    use tempfile::TempDir;

    #[test]
    fn init_creates_structure() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert!(project.shelter_dir().is_dir());
        assert!(project.shelter_dir().join("config.toml").is_file());
        assert!(project.shelter_dir().join(".gitignore").is_file());
        assert!(project.database_path().is_file());
    }

    #[test]
    fn init_is_idempotent() {
        let dir = TempDir::new().unwrap();

        let project = Project::init(dir.path()).unwrap();
        let animal = project
            .store()
            .unwrap()
            .register_animal("Biscuit", None, ShelterId::new(1))
            .unwrap();

        // Should not fail or wipe data
        let project = Project::init(dir.path()).unwrap();
        assert!(project
            .store()
            .unwrap()
            .records()
            .find_animal(animal.id)
            .unwrap()
            .is_some());
    }

    #[test]
    fn open_existing_project() {
        let dir = TempDir::new().unwrap();
        Project::init(dir.path()).unwrap();

        let project = Project::open(dir.path()).unwrap();
        assert_eq!(project.root(), dir.path());
        assert!(project.outbox_path().ends_with("notifications.jsonl"));
    }

    #[test]
    fn open_non_project_fails() {
        let dir = TempDir::new().unwrap();
        let result = Project::open(dir.path());

        assert!(result.is_err());
    }

    #[test]
    fn outbox_follows_config() {
        let dir = TempDir::new().unwrap();
        Project::init(dir.path()).unwrap();
        assert!(Project::open(dir.path()).unwrap().outbox().is_some());

        fs::write(
            dir.path().join(PROJECT_DIR).join("config.toml"),
            "[notifications]\nenabled = false\n",
        )
        .unwrap();
        assert!(Project::open(dir.path()).unwrap().outbox().is_none());
    }
}
