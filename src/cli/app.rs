//! Main CLI application structure

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::{adoption, animal, foster, timeline};
use crate::domain::{Actor, AnimalId, Role, ShelterId, UserId};
use crate::engine::{LifecycleEngine, LogNotifier};
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "shelter")]
#[command(author, version, about = "Adoption and foster lifecycle for animal shelters")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Acting user id
    #[arg(long = "as", global = true, env = "SHELTER_USER", value_name = "USER")]
    pub as_user: Option<UserId>,

    /// Acting user's role
    #[arg(long, global = true, env = "SHELTER_ROLE", default_value = "user")]
    pub role: Role,

    /// Shelter an admin is limited to
    #[arg(long, global = true, env = "SHELTER_SCOPE", value_name = "SHELTER")]
    pub scope: Option<ShelterId>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new shelter project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Register and inspect animals
    #[command(subcommand)]
    Animal(animal::AnimalCommands),

    /// Adoption requests
    #[command(subcommand)]
    Adopt(adoption::AdoptCommands),

    /// Foster requests
    #[command(subcommand)]
    Foster(foster::FosterCommands),

    /// Show the adoption and foster history of an animal for one requester
    Timeline {
        /// Animal ID
        animal: AnimalId,

        /// Requester (user) ID
        requester: UserId,
    },
}

/// Per-invocation state shared by every command
pub struct Session {
    pub output: Output,
    user: Option<UserId>,
    role: Role,
    scope: Option<ShelterId>,
}

impl Session {
    /// The acting user, required by every mutation
    pub fn actor(&self) -> Result<Actor> {
        let requester_id = self.user.ok_or_else(|| {
            anyhow::anyhow!("No acting user. Pass --as <user>, set SHELTER_USER, or set default_user in the global config.")
        })?;

        Ok(Actor {
            requester_id,
            role: self.role,
            shelter_scope: self.scope,
        })
    }

    /// Opens the engine for the project containing the current directory
    pub fn engine(&self) -> Result<LifecycleEngine> {
        open_engine(&Project::open_current()?)
    }
}

/// Builds an engine for `project`, wiring the outbox when notifications are on
pub fn open_engine(project: &Project) -> Result<LifecycleEngine> {
    let engine = LifecycleEngine::new(project.store()?);

    Ok(match project.outbox() {
        Some(outbox) => engine.with_notifier(Arc::new(outbox)),
        None => engine.with_notifier(Arc::new(LogNotifier)),
    })
}

fn init_logging(verbose: bool, configured: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_new(configured).unwrap_or_else(|_| EnvFilter::new("warn"))
        }
    });

    // A second init (tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // A broken config is reported by the command that needs it
    let config = Config::load().ok();
    let log_filter = config
        .as_ref()
        .map(|c| c.project.log_filter.as_str())
        .unwrap_or("warn");
    init_logging(cli.verbose, log_filter);

    let format = cli
        .format
        .or_else(|| config.as_ref().map(|c| c.global.default_format.into()))
        .unwrap_or_default();

    let session = Session {
        output: Output::new(format),
        user: cli
            .as_user
            .or_else(|| config.as_ref().and_then(|c| c.global.default_user)),
        role: cli.role,
        scope: cli.scope,
    };

    tracing::debug!(role = %session.role, user = ?session.user, "shelter starting");

    match execute(cli.command, &session) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            session.output.failure(&err);
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Commands, session: &Session) -> Result<()> {
    match command {
        Commands::Init { path } => {
            let project = Project::init(&path)
                .with_context(|| format!("Failed to initialize project at {}", path))?;
            session.output.success(&format!(
                "Initialized shelter project at {}",
                project.root().display()
            ));
        }

        Commands::Animal(cmd) => animal::run(cmd, session)?,
        Commands::Adopt(cmd) => adoption::run(cmd, session)?,
        Commands::Foster(cmd) => foster::run(cmd, session)?,

        Commands::Timeline { animal, requester } => timeline::show(session, animal, requester)?,
    }

    tracing::debug!("command completed");
    Ok(())
}
