//! # Command-Line Interface
//!
//! A thin local-first front end over the lifecycle engine.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project management | `init` |
//! | Animal | Registration and custody | `animal add`, `animal show`, `animal death` |
//! | Adopt | Adoption requests | `adopt request`, `adopt approve`, `adopt reject` |
//! | Foster | Foster requests | `foster request`, `foster complete`, `foster delete` |
//! | History | Reconstructed timeline | `timeline A-1 U-10` |
//!
//! ## Acting User
//!
//! Mutations run as `--as <user>` with `--role user|admin` and an optional
//! admin `--scope <shelter>`, or the `SHELTER_USER`, `SHELTER_ROLE` and
//! `SHELTER_SCOPE` environment variables.
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON; failures carry a stable `code`
//!
//! ## Logging
//!
//! `RUST_LOG` wins; otherwise `--verbose` selects `debug` and the project's
//! `log_filter` applies.
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod adoption;
mod animal;
mod app;
mod foster;
mod output;
mod timeline;

pub use app::{open_engine, run, Cli, Commands, Session};
pub use output::{Output, OutputFormat};
