//! Foster CLI commands

use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;

use super::app::Session;
use crate::domain::{AnimalId, Decision, FosterRequest, FosterRequestId, FosterStatus, ShelterId, UserId};
use crate::storage::FosterFilter;

#[derive(Subcommand)]
pub enum FosterCommands {
    /// Request to foster an animal you adopted
    Request {
        /// Animal ID
        animal: AnimalId,

        /// Hosting shelter
        #[arg(long)]
        shelter: ShelterId,

        /// Start date (YYYY-MM-DD); today or omitted starts immediately
        #[arg(long)]
        start: Option<NaiveDate>,
    },

    /// Approve a pending foster request (admin)
    Approve {
        id: FosterRequestId,

        #[arg(long)]
        note: Option<String>,
    },

    /// Reject a pending foster request (admin)
    Reject {
        id: FosterRequestId,

        #[arg(long)]
        note: Option<String>,
    },

    /// End an ongoing foster period
    Complete { id: FosterRequestId },

    /// Soft-delete one of your foster requests that is not ongoing
    Delete { id: FosterRequestId },

    /// List foster requests
    List {
        #[arg(long)]
        animal: Option<AnimalId>,

        #[arg(long)]
        requester: Option<UserId>,

        /// Only requests in these states (repeatable)
        #[arg(long = "status")]
        status: Vec<FosterStatus>,

        /// Include soft-deleted requests
        #[arg(long)]
        deleted: bool,
    },
}

pub fn run(cmd: FosterCommands, session: &Session) -> Result<()> {
    match cmd {
        FosterCommands::Request {
            animal,
            shelter,
            start,
        } => request_foster(session, animal, shelter, start),
        FosterCommands::Approve { id, note } => decide(session, id, Decision::Approve, note),
        FosterCommands::Reject { id, note } => decide(session, id, Decision::Reject, note),
        FosterCommands::Complete { id } => complete(session, id),
        FosterCommands::Delete { id } => delete(session, id),
        FosterCommands::List {
            animal,
            requester,
            status,
            deleted,
        } => list_requests(session, animal, requester, &status, deleted),
    }
}

fn report(session: &Session, request: &FosterRequest, verb: &str) {
    if session.output.is_json() {
        session.output.data(request);
    } else {
        session.output.success(&format!(
            "{} foster request {} for {} ({})",
            verb, request.id, request.animal_id, request.status
        ));
    }
}

fn request_foster(
    session: &Session,
    animal: AnimalId,
    shelter: ShelterId,
    start: Option<NaiveDate>,
) -> Result<()> {
    let actor = session.actor()?;
    let mut engine = session.engine()?;
    let request = engine.create_foster_request(&actor, animal, shelter, start)?;

    report(session, &request, "Created");
    Ok(())
}

fn decide(
    session: &Session,
    id: FosterRequestId,
    decision: Decision,
    note: Option<String>,
) -> Result<()> {
    let actor = session.actor()?;
    let mut engine = session.engine()?;
    let request = engine.decide_foster_request(&actor, id, decision, note)?;

    let verb = match decision {
        Decision::Approve => "Approved",
        Decision::Reject => "Rejected",
    };
    report(session, &request, verb);
    Ok(())
}

fn complete(session: &Session, id: FosterRequestId) -> Result<()> {
    let actor = session.actor()?;
    let mut engine = session.engine()?;
    let request = engine.complete_foster(&actor, id)?;

    report(session, &request, "Completed");
    Ok(())
}

fn delete(session: &Session, id: FosterRequestId) -> Result<()> {
    let actor = session.actor()?;
    let mut engine = session.engine()?;
    let request = engine.soft_delete_foster(&actor, id)?;

    report(session, &request, "Deleted");
    Ok(())
}

fn list_requests(
    session: &Session,
    animal: Option<AnimalId>,
    requester: Option<UserId>,
    status: &[FosterStatus],
    deleted: bool,
) -> Result<()> {
    let engine = session.engine()?;

    let mut filter = FosterFilter::all().statuses(status);
    filter.animal_id = animal;
    filter.requester_id = requester;
    if deleted {
        filter = filter.with_deleted();
    }
    let requests = engine.foster_requests(&filter)?;

    if session.output.is_json() {
        session.output.data(&requests);
    } else if requests.is_empty() {
        println!("No foster requests found.");
    } else {
        println!(
            "{:<8} {:<8} {:<8} {:<10} {:<17} END",
            "ID", "ANIMAL", "USER", "STATUS", "START"
        );
        for request in &requests {
            let fmt = |at: Option<chrono::DateTime<chrono::Utc>>| {
                at.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string())
            };
            let status = if request.deleted {
                format!("{}*", request.status.as_str())
            } else {
                request.status.as_str().to_string()
            };
            println!(
                "{:<8} {:<8} {:<8} {:<10} {:<17} {}",
                request.id.to_string(),
                request.animal_id.to_string(),
                request.requester_id.to_string(),
                status,
                fmt(request.start_at),
                fmt(request.end_at)
            );
        }
        if deleted {
            println!("\n* soft-deleted");
        }
    }
    Ok(())
}
