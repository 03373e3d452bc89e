//! Adoption CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::app::Session;
use crate::domain::{AdoptionRequest, AdoptionRequestId, AdoptionStatus, AnimalId, Decision, UserId};
use crate::storage::AdoptionFilter;

#[derive(Subcommand)]
pub enum AdoptCommands {
    /// Request to adopt an animal as the acting user
    Request {
        /// Animal ID
        animal: AnimalId,
    },

    /// Approve a pending adoption request (admin)
    Approve {
        /// Adoption request ID
        id: AdoptionRequestId,

        /// Review note
        #[arg(long)]
        note: Option<String>,
    },

    /// Reject a pending adoption request (admin)
    Reject {
        /// Adoption request ID
        id: AdoptionRequestId,

        /// Review note
        #[arg(long)]
        note: Option<String>,
    },

    /// List adoption requests
    List {
        #[arg(long)]
        animal: Option<AnimalId>,

        #[arg(long)]
        requester: Option<UserId>,

        /// Only requests in these states (repeatable)
        #[arg(long = "status")]
        status: Vec<AdoptionStatus>,
    },
}

pub fn run(cmd: AdoptCommands, session: &Session) -> Result<()> {
    match cmd {
        AdoptCommands::Request { animal } => request_adoption(session, animal),
        AdoptCommands::Approve { id, note } => decide(session, id, Decision::Approve, note),
        AdoptCommands::Reject { id, note } => decide(session, id, Decision::Reject, note),
        AdoptCommands::List {
            animal,
            requester,
            status,
        } => list_requests(session, animal, requester, &status),
    }
}

fn request_adoption(session: &Session, animal: AnimalId) -> Result<()> {
    let actor = session.actor()?;
    let mut engine = session.engine()?;
    let request = engine.create_adoption_request(&actor, animal)?;

    if session.output.is_json() {
        session.output.data(&request);
    } else {
        session.output.success(&format!(
            "Created adoption request {} for {} ({})",
            request.id, request.animal_id, request.status
        ));
    }
    Ok(())
}

fn decide(
    session: &Session,
    id: AdoptionRequestId,
    decision: Decision,
    note: Option<String>,
) -> Result<()> {
    let actor = session.actor()?;
    let mut engine = session.engine()?;
    let request = engine.decide_adoption_request(&actor, id, decision, note)?;

    if session.output.is_json() {
        session.output.data(&request);
    } else {
        let custody = engine.animal(request.animal_id)?.custody();
        session.output.success(&format!(
            "Adoption request {} is now {}; {} is {}",
            request.id, request.status, request.animal_id, custody
        ));
    }
    Ok(())
}

fn list_requests(
    session: &Session,
    animal: Option<AnimalId>,
    requester: Option<UserId>,
    status: &[AdoptionStatus],
) -> Result<()> {
    let engine = session.engine()?;

    let mut filter = AdoptionFilter::all().statuses(status);
    filter.animal_id = animal;
    filter.requester_id = requester;
    let requests = engine.adoption_requests(&filter)?;

    if session.output.is_json() {
        session.output.data(&requests);
    } else if requests.is_empty() {
        println!("No adoption requests found.");
    } else {
        println!("{:<8} {:<8} {:<8} {:<10} DECIDED", "ID", "ANIMAL", "USER", "STATUS");
        for request in &requests {
            print_row(request);
        }
    }
    Ok(())
}

fn print_row(request: &AdoptionRequest) {
    let decided = if request.status.is_decided() {
        request.decided_at.format("%Y-%m-%d %H:%M").to_string()
    } else {
        "-".to_string()
    };
    println!(
        "{:<8} {:<8} {:<8} {:<10} {}",
        request.id.to_string(),
        request.animal_id.to_string(),
        request.requester_id.to_string(),
        request.status.as_str(),
        decided
    );
}
