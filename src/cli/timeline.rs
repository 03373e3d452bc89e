//! Timeline CLI command

use anyhow::Result;

use super::app::Session;
use crate::domain::{AnimalId, UserId};

pub fn show(session: &Session, animal: AnimalId, requester: UserId) -> Result<()> {
    let engine = session.engine()?;
    let timeline = engine.timeline(animal, requester)?;

    if session.output.is_json() {
        session.output.data(&timeline);
        return Ok(());
    }

    match &timeline.animal_breed {
        Some(breed) => println!("{} ({}) for {}", timeline.animal_name, breed, requester),
        None => println!("{} for {}", timeline.animal_name, requester),
    }

    if timeline.is_empty() {
        println!("No history.");
        return Ok(());
    }

    println!();
    for event in &timeline.timeline {
        println!(
            "{:>3}. {}  {:<15} {:<13} {}",
            event.sequence,
            event.at.format("%Y-%m-%d %H:%M"),
            event.kind.as_str(),
            event.status,
            event.description
        );
    }
    println!();
    println!("{} event(s)", timeline.total);

    Ok(())
}
