//! Animal CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::app::Session;
use crate::domain::{Animal, AnimalId, CustodyState, ShelterId};
use crate::storage::AnimalFilter;

#[derive(Subcommand)]
pub enum AnimalCommands {
    /// Register an animal (starts AVAILABLE)
    Add {
        /// Display name
        name: String,

        /// Owning shelter
        #[arg(long)]
        shelter: ShelterId,

        /// Breed, if known
        #[arg(long)]
        breed: Option<String>,
    },

    /// Show an animal with its custody state
    Show {
        /// Animal ID
        id: AnimalId,
    },

    /// List animals
    List {
        /// Only animals of this shelter
        #[arg(long)]
        shelter: Option<ShelterId>,

        /// Only animals in these custody states (repeatable)
        #[arg(long = "custody")]
        custody: Vec<CustodyState>,
    },

    /// Record an animal's death (admin)
    Death {
        /// Animal ID
        id: AnimalId,
    },
}

pub fn run(cmd: AnimalCommands, session: &Session) -> Result<()> {
    match cmd {
        AnimalCommands::Add {
            name,
            shelter,
            breed,
        } => add_animal(session, &name, shelter, breed.as_deref()),
        AnimalCommands::Show { id } => show_animal(session, id),
        AnimalCommands::List { shelter, custody } => list_animals(session, shelter, &custody),
        AnimalCommands::Death { id } => record_death(session, id),
    }
}

fn add_animal(session: &Session, name: &str, shelter: ShelterId, breed: Option<&str>) -> Result<()> {
    if name.trim().is_empty() {
        anyhow::bail!("Animal name must not be empty");
    }

    let mut engine = session.engine()?;
    let animal = engine.register_animal(name, breed, shelter)?;

    if session.output.is_json() {
        session.output.data(&animal);
    } else {
        println!("Registered {} ({}) at {}", animal.id, animal.name, animal.shelter_id);
    }
    Ok(())
}

fn show_animal(session: &Session, id: AnimalId) -> Result<()> {
    let engine = session.engine()?;
    let animal = engine.animal(id)?;
    let active = engine.active_request_count(id)?;

    if session.output.is_json() {
        session.output.data(&serde_json::json!({
            "animal": animal,
            "custody": animal.custody(),
            "active_requests": active,
        }));
    } else {
        println!("Animal: {}", animal.id);
        println!("Name: {}", animal.name);
        if let Some(breed) = &animal.breed {
            println!("Breed: {}", breed);
        }
        println!("Shelter: {}", animal.shelter_id);
        println!("Custody: {}", animal.custody());
        println!("Active requests: {}", active);
        println!("Registered: {}", animal.registered_at.format("%Y-%m-%d %H:%M"));
        println!("Updated: {}", animal.updated_at.format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}

fn list_animals(
    session: &Session,
    shelter: Option<ShelterId>,
    custody: &[CustodyState],
) -> Result<()> {
    let engine = session.engine()?;

    let mut filter = AnimalFilter::all().custody(custody);
    if let Some(shelter) = shelter {
        filter = filter.shelter(shelter);
    }
    let animals = engine.animals(&filter)?;

    if session.output.is_json() {
        session.output.data(&animals);
    } else if animals.is_empty() {
        println!("No animals found.");
    } else {
        println!("{:<8} {:<12} {:<6} NAME", "ID", "CUSTODY", "SHELTER");
        for animal in &animals {
            print_row(animal);
        }
    }
    Ok(())
}

fn print_row(animal: &Animal) {
    let name = match &animal.breed {
        Some(breed) => format!("{} ({})", animal.name, breed),
        None => animal.name.clone(),
    };
    println!(
        "{:<8} {:<12} {:<6} {}",
        animal.id.to_string(),
        animal.custody().as_str(),
        animal.shelter_id.to_string(),
        name
    );
}

fn record_death(session: &Session, id: AnimalId) -> Result<()> {
    let actor = session.actor()?;
    let mut engine = session.engine()?;
    let animal = engine.record_death(&actor, id)?;

    if session.output.is_json() {
        session.output.data(&animal);
    } else {
        session
            .output
            .success(&format!("Recorded death of {} ({})", animal.id, animal.name));
    }
    Ok(())
}
