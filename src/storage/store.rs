//! SQLite record store for animals and their requests
//!
//! The store lives in `.shelter/shelter.db` and is the source of truth.
//! Writes go through immediate transactions so a guard check and the write
//! it protects happen under the database write lock.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings with
//! microsecond precision, which makes lexical order chronological.

use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{
    params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use thiserror::Error;

use super::filter::{AdoptionFilter, AdoptionOrder, AnimalFilter, FosterFilter, FosterOrder};
use crate::domain::{
    now, AdoptionRequest, AdoptionRequestId, AdoptionStatus, Animal, AnimalId, CustodyFacts,
    CustodyState, FosterRequest, FosterRequestId, FosterStatus, Review, ShelterId, UserId,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Database schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: i32, supported: i32 },

    #[error("{kind} {id} vanished during update")]
    Missing { kind: &'static str, id: i64 },
}

impl StoreError {
    /// Returns true if a uniqueness or check constraint rejected the write
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation
        )
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Formats a timestamp the way the store keeps it
pub(crate) fn ts(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    idx: usize,
    err: impl Into<Box<dyn StdError + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: Into<Box<dyn StdError + Send + Sync>>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| conversion_error(idx, e))
}

fn parsed_opt<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: Into<Box<dyn StdError + Send + Sync>>,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| s.parse::<T>().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

/// Reads the three review columns starting at `idx`
fn review_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Review>> {
    let reviewer: Option<i64> = row.get(idx)?;
    let note: Option<String> = row.get(idx + 1)?;
    let reviewed_at: Option<DateTime<Utc>> = parsed_opt(row, idx + 2)?;

    Ok(match (reviewer, reviewed_at) {
        (Some(reviewer), Some(at)) => Some(Review {
            reviewer_id: UserId::new(reviewer),
            note,
            reviewed_at: at,
        }),
        _ => None,
    })
}

const ANIMAL_COLUMNS: &str = "id, name, breed, shelter_id, custody, registered_at, updated_at";

fn animal_from_row(row: &Row<'_>) -> rusqlite::Result<Animal> {
    Ok(Animal {
        id: AnimalId::new(row.get(0)?),
        name: row.get(1)?,
        breed: row.get(2)?,
        shelter_id: ShelterId::new(row.get(3)?),
        custody: parsed::<CustodyState>(row, 4)?,
        registered_at: parsed(row, 5)?,
        updated_at: parsed(row, 6)?,
    })
}

const ADOPTION_COLUMNS: &str = "id, animal_id, requester_id, status, decided_at, \
     reviewer_id, review_note, reviewed_at, created_at, updated_at";

fn adoption_from_row(row: &Row<'_>) -> rusqlite::Result<AdoptionRequest> {
    Ok(AdoptionRequest {
        id: AdoptionRequestId::new(row.get(0)?),
        animal_id: AnimalId::new(row.get(1)?),
        requester_id: UserId::new(row.get(2)?),
        status: parsed::<AdoptionStatus>(row, 3)?,
        decided_at: parsed(row, 4)?,
        review: review_at(row, 5)?,
        created_at: parsed(row, 8)?,
        updated_at: parsed(row, 9)?,
    })
}

const FOSTER_COLUMNS: &str = "id, animal_id, requester_id, shelter_id, status, start_at, end_at, \
     deleted, reviewer_id, review_note, reviewed_at, created_at, updated_at";

fn foster_from_row(row: &Row<'_>) -> rusqlite::Result<FosterRequest> {
    Ok(FosterRequest {
        id: FosterRequestId::new(row.get(0)?),
        animal_id: AnimalId::new(row.get(1)?),
        requester_id: UserId::new(row.get(2)?),
        shelter_id: ShelterId::new(row.get(3)?),
        status: parsed::<FosterStatus>(row, 4)?,
        start_at: parsed_opt(row, 5)?,
        end_at: parsed_opt(row, 6)?,
        deleted: row.get(7)?,
        review: review_at(row, 8)?,
        created_at: parsed(row, 11)?,
        updated_at: parsed(row, 12)?,
    })
}

/// SQLite-backed record store
pub struct Store {
    /// Database file, or `None` for an in-memory store
    path: Option<PathBuf>,

    conn: Connection,
}

impl Store {
    /// Schema version - bump when the schema changes
    const SCHEMA_VERSION: i32 = 1;

    /// Opens (creating if needed) the store at `path`
    pub fn open(path: &Path, busy_timeout: Duration) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;

        // WAL lets readers proceed while a writer holds the lock
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Opens a private in-memory store (tests, scratch use)
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self { path, conn };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Ensures the schema exists and is not newer than this build understands
    fn ensure_schema(&self) -> StoreResult<()> {
        let version = self.schema_version()?;

        if version == 0 {
            self.create_schema()?;
        } else if version > Self::SCHEMA_VERSION {
            return Err(StoreError::SchemaTooNew {
                found: version,
                supported: Self::SCHEMA_VERSION,
            });
        }

        Ok(())
    }

    fn schema_version(&self) -> StoreResult<i32> {
        let version: Option<i32> = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .optional()?;

        Ok(version.unwrap_or(0))
    }

    fn create_schema(&self) -> StoreResult<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS animals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                breed TEXT,
                shelter_id INTEGER NOT NULL,
                custody TEXT NOT NULL,
                registered_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS adoption_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                animal_id INTEGER NOT NULL REFERENCES animals(id),
                requester_id INTEGER NOT NULL,
                status TEXT NOT NULL,
                decided_at TEXT NOT NULL,
                reviewer_id INTEGER,
                review_note TEXT,
                reviewed_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS foster_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                animal_id INTEGER NOT NULL REFERENCES animals(id),
                requester_id INTEGER NOT NULL,
                shelter_id INTEGER NOT NULL,
                status TEXT NOT NULL,
                start_at TEXT,
                end_at TEXT,
                deleted INTEGER NOT NULL DEFAULT 0,
                reviewer_id INTEGER,
                review_note TEXT,
                reviewed_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_animals_shelter ON animals(shelter_id, custody);
            CREATE INDEX IF NOT EXISTS idx_adoptions_animal ON adoption_requests(animal_id, requester_id);
            CREATE INDEX IF NOT EXISTS idx_fosters_animal ON foster_requests(animal_id, requester_id);

            -- Backstop for the duplicate-active-request guards
            CREATE UNIQUE INDEX IF NOT EXISTS uniq_active_adoption
                ON adoption_requests(animal_id)
                WHERE status IN ('PENDING', 'APPROVED');

            CREATE UNIQUE INDEX IF NOT EXISTS uniq_active_foster
                ON foster_requests(animal_id, requester_id)
                WHERE status IN ('PENDING', 'ONGOING') AND deleted = 0;
            ",
        )?;

        self.conn.execute_batch(&format!(
            "PRAGMA user_version = {}",
            Self::SCHEMA_VERSION
        ))?;

        Ok(())
    }

    /// Read access outside any transaction
    pub fn records(&self) -> Records<'_> {
        Records::new(&self.conn)
    }

    /// Starts a write transaction holding the database write lock
    pub(crate) fn begin_write(&mut self) -> StoreResult<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    /// Registers a new animal. Animals always start `AVAILABLE`.
    pub fn register_animal(
        &mut self,
        name: &str,
        breed: Option<&str>,
        shelter_id: ShelterId,
    ) -> StoreResult<Animal> {
        let at = now();
        let animal = Animal {
            id: AnimalId::new(0),
            name: name.trim().to_string(),
            breed: breed.map(|b| b.trim().to_string()).filter(|b| !b.is_empty()),
            shelter_id,
            custody: CustodyState::Available,
            registered_at: at,
            updated_at: at,
        };

        let tx = self.begin_write()?;
        let animal = Records::new(&tx).insert_animal(&animal)?;
        tx.commit()?;

        tracing::info!(animal = %animal.id, shelter = %shelter_id, "registered animal");
        Ok(animal)
    }

    /// Returns the path to the database file
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Record operations over a connection or an open transaction
pub struct Records<'c> {
    conn: &'c Connection,
}

impl<'c> Records<'c> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    // --- animals ---

    pub fn find_animal(&self, id: AnimalId) -> StoreResult<Option<Animal>> {
        let sql = format!("SELECT {} FROM animals WHERE id = ?1", ANIMAL_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id.get()], animal_from_row)
            .optional()?)
    }

    pub fn list_animals(&self, filter: &AnimalFilter) -> StoreResult<Vec<Animal>> {
        let w = filter.to_where();
        let sql = format!("SELECT {} FROM animals{} ORDER BY id", ANIMAL_COLUMNS, w.sql());
        let mut stmt = self.conn.prepare(&sql)?;
        let animals = stmt
            .query_map(params_from_iter(w.values()), animal_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(animals)
    }

    pub fn count_animals(&self, filter: &AnimalFilter) -> StoreResult<usize> {
        let w = filter.to_where();
        let sql = format!("SELECT COUNT(*) FROM animals{}", w.sql());
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(w.values()), |row| row.get(0))?;
        Ok(count as usize)
    }

    pub(crate) fn insert_animal(&self, animal: &Animal) -> StoreResult<Animal> {
        self.conn.execute(
            "INSERT INTO animals (name, breed, shelter_id, custody, registered_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                animal.name,
                animal.breed,
                animal.shelter_id.get(),
                animal.custody.as_str(),
                ts(&animal.registered_at),
                ts(&animal.updated_at),
            ],
        )?;

        let mut inserted = animal.clone();
        inserted.id = AnimalId::new(self.conn.last_insert_rowid());
        Ok(inserted)
    }

    /// Writes the derived custody state back
    pub(crate) fn update_animal_custody(&self, animal: &Animal) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE animals SET custody = ?1, updated_at = ?2 WHERE id = ?3",
            params![animal.custody.as_str(), ts(&animal.updated_at), animal.id.get()],
        )?;
        if changed == 0 {
            return Err(StoreError::Missing {
                kind: "animal",
                id: animal.id.get(),
            });
        }
        Ok(())
    }

    /// Gathers the request facts custody is derived from
    pub fn custody_facts(&self, animal_id: AnimalId) -> StoreResult<CustodyFacts> {
        let approved = self.count_adoptions(
            &AdoptionFilter::for_animal(animal_id).statuses(&[AdoptionStatus::Approved]),
        )?;
        let ongoing = self.count_fosters(
            &FosterFilter::for_animal(animal_id).statuses(&[FosterStatus::Ongoing]),
        )?;

        Ok(CustodyFacts {
            approved_adoption: approved > 0,
            ongoing_fosters: ongoing,
        })
    }

    // --- adoption requests ---

    pub fn find_adoption(&self, id: AdoptionRequestId) -> StoreResult<Option<AdoptionRequest>> {
        let sql = format!("SELECT {} FROM adoption_requests WHERE id = ?1", ADOPTION_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id.get()], adoption_from_row)
            .optional()?)
    }

    pub fn find_one_adoption(
        &self,
        filter: &AdoptionFilter,
        order: AdoptionOrder,
    ) -> StoreResult<Option<AdoptionRequest>> {
        let w = filter.to_where();
        let sql = format!(
            "SELECT {} FROM adoption_requests{}{} LIMIT 1",
            ADOPTION_COLUMNS,
            w.sql(),
            order.sql()
        );
        Ok(self
            .conn
            .query_row(&sql, params_from_iter(w.values()), adoption_from_row)
            .optional()?)
    }

    pub fn list_adoptions(
        &self,
        filter: &AdoptionFilter,
        order: AdoptionOrder,
    ) -> StoreResult<Vec<AdoptionRequest>> {
        let w = filter.to_where();
        let sql = format!(
            "SELECT {} FROM adoption_requests{}{}",
            ADOPTION_COLUMNS,
            w.sql(),
            order.sql()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let requests = stmt
            .query_map(params_from_iter(w.values()), adoption_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(requests)
    }

    pub fn count_adoptions(&self, filter: &AdoptionFilter) -> StoreResult<usize> {
        let w = filter.to_where();
        let sql = format!("SELECT COUNT(*) FROM adoption_requests{}", w.sql());
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(w.values()), |row| row.get(0))?;
        Ok(count as usize)
    }

    pub(crate) fn insert_adoption(&self, request: &AdoptionRequest) -> StoreResult<AdoptionRequest> {
        let review = request.review.as_ref();
        self.conn.execute(
            "INSERT INTO adoption_requests
                (animal_id, requester_id, status, decided_at, reviewer_id, review_note, reviewed_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                request.animal_id.get(),
                request.requester_id.get(),
                request.status.as_str(),
                ts(&request.decided_at),
                review.map(|r| r.reviewer_id.get()),
                review.and_then(|r| r.note.clone()),
                review.map(|r| ts(&r.reviewed_at)),
                ts(&request.created_at),
                ts(&request.updated_at),
            ],
        )?;

        let mut inserted = request.clone();
        inserted.id = AdoptionRequestId::new(self.conn.last_insert_rowid());
        Ok(inserted)
    }

    pub(crate) fn update_adoption(&self, request: &AdoptionRequest) -> StoreResult<()> {
        let review = request.review.as_ref();
        let changed = self.conn.execute(
            "UPDATE adoption_requests
             SET status = ?1, decided_at = ?2, reviewer_id = ?3, review_note = ?4,
                 reviewed_at = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                request.status.as_str(),
                ts(&request.decided_at),
                review.map(|r| r.reviewer_id.get()),
                review.and_then(|r| r.note.clone()),
                review.map(|r| ts(&r.reviewed_at)),
                ts(&request.updated_at),
                request.id.get(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::Missing {
                kind: "adoption request",
                id: request.id.get(),
            });
        }
        Ok(())
    }

    // --- foster requests ---

    pub fn find_foster(&self, id: FosterRequestId) -> StoreResult<Option<FosterRequest>> {
        let sql = format!("SELECT {} FROM foster_requests WHERE id = ?1", FOSTER_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id.get()], foster_from_row)
            .optional()?)
    }

    pub fn find_one_foster(
        &self,
        filter: &FosterFilter,
        order: FosterOrder,
    ) -> StoreResult<Option<FosterRequest>> {
        let w = filter.to_where();
        let sql = format!(
            "SELECT {} FROM foster_requests{}{} LIMIT 1",
            FOSTER_COLUMNS,
            w.sql(),
            order.sql()
        );
        Ok(self
            .conn
            .query_row(&sql, params_from_iter(w.values()), foster_from_row)
            .optional()?)
    }

    pub fn list_fosters(
        &self,
        filter: &FosterFilter,
        order: FosterOrder,
    ) -> StoreResult<Vec<FosterRequest>> {
        let w = filter.to_where();
        let sql = format!(
            "SELECT {} FROM foster_requests{}{}",
            FOSTER_COLUMNS,
            w.sql(),
            order.sql()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let requests = stmt
            .query_map(params_from_iter(w.values()), foster_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(requests)
    }

    pub fn count_fosters(&self, filter: &FosterFilter) -> StoreResult<usize> {
        let w = filter.to_where();
        let sql = format!("SELECT COUNT(*) FROM foster_requests{}", w.sql());
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(w.values()), |row| row.get(0))?;
        Ok(count as usize)
    }

    pub(crate) fn insert_foster(&self, request: &FosterRequest) -> StoreResult<FosterRequest> {
        let review = request.review.as_ref();
        self.conn.execute(
            "INSERT INTO foster_requests
                (animal_id, requester_id, shelter_id, status, start_at, end_at, deleted,
                 reviewer_id, review_note, reviewed_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                request.animal_id.get(),
                request.requester_id.get(),
                request.shelter_id.get(),
                request.status.as_str(),
                request.start_at.as_ref().map(ts),
                request.end_at.as_ref().map(ts),
                request.deleted,
                review.map(|r| r.reviewer_id.get()),
                review.and_then(|r| r.note.clone()),
                review.map(|r| ts(&r.reviewed_at)),
                ts(&request.created_at),
                ts(&request.updated_at),
            ],
        )?;

        let mut inserted = request.clone();
        inserted.id = FosterRequestId::new(self.conn.last_insert_rowid());
        Ok(inserted)
    }

    pub(crate) fn update_foster(&self, request: &FosterRequest) -> StoreResult<()> {
        let review = request.review.as_ref();
        let changed = self.conn.execute(
            "UPDATE foster_requests
             SET status = ?1, start_at = ?2, end_at = ?3, deleted = ?4, reviewer_id = ?5,
                 review_note = ?6, reviewed_at = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                request.status.as_str(),
                request.start_at.as_ref().map(ts),
                request.end_at.as_ref().map(ts),
                request.deleted,
                review.map(|r| r.reviewer_id.get()),
                review.and_then(|r| r.note.clone()),
                review.map(|r| ts(&r.reviewed_at)),
                ts(&request.updated_at),
                request.id.get(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::Missing {
                kind: "foster request",
                id: request.id.get(),
            });
        }
        Ok(())
    }
}
