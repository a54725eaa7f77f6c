//! Persistence contract consumed by the engine and the read-only passes.
//!
//! Writes that must land together go through a [`ReadingTx`]. A transaction
//! that is dropped without [`ReadingTx::commit`] discards everything it staged.

use async_trait::async_trait;
use time::{Date, OffsetDateTime};

use crate::domain::{NewReading, NewUser, Reading, ReadingId, Tariff, User, UserId};

pub mod memory;

pub use memory::MemoryStore;

pub const READING_OWNER_DATE_KEY: &str = "water_readings_owner_id_reading_date_key";
pub const USERS_USERNAME_KEY: &str = "users_username_key";
pub const USERS_EMAIL_KEY: &str = "users_email_key";
pub const READING_OWNER_FK: &str = "water_readings_owner_id_fkey";

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),
}

impl StoreError {
    /// Map a driver error, singling out unique and foreign key violations by
    /// constraint name.
    pub fn from_sqlx(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            let constraint = db.constraint().unwrap_or_default().to_string();
            if db.is_unique_violation() {
                return StoreError::UniqueViolation(constraint);
            }
            if db.is_foreign_key_violation() {
                return StoreError::ForeignKeyViolation(constraint);
            }
        }
        StoreError::Database(e)
    }

    pub fn violates(&self, constraint: &str) -> bool {
        match self {
            StoreError::UniqueViolation(c) | StoreError::ForeignKeyViolation(c) => c == constraint,
            StoreError::Database(_) => false,
        }
    }
}

/// Owner-scoped unit of work over the readings table.
///
/// Inserting a reading for an owner with no user row fails with
/// [`StoreError::ForeignKeyViolation`] on stores that keep users; the
/// in-memory store does not check owners.
#[async_trait]
pub trait ReadingTx: Send {
    async fn find_by_id(&mut self, id: ReadingId) -> Result<Option<Reading>, StoreError>;

    async fn find_by_owner_and_date(
        &mut self,
        owner: UserId,
        date: Date,
    ) -> Result<Option<Reading>, StoreError>;

    /// Nearest reading strictly before `date`.
    async fn find_latest_before(
        &mut self,
        owner: UserId,
        date: Date,
    ) -> Result<Option<Reading>, StoreError>;

    /// Nearest reading strictly after `date`.
    async fn find_earliest_after(
        &mut self,
        owner: UserId,
        date: Date,
    ) -> Result<Option<Reading>, StoreError>;

    /// Up to `n` readings strictly before `before`, newest first.
    async fn find_last_n(
        &mut self,
        owner: UserId,
        before: Date,
        n: usize,
    ) -> Result<Vec<Reading>, StoreError>;

    async fn insert(&mut self, reading: NewReading) -> Result<Reading, StoreError>;

    async fn update(&mut self, reading: &Reading) -> Result<(), StoreError>;

    async fn delete(&mut self, id: ReadingId) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait WaterStore: Send + Sync {
    /// Open a transaction serialized against every other transaction for `owner`.
    async fn begin(&self, owner: UserId) -> Result<Box<dyn ReadingTx>, StoreError>;

    /// All readings for `owner`, newest first.
    async fn list_readings(&self, owner: UserId) -> Result<Vec<Reading>, StoreError>;

    async fn current_tariff(&self) -> Result<Option<Tariff>, StoreError>;

    async fn insert_tariff(
        &self,
        cost_per_unit: f64,
        set_at: OffsetDateTime,
    ) -> Result<Tariff, StoreError>;

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Remove a user and every reading it owns. Returns whether a row was removed.
    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError>;
}
