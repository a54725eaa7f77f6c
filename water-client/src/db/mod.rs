//! PostgreSQL-backed [`WaterStore`].

use async_trait::async_trait;
use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    Postgres, Transaction,
};
use time::{Date, OffsetDateTime};

use crate::{
    domain::{NewReading, NewUser, Reading, ReadingId, Tariff, User, UserId},
    store::{ReadingTx, StoreError, WaterStore},
};

pub mod reading_queries;
pub mod tariff_queries;
pub mod user_queries;

const SCHEMA: &str = include_str!("../../sql/schema/01_water.sql");

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(uri: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(uri)
            .await?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn apply_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

struct PgReadingTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ReadingTx for PgReadingTx {
    async fn find_by_id(&mut self, id: ReadingId) -> Result<Option<Reading>, StoreError> {
        reading_queries::find_by_id(&mut *self.tx, id)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn find_by_owner_and_date(
        &mut self,
        owner: UserId,
        date: Date,
    ) -> Result<Option<Reading>, StoreError> {
        reading_queries::find_by_owner_and_date(&mut *self.tx, owner, date)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn find_latest_before(
        &mut self,
        owner: UserId,
        date: Date,
    ) -> Result<Option<Reading>, StoreError> {
        reading_queries::find_latest_before(&mut *self.tx, owner, date)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn find_earliest_after(
        &mut self,
        owner: UserId,
        date: Date,
    ) -> Result<Option<Reading>, StoreError> {
        reading_queries::find_earliest_after(&mut *self.tx, owner, date)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn find_last_n(
        &mut self,
        owner: UserId,
        before: Date,
        n: usize,
    ) -> Result<Vec<Reading>, StoreError> {
        reading_queries::find_last_n(&mut *self.tx, owner, before, n)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn insert(&mut self, reading: NewReading) -> Result<Reading, StoreError> {
        reading_queries::insert(&mut *self.tx, &reading)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn update(&mut self, reading: &Reading) -> Result<(), StoreError> {
        reading_queries::update(&mut *self.tx, reading)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn delete(&mut self, id: ReadingId) -> Result<(), StoreError> {
        reading_queries::delete(&mut *self.tx, id)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let PgReadingTx { tx } = *self;
        tx.commit().await.map_err(StoreError::from_sqlx)
    }
}

#[async_trait]
impl WaterStore for PgStore {
    async fn begin(&self, owner: UserId) -> Result<Box<dyn ReadingTx>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Held until commit/rollback; serializes neighbor repairs per owner.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(owner)
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PgReadingTx { tx }))
    }

    async fn list_readings(&self, owner: UserId) -> Result<Vec<Reading>, StoreError> {
        Ok(reading_queries::list_for_owner(&self.pool, owner).await?)
    }

    async fn current_tariff(&self) -> Result<Option<Tariff>, StoreError> {
        Ok(tariff_queries::current(&self.pool).await?)
    }

    async fn insert_tariff(
        &self,
        cost_per_unit: f64,
        set_at: OffsetDateTime,
    ) -> Result<Tariff, StoreError> {
        Ok(tariff_queries::insert(&self.pool, cost_per_unit, set_at).await?)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        user_queries::insert(&self.pool, &user)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(user_queries::find_by_username(&self.pool, username).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(user_queries::find_by_email(&self.pool, email).await?)
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        Ok(user_queries::delete(&self.pool, id).await?)
    }
}
