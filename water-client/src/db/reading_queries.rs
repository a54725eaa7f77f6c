use sqlx::PgExecutor;
use time::Date;

use crate::domain::{NewReading, Reading, ReadingId, UserId};

pub async fn find_by_id<'e>(
    ex: impl PgExecutor<'e>,
    id: ReadingId,
) -> Result<Option<Reading>, sqlx::Error> {
    sqlx::query_as::<_, Reading>(
        r#"
        SELECT id, owner_id, reading_date, reading_value, consumption, is_spike
        FROM water_readings
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(ex)
    .await
}

pub async fn find_by_owner_and_date<'e>(
    ex: impl PgExecutor<'e>,
    owner: UserId,
    date: Date,
) -> Result<Option<Reading>, sqlx::Error> {
    sqlx::query_as::<_, Reading>(
        r#"
        SELECT id, owner_id, reading_date, reading_value, consumption, is_spike
        FROM water_readings
        WHERE owner_id = $1
          AND reading_date = $2
        "#,
    )
    .bind(owner)
    .bind(date)
    .fetch_optional(ex)
    .await
}

pub async fn find_latest_before<'e>(
    ex: impl PgExecutor<'e>,
    owner: UserId,
    date: Date,
) -> Result<Option<Reading>, sqlx::Error> {
    sqlx::query_as::<_, Reading>(
        r#"
        SELECT id, owner_id, reading_date, reading_value, consumption, is_spike
        FROM water_readings
        WHERE owner_id = $1
          AND reading_date < $2
        ORDER BY reading_date DESC
        LIMIT 1
        "#,
    )
    .bind(owner)
    .bind(date)
    .fetch_optional(ex)
    .await
}

pub async fn find_earliest_after<'e>(
    ex: impl PgExecutor<'e>,
    owner: UserId,
    date: Date,
) -> Result<Option<Reading>, sqlx::Error> {
    sqlx::query_as::<_, Reading>(
        r#"
        SELECT id, owner_id, reading_date, reading_value, consumption, is_spike
        FROM water_readings
        WHERE owner_id = $1
          AND reading_date > $2
        ORDER BY reading_date
        LIMIT 1
        "#,
    )
    .bind(owner)
    .bind(date)
    .fetch_optional(ex)
    .await
}

/// Up to `n` readings strictly before `before`, newest first.
pub async fn find_last_n<'e>(
    ex: impl PgExecutor<'e>,
    owner: UserId,
    before: Date,
    n: usize,
) -> Result<Vec<Reading>, sqlx::Error> {
    sqlx::query_as::<_, Reading>(
        r#"
        SELECT id, owner_id, reading_date, reading_value, consumption, is_spike
        FROM water_readings
        WHERE owner_id = $1
          AND reading_date < $2
        ORDER BY reading_date DESC
        LIMIT $3
        "#,
    )
    .bind(owner)
    .bind(before)
    .bind(i64::try_from(n).unwrap_or(i64::MAX))
    .fetch_all(ex)
    .await
}

/// Full reading history for one owner, newest first.
pub async fn list_for_owner<'e>(
    ex: impl PgExecutor<'e>,
    owner: UserId,
) -> Result<Vec<Reading>, sqlx::Error> {
    sqlx::query_as::<_, Reading>(
        r#"
        SELECT id, owner_id, reading_date, reading_value, consumption, is_spike
        FROM water_readings
        WHERE owner_id = $1
        ORDER BY reading_date DESC
        "#,
    )
    .bind(owner)
    .fetch_all(ex)
    .await
}

pub async fn insert<'e>(
    ex: impl PgExecutor<'e>,
    reading: &NewReading,
) -> Result<Reading, sqlx::Error> {
    sqlx::query_as::<_, Reading>(
        r#"
        INSERT INTO water_readings (owner_id, reading_date, reading_value, consumption, is_spike)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, owner_id, reading_date, reading_value, consumption, is_spike
        "#,
    )
    .bind(reading.owner_id)
    .bind(reading.date)
    .bind(reading.value)
    .bind(reading.consumption)
    .bind(reading.is_spike)
    .fetch_one(ex)
    .await
}

pub async fn update<'e>(ex: impl PgExecutor<'e>, reading: &Reading) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE water_readings
        SET reading_value = $2,
            consumption   = $3,
            is_spike      = $4
        WHERE id = $1
        "#,
    )
    .bind(reading.id)
    .bind(reading.value)
    .bind(reading.consumption)
    .bind(reading.is_spike)
    .execute(ex)
    .await
    .map(|_| ())
}

pub async fn delete<'e>(ex: impl PgExecutor<'e>, id: ReadingId) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM water_readings WHERE id = $1")
        .bind(id)
        .execute(ex)
        .await
        .map(|_| ())
}
