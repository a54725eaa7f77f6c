use sqlx::PgExecutor;
use time::OffsetDateTime;

use crate::domain::Tariff;

/// The most recently set tariff, if any has ever been set.
pub async fn current<'e>(ex: impl PgExecutor<'e>) -> Result<Option<Tariff>, sqlx::Error> {
    sqlx::query_as::<_, Tariff>(
        r#"
        SELECT id, cost_per_unit, set_at
        FROM tariffs
        ORDER BY set_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(ex)
    .await
}

pub async fn insert<'e>(
    ex: impl PgExecutor<'e>,
    cost_per_unit: f64,
    set_at: OffsetDateTime,
) -> Result<Tariff, sqlx::Error> {
    sqlx::query_as::<_, Tariff>(
        r#"
        INSERT INTO tariffs (cost_per_unit, set_at)
        VALUES ($1, $2)
        RETURNING id, cost_per_unit, set_at
        "#,
    )
    .bind(cost_per_unit)
    .bind(set_at)
    .fetch_one(ex)
    .await
}
