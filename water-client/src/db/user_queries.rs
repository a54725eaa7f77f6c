use sqlx::PgExecutor;

use crate::domain::{NewUser, User, UserId};

pub async fn insert<'e>(ex: impl PgExecutor<'e>, user: &NewUser) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING id, username, email, password_hash
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .fetch_one(ex)
    .await
}

pub async fn find_by_username<'e>(
    ex: impl PgExecutor<'e>,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(ex)
    .await
}

pub async fn find_by_email<'e>(
    ex: impl PgExecutor<'e>,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT id, username, email, password_hash FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(ex)
        .await
}

/// Readings go with the user through `ON DELETE CASCADE`.
pub async fn delete<'e>(ex: impl PgExecutor<'e>, id: UserId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected() > 0)
}
