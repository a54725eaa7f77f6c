use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use water_client::domain::UserId;

use super::error::AppError;

/// Header the access layer sets after authenticating the caller.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller. Every engine operation is scoped to this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<UserId>().ok())
            .map(CurrentUser)
            .ok_or(AppError::Unauthenticated)
    }
}
