use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use water_client::StoreError;

use crate::{accounts::AccountError, error::TrackerError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Missing or invalid user id header")]
    Unauthenticated,

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Tracker(TrackerError::DuplicateDate(_)) => StatusCode::CONFLICT,
            AppError::Tracker(TrackerError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Tracker(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Account(AccountError::MissingField(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Account(AccountError::UsernameTaken(_) | AccountError::EmailTaken(_)) => {
                StatusCode::CONFLICT
            }
            AppError::Account(AccountError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details stay in the logs.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "An unexpected error occurred.".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
