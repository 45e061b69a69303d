use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::application::AppError;

use super::types::StatusResponse;

/// Everything a handler can fail with. Rendered as `{status: "error", message}`.
///
/// Every unusable body (bad JSON, wrong content type, not an object) is a 400.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Rejected(#[from] JsonRejection),

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error(transparent)]
    App(#[from] AppError),
}

impl ApiError {
    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        ApiError::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Rejected(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidField { .. } => StatusCode::BAD_REQUEST,
            ApiError::App(AppError::InvalidReferral(_)) => StatusCode::BAD_REQUEST,
            ApiError::App(AppError::BalanceOverflow { .. }) => StatusCode::BAD_REQUEST,
            ApiError::App(AppError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // Storage details stay in the log.
            ApiError::App(AppError::Database(e)) => {
                error!("storage failure: {:#}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(StatusResponse::error(message))).into_response()
    }
}
