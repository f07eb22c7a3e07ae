//! Application error type and the JSON envelope every failure is rendered as.

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

use crate::storage::StorageError;

pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = status.as_u16();

        let body = match self {
            AppError::Validation(errors) => json!({
                "success": false,
                "message": "Validation failed",
                "statusCode": code,
                "errors": errors,
            }),
            AppError::Internal(e) => {
                // Cause chain stays in the logs; clients get a generic message.
                error!(error = ?e, "unhandled error");
                json!({
                    "success": false,
                    "message": "Internal server error",
                    "statusCode": code,
                })
            }
            AppError::BadRequest(message)
            | AppError::Unauthorized(message)
            | AppError::NotFound(message) => json!({
                "success": false,
                "message": message,
                "statusCode": code,
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationErrors> for AppError {
    fn from(e: ValidationErrors) -> Self {
        AppError::Validation(
            e.field_errors()
                .into_iter()
                .map(|(field, errors)| {
                    (
                        field.to_string(),
                        errors
                            .iter()
                            .map(|e| {
                                e.message
                                    .clone()
                                    .map(|m| m.to_string())
                                    .unwrap_or_else(|| format!("invalid {}", field))
                            })
                            .collect(),
                    )
                })
                .collect(),
        )
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::EmailTaken => AppError::BadRequest("Email already registered".into()),
            StorageError::UserNotFound => AppError::NotFound("User not found".into()),
            StorageError::InsufficientCoins { required, balance } => AppError::BadRequest(format!(
                "Insufficient coins. You need {} coins to exchange, you have {}.",
                required, balance
            )),
            StorageError::IdempotencyConflict => AppError::BadRequest(
                "Idempotency key was already used for a different package".into(),
            ),
            StorageError::NegativeBalance(_) => {
                AppError::BadRequest("Coin balance cannot be negative".into())
            }
            e @ StorageError::DanglingSeller { .. } => AppError::Internal(e.into()),
        }
    }
}
