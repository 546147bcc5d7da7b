use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

/// Failure kinds surfaced by the auth core and the resource handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("incorrect username or password")]
    InvalidCredentials,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("could not validate credentials")]
    Unauthenticated,

    #[error("inactive user")]
    InactiveAccount,

    #[error("operation forbidden")]
    Forbidden,

    #[error("username already registered")]
    DuplicateUsername,

    #[error("email already registered")]
    DuplicateEmail,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("old password does not match")]
    WrongPassword,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::InvalidToken | AppError::Unauthenticated => {
                StatusCode::UNAUTHORIZED
            }
            AppError::InactiveAccount | AppError::WrongPassword | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::DuplicateUsername | AppError::DuplicateEmail => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::InvalidToken => "invalid_token",
            AppError::Unauthenticated => "unauthenticated",
            AppError::InactiveAccount => "inactive_account",
            AppError::Forbidden => "forbidden",
            AppError::DuplicateUsername => "duplicate_username",
            AppError::DuplicateEmail => "duplicate_email",
            AppError::NotFound(_) => "not_found",
            AppError::WrongPassword => "wrong_password",
            AppError::Validation(_) => "validation_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(constraint) if constraint.contains("username") => {
                AppError::DuplicateUsername
            }
            StoreError::UniqueViolation(constraint) if constraint.contains("email") => {
                AppError::DuplicateEmail
            }
            StoreError::UniqueViolation(constraint) => {
                AppError::Internal(anyhow::anyhow!("unique constraint `{constraint}` violated"))
            }
            StoreError::Other(e) => AppError::Internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        let mut res = (
            status,
            Json(json!({
                "error": self.code(),
                "message": message,
            })),
        )
            .into_response();
        if matches!(self, AppError::Unauthenticated) {
            res.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        res
    }
}
