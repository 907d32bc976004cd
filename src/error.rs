use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("authentication error: {0}")]
    Authentication(String),

    #[error("forbidden")]
    Forbidden,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("email address already in use")]
    EmailAlreadyExists,

    #[error("reset token is invalid or has expired")]
    TokenExpired,

    #[error("email delivery failed")]
    EmailDelivery(#[source] anyhow::Error),

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_logged_in() -> Self {
        Self::Authentication("You are not logged in! Please log in to get access.".to_string())
    }

    pub fn invalid_credentials() -> Self {
        Self::Authentication("Incorrect email or password".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::TokenExpired => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::EmailAlreadyExists => StatusCode::CONFLICT,
            Self::EmailDelivery(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<garde::Report> for AppError {
    fn from(report: garde::Report) -> Self {
        Self::Validation(report.to_string())
    }
}

// Extractor rejections answer with the same envelope as handler errors

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(status = %rejection.status(), "request body rejected");
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(status = %rejection.status(), "path parameter rejected");
        Self::Validation(rejection.body_text())
    }
}

/// Error envelope: `fail` for client errors, `error` for server errors
#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Validation(msg) | Self::Authentication(msg) | Self::NotFound(msg) => msg.clone(),
            Self::Forbidden => "You do not have permission to perform this action".to_string(),
            Self::EmailAlreadyExists => "Email address is already in use".to_string(),
            Self::TokenExpired => "Token is invalid or has expired".to_string(),
            Self::EmailDelivery(e) => {
                tracing::error!(error = ?e, "email delivery failed");
                "There was an error sending the email! Try again later!".to_string()
            }
            Self::Database(e) => {
                tracing::error!(error = ?e, "database error");
                "Something went very wrong!".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "internal error");
                "Something went very wrong!".to_string()
            }
        };

        let body = ErrorResponse {
            status: if status.is_server_error() { "error" } else { "fail" },
            message,
        };

        (status, Json(body)).into_response()
    }
}
