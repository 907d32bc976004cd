use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::handlers::session::send_session;
use crate::middleware::CurrentUser;
use crate::state::AppState;

// === Forgot password ===

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub status: &'static str,
    pub message: String,
}

/// POST /api/v1/users/forgotPassword
///
/// # Security
/// The reset token only travels by email; it never appears in the response
/// or the logs.
pub async fn forgot_password(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<ForgotPasswordRequest>, AppError>,
) -> Result<Json<MessageResponse>, AppError> {
    validate_email(&request.email)?;

    state
        .password_reset_service
        .request_reset(&request.email)
        .await?;

    Ok(Json(MessageResponse {
        status: "success",
        message: "Token sent to email!".to_string(),
    }))
}

fn validate_email(email: &str) -> Result<(), AppError> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(AppError::Validation(
            "Please provide a valid email address".to_string(),
        ));
    }
    Ok(())
}

// === Reset password ===

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[garde(length(min = 8))]
    pub password: String,
    #[garde(matches(password))]
    pub confirm_password: String,
}

/// PATCH /api/v1/users/resetPassword/{token}
///
/// Logs the user in on success.
pub async fn reset_password(
    State(state): State<AppState>,
    WithRejection(Path(token), _): WithRejection<Path<String>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<ResetPasswordRequest>, AppError>,
) -> Result<Response, AppError> {
    request.validate()?;

    let user = state
        .password_reset_service
        .reset_password(&token, &request.password)
        .await?;

    Ok(send_session(&state, StatusCode::OK, &user, false)?.into_response())
}

// === Update password (logged in) ===

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    #[serde(default)]
    #[garde(skip)]
    pub current_password: Option<String>,
    #[garde(length(min = 8))]
    pub new_password: String,
    #[garde(matches(new_password))]
    pub confirm_password: String,
}

/// PATCH /api/v1/users/updateMyPassword
///
/// Issues a fresh session; older tokens become stale.
pub async fn update_my_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    WithRejection(Json(request), _): WithRejection<Json<UpdatePasswordRequest>, AppError>,
) -> Result<Response, AppError> {
    request.validate()?;

    let user = state
        .auth_service
        .update_password(
            user.id,
            request.current_password.as_deref(),
            &request.new_password,
        )
        .await?;

    Ok(send_session(&state, StatusCode::OK, &user, false)?.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("").is_err());
        assert!(validate_email("invalid-email").is_err());
        assert!(validate_email("test@example.com").is_ok());
    }

    #[test]
    fn test_validate_reset_request() {
        let ok = ResetPasswordRequest {
            password: "password123".to_string(),
            confirm_password: "password123".to_string(),
        };
        let mismatch = ResetPasswordRequest {
            password: "password123".to_string(),
            confirm_password: "password321".to_string(),
        };
        let short = ResetPasswordRequest {
            password: "short".to_string(),
            confirm_password: "short".to_string(),
        };

        assert!(ok.validate().is_ok());
        assert!(mismatch.validate().is_err());
        assert!(short.validate().is_err());
    }

    #[test]
    fn test_validate_update_request_allows_missing_current_password() {
        // a missing current password is an authentication failure, not a validation one
        let request = UpdatePasswordRequest {
            current_password: None,
            new_password: "password123".to_string(),
            confirm_password: "password123".to_string(),
        };
        assert!(request.validate().is_ok());
    }
}
