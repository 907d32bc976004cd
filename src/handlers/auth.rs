use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::handlers::session::{clear_session, send_session};
use crate::state::AppState;

// === Signup ===

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[garde(length(min = 1, max = 100))]
    pub name: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 8))]
    pub password: String,
    #[garde(matches(password))]
    pub confirm_password: String,
}

/// POST /api/v1/users/signup
///
/// # Security
/// - the password is hashed before storage and never logged
pub async fn signup(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<SignupRequest>, AppError>,
) -> Result<Response, AppError> {
    request.validate()?;

    let welcome_url = format!("{}/me", state.config.app_url());
    let user = state
        .auth_service
        .signup(&request.name, &request.email, &request.password, &welcome_url)
        .await?;

    Ok(send_session(&state, StatusCode::CREATED, &user, true)?.into_response())
}

// === Login ===

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// POST /api/v1/users/login
///
/// Unknown email and wrong password get the same 401.
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<Response, AppError> {
    let (email, password) = validate_login_request(&request)?;

    let user = state.auth_service.login(email, password).await?;

    Ok(send_session(&state, StatusCode::OK, &user, false)?.into_response())
}

fn validate_login_request(request: &LoginRequest) -> Result<(&str, &str), AppError> {
    match (request.email.as_deref(), request.password.as_deref()) {
        (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
            Ok((email, password))
        }
        _ => Err(AppError::Validation(
            "Please provide email and password!".to_string(),
        )),
    }
}

// === Logout ===

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// GET /api/v1/users/logout
pub async fn logout() -> impl IntoResponse {
    (
        clear_session(),
        Json(StatusResponse { status: "success" }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup_request(email: &str, password: &str, confirm: &str) -> SignupRequest {
        SignupRequest {
            name: "Jonas".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn test_validate_valid_signup() {
        assert!(
            signup_request("test@example.com", "password123", "password123")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_validate_invalid_email() {
        assert!(
            signup_request("invalid-email", "password123", "password123")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_validate_short_password() {
        assert!(signup_request("test@example.com", "short", "short").validate().is_err());
    }

    #[test]
    fn test_validate_confirm_mismatch() {
        assert!(
            signup_request("test@example.com", "password123", "password124")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_validate_login_missing_fields() {
        let missing_password = LoginRequest {
            email: Some("test@example.com".to_string()),
            password: None,
        };
        let empty_email = LoginRequest {
            email: Some("  ".to_string()),
            password: Some("password123".to_string()),
        };

        assert!(validate_login_request(&missing_password).is_err());
        assert!(validate_login_request(&empty_email).is_err());
    }

    #[test]
    fn test_validate_login_ok() {
        let request = LoginRequest {
            email: Some("test@example.com".to_string()),
            password: Some("password123".to_string()),
        };
        assert_eq!(
            validate_login_request(&request).unwrap(),
            ("test@example.com", "password123")
        );
    }
}
