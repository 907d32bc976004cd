use axum::{Json, http::StatusCode};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::error::AppError;
use crate::middleware::SESSION_COOKIE;
use crate::models::User;
use crate::state::AppState;

/// `{ "user": ... }` payload shared by user-returning endpoints
#[derive(Debug, Serialize)]
pub struct UserData<'a> {
    pub user: &'a User,
}

/// Body returned when a session is issued
#[derive(Debug, Serialize)]
pub struct SessionResponse<'a> {
    pub status: &'static str,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<UserData<'a>>,
}

/// Issue a session for `user`: sign a token, set the session cookie and write
/// the success envelope
///
/// # Security
/// The password hash is excluded by `User`'s serialization; the caller's
/// value is not modified.
pub fn send_session<'a>(
    state: &AppState,
    status: StatusCode,
    user: &'a User,
    include_user: bool,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse<'a>>), AppError> {
    let token = state.tokens.issue(user.id)?;

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::None)
        .secure(state.config.is_production())
        .expires(
            OffsetDateTime::now_utc() + Duration::days(state.config.jwt_cookie_expires_in_days),
        );

    let body = SessionResponse {
        status: "success",
        token,
        data: include_user.then_some(UserData { user }),
    };

    Ok((status, CookieJar::new().add(cookie), Json(body)))
}

/// Overwrite the session cookie with a short-lived placeholder
pub fn clear_session() -> CookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, "loggedout"))
        .path("/")
        .http_only(true)
        .expires(OffsetDateTime::now_utc() + Duration::seconds(10));

    CookieJar::new().add(cookie)
}
