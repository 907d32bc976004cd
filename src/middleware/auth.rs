use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::error::AppError;
use crate::models::User;
use crate::state::AppState;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "jwt";

/// Authenticated user, inserted by [`protect`]
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Possibly-anonymous viewer, inserted by [`is_logged_in`]
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<User>);

/// Token from `Authorization: Bearer <token>`, else from the session cookie
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    from_header.or_else(|| {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
    })
}

/// Resolve the user behind a session token
///
/// 1. verify signature and expiry
/// 2. load the user (role included)
/// 3. reject tokens issued before the last password change
pub async fn authenticate(state: &AppState, token: &str) -> Result<User, AppError> {
    let claims = state.tokens.verify(token)?;

    let user = state.users.find_by_id(claims.sub).await?.ok_or_else(|| {
        AppError::Authentication("The user belonging to this token no longer exists.".to_string())
    })?;

    if user.changed_password_after(claims.iat) {
        tracing::info!(user_id = %user.id, "stale session token rejected");
        return Err(AppError::Authentication(
            "User recently changed password! Please log in again.".to_string(),
        ));
    }

    Ok(user)
}

/// Route protection: rejects the request unless it carries a valid session
pub async fn protect(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(req.headers()).ok_or_else(AppError::not_logged_in)?;
    let user = authenticate(&state, &token).await?;

    tracing::debug!(user_id = %user.id, "request authenticated");
    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}

/// Soft variant of [`protect`]: never fails, attaches the user when one is
/// logged in
pub async fn is_logged_in(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let user = match extract_token(req.headers()) {
        Some(token) => match authenticate(&state, &token).await {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::debug!(error = %e, "treating request as anonymous");
                None
            }
        },
        None => None,
    };

    req.extensions_mut().insert(Viewer(user));
    next.run(req).await
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(AppError::not_logged_in)
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Viewer>().cloned().unwrap_or_default())
    }
}
