use axum::{
    Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::{CurrentUser, Viewer};
use crate::models::User;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UserEnvelope<T> {
    pub status: &'static str,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct UserPayload {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct ViewerPayload {
    pub user: Option<User>,
}

/// GET /api/v1/users/me
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<UserEnvelope<UserPayload>> {
    Json(UserEnvelope {
        status: "success",
        data: UserPayload { user },
    })
}

/// GET /api/v1/users/{id} (admin only)
pub async fn get_user(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<UserEnvelope<UserPayload>>, AppError> {
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No user found with that ID".to_string()))?;

    Ok(Json(UserEnvelope {
        status: "success",
        data: UserPayload { user },
    }))
}

/// GET /api/v1/viewer
///
/// Pages that adapt to a logged-in user ask here; anonymous callers get
/// `user: null`, never an error.
pub async fn viewer(Viewer(user): Viewer) -> Json<UserEnvelope<ViewerPayload>> {
    Json(UserEnvelope {
        status: "success",
        data: ViewerPayload { user },
    })
}
