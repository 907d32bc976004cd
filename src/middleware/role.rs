use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::middleware::auth::CurrentUser;
use crate::models::Role;

/// Set of roles admitted by [`require_role`]
#[derive(Debug, Clone, Copy)]
pub struct RoleGuard {
    allowed: &'static [Role],
}

/// Guard admitting only `roles`
///
/// ```ignore
/// router.route_layer(from_fn_with_state(restrict_to(&[Role::Admin]), require_role))
/// ```
pub fn restrict_to(roles: &'static [Role]) -> RoleGuard {
    RoleGuard { allowed: roles }
}

impl RoleGuard {
    pub fn check(&self, role: Role) -> Result<(), AppError> {
        if self.allowed.contains(&role) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Must be layered inside [`crate::middleware::protect`]
pub async fn require_role(
    State(guard): State<RoleGuard>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let CurrentUser(user) = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(AppError::not_logged_in)?;

    if let Err(e) = guard.check(user.role) {
        tracing::warn!(user_id = %user.id, role = ?user.role, "role not permitted");
        return Err(e);
    }

    Ok(next.run(req).await)
}
